//! # vellum-index
//!
//! Concurrent sorted index for Vellum.
//!
//! The versioned key space is held in a [`ConcurrentSkipList`]: a
//! probabilistically balanced sorted structure with lock-free reads and
//! fine-grained, per-node locking for inserts and removals.
//!
//! - **Reads** (`contains`, `try_get_value`, iteration) never take a node
//!   lock and only observe fully inserted, not deleted entries.
//! - **Inserts** lock the predecessors of the new node bottom-up, validate
//!   adjacency, and publish the node level by level.
//! - **Removals** mark the node deleted first, then unlink it top-down under
//!   the predecessors' locks. Unlinked nodes are reclaimed once no reader can
//!   still observe them.
//!
//! # Example
//!
//! ```rust
//! use vellum_index::ConcurrentSkipList;
//!
//! let list = ConcurrentSkipList::new();
//! assert!(list.try_add(5, "a"));
//! assert!(!list.try_add(5, "b"));
//! assert_eq!(list.try_get_value(&5), Some("a"));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Key ordering abstraction.
pub mod comparer;

/// The concurrent skip list.
pub mod skiplist;

/// Sorted container trait.
pub mod sorted;

pub use comparer::{FnComparer, KeyComparer, OrdComparer};
pub use skiplist::{ConcurrentSkipList, Iter};
pub use sorted::SortedList;
