//! # vellum-common
//!
//! Common types, errors, and configuration for Vellum.
//!
//! This crate provides the foundational types shared by the index, MVCC,
//! and transaction crates:
//!
//! - **Types**: Identifiers (`TxnId`, `Lsn`, `StateProviderId`)
//! - **Errors**: Unified error handling with `VellumError`
//! - **Config**: Component configuration structures
//! - **Constants**: System-wide constants and sentinels
//!
//! ## Example
//!
//! ```rust
//! use vellum_common::error::VellumResult;
//! use vellum_common::types::{Lsn, TxnId};
//!
//! fn example() -> VellumResult<()> {
//!     let txn = TxnId::scoped(0, 1);
//!     let lsn = Lsn::new(42);
//!     assert!(txn.is_valid() && lsn.is_valid());
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod constants;
pub mod error;
pub mod types;

// Re-export commonly used items at the crate root
pub use constants::*;
pub use error::{ErrorCode, VellumError, VellumResult};
pub use types::{AtomicGroupId, Lsn, StateProviderId, TxnId};
