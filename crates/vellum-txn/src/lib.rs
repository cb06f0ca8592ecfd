//! # vellum-txn
//!
//! Transactions and lock management for Vellum.
//!
//! This crate provides:
//!
//! - **Lock Management**: Named-resource locking with shared, update,
//!   exclusive, intention, and schema modes; re-entrant grants and
//!   timeout-bounded FIFO waiting.
//!
//! - **Transactions**: Read-only and read-write transactions that track the
//!   locks they acquire and release them all on termination.
//!
//! - **Transaction Manager**: One live transaction per atomic group,
//!   lifecycle of the shared lock manager, and drain-on-close.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │                 TransactionManager                   │
//! │   group id ──▶ ReadWriteTransaction                  │
//! │                      │                               │
//! │          ┌───────────┴────────────┐                  │
//! │          ▼                        ▼                  │
//! │  ┌────────────────┐      ┌──────────────────┐        │
//! │  │  Transaction   │─────▶│   LockManager    │        │
//! │  │ (lock table)   │      │ (grants, queues) │        │
//! │  └────────────────┘      └──────────────────┘        │
//! └──────────────────────────────────────────────────────┘
//! ```
//!
//! # Example Usage
//!
//! ```rust
//! use std::future::pending;
//! use vellum_txn::{LockMode, TransactionManager};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let tm = TransactionManager::default();
//! tm.open().await.unwrap();
//!
//! let (txn, existing) = tm.create_transaction(7).unwrap();
//! assert!(!existing);
//! txn.lock("accounts", LockMode::Exclusive, None).await.unwrap();
//!
//! assert!(tm.remove_transaction(&txn).await);
//! tm.close(pending()).await.unwrap();
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Lock table implementation.
///
/// This module provides:
/// - [`lock::LockManager`]: Manages all locks
/// - [`lock::LockMode`]: Lock modes and their compatibility
/// - [`lock::LockHandle`]: A granted lock and its reference count
pub mod lock;

/// Transaction handles.
///
/// This module provides:
/// - [`transaction::Transaction`]: Lock tracking and termination
/// - [`transaction::ReadOnlyTransaction`]: Shared-only transactions
/// - [`transaction::ReadWriteTransaction`]: Group-scoped transactions
pub mod transaction;

/// Transaction lifecycle management.
pub mod manager;

// Re-export commonly used types

pub use lock::{LockHandle, LockManager, LockMode, LockStats, LockStatus, UnlockStatus};

pub use manager::{ManagerStatus, TransactionManager, TransactionStats};

pub use transaction::{
    OperationContext, OperationContexts, ReadOnlyTransaction, ReadWriteTransaction, Transaction,
    TransactionKind,
};
