//! Configuration for Vellum.
//!
//! This module provides configuration structures for all components.

mod components;

pub use components::{LockManagerConfig, SkipListConfig, TransactionManagerConfig};
