//! # vellum-test
//!
//! Integration tests for Vellum.
//!
//! This crate contains:
//! - Shared test utilities (tracing setup, version providers)
//! - Cross-crate scenario tests under `tests/`

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Test utilities and helpers
pub mod utils;

pub use utils::{init_tracing, SequenceProvider};
