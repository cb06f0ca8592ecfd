//! Vellum Performance Benchmarks
//!
//! This crate contains benchmarks for Vellum components:
//! - Concurrent skip list inserts, lookups, removals, and scans
//! - Mixed multi-threaded workloads
//!
//! Run benchmarks with:
//! ```bash
//! cargo bench -p vellum-bench
//! ```

pub mod utils;
