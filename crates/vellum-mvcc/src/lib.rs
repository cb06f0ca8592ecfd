//! # vellum-mvcc
//!
//! Snapshot visibility tracking for Vellum.
//!
//! This crate implements:
//! - Registration of snapshot readers and their visibility numbers
//! - Reclamation checks for superseded versions and checkpoints
//! - Dispatching-barrier gating of new registrations

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Dispatching barrier signals
pub mod barrier;

/// Visibility-number tracking
pub mod version;

pub use barrier::{BarrierCompleter, BarrierSignal};
pub use version::{
    EnumerationCompletion, RemovalWait, TryRemoveVersionResult, VersionManager, VersionProvider,
    VersionStats,
};
