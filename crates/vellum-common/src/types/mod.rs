//! Type definitions for Vellum.
//!
//! This module contains the identifier types shared by every crate.

mod ids;

pub use ids::{AtomicGroupId, Lsn, StateProviderId, TxnId};
