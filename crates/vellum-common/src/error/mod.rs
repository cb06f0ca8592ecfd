//! Error handling for Vellum.
//!
//! This module provides a unified error type and result alias used
//! across all Vellum components.

mod vellum;

pub use vellum::{ErrorCode, VellumError};

/// Result type alias for Vellum operations.
pub type VellumResult<T> = std::result::Result<T, VellumError>;
