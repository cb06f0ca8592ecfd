//! Vellum error types.

use std::fmt;
use thiserror::Error;

use crate::types::TxnId;

/// Error codes for categorizing errors.
///
/// These codes can be used for programmatic error handling and
/// are stable across versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum ErrorCode {
    // General errors (0x0000 - 0x00FF)
    /// Invalid argument provided.
    InvalidArgument = 0x0003,
    /// Operation was cancelled.
    Cancelled = 0x0005,
    /// Object used after it was closed.
    ObjectClosed = 0x0006,

    // Index errors (0x0200 - 0x02FF)
    /// Key not found.
    KeyNotFound = 0x0203,

    // Transaction errors (0x0300 - 0x03FF)
    /// Lock acquisition timed out.
    LockTimeout = 0x0306,
}

impl ErrorCode {
    /// Returns the numeric code.
    #[inline]
    #[must_use]
    pub const fn as_u16(self) -> u16 {
        self as u16
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// The main error type for Vellum.
///
/// Variants separate programming-contract violations
/// ([`InvalidArgument`](Self::InvalidArgument),
/// [`KeyNotFound`](Self::KeyNotFound)) from lifecycle conflicts
/// ([`ObjectClosed`](Self::ObjectClosed)) and from expected runtime
/// conditions ([`LockTimeout`](Self::LockTimeout),
/// [`Cancelled`](Self::Cancelled)).
///
/// # Example
///
/// ```rust
/// use vellum_common::error::{ErrorCode, VellumError};
///
/// let err = VellumError::object_closed("transaction manager");
/// assert_eq!(err.code(), ErrorCode::ObjectClosed);
/// assert_eq!(err.to_string(), "transaction manager is closed");
/// ```
#[derive(Debug, Error)]
pub enum VellumError {
    // ==========================================================================
    // General Errors
    // ==========================================================================
    /// Invalid argument provided.
    #[error("invalid argument: {message}")]
    InvalidArgument {
        /// Error message.
        message: String,
    },

    /// Operation was cancelled.
    #[error("operation was cancelled")]
    Cancelled,

    /// The object was used after it was closed.
    #[error("{object} is closed")]
    ObjectClosed {
        /// What was closed.
        object: String,
    },

    // ==========================================================================
    // Index Errors
    // ==========================================================================
    /// Key not found.
    #[error("key not found")]
    KeyNotFound,

    // ==========================================================================
    // Transaction Errors
    // ==========================================================================
    /// Lock acquisition exceeded its timeout.
    #[error("transaction {txn_id} timed out acquiring lock on '{resource}' after {duration_ms}ms")]
    LockTimeout {
        /// The transaction that waited.
        txn_id: TxnId,
        /// The resource it waited for.
        resource: String,
        /// Timeout duration in milliseconds.
        duration_ms: u64,
    },
}

impl VellumError {
    /// Returns the error code for this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::InvalidArgument { .. } => ErrorCode::InvalidArgument,
            Self::Cancelled => ErrorCode::Cancelled,
            Self::ObjectClosed { .. } => ErrorCode::ObjectClosed,
            Self::KeyNotFound => ErrorCode::KeyNotFound,
            Self::LockTimeout { .. } => ErrorCode::LockTimeout,
        }
    }

    /// Returns true if this error reports use of a closed object.
    #[must_use]
    pub const fn is_closed(&self) -> bool {
        matches!(self, Self::ObjectClosed { .. })
    }

    /// Returns true if this error reports a lock timeout.
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::LockTimeout { .. })
    }

    /// Creates an invalid argument error.
    #[must_use]
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Creates an object-closed error.
    #[must_use]
    pub fn object_closed(object: impl Into<String>) -> Self {
        Self::ObjectClosed {
            object: object.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code() {
        let err = VellumError::KeyNotFound;
        assert_eq!(err.code(), ErrorCode::KeyNotFound);
        assert_eq!(err.code().as_u16(), 0x0203);

        let err = VellumError::invalid_argument("bad");
        assert_eq!(err.code(), ErrorCode::InvalidArgument);
    }

    #[test]
    fn test_error_display() {
        let err = VellumError::LockTimeout {
            txn_id: TxnId::scoped(1, 4),
            resource: "orders".to_string(),
            duration_ms: 250,
        };
        assert_eq!(
            err.to_string(),
            "transaction 1:4 timed out acquiring lock on 'orders' after 250ms"
        );
    }

    #[test]
    fn test_timeout_classification() {
        let err = VellumError::LockTimeout {
            txn_id: TxnId::new(1),
            resource: "r".to_string(),
            duration_ms: 1,
        };
        assert!(err.is_timeout());
        assert!(!VellumError::Cancelled.is_timeout());
        assert!(!VellumError::object_closed("txn").is_timeout());
    }

    #[test]
    fn test_closed_is_distinct_from_bad_input() {
        let closed = VellumError::object_closed("transaction");
        let bad = VellumError::invalid_argument("empty resource name");
        assert!(closed.is_closed());
        assert!(!bad.is_closed());
        assert_ne!(closed.code(), bad.code());
    }
}
