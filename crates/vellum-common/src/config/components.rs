//! Component configuration structures.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::constants::{
    DEFAULT_LOCK_TIMEOUT, DEFAULT_PROMOTION_PROBABILITY, DEFAULT_SKIP_LIST_LEVELS,
    MAX_SKIP_LIST_LEVELS,
};
use crate::error::{VellumError, VellumResult};

/// Skip list configuration.
///
/// # Example
///
/// ```rust
/// use vellum_common::config::SkipListConfig;
///
/// let config = SkipListConfig::default();
/// assert_eq!(config.max_level, 32);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkipListConfig {
    /// Number of levels, including level 0.
    /// Default: 32
    pub max_level: usize,

    /// Probability that a node reaching level L also reaches level L+1.
    /// Default: 0.5
    pub promotion_probability: f64,
}

impl Default for SkipListConfig {
    fn default() -> Self {
        Self {
            max_level: DEFAULT_SKIP_LIST_LEVELS,
            promotion_probability: DEFAULT_PROMOTION_PROBABILITY,
        }
    }
}

impl SkipListConfig {
    /// Sets the number of levels.
    #[must_use]
    pub fn with_max_level(mut self, max_level: usize) -> Self {
        self.max_level = max_level;
        self
    }

    /// Sets the promotion probability.
    #[must_use]
    pub fn with_promotion_probability(mut self, probability: f64) -> Self {
        self.promotion_probability = probability;
        self
    }

    /// Validates the configuration.
    pub fn validate(&self) -> VellumResult<()> {
        if self.max_level == 0 || self.max_level > MAX_SKIP_LIST_LEVELS {
            return Err(VellumError::invalid_argument(format!(
                "max_level must be in 1..={MAX_SKIP_LIST_LEVELS}, got {}",
                self.max_level
            )));
        }

        if !(self.promotion_probability > 0.0 && self.promotion_probability < 1.0) {
            return Err(VellumError::invalid_argument(format!(
                "promotion_probability must be in (0, 1), got {}",
                self.promotion_probability
            )));
        }

        Ok(())
    }
}

/// Lock manager configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockManagerConfig {
    /// Timeout applied when a caller does not pass one explicitly.
    /// `None` waits forever.
    /// Default: 30 seconds
    pub default_timeout: Option<Duration>,
}

impl Default for LockManagerConfig {
    fn default() -> Self {
        Self {
            default_timeout: Some(DEFAULT_LOCK_TIMEOUT),
        }
    }
}

impl LockManagerConfig {
    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`VellumError::InvalidArgument`] for a zero default timeout,
    /// which would turn every lock taken with the default into a try-lock.
    pub fn validate(&self) -> VellumResult<()> {
        if self.default_timeout == Some(Duration::ZERO) {
            return Err(VellumError::invalid_argument(
                "default lock timeout must be non-zero (use None to wait forever)",
            ));
        }
        Ok(())
    }
}

/// Transaction manager configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TransactionManagerConfig {
    /// Namespace stamped into every transaction id issued by the manager.
    /// Default: 0
    pub owner_namespace: u16,

    /// Configuration of the lock manager created on open.
    pub lock: LockManagerConfig,
}

impl TransactionManagerConfig {
    /// Creates a configuration for the given owner namespace.
    #[must_use]
    pub fn with_namespace(owner_namespace: u16) -> Self {
        Self {
            owner_namespace,
            ..Default::default()
        }
    }

    /// Sets the default lock timeout.
    #[must_use]
    pub fn with_lock_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.lock.default_timeout = timeout;
        self
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`VellumError::InvalidArgument`] if the lock configuration is
    /// invalid.
    pub fn validate(&self) -> VellumResult<()> {
        self.lock.validate()
    }
}
