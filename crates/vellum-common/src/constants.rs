//! System-wide constants for Vellum.

use std::time::Duration;

use crate::types::AtomicGroupId;

// =============================================================================
// Transaction Constants
// =============================================================================

/// Atomic group id of a trivial read/write transaction (one that belongs to
/// no atomic group and is never tracked by the transaction manager).
pub const INVALID_ATOMIC_GROUP_ID: AtomicGroupId = -1;

/// Default timeout for lock acquisition.
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(30);

// =============================================================================
// Version Manager Constants
// =============================================================================

/// Minimum distance between a removed checkpoint LSN and the next one.
///
/// A barrier record always separates two checkpoints.
pub const MIN_CHECKPOINT_LSN_GAP: u64 = 2;

// =============================================================================
// Skip List Constants
// =============================================================================

/// Default number of levels in a skip list.
pub const DEFAULT_SKIP_LIST_LEVELS: usize = 32;

/// Largest supported number of skip-list levels.
pub const MAX_SKIP_LIST_LEVELS: usize = 64;

/// Default probability that a node is promoted to the next level.
pub const DEFAULT_PROMOTION_PROBABILITY: f64 = 0.5;
