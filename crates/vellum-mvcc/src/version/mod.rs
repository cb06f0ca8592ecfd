//! Visibility-number tracking and version reclamation.
//!
//! Every snapshot reader registers with the [`VersionManager`] to obtain a
//! visibility number and unregisters once it is done reading. A version (or
//! checkpoint) that was superseded at `next` after being written at `commit`
//! is still reachable by any reader whose number lies in `(commit, next]`.
//!
//! ```text
//! outstanding:   [ 12, 15, 15, 21, 40 ]
//!
//! try_remove_version(sp, commit = 14, next = 21)
//!                     └──(14, 21]──┘
//!                     blocked by 15 and 21
//!
//! try_remove_version(sp, commit = 21, next = 30)
//!                     (21, 30] is empty → removable
//! ```
//!
//! Each distinct outstanding number owns a completion signal that fires when
//! its last holder unregisters. Blocked callers receive waits built from
//! those signals.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tokio::sync::watch;
use tracing::{debug, trace};
use vellum_common::constants::MIN_CHECKPOINT_LSN_GAP;
use vellum_common::{Lsn, StateProviderId, VellumError, VellumResult};

use crate::barrier::BarrierSignal;

/// Source of visibility numbers.
///
/// Successive calls must never go backwards.
pub trait VersionProvider: Send + Sync {
    /// Returns the current version number.
    fn current_version(&self) -> Lsn;
}

/// A wait that completes once every blocking visibility number has been
/// released.
#[derive(Clone, Default)]
pub struct RemovalWait {
    pending: Vec<watch::Receiver<bool>>,
}

impl RemovalWait {
    /// A wait that is already complete.
    pub fn ready() -> Self {
        Self::default()
    }

    fn from_receivers(pending: Vec<watch::Receiver<bool>>) -> Self {
        Self { pending }
    }

    /// Returns true if nothing blocks removal any more.
    pub fn is_ready(&self) -> bool {
        self.pending.iter().all(|done| *done.borrow())
    }

    /// Number of signals this wait was built from.
    pub fn blocking_count(&self) -> usize {
        self.pending.len()
    }

    /// Waits until every blocking number has been released.
    pub async fn wait(self) {
        for mut done in self.pending {
            // The signal is dropped either after sending `true` or with the
            // manager itself; both release the wait.
            let _ = done.wait_for(|released| *released).await;
        }
    }
}

impl fmt::Debug for RemovalWait {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemovalWait")
            .field("blocking", &self.pending.len())
            .field("ready", &self.is_ready())
            .finish()
    }
}

/// Notification that enumeration at `visibility_lsn` has finished.
#[derive(Debug, Clone)]
pub struct EnumerationCompletion {
    /// The blocking visibility number.
    pub visibility_lsn: Lsn,
    /// Completes when `visibility_lsn` is released.
    pub wait: RemovalWait,
}

/// Result of [`VersionManager::try_remove_version`].
#[derive(Debug, Clone, Default)]
pub struct TryRemoveVersionResult {
    /// True if no reader can still observe the version.
    pub can_be_removed: bool,
    /// Every visibility number that currently blocks removal.
    pub enumeration_set: BTreeSet<Lsn>,
    /// Completion notifications not previously handed to this state provider.
    pub enumeration_completion_notifications: Vec<EnumerationCompletion>,
}

impl TryRemoveVersionResult {
    fn removable() -> Self {
        Self {
            can_be_removed: true,
            ..Self::default()
        }
    }
}

/// Point-in-time statistics of a [`VersionManager`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VersionStats {
    /// Outstanding registrations, counting duplicates.
    pub outstanding: usize,
    /// Distinct numbers with a pending completion signal.
    pub pending_signals: usize,
    /// Registered `(state provider, number)` notifications.
    pub notifications: usize,
    /// Total registrations.
    pub registrations: u64,
    /// Total unregistrations.
    pub unregistrations: u64,
    /// Registrations that waited on a dispatching barrier.
    pub barrier_waits: u64,
}

#[derive(Default)]
struct VersionCounters {
    registrations: AtomicU64,
    unregistrations: AtomicU64,
    barrier_waits: AtomicU64,
}

#[derive(Default)]
struct VersionState {
    /// Sorted, duplicates allowed.
    outstanding: Vec<Lsn>,
    signals: HashMap<Lsn, watch::Sender<bool>>,
    notified: HashSet<(StateProviderId, Lsn)>,
}

impl VersionState {
    /// Distinct outstanding numbers in `(low, high]`.
    fn blocking(&self, low: Lsn, high: Lsn) -> impl Iterator<Item = Lsn> + '_ {
        let start = self.outstanding.partition_point(|lsn| *lsn <= low);
        let mut last = None;
        self.outstanding[start..]
            .iter()
            .copied()
            .take_while(move |lsn| *lsn <= high)
            .filter(move |lsn| {
                let fresh = last != Some(*lsn);
                last = Some(*lsn);
                fresh
            })
    }

    fn subscribe(&self, lsn: Lsn) -> Option<watch::Receiver<bool>> {
        let signal = self.signals.get(&lsn);
        debug_assert!(signal.is_some(), "outstanding {lsn} has no completion signal");
        signal.map(watch::Sender::subscribe)
    }
}

/// Tracks outstanding snapshot visibility numbers.
pub struct VersionManager {
    provider: Arc<dyn VersionProvider>,
    state: RwLock<VersionState>,
    barrier: Mutex<Option<BarrierSignal>>,
    counters: VersionCounters,
}

impl VersionManager {
    /// Creates a manager drawing numbers from `provider`.
    pub fn new(provider: Arc<dyn VersionProvider>) -> Self {
        Self {
            provider,
            state: RwLock::new(VersionState::default()),
            barrier: Mutex::new(None),
            counters: VersionCounters::default(),
        }
    }

    /// Records the most recently dispatched barrier.
    pub fn update_dispatching_barrier(&self, barrier: BarrierSignal) {
        *self.barrier.lock() = Some(barrier);
    }

    /// Registers a snapshot reader and returns its visibility number.
    ///
    /// Waits for the latest dispatching barrier first.
    ///
    /// # Panics
    ///
    /// Panics if the provider hands out a number lower than one already
    /// registered.
    pub async fn register(&self) -> Lsn {
        let barrier = self.barrier.lock().clone();
        if let Some(barrier) = barrier.filter(|b| !b.is_complete()) {
            debug!("registration waiting for dispatching barrier");
            self.counters
                .barrier_waits
                .fetch_add(1, AtomicOrdering::Relaxed);
            barrier.wait().await;
        }

        let mut state = self.state.write();
        let lsn = self.provider.current_version();
        if let Some(&highest) = state.outstanding.last() {
            assert!(
                lsn >= highest,
                "version provider went backwards: {lsn} < {highest}"
            );
        }
        state.outstanding.push(lsn);
        state
            .signals
            .entry(lsn)
            .or_insert_with(|| watch::channel(false).0);
        drop(state);

        self.counters
            .registrations
            .fetch_add(1, AtomicOrdering::Relaxed);
        trace!(%lsn, "registered visibility number");
        lsn
    }

    /// Releases one registration of `lsn`.
    ///
    /// When the last registration of that number goes away its completion
    /// signal fires and its notifications are discarded.
    ///
    /// # Panics
    ///
    /// Panics if `lsn` is not registered.
    pub fn unregister(&self, lsn: Lsn) {
        let released = {
            let mut state = self.state.write();
            let index = state
                .outstanding
                .binary_search(&lsn)
                .unwrap_or_else(|_| panic!("unregister of {lsn}, which is not registered"));
            state.outstanding.remove(index);

            if state.outstanding.binary_search(&lsn).is_ok() {
                None
            } else {
                state.notified.retain(|(_, notified)| *notified != lsn);
                state.signals.remove(&lsn)
            }
        };

        self.counters
            .unregistrations
            .fetch_add(1, AtomicOrdering::Relaxed);
        if let Some(signal) = released {
            trace!(%lsn, "visibility number released");
            signal.send_replace(true);
        }
    }

    /// Checks whether the checkpoint at `remove_lsn`, superseded by the one
    /// at `next_lsn`, can be reclaimed.
    ///
    /// Returns a ready wait if no reader blocks it.
    pub fn try_remove_checkpoint(
        &self,
        remove_lsn: Lsn,
        next_lsn: Lsn,
    ) -> VellumResult<RemovalWait> {
        if next_lsn.diff(remove_lsn) < MIN_CHECKPOINT_LSN_GAP {
            return Err(VellumError::invalid_argument(format!(
                "checkpoint {next_lsn} must follow {remove_lsn} by at least \
                 {MIN_CHECKPOINT_LSN_GAP}"
            )));
        }

        let state = self.state.read();
        let pending: Vec<_> = state
            .blocking(remove_lsn, next_lsn)
            .filter_map(|lsn| state.subscribe(lsn))
            .collect();
        drop(state);

        if pending.is_empty() {
            return Ok(RemovalWait::ready());
        }
        debug!(
            %remove_lsn,
            %next_lsn,
            blocking = pending.len(),
            "checkpoint removal blocked by readers"
        );
        Ok(RemovalWait::from_receivers(pending))
    }

    /// Checks whether a version of `state_provider` committed at `commit_lsn`
    /// and superseded at `next_lsn` can be removed.
    ///
    /// At most one completion notification is handed out per
    /// `(state_provider, number)` pair until that number is released.
    pub fn try_remove_version(
        &self,
        state_provider: StateProviderId,
        commit_lsn: Lsn,
        next_lsn: Lsn,
    ) -> TryRemoveVersionResult {
        let mut state = self.state.write();
        let blocking: BTreeSet<Lsn> = state.blocking(commit_lsn, next_lsn).collect();
        if blocking.is_empty() {
            return TryRemoveVersionResult::removable();
        }

        let mut notifications = Vec::new();
        for &lsn in &blocking {
            if !state.notified.insert((state_provider, lsn)) {
                continue;
            }
            if let Some(done) = state.subscribe(lsn) {
                notifications.push(EnumerationCompletion {
                    visibility_lsn: lsn,
                    wait: RemovalWait::from_receivers(vec![done]),
                });
            }
        }
        drop(state);

        debug!(
            %state_provider,
            %commit_lsn,
            %next_lsn,
            blocking = blocking.len(),
            new_notifications = notifications.len(),
            "version removal blocked by readers"
        );
        TryRemoveVersionResult {
            can_be_removed: false,
            enumeration_set: blocking,
            enumeration_completion_notifications: notifications,
        }
    }

    /// Number of outstanding registrations, counting duplicates.
    pub fn outstanding_count(&self) -> usize {
        self.state.read().outstanding.len()
    }

    /// Returns current statistics.
    pub fn stats(&self) -> VersionStats {
        let state = self.state.read();
        VersionStats {
            outstanding: state.outstanding.len(),
            pending_signals: state.signals.len(),
            notifications: state.notified.len(),
            registrations: self.counters.registrations.load(AtomicOrdering::Relaxed),
            unregistrations: self.counters.unregistrations.load(AtomicOrdering::Relaxed),
            barrier_waits: self.counters.barrier_waits.load(AtomicOrdering::Relaxed),
        }
    }
}

impl fmt::Debug for VersionManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.read();
        f.debug_struct("VersionManager")
            .field("outstanding", &state.outstanding)
            .field("pending_signals", &state.signals.len())
            .field("notifications", &state.notified.len())
            .finish()
    }
}
