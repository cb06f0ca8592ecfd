//! Lock management for transaction isolation.
//!
//! This module implements a named-resource lock manager supporting:
//! - Shared (S), update (U), and exclusive (X) modes
//! - Intention locks (IS, IX) for hierarchical granularity hints
//! - Schema stability (Sch-S) and schema modification (Sch-M) locks
//! - Re-entrant grants with reference counting
//! - FIFO wait queues with upgrades ahead of new requests
//!
//! # Lock Compatibility Matrix
//!
//! ```text
//!          │ Sch-S │ Sch-M │ S  │ U  │ X  │ IS │ IX │
//! ─────────┼───────┼───────┼────┼────┼────┼────┼────┤
//!   Sch-S  │  ✓    │  ✗    │ ✓  │ ✓  │ ✓  │ ✓  │ ✓  │
//!   Sch-M  │  ✗    │  ✗    │ ✗  │ ✗  │ ✗  │ ✗  │ ✗  │
//!     S    │  ✓    │  ✗    │ ✓  │ ✓  │ ✗  │ ✓  │ ✗  │
//!     U    │  ✓    │  ✗    │ ✗  │ ✗  │ ✗  │ ✗  │ ✗  │
//!     X    │  ✓    │  ✗    │ ✗  │ ✗  │ ✗  │ ✗  │ ✗  │
//!     IS   │  ✓    │  ✗    │ ✓  │ ✗  │ ✗  │ ✓  │ ✓  │
//!     IX   │  ✓    │  ✗    │ ✗  │ ✗  │ ✗  │ ✓  │ ✓  │
//! ```
//!
//! `Free` is compatible with everything. The matrix is asymmetric for
//! S/U: a new S request is compatible with a granted U, but a new U request
//! is not compatible with a granted S.
//!
//! # Waiting
//!
//! A request that cannot be granted joins the resource's wait queue and is
//! woken when a release makes it grantable. New owners never overtake queued
//! waiters; a holder asking for a different mode is queued ahead of every
//! non-upgrade waiter.

use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering as AtomicOrdering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};
use vellum_common::config::LockManagerConfig;
use vellum_common::{TxnId, VellumError, VellumResult};

/// Lock mode for a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LockMode {
    /// No lock. Never requested; the granted mode of an idle resource.
    Free,
    /// Schema stability.
    SchemaStability,
    /// Schema modification.
    SchemaModification,
    /// Shared lock (read lock).
    Shared,
    /// Update lock (read with intent to write).
    Update,
    /// Exclusive lock (write lock).
    Exclusive,
    /// Intention shared.
    IntentShared,
    /// Intention exclusive.
    IntentExclusive,
}

impl LockMode {
    /// Checks if a request in this mode can be granted while `granted` is
    /// held by someone else.
    pub fn is_compatible_with(self, granted: LockMode) -> bool {
        use LockMode::*;
        match (self, granted) {
            (Free, _) | (_, Free) => true,
            (SchemaModification, _) | (_, SchemaModification) => false,
            (SchemaStability, _) | (_, SchemaStability) => true,
            (Shared, Shared | Update | IntentShared) => true,
            (Shared, _) => false,
            (Update | Exclusive, _) => false,
            (IntentShared, Shared | IntentShared | IntentExclusive) => true,
            (IntentShared, _) => false,
            (IntentExclusive, IntentShared | IntentExclusive) => true,
            (IntentExclusive, _) => false,
        }
    }

    /// Returns the weakest mode that covers both modes.
    pub fn stronger(self, other: LockMode) -> LockMode {
        use LockMode::*;
        match (self, other) {
            (a, b) if a == b => a,
            (Free, m) | (m, Free) => m,
            (SchemaModification, _) | (_, SchemaModification) => SchemaModification,
            (SchemaStability, m) | (m, SchemaStability) => m,
            (Exclusive, _) | (_, Exclusive) => Exclusive,
            (Update, Shared | IntentShared) | (Shared | IntentShared, Update) => Update,
            (Shared, IntentShared) | (IntentShared, Shared) => Shared,
            (IntentExclusive, IntentShared) | (IntentShared, IntentExclusive) => IntentExclusive,
            // S+IX and U+IX have no single covering mode short of X.
            _ => Exclusive,
        }
    }

    /// Returns true for modes that only read: IS, S, and Sch-S.
    pub fn is_shared(self) -> bool {
        matches!(
            self,
            LockMode::IntentShared | LockMode::Shared | LockMode::SchemaStability
        )
    }
}

impl fmt::Display for LockMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LockMode::Free => write!(f, "Free"),
            LockMode::SchemaStability => write!(f, "Sch-S"),
            LockMode::SchemaModification => write!(f, "Sch-M"),
            LockMode::Shared => write!(f, "S"),
            LockMode::Update => write!(f, "U"),
            LockMode::Exclusive => write!(f, "X"),
            LockMode::IntentShared => write!(f, "IS"),
            LockMode::IntentExclusive => write!(f, "IX"),
        }
    }
}

/// Outcome of a lock acquisition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockStatus {
    /// The lock is held.
    Granted,
    /// The request waited past its timeout.
    Timeout,
    /// The lock manager was closed.
    Invalid,
}

/// Outcome of a lock release.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnlockStatus {
    /// One reference was released.
    Success,
    /// The handle is not a current grant on its resource.
    NotGranted,
    /// Nothing is known about the handle's resource.
    UnknownResource,
}

/// A granted (or refused) lock.
///
/// Granted handles are shared between the lock manager and their owner.
/// Acquiring the same resource in the same mode again returns the same
/// handle with its reference count bumped.
pub struct LockHandle {
    owner: TxnId,
    resource: String,
    mode: LockMode,
    status: LockStatus,
    count: AtomicU32,
    grant_time: Option<Instant>,
}

impl LockHandle {
    fn granted(owner: TxnId, resource: &str, mode: LockMode) -> Self {
        Self {
            owner,
            resource: resource.to_owned(),
            mode,
            status: LockStatus::Granted,
            count: AtomicU32::new(1),
            grant_time: Some(Instant::now()),
        }
    }

    fn refused(owner: TxnId, resource: &str, mode: LockMode, status: LockStatus) -> Arc<Self> {
        debug_assert_ne!(status, LockStatus::Granted);
        Arc::new(Self {
            owner,
            resource: resource.to_owned(),
            mode,
            status,
            count: AtomicU32::new(0),
            grant_time: None,
        })
    }

    /// The owning transaction.
    pub fn owner(&self) -> TxnId {
        self.owner
    }

    /// The locked resource name.
    pub fn resource(&self) -> &str {
        &self.resource
    }

    /// The requested mode.
    pub fn mode(&self) -> LockMode {
        self.mode
    }

    /// The acquisition outcome.
    pub fn status(&self) -> LockStatus {
        self.status
    }

    /// Outstanding references. Zero once fully released.
    pub fn count(&self) -> u32 {
        self.count.load(AtomicOrdering::Acquire)
    }

    /// When the lock was granted.
    pub fn grant_time(&self) -> Option<Instant> {
        self.grant_time
    }

    fn retain(&self) {
        self.count.fetch_add(1, AtomicOrdering::AcqRel);
    }

    /// Drops one reference and returns the remaining count.
    fn release_one(&self) -> u32 {
        let previous = self.count.fetch_sub(1, AtomicOrdering::AcqRel);
        debug_assert!(previous > 0, "lock handle released below zero");
        previous - 1
    }
}

impl fmt::Debug for LockHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LockHandle")
            .field("owner", &self.owner)
            .field("resource", &self.resource)
            .field("mode", &self.mode)
            .field("status", &self.status)
            .field("count", &self.count())
            .finish()
    }
}

/// A queued lock request.
struct Waiter {
    id: u64,
    owner: TxnId,
    mode: LockMode,
    is_upgrade: bool,
    grant: oneshot::Sender<Arc<LockHandle>>,
}

/// Grants and waiters for one resource.
struct LockEntry {
    granted_mode: LockMode,
    grantees: Vec<Arc<LockHandle>>,
    waiters: VecDeque<Waiter>,
}

impl LockEntry {
    fn new() -> Self {
        Self {
            granted_mode: LockMode::Free,
            grantees: Vec::new(),
            waiters: VecDeque::new(),
        }
    }

    fn holds(&self, owner: TxnId) -> bool {
        self.grantees.iter().any(|h| h.owner == owner)
    }

    fn is_sole_owner(&self, owner: TxnId) -> bool {
        !self.grantees.is_empty() && self.grantees.iter().all(|h| h.owner == owner)
    }

    fn is_idle(&self) -> bool {
        self.grantees.is_empty() && self.waiters.is_empty()
    }

    fn can_grant_upgrade(&self, owner: TxnId, mode: LockMode) -> bool {
        mode.is_compatible_with(self.granted_mode) || self.is_sole_owner(owner)
    }

    fn can_grant_new(&self, mode: LockMode) -> bool {
        mode.is_compatible_with(self.granted_mode)
    }

    fn grant(&mut self, owner: TxnId, resource: &str, mode: LockMode) -> Arc<LockHandle> {
        let handle = Arc::new(LockHandle::granted(owner, resource, mode));
        self.granted_mode = self.granted_mode.stronger(mode);
        self.grantees.push(Arc::clone(&handle));
        handle
    }

    fn recompute_mode(&mut self) {
        self.granted_mode = self
            .grantees
            .iter()
            .fold(LockMode::Free, |mode, h| mode.stronger(h.mode));
    }

    fn enqueue(&mut self, waiter: Waiter) {
        if waiter.is_upgrade {
            let at = self
                .waiters
                .iter()
                .position(|w| !w.is_upgrade)
                .unwrap_or(self.waiters.len());
            self.waiters.insert(at, waiter);
        } else {
            self.waiters.push_back(waiter);
        }
    }

    /// Grants waiters from the front of the queue while they are grantable.
    /// Returns the number granted.
    fn grant_waiters(&mut self, resource: &str) -> usize {
        let mut granted = 0;
        while let Some(front) = self.waiters.front() {
            let grantable = if front.is_upgrade {
                self.can_grant_upgrade(front.owner, front.mode)
            } else {
                self.can_grant_new(front.mode)
            };
            if !grantable {
                break;
            }
            let Some(waiter) = self.waiters.pop_front() else {
                break;
            };
            if waiter.grant.is_closed() {
                // The waiting future was dropped.
                continue;
            }
            let handle = LockHandle::granted(waiter.owner, resource, waiter.mode);
            let handle = Arc::new(handle);
            if waiter.grant.send(Arc::clone(&handle)).is_ok() {
                self.granted_mode = self.granted_mode.stronger(waiter.mode);
                self.grantees.push(handle);
                granted += 1;
            }
        }
        granted
    }

    /// Drops one reference of `handle`. The last reference removes the grant
    /// and lets queued requests in.
    fn release(&mut self, resource: &str, handle: &LockHandle) -> UnlockStatus {
        let Some(index) = self
            .grantees
            .iter()
            .position(|h| std::ptr::eq(h.as_ref(), handle))
        else {
            return UnlockStatus::NotGranted;
        };

        if self.grantees[index].release_one() == 0 {
            self.grantees.remove(index);
            self.recompute_mode();
            let woken = self.grant_waiters(resource);
            if woken > 0 {
                debug!(resource, woken, "granted queued lock requests");
            }
        }
        UnlockStatus::Success
    }

    fn remove_waiter(&mut self, id: u64) -> bool {
        match self.waiters.iter().position(|w| w.id == id) {
            Some(index) => {
                self.waiters.remove(index);
                true
            }
            None => false,
        }
    }
}

/// A queued request whose acquiring future is still waiting.
///
/// Dropping it while armed withdraws the request: a still-queued waiter is
/// dequeued, and a grant already sent to it is handed back.
struct PendingGrant<'a> {
    manager: &'a LockManager,
    resource: &'a str,
    waiter_id: u64,
    grant: oneshot::Receiver<Arc<LockHandle>>,
    armed: bool,
}

impl Drop for PendingGrant<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let resource = self.resource;
        let mut locks = self.manager.locks.lock();
        let Some(entry) = locks.get_mut(resource) else {
            return;
        };

        if entry.remove_waiter(self.waiter_id) {
            entry.grant_waiters(resource);
        } else if let Ok(handle) = self.grant.try_recv() {
            // Granted under the latch before we were dropped.
            if handle.status() == LockStatus::Granted
                && entry.release(resource, &handle) == UnlockStatus::Success
            {
                self.manager.stats.record_release();
            }
        }
        if entry.is_idle() {
            locks.remove(resource);
        }
        debug!(resource, waiter_id = self.waiter_id, "lock request abandoned");
    }
}

/// Statistics about the lock manager.
#[derive(Debug, Default)]
pub struct LockStats {
    /// Total lock acquisitions.
    pub acquisitions: AtomicU64,
    /// Total lock releases.
    pub releases: AtomicU64,
    /// Total lock waits.
    pub waits: AtomicU64,
    /// Total grants of an additional mode to an existing holder.
    pub upgrades: AtomicU64,
    /// Total timeouts.
    pub timeouts: AtomicU64,
}

impl LockStats {
    /// Creates new stats.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a successful acquisition.
    pub fn record_acquisition(&self) {
        self.acquisitions.fetch_add(1, AtomicOrdering::Relaxed);
    }

    /// Records a release.
    pub fn record_release(&self) {
        self.releases.fetch_add(1, AtomicOrdering::Relaxed);
    }

    /// Records a wait.
    pub fn record_wait(&self) {
        self.waits.fetch_add(1, AtomicOrdering::Relaxed);
    }

    /// Records an upgrade.
    pub fn record_upgrade(&self) {
        self.upgrades.fetch_add(1, AtomicOrdering::Relaxed);
    }

    /// Records a timeout.
    pub fn record_timeout(&self) {
        self.timeouts.fetch_add(1, AtomicOrdering::Relaxed);
    }
}

/// The lock manager for managing transaction locks.
pub struct LockManager {
    /// All locks, keyed by resource name.
    locks: Mutex<HashMap<String, LockEntry>>,
    /// Whether new requests are accepted.
    open: AtomicBool,
    /// Waiter identity source.
    next_waiter: AtomicU64,
    /// Configuration.
    config: LockManagerConfig,
    /// Statistics.
    stats: LockStats,
}

impl LockManager {
    /// Creates a new, closed lock manager with default configuration.
    pub fn new() -> Self {
        Self::with_config(LockManagerConfig::default())
    }

    /// Creates a closed lock manager with custom configuration.
    pub fn with_config(config: LockManagerConfig) -> Self {
        Self {
            locks: Mutex::new(HashMap::new()),
            open: AtomicBool::new(false),
            next_waiter: AtomicU64::new(1),
            config,
            stats: LockStats::new(),
        }
    }

    /// Starts accepting lock requests.
    pub fn open(&self) {
        self.open.store(true, AtomicOrdering::Release);
        info!("lock manager opened");
    }

    /// Stops accepting requests and fails every waiter with
    /// [`LockStatus::Invalid`]. Granted locks stay in place so that their
    /// owners can still release them.
    pub fn close(&self) {
        let mut locks = self.locks.lock();
        self.open.store(false, AtomicOrdering::Release);

        let mut failed = 0usize;
        for (resource, entry) in locks.iter_mut() {
            for waiter in entry.waiters.drain(..) {
                let refused =
                    LockHandle::refused(waiter.owner, resource, waiter.mode, LockStatus::Invalid);
                let _ = waiter.grant.send(refused);
                failed += 1;
            }
        }
        locks.retain(|_, entry| !entry.is_idle());
        info!(failed_waiters = failed, held = locks.len(), "lock manager closed");
    }

    /// Closes the manager and discards all state without waking waiters
    /// individually. Pending acquisitions resolve as [`LockStatus::Invalid`].
    pub fn abort(&self) {
        let mut locks = self.locks.lock();
        self.open.store(false, AtomicOrdering::Release);
        let dropped = locks.len();
        locks.clear();
        warn!(resources = dropped, "lock manager aborted");
    }

    /// Returns true if requests are accepted.
    pub fn is_open(&self) -> bool {
        self.open.load(AtomicOrdering::Acquire)
    }

    /// The configured default timeout. `None` waits forever.
    pub fn default_timeout(&self) -> Option<Duration> {
        self.config.default_timeout
    }

    /// Acquires `resource` in `mode` on behalf of `owner`.
    ///
    /// Waits up to `timeout` (`None` waits forever, zero never waits) and
    /// returns a handle whose [`status`](LockHandle::status) tells the
    /// outcome. Errors only on invalid arguments.
    pub async fn acquire_lock(
        &self,
        owner: TxnId,
        resource: &str,
        mode: LockMode,
        timeout: Option<Duration>,
    ) -> VellumResult<Arc<LockHandle>> {
        if mode == LockMode::Free {
            return Err(VellumError::invalid_argument("cannot acquire a lock in mode Free"));
        }
        if resource.is_empty() {
            return Err(VellumError::invalid_argument("resource name must not be empty"));
        }

        let (waiter_id, grant) = {
            let mut locks = self.locks.lock();
            if !self.is_open() {
                return Ok(LockHandle::refused(owner, resource, mode, LockStatus::Invalid));
            }

            let entry = locks
                .entry(resource.to_owned())
                .or_insert_with(LockEntry::new);

            if let Some(handle) = entry
                .grantees
                .iter()
                .find(|h| h.owner == owner && h.mode == mode)
            {
                handle.retain();
                self.stats.record_acquisition();
                return Ok(Arc::clone(handle));
            }

            let is_upgrade = entry.holds(owner);
            let grantable = if is_upgrade {
                entry.can_grant_upgrade(owner, mode)
            } else {
                entry.waiters.is_empty() && entry.can_grant_new(mode)
            };
            if grantable {
                let handle = entry.grant(owner, resource, mode);
                if is_upgrade {
                    self.stats.record_upgrade();
                } else {
                    self.stats.record_acquisition();
                }
                return Ok(handle);
            }

            if timeout == Some(Duration::ZERO) {
                if entry.is_idle() {
                    locks.remove(resource);
                }
                self.stats.record_timeout();
                return Ok(LockHandle::refused(owner, resource, mode, LockStatus::Timeout));
            }

            let (tx, rx) = oneshot::channel();
            let id = self.next_waiter.fetch_add(1, AtomicOrdering::Relaxed);
            entry.enqueue(Waiter {
                id,
                owner,
                mode,
                is_upgrade,
                grant: tx,
            });
            self.stats.record_wait();
            debug!(%owner, resource, %mode, is_upgrade, "lock request queued");
            (id, rx)
        };

        Ok(self
            .wait_for_grant(owner, resource, mode, waiter_id, grant, timeout)
            .await)
    }

    async fn wait_for_grant(
        &self,
        owner: TxnId,
        resource: &str,
        mode: LockMode,
        waiter_id: u64,
        grant: oneshot::Receiver<Arc<LockHandle>>,
        timeout: Option<Duration>,
    ) -> Arc<LockHandle> {
        let mut pending = PendingGrant {
            manager: self,
            resource,
            waiter_id,
            grant,
            armed: true,
        };
        let outcome = match timeout {
            None => Some((&mut pending.grant).await),
            Some(limit) => tokio::time::timeout(limit, &mut pending.grant).await.ok(),
        };
        pending.armed = false;

        match outcome {
            Some(Ok(handle)) => handle,
            // The queue was discarded by `abort`.
            Some(Err(_)) => LockHandle::refused(owner, resource, mode, LockStatus::Invalid),
            None => self.expire_waiter(owner, resource, mode, waiter_id, &mut pending.grant),
        }
    }

    /// Removes a timed-out waiter. A grant that raced the expiry wins.
    fn expire_waiter(
        &self,
        owner: TxnId,
        resource: &str,
        mode: LockMode,
        waiter_id: u64,
        grant: &mut oneshot::Receiver<Arc<LockHandle>>,
    ) -> Arc<LockHandle> {
        {
            let mut locks = self.locks.lock();
            if let Some(entry) = locks.get_mut(resource) {
                if entry.remove_waiter(waiter_id) {
                    // Waiters queued behind this one may now be grantable.
                    entry.grant_waiters(resource);
                    if entry.is_idle() {
                        locks.remove(resource);
                    }
                    drop(locks);
                    self.stats.record_timeout();
                    warn!(%owner, resource, %mode, "lock request timed out");
                    return LockHandle::refused(owner, resource, mode, LockStatus::Timeout);
                }
            }
        }

        // No longer queued: the grant (or close) was sent under the lock.
        match grant.try_recv() {
            Ok(handle) => handle,
            Err(_) => LockHandle::refused(owner, resource, mode, LockStatus::Invalid),
        }
    }

    /// Releases one reference of `handle`.
    ///
    /// When the last reference goes, the grant is removed and queued
    /// requests that became compatible are granted in order.
    pub fn release_lock(&self, handle: &LockHandle) -> UnlockStatus {
        let mut locks = self.locks.lock();
        let Some(entry) = locks.get_mut(handle.resource()) else {
            return UnlockStatus::UnknownResource;
        };
        let status = entry.release(handle.resource(), handle);
        if status != UnlockStatus::Success {
            return status;
        }
        if entry.is_idle() {
            locks.remove(handle.resource());
        }
        self.stats.record_release();
        status
    }

    /// Returns statistics about the lock manager.
    pub fn stats(&self) -> &LockStats {
        &self.stats
    }

    /// Returns the number of resources with at least one grant.
    pub fn lock_count(&self) -> usize {
        self.locks
            .lock()
            .values()
            .filter(|entry| !entry.grantees.is_empty())
            .count()
    }

    /// Returns the number of queued requests.
    pub fn waiter_count(&self) -> usize {
        self.locks.lock().values().map(|e| e.waiters.len()).sum()
    }

    /// Returns the mode currently granted on `resource`.
    pub fn granted_mode(&self, resource: &str) -> LockMode {
        self.locks
            .lock()
            .get(resource)
            .map_or(LockMode::Free, |entry| entry.granted_mode)
    }
}

impl Default for LockManager {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for LockManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LockManager")
            .field("open", &self.is_open())
            .field("lock_count", &self.lock_count())
            .field("waiter_count", &self.waiter_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SHORT: Option<Duration> = Some(Duration::from_millis(50));

    fn open_manager() -> Arc<LockManager> {
        let lm = Arc::new(LockManager::new());
        lm.open();
        lm
    }

    #[test]
    fn test_lock_mode_compatibility() {
        use LockMode::*;

        // S-S compatible
        assert!(Shared.is_compatible_with(Shared));

        // S-X not compatible
        assert!(!Shared.is_compatible_with(Exclusive));
        assert!(!Exclusive.is_compatible_with(Shared));

        // New S over granted U is fine, new U over granted S is not
        assert!(Shared.is_compatible_with(Update));
        assert!(!Update.is_compatible_with(Shared));

        // Sch-S conflicts only with Sch-M
        for mode in [Shared, Update, Exclusive, IntentShared, IntentExclusive, SchemaStability] {
            assert!(SchemaStability.is_compatible_with(mode));
            assert!(mode.is_compatible_with(SchemaStability));
        }
        assert!(!SchemaStability.is_compatible_with(SchemaModification));

        // Sch-M conflicts with everything but Free
        assert!(SchemaModification.is_compatible_with(Free));
        assert!(!SchemaModification.is_compatible_with(SchemaStability));
        assert!(!Shared.is_compatible_with(SchemaModification));

        // IS compatible with S, IS, IX
        assert!(IntentShared.is_compatible_with(Shared));
        assert!(IntentShared.is_compatible_with(IntentShared));
        assert!(IntentShared.is_compatible_with(IntentExclusive));
        assert!(!IntentShared.is_compatible_with(Update));

        // IX compatible with IS, IX
        assert!(IntentExclusive.is_compatible_with(IntentShared));
        assert!(IntentExclusive.is_compatible_with(IntentExclusive));

        // IX not compatible with S, X
        assert!(!IntentExclusive.is_compatible_with(Shared));
        assert!(!IntentExclusive.is_compatible_with(Exclusive));
    }

    #[test]
    fn test_lock_mode_stronger() {
        use LockMode::*;

        assert_eq!(Free.stronger(Shared), Shared);
        assert_eq!(Shared.stronger(Shared), Shared);
        assert_eq!(Shared.stronger(Update), Update);
        assert_eq!(IntentShared.stronger(Update), Update);
        assert_eq!(IntentShared.stronger(Shared), Shared);
        assert_eq!(IntentShared.stronger(IntentExclusive), IntentExclusive);
        assert_eq!(Shared.stronger(IntentExclusive), Exclusive);
        assert_eq!(Update.stronger(IntentExclusive), Exclusive);
        assert_eq!(Exclusive.stronger(IntentShared), Exclusive);
        assert_eq!(SchemaStability.stronger(Shared), Shared);
        assert_eq!(Exclusive.stronger(SchemaModification), SchemaModification);
    }

    #[test]
    fn test_lock_mode_is_shared() {
        assert!(LockMode::Shared.is_shared());
        assert!(LockMode::IntentShared.is_shared());
        assert!(LockMode::SchemaStability.is_shared());
        assert!(!LockMode::Update.is_shared());
        assert!(!LockMode::Exclusive.is_shared());
        assert!(!LockMode::IntentExclusive.is_shared());
    }

    #[test]
    fn test_lock_mode_display() {
        assert_eq!(format!("{}", LockMode::Shared), "S");
        assert_eq!(format!("{}", LockMode::Exclusive), "X");
        assert_eq!(format!("{}", LockMode::IntentShared), "IS");
        assert_eq!(format!("{}", LockMode::IntentExclusive), "IX");
        assert_eq!(format!("{}", LockMode::SchemaModification), "Sch-M");
    }

    #[tokio::test]
    async fn test_lock_manager_basic() {
        let lm = open_manager();
        let txn1 = TxnId::new(1);

        let h = lm.acquire_lock(txn1, "key1", LockMode::Shared, SHORT).await.unwrap();
        assert_eq!(h.status(), LockStatus::Granted);
        assert_eq!(h.count(), 1);
        assert!(h.grant_time().is_some());

        // Same lock again
        let again = lm.acquire_lock(txn1, "key1", LockMode::Shared, SHORT).await.unwrap();
        assert!(Arc::ptr_eq(&h, &again));
        assert_eq!(h.count(), 2);

        assert_eq!(lm.release_lock(&h), UnlockStatus::Success);
        assert_eq!(lm.lock_count(), 1);
        assert_eq!(lm.release_lock(&h), UnlockStatus::Success);
        assert_eq!(h.count(), 0);
        assert_eq!(lm.lock_count(), 0);
        assert_eq!(lm.release_lock(&h), UnlockStatus::UnknownResource);
    }

    #[tokio::test]
    async fn test_invalid_requests() {
        let lm = open_manager();
        let txn = TxnId::new(1);
        assert!(lm.acquire_lock(txn, "r", LockMode::Free, None).await.is_err());
        assert!(lm.acquire_lock(txn, "", LockMode::Shared, None).await.is_err());
    }

    #[tokio::test]
    async fn test_closed_manager_refuses() {
        let lm = LockManager::new();
        let h = lm.acquire_lock(TxnId::new(1), "r", LockMode::Shared, None).await.unwrap();
        assert_eq!(h.status(), LockStatus::Invalid);
    }

    #[tokio::test]
    async fn test_shared_locks_concurrent() {
        let lm = open_manager();
        let h1 = lm.acquire_lock(TxnId::new(1), "key1", LockMode::Shared, SHORT).await.unwrap();
        let h2 = lm.acquire_lock(TxnId::new(2), "key1", LockMode::Shared, SHORT).await.unwrap();
        assert_eq!(h1.status(), LockStatus::Granted);
        assert_eq!(h2.status(), LockStatus::Granted);
        assert_eq!(lm.lock_count(), 1);
    }

    #[tokio::test]
    async fn test_zero_timeout_does_not_queue() {
        let lm = open_manager();
        lm.acquire_lock(TxnId::new(1), "r", LockMode::Exclusive, None).await.unwrap();
        let h = lm
            .acquire_lock(TxnId::new(2), "r", LockMode::Shared, Some(Duration::ZERO))
            .await
            .unwrap();
        assert_eq!(h.status(), LockStatus::Timeout);
        assert_eq!(lm.waiter_count(), 0);
    }

    #[tokio::test]
    async fn test_timeout_removes_waiter() {
        let lm = open_manager();
        lm.acquire_lock(TxnId::new(1), "r", LockMode::Exclusive, None).await.unwrap();
        let h = lm.acquire_lock(TxnId::new(2), "r", LockMode::Shared, SHORT).await.unwrap();
        assert_eq!(h.status(), LockStatus::Timeout);
        assert_eq!(lm.waiter_count(), 0);
        assert_eq!(lm.stats().timeouts.load(AtomicOrdering::Relaxed), 1);
    }

    #[tokio::test]
    async fn test_exclusive_blocks_shared() {
        let lm = open_manager();
        let x = lm.acquire_lock(TxnId::new(1), "key1", LockMode::Exclusive, None).await.unwrap();

        let waiter = {
            let lm = Arc::clone(&lm);
            tokio::spawn(async move {
                let timeout = Some(Duration::from_secs(5));
                lm.acquire_lock(TxnId::new(2), "key1", LockMode::Shared, timeout)
                    .await
            })
        };
        while lm.waiter_count() == 0 {
            tokio::task::yield_now().await;
        }

        // Releasing the exclusive lock grants the queued request.
        lm.release_lock(&x);
        let s = waiter.await.unwrap().unwrap();
        assert_eq!(s.status(), LockStatus::Granted);
        assert_eq!(lm.granted_mode("key1"), LockMode::Shared);
    }

    #[tokio::test]
    async fn test_new_owner_waits_behind_queue() {
        let lm = open_manager();
        let s1 = lm.acquire_lock(TxnId::new(1), "r", LockMode::Shared, None).await.unwrap();

        // X queues behind the shared holder.
        let writer = {
            let lm = Arc::clone(&lm);
            tokio::spawn(async move {
                let timeout = Some(Duration::from_secs(5));
                lm.acquire_lock(TxnId::new(2), "r", LockMode::Exclusive, timeout)
                    .await
            })
        };
        while lm.waiter_count() == 0 {
            tokio::task::yield_now().await;
        }

        // A compatible S request still may not overtake the queued X.
        let s3 = lm
            .acquire_lock(TxnId::new(3), "r", LockMode::Shared, Some(Duration::ZERO))
            .await
            .unwrap();
        assert_eq!(s3.status(), LockStatus::Timeout);

        lm.release_lock(&s1);
        let x = writer.await.unwrap().unwrap();
        assert_eq!(x.status(), LockStatus::Granted);
        assert_eq!(lm.granted_mode("r"), LockMode::Exclusive);
    }

    #[tokio::test]
    async fn test_lock_upgrade() {
        let lm = open_manager();
        let txn1 = TxnId::new(1);

        let s = lm.acquire_lock(txn1, "key1", LockMode::Shared, None).await.unwrap();
        // Sole grantee may take any mode.
        let x = lm.acquire_lock(txn1, "key1", LockMode::Exclusive, None).await.unwrap();
        assert_eq!(x.status(), LockStatus::Granted);
        assert!(!Arc::ptr_eq(&s, &x));
        assert_eq!(lm.granted_mode("key1"), LockMode::Exclusive);
        assert_eq!(lm.stats().upgrades.load(AtomicOrdering::Relaxed), 1);

        lm.release_lock(&x);
        assert_eq!(lm.granted_mode("key1"), LockMode::Shared);
    }

    #[tokio::test]
    async fn test_upgrade_queued_ahead_of_new_requests() {
        let lm = open_manager();
        let a = TxnId::new(1);
        let b = TxnId::new(2);
        let c = TxnId::new(3);
        let wait = Some(Duration::from_secs(5));

        let sa = lm.acquire_lock(a, "r", LockMode::Shared, None).await.unwrap();
        let sb = lm.acquire_lock(b, "r", LockMode::Shared, None).await.unwrap();

        let new_writer = {
            let lm = Arc::clone(&lm);
            tokio::spawn(async move { lm.acquire_lock(c, "r", LockMode::Exclusive, wait).await })
        };
        while lm.waiter_count() < 1 {
            tokio::task::yield_now().await;
        }
        let upgrader = {
            let lm = Arc::clone(&lm);
            tokio::spawn(async move { lm.acquire_lock(a, "r", LockMode::Exclusive, wait).await })
        };
        while lm.waiter_count() < 2 {
            tokio::task::yield_now().await;
        }

        // Once b leaves, a is the sole grantee and its upgrade goes first.
        lm.release_lock(&sb);
        let xa = upgrader.await.unwrap().unwrap();
        assert_eq!(xa.status(), LockStatus::Granted);
        assert_eq!(lm.waiter_count(), 1);

        lm.release_lock(&xa);
        lm.release_lock(&sa);
        let xc = new_writer.await.unwrap().unwrap();
        assert_eq!(xc.status(), LockStatus::Granted);
    }

    #[tokio::test]
    async fn test_close_fails_waiters() {
        let lm = open_manager();
        let x = lm.acquire_lock(TxnId::new(1), "r", LockMode::Exclusive, None).await.unwrap();
        let waiter = {
            let lm = Arc::clone(&lm);
            tokio::spawn(async move {
                lm.acquire_lock(TxnId::new(2), "r", LockMode::Shared, None)
                    .await
            })
        };
        while lm.waiter_count() == 0 {
            tokio::task::yield_now().await;
        }

        lm.close();
        let h = waiter.await.unwrap().unwrap();
        assert_eq!(h.status(), LockStatus::Invalid);

        // Existing grants can still be released.
        assert_eq!(lm.release_lock(&x), UnlockStatus::Success);
        assert_eq!(lm.lock_count(), 0);
    }

    #[tokio::test]
    async fn test_cancelled_waiter_leaves_queue() {
        let lm = open_manager();
        let x = lm.acquire_lock(TxnId::new(1), "r", LockMode::Exclusive, None).await.unwrap();
        let waiter = {
            let lm = Arc::clone(&lm);
            tokio::spawn(async move {
                lm.acquire_lock(TxnId::new(2), "r", LockMode::Shared, None)
                    .await
            })
        };
        while lm.waiter_count() == 0 {
            tokio::task::yield_now().await;
        }

        waiter.abort();
        assert!(waiter.await.unwrap_err().is_cancelled());
        assert_eq!(lm.waiter_count(), 0);

        assert_eq!(lm.release_lock(&x), UnlockStatus::Success);
        assert_eq!(lm.lock_count(), 0);
    }

    #[tokio::test]
    async fn test_cancelled_waiter_returns_sent_grant() {
        let lm = open_manager();
        let x = lm.acquire_lock(TxnId::new(1), "r", LockMode::Exclusive, None).await.unwrap();
        let waiter = {
            let lm = Arc::clone(&lm);
            tokio::spawn(async move {
                lm.acquire_lock(TxnId::new(2), "r", LockMode::Exclusive, None)
                    .await
            })
        };
        while lm.waiter_count() == 0 {
            tokio::task::yield_now().await;
        }

        // The release hands the lock to the waiter before its task runs again.
        assert_eq!(lm.release_lock(&x), UnlockStatus::Success);
        assert_eq!(lm.granted_mode("r"), LockMode::Exclusive);
        waiter.abort();
        assert!(waiter.await.unwrap_err().is_cancelled());

        assert_eq!(lm.lock_count(), 0);
        let h = lm
            .acquire_lock(TxnId::new(3), "r", LockMode::Shared, Some(Duration::from_millis(100)))
            .await
            .unwrap();
        assert_eq!(h.status(), LockStatus::Granted);
    }

    #[tokio::test]
    async fn test_abort_discards_state() {
        let lm = open_manager();
        let x = lm.acquire_lock(TxnId::new(1), "r", LockMode::Exclusive, None).await.unwrap();
        let waiter = {
            let lm = Arc::clone(&lm);
            tokio::spawn(async move {
                lm.acquire_lock(TxnId::new(2), "r", LockMode::Shared, None)
                    .await
            })
        };
        while lm.waiter_count() == 0 {
            tokio::task::yield_now().await;
        }

        lm.abort();
        let h = waiter.await.unwrap().unwrap();
        assert_eq!(h.status(), LockStatus::Invalid);
        assert_eq!(lm.release_lock(&x), UnlockStatus::UnknownResource);
        assert!(!lm.is_open());
    }

    #[tokio::test]
    async fn test_release_foreign_handle() {
        let lm = open_manager();
        let h = lm.acquire_lock(TxnId::new(1), "r", LockMode::Shared, None).await.unwrap();
        let other = LockManager::new();
        other.open();
        other.acquire_lock(TxnId::new(1), "r", LockMode::Shared, None).await.unwrap();
        assert_eq!(other.release_lock(&h), UnlockStatus::NotGranted);
    }

    #[tokio::test]
    async fn test_lock_stats() {
        let lm = open_manager();
        let h = lm.acquire_lock(TxnId::new(1), "key1", LockMode::Shared, None).await.unwrap();
        assert_eq!(lm.stats().acquisitions.load(AtomicOrdering::Relaxed), 1);

        lm.release_lock(&h);
        assert_eq!(lm.stats().releases.load(AtomicOrdering::Relaxed), 1);
    }
}
