//! Transactions and the locks they hold.
//!
//! A [`Transaction`] tracks every lock it acquires through the shared
//! [`LockManager`] so that [`terminate`](Transaction::terminate) can release
//! them all. Read-only transactions may only take shared modes.
//!
//! # Transaction States
//!
//! ```text
//! ┌──────┐  terminate()  ┌────────┐
//! │ Open │──────────────▶│ Closed │
//! └──────┘               └────────┘
//! ```
//!
//! A closed transaction never reopens. `lock` on a closed transaction fails
//! with an object-closed error; `unlock` returns `false`.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::ops::Deref;
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::RwLock;
use tracing::debug;
use vellum_common::constants::INVALID_ATOMIC_GROUP_ID;
use vellum_common::{AtomicGroupId, TxnId, VellumError, VellumResult};

use crate::lock::{LockHandle, LockManager, LockMode, LockStatus, UnlockStatus};

/// What a transaction is allowed to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionKind {
    /// Shared locks only.
    ReadOnly,
    /// Any lock mode. Grouped by atomic group id.
    ReadWrite {
        /// Group id, or [`INVALID_ATOMIC_GROUP_ID`] for an untracked
        /// transaction.
        atomic_group_id: AtomicGroupId,
    },
}

/// A transaction handle.
pub struct Transaction {
    /// Unique transaction ID.
    id: TxnId,
    /// Read-only or read-write.
    kind: TransactionKind,
    /// Set once by `terminate`.
    closed: AtomicBool,
    /// Resource name to the handles acquired on it.
    locks: RwLock<HashMap<String, Vec<Arc<LockHandle>>>>,
    /// Shared lock manager.
    lock_manager: Arc<LockManager>,
}

impl Transaction {
    pub(crate) fn new(id: TxnId, kind: TransactionKind, lock_manager: Arc<LockManager>) -> Self {
        Self {
            id,
            kind,
            closed: AtomicBool::new(false),
            locks: RwLock::new(HashMap::new()),
            lock_manager,
        }
    }

    /// Returns the transaction ID.
    pub fn id(&self) -> TxnId {
        self.id
    }

    /// Returns the transaction kind.
    pub fn kind(&self) -> TransactionKind {
        self.kind
    }

    /// Returns true for read-only transactions.
    pub fn is_read_only(&self) -> bool {
        self.kind == TransactionKind::ReadOnly
    }

    /// Returns true once the transaction has been terminated.
    pub fn is_closed(&self) -> bool {
        self.closed.load(AtomicOrdering::Acquire)
    }

    /// Number of distinct lock handles currently tracked.
    pub async fn lock_count(&self) -> usize {
        self.locks.read().await.values().map(Vec::len).sum()
    }

    fn closed_error(&self) -> VellumError {
        VellumError::object_closed(format!("transaction {}", self.id))
    }

    /// Acquires `resource` in `mode`, waiting up to `timeout` (`None` waits
    /// forever).
    ///
    /// The transaction's lock table stays write-locked for the whole
    /// acquisition, so concurrent `lock` calls on one transaction run one at
    /// a time.
    pub async fn lock(
        &self,
        resource: &str,
        mode: LockMode,
        timeout: Option<Duration>,
    ) -> VellumResult<Arc<LockHandle>> {
        if resource.is_empty() {
            return Err(VellumError::invalid_argument("resource name must not be empty"));
        }
        if mode == LockMode::Free {
            return Err(VellumError::invalid_argument("cannot lock in mode Free"));
        }
        if self.is_read_only() && !mode.is_shared() {
            return Err(VellumError::invalid_argument(format!(
                "read-only transaction {} cannot take a {mode} lock",
                self.id
            )));
        }
        if self.is_closed() {
            return Err(self.closed_error());
        }

        // TODO: acquire outside the table latch once callers no longer rely
        // on per-transaction serialization of lock requests.
        let mut locks = self.locks.write().await;
        let handle = self
            .lock_manager
            .acquire_lock(self.id, resource, mode, timeout)
            .await?;

        match handle.status() {
            LockStatus::Granted => {}
            LockStatus::Timeout => {
                let duration_ms = timeout.map_or(u64::MAX, |t| {
                    u64::try_from(t.as_millis()).unwrap_or(u64::MAX)
                });
                return Err(VellumError::LockTimeout {
                    txn_id: self.id,
                    resource: resource.to_owned(),
                    duration_ms,
                });
            }
            LockStatus::Invalid => return Err(VellumError::object_closed("lock manager")),
        }

        // Terminated while we were waiting.
        if self.is_closed() {
            self.lock_manager.release_lock(&handle);
            return Err(self.closed_error());
        }

        if handle.count() == 1 {
            locks
                .entry(resource.to_owned())
                .or_default()
                .push(Arc::clone(&handle));
        }
        Ok(handle)
    }

    /// Acquires `resource` in `mode` with the lock manager's default timeout.
    pub async fn lock_default(
        &self,
        resource: &str,
        mode: LockMode,
    ) -> VellumResult<Arc<LockHandle>> {
        let timeout = self.lock_manager.default_timeout();
        self.lock(resource, mode, timeout).await
    }

    /// Releases one reference of a lock taken by this transaction.
    ///
    /// Returns `Ok(false)` if the transaction is closed or the handle is not
    /// tracked by it.
    pub async fn unlock(&self, handle: &LockHandle) -> VellumResult<bool> {
        if handle.resource().is_empty() {
            return Err(VellumError::invalid_argument("lock handle has no resource"));
        }
        if self.is_read_only() && !handle.mode().is_shared() {
            return Err(VellumError::invalid_argument(format!(
                "read-only transaction {} cannot hold a {} lock",
                self.id,
                handle.mode()
            )));
        }
        if self.is_closed() {
            return Ok(false);
        }

        let mut locks = self.locks.write().await;
        if self.is_closed() {
            return Ok(false);
        }
        let Some(handles) = locks.get_mut(handle.resource()) else {
            return Ok(false);
        };
        let Some(index) = handles
            .iter()
            .position(|h| std::ptr::eq(h.as_ref(), handle))
        else {
            return Ok(false);
        };

        self.lock_manager.release_lock(handle);
        if handle.count() == 0 {
            handles.remove(index);
            if handles.is_empty() {
                locks.remove(handle.resource());
            }
        }
        Ok(true)
    }

    /// Closes the transaction and fully releases every lock it holds.
    ///
    /// Safe to call more than once.
    pub async fn terminate(&self) {
        let was_closed = self.closed.swap(true, AtomicOrdering::AcqRel);

        let mut locks = self.locks.write().await;
        let mut released = 0usize;
        for (_, handles) in locks.drain() {
            for handle in handles {
                while handle.count() > 0 {
                    if self.lock_manager.release_lock(&handle) != UnlockStatus::Success {
                        break;
                    }
                }
                released += 1;
            }
        }
        if !was_closed {
            debug!(txn_id = %self.id, released, "transaction terminated");
        }
    }
}

impl fmt::Debug for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transaction")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("closed", &self.is_closed())
            .finish()
    }
}

/// A transaction restricted to shared locks.
#[derive(Debug)]
pub struct ReadOnlyTransaction {
    inner: Transaction,
}

impl ReadOnlyTransaction {
    pub(crate) fn new(id: TxnId, lock_manager: Arc<LockManager>) -> Self {
        Self {
            inner: Transaction::new(id, TransactionKind::ReadOnly, lock_manager),
        }
    }

    /// Returns the underlying transaction.
    pub fn as_transaction(&self) -> &Transaction {
        &self.inner
    }
}

impl Deref for ReadOnlyTransaction {
    type Target = Transaction;

    fn deref(&self) -> &Transaction {
        &self.inner
    }
}

/// A read-write transaction belonging to an atomic group.
#[derive(Debug)]
pub struct ReadWriteTransaction {
    inner: Transaction,
    atomic_group_id: AtomicGroupId,
    context: OperationContexts,
}

impl ReadWriteTransaction {
    pub(crate) fn new(
        id: TxnId,
        atomic_group_id: AtomicGroupId,
        lock_manager: Arc<LockManager>,
    ) -> Self {
        Self {
            inner: Transaction::new(
                id,
                TransactionKind::ReadWrite { atomic_group_id },
                lock_manager,
            ),
            atomic_group_id,
            context: OperationContexts::default(),
        }
    }

    /// The atomic group this transaction belongs to.
    pub fn atomic_group_id(&self) -> AtomicGroupId {
        self.atomic_group_id
    }

    /// True if the transaction is not tracked by group.
    pub fn is_trivial(&self) -> bool {
        self.atomic_group_id == INVALID_ATOMIC_GROUP_ID
    }

    /// Opaque per-operation state attached by higher layers.
    pub fn context(&self) -> &OperationContexts {
        &self.context
    }

    /// Returns the underlying transaction.
    pub fn as_transaction(&self) -> &Transaction {
        &self.inner
    }
}

impl Deref for ReadWriteTransaction {
    type Target = Transaction;

    fn deref(&self) -> &Transaction {
        &self.inner
    }
}

/// An opaque context item.
pub type OperationContext = Arc<dyn Any + Send + Sync>;

/// Thread-safe collection of operation contexts.
#[derive(Default)]
pub struct OperationContexts {
    items: Mutex<Vec<OperationContext>>,
}

impl OperationContexts {
    /// Adds a context.
    pub fn add(&self, context: OperationContext) {
        self.items.lock().push(context);
    }

    /// Removes a context by identity. Returns false if it was not present.
    pub fn remove(&self, context: &OperationContext) -> bool {
        let mut items = self.items.lock();
        match items.iter().position(|c| Arc::ptr_eq(c, context)) {
            Some(index) => {
                items.remove(index);
                true
            }
            None => false,
        }
    }

    /// Point-in-time copy of the contexts.
    pub fn snapshot(&self) -> Vec<OperationContext> {
        self.items.lock().clone()
    }

    /// Number of contexts.
    pub fn len(&self) -> usize {
        self.items.lock().len()
    }

    /// Returns true if there are no contexts.
    pub fn is_empty(&self) -> bool {
        self.items.lock().is_empty()
    }
}

impl fmt::Debug for OperationContexts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperationContexts")
            .field("len", &self.len())
            .finish()
    }
}
