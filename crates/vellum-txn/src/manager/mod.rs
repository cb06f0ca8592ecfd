//! Transaction manager for coordinating transaction lifecycle.
//!
//! The manager owns the shared [`LockManager`] and the table of live
//! read-write transactions keyed by atomic group id. At most one live
//! transaction exists per non-trivial group.
//!
//! # Manager States
//!
//! ```text
//! ┌─────────┐  open()  ┌──────┐  close() / abort()  ┌────────┐
//! │ Created │─────────▶│ Open │────────────────────▶│ Closed │
//! └─────────┘          └──────┘                     └────────┘
//!                          ▲        open()              │
//!                          └────────────────────────────┘
//! ```
//!
//! `close` waits until every tracked transaction has been removed;
//! `abort` does not.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::watch;
use tracing::{debug, info, warn};
use vellum_common::config::TransactionManagerConfig;
use vellum_common::constants::INVALID_ATOMIC_GROUP_ID;
use vellum_common::{AtomicGroupId, TxnId, VellumError, VellumResult};

use crate::lock::LockManager;
use crate::transaction::{ReadOnlyTransaction, ReadWriteTransaction, Transaction, TransactionKind};

/// Lifecycle of the manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManagerStatus {
    /// Constructed, not yet opened.
    Created,
    /// Accepting new transactions.
    Open,
    /// Closed or aborted.
    Closed,
}

impl fmt::Display for ManagerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ManagerStatus::Created => write!(f, "Created"),
            ManagerStatus::Open => write!(f, "Open"),
            ManagerStatus::Closed => write!(f, "Closed"),
        }
    }
}

/// Transaction manager statistics.
#[derive(Debug, Default)]
pub struct TransactionStats {
    /// Total transactions created.
    pub created: AtomicU64,
    /// Total tracked transactions removed.
    pub removed: AtomicU64,
    /// Total untracked transactions terminated on removal.
    pub terminated: AtomicU64,
}

impl TransactionStats {
    /// Creates new stats.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a transaction creation.
    pub fn record_created(&self) {
        self.created.fetch_add(1, AtomicOrdering::Relaxed);
    }

    /// Records removal of a tracked transaction.
    pub fn record_removed(&self) {
        self.removed.fetch_add(1, AtomicOrdering::Relaxed);
    }

    /// Records termination of an untracked transaction.
    pub fn record_terminated(&self) {
        self.terminated.fetch_add(1, AtomicOrdering::Relaxed);
    }
}

struct ManagerState {
    status: ManagerStatus,
    transactions: HashMap<AtomicGroupId, Arc<ReadWriteTransaction>>,
    lock_manager: Option<Arc<LockManager>>,
    /// Fires once the manager is closed and the table is empty.
    drained: watch::Sender<bool>,
}

impl ManagerState {
    fn open_lock_manager(&self) -> VellumResult<Arc<LockManager>> {
        match (&self.lock_manager, self.status) {
            (Some(lm), ManagerStatus::Open) => Ok(Arc::clone(lm)),
            _ => Err(VellumError::object_closed("transaction manager")),
        }
    }
}

/// Creates, tracks, and removes transactions.
pub struct TransactionManager {
    /// Configuration.
    config: TransactionManagerConfig,
    /// Status, transaction table, lock manager.
    state: Mutex<ManagerState>,
    /// Transaction id sequence.
    next_sequence: AtomicU64,
    /// Statistics.
    stats: TransactionStats,
}

impl TransactionManager {
    /// Creates a manager. Call [`open`](Self::open) before use.
    pub fn new(config: TransactionManagerConfig) -> Self {
        Self {
            config,
            state: Mutex::new(ManagerState {
                status: ManagerStatus::Created,
                transactions: HashMap::new(),
                lock_manager: None,
                drained: watch::channel(false).0,
            }),
            next_sequence: AtomicU64::new(1),
            stats: TransactionStats::new(),
        }
    }

    fn next_txn_id(&self) -> TxnId {
        let sequence = self.next_sequence.fetch_add(1, AtomicOrdering::Relaxed);
        TxnId::scoped(self.config.owner_namespace, sequence)
    }

    /// Opens the manager with a fresh lock manager.
    ///
    /// Transactions still tracked from before a close or abort are bound to
    /// the old lock manager; they are terminated and dropped from the table
    /// first, which also ends any close still waiting for them.
    pub async fn open(&self) -> VellumResult<()> {
        self.config.validate()?;

        let leftovers: Vec<_> = {
            let mut state = self.state.lock();
            if state.status == ManagerStatus::Open {
                return Ok(());
            }
            state.transactions.drain().map(|(_, txn)| txn).collect()
        };
        if !leftovers.is_empty() {
            warn!(
                count = leftovers.len(),
                "terminating transactions left from previous session"
            );
            for txn in &leftovers {
                txn.terminate().await;
                self.stats.record_removed();
            }
        }

        let mut state = self.state.lock();
        if state.status == ManagerStatus::Open {
            return Ok(());
        }
        state.drained.send_replace(true);
        let lock_manager = Arc::new(LockManager::with_config(self.config.lock.clone()));
        lock_manager.open();
        state.lock_manager = Some(lock_manager);
        state.status = ManagerStatus::Open;
        state.drained = watch::channel(false).0;
        info!(namespace = self.config.owner_namespace, "transaction manager opened");
        Ok(())
    }

    /// Closes the manager.
    ///
    /// The lock manager stops accepting requests and the call waits until
    /// every tracked transaction has been removed. If `cancel` completes
    /// first the wait is abandoned with [`VellumError::Cancelled`]; the
    /// manager stays closed.
    pub async fn close<F>(&self, cancel: F) -> VellumResult<()>
    where
        F: Future<Output = ()>,
    {
        let pending = {
            let mut state = self.state.lock();
            if state.status != ManagerStatus::Open {
                return Ok(());
            }
            if let Some(lock_manager) = &state.lock_manager {
                lock_manager.close();
            }
            state.status = ManagerStatus::Closed;
            let remaining = state.transactions.len();
            (remaining > 0).then(|| (remaining, state.drained.subscribe()))
        };

        if let Some((remaining, drained)) = pending {
            info!(remaining, "waiting for transactions to drain");
            tokio::select! {
                () = wait_drained(drained) => {}
                () = cancel => {
                    warn!("transaction manager close cancelled before drain");
                    return Err(VellumError::Cancelled);
                }
            }
        }

        {
            let mut state = self.state.lock();
            if state.status == ManagerStatus::Closed {
                state.lock_manager = None;
            }
        }
        info!("transaction manager closed");
        Ok(())
    }

    /// Closes the manager without waiting for transactions to drain.
    pub fn abort(&self) {
        let mut state = self.state.lock();
        if let Some(lock_manager) = state.lock_manager.take() {
            lock_manager.abort();
        }
        state.status = ManagerStatus::Closed;
        warn!(
            remaining = state.transactions.len(),
            "transaction manager aborted"
        );
    }

    /// Creates an untracked read-only transaction.
    pub fn create_read_only_transaction(&self) -> VellumResult<Arc<ReadOnlyTransaction>> {
        let lock_manager = self.state.lock().open_lock_manager()?;
        self.stats.record_created();
        Ok(Arc::new(ReadOnlyTransaction::new(self.next_txn_id(), lock_manager)))
    }

    /// Returns the transaction for `atomic_group_id`, creating it if needed.
    ///
    /// The flag is true if the transaction already existed. The sentinel
    /// [`INVALID_ATOMIC_GROUP_ID`] always yields a fresh, untracked
    /// transaction.
    pub fn create_transaction(
        &self,
        atomic_group_id: AtomicGroupId,
    ) -> VellumResult<(Arc<ReadWriteTransaction>, bool)> {
        if atomic_group_id != INVALID_ATOMIC_GROUP_ID && atomic_group_id < 0 {
            return Err(VellumError::invalid_argument(format!(
                "invalid atomic group id {atomic_group_id}"
            )));
        }

        let mut state = self.state.lock();
        let lock_manager = state.open_lock_manager()?;

        if atomic_group_id == INVALID_ATOMIC_GROUP_ID {
            self.stats.record_created();
            let txn = ReadWriteTransaction::new(self.next_txn_id(), atomic_group_id, lock_manager);
            return Ok((Arc::new(txn), false));
        }

        if let Some(existing) = state.transactions.get(&atomic_group_id) {
            return Ok((Arc::clone(existing), true));
        }

        let txn = Arc::new(ReadWriteTransaction::new(
            self.next_txn_id(),
            atomic_group_id,
            lock_manager,
        ));
        state.transactions.insert(atomic_group_id, Arc::clone(&txn));
        self.stats.record_created();
        debug!(atomic_group_id, txn_id = %txn.id(), "transaction created");
        Ok((txn, false))
    }

    /// Returns the tracked transaction for `atomic_group_id`, if any.
    pub fn get_transaction(
        &self,
        atomic_group_id: AtomicGroupId,
    ) -> VellumResult<Option<Arc<ReadWriteTransaction>>> {
        if atomic_group_id < 0 {
            return Err(VellumError::invalid_argument(format!(
                "invalid atomic group id {atomic_group_id}"
            )));
        }
        let found = self.state.lock().transactions.get(&atomic_group_id).cloned();
        if found.is_none() {
            debug!(atomic_group_id, "no transaction for atomic group");
        }
        Ok(found)
    }

    /// Terminates `txn` and stops tracking it.
    ///
    /// Read-only and trivial transactions are terminated and `false` is
    /// returned. For tracked transactions this removes the entry for the
    /// transaction's group and returns true iff one existed.
    pub async fn remove_transaction(&self, txn: &Transaction) -> bool {
        match txn.kind() {
            TransactionKind::ReadWrite { atomic_group_id }
                if atomic_group_id != INVALID_ATOMIC_GROUP_ID =>
            {
                self.remove_tracked(atomic_group_id).await
            }
            _ => {
                txn.terminate().await;
                self.stats.record_terminated();
                false
            }
        }
    }

    /// Terminates and removes the transaction tracked for `atomic_group_id`.
    pub async fn remove_transaction_by_group(
        &self,
        atomic_group_id: AtomicGroupId,
    ) -> VellumResult<bool> {
        if atomic_group_id == INVALID_ATOMIC_GROUP_ID {
            return Ok(false);
        }
        if atomic_group_id < 0 {
            return Err(VellumError::invalid_argument(format!(
                "invalid atomic group id {atomic_group_id}"
            )));
        }
        Ok(self.remove_tracked(atomic_group_id).await)
    }

    async fn remove_tracked(&self, atomic_group_id: AtomicGroupId) -> bool {
        let removed = self.state.lock().transactions.remove(&atomic_group_id);
        let Some(txn) = removed else {
            return false;
        };

        txn.terminate().await;
        self.stats.record_removed();

        let state = self.state.lock();
        if state.status == ManagerStatus::Closed && state.transactions.is_empty() {
            state.drained.send_replace(true);
            info!("all transactions drained");
        }
        true
    }

    /// Current lifecycle status.
    pub fn status(&self) -> ManagerStatus {
        self.state.lock().status
    }

    /// Returns true if new transactions can be created.
    pub fn is_open(&self) -> bool {
        self.status() == ManagerStatus::Open
    }

    /// Number of tracked transactions.
    pub fn transaction_count(&self) -> usize {
        self.state.lock().transactions.len()
    }

    /// The current lock manager, if the manager is open or still draining.
    pub fn lock_manager(&self) -> Option<Arc<LockManager>> {
        self.state.lock().lock_manager.clone()
    }

    /// Returns statistics.
    pub fn stats(&self) -> &TransactionStats {
        &self.stats
    }
}

impl Default for TransactionManager {
    fn default() -> Self {
        Self::new(TransactionManagerConfig::default())
    }
}

impl fmt::Debug for TransactionManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("TransactionManager")
            .field("status", &state.status)
            .field("transactions", &state.transactions.len())
            .finish()
    }
}

async fn wait_drained(mut drained: watch::Receiver<bool>) {
    // A sender dropped without signalling never means drained.
    if drained.wait_for(|done| *done).await.is_err() {
        std::future::pending::<()>().await;
    }
}
