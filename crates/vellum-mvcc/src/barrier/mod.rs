//! Dispatching barrier signals.
//!
//! The log layer publishes a [`BarrierSignal`] for every barrier record it
//! dispatches. Snapshot registration waits for the latest barrier so that no
//! reader obtains a visibility number older than an in-flight barrier.

use std::fmt;

use tokio::sync::watch;
use tracing::warn;

/// Observer side of a dispatching barrier. Cheap to clone.
#[derive(Clone)]
pub struct BarrierSignal {
    done: watch::Receiver<bool>,
}

/// Completion side of a dispatching barrier.
pub struct BarrierCompleter {
    done: watch::Sender<bool>,
}

impl BarrierSignal {
    /// Creates a pending barrier and the handle that completes it.
    pub fn pending() -> (Self, BarrierCompleter) {
        let (tx, rx) = watch::channel(false);
        (Self { done: rx }, BarrierCompleter { done: tx })
    }

    /// Creates a barrier that is already complete.
    pub fn completed() -> Self {
        let (_, rx) = watch::channel(true);
        Self { done: rx }
    }

    /// Returns true once the barrier has been dispatched.
    pub fn is_complete(&self) -> bool {
        *self.done.borrow()
    }

    /// Waits for the barrier to complete.
    ///
    /// A barrier whose completer is dropped without completing is treated as
    /// complete, so that registration cannot hang on an abandoned log record.
    pub async fn wait(&self) {
        let mut done = self.done.clone();
        if done.wait_for(|complete| *complete).await.is_err() {
            warn!("dispatching barrier abandoned before completion");
        }
    }
}

impl BarrierCompleter {
    /// Marks the barrier dispatched and wakes every waiter.
    pub fn complete(self) {
        self.done.send_replace(true);
    }
}

impl fmt::Debug for BarrierSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BarrierSignal")
            .field("complete", &self.is_complete())
            .finish()
    }
}

impl fmt::Debug for BarrierCompleter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BarrierCompleter")
            .field("complete", &*self.done.borrow())
            .finish()
    }
}
