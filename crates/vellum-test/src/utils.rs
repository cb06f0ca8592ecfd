use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Once;

use tracing_subscriber::EnvFilter;
use vellum_common::Lsn;
use vellum_mvcc::VersionProvider;

static TRACING: Once = Once::new();

/// Installs a test subscriber honouring `RUST_LOG`. Safe to call from every
/// test.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init();
    });
}

/// A version provider standing in for the replication log.
///
/// The current version only moves when the test calls
/// [`advance`](Self::advance), mimicking commits being applied.
#[derive(Debug)]
pub struct SequenceProvider {
    current: AtomicU64,
}

impl SequenceProvider {
    /// Creates a provider starting at `start`.
    pub fn new(start: u64) -> Self {
        Self {
            current: AtomicU64::new(start),
        }
    }

    /// Moves the current version forward by one and returns it.
    pub fn advance(&self) -> Lsn {
        Lsn::new(self.current.fetch_add(1, Ordering::SeqCst) + 1)
    }

    /// Current version without advancing.
    pub fn peek(&self) -> Lsn {
        Lsn::new(self.current.load(Ordering::SeqCst))
    }
}

impl Default for SequenceProvider {
    fn default() -> Self {
        Self::new(Lsn::FIRST.as_u64())
    }
}

impl VersionProvider for SequenceProvider {
    fn current_version(&self) -> Lsn {
        self.peek()
    }
}
