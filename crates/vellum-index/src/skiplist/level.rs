//! Random tower heights.

use std::cell::RefCell;
use std::sync::OnceLock;

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

static SEED_SOURCE: OnceLock<Mutex<StdRng>> = OnceLock::new();

fn next_seed() -> u64 {
    SEED_SOURCE
        .get_or_init(|| Mutex::new(StdRng::from_entropy()))
        .lock()
        .gen()
}

thread_local! {
    static LEVEL_RNG: RefCell<StdRng> = RefCell::new(StdRng::seed_from_u64(next_seed()));
}

/// Draws node heights from a geometric distribution.
#[derive(Debug, Clone, Copy)]
pub(crate) struct LevelGenerator {
    max_level: usize,
    probability: f64,
}

impl LevelGenerator {
    pub(crate) fn new(max_level: usize, probability: f64) -> Self {
        debug_assert!(max_level >= 1);
        Self {
            max_level,
            probability,
        }
    }

    /// Returns a top level in `0..max_level`.
    pub(crate) fn next_level(&self) -> usize {
        LEVEL_RNG.with(|rng| {
            let mut rng = rng.borrow_mut();
            let mut level = 0;
            while level + 1 < self.max_level && rng.gen_bool(self.probability) {
                level += 1;
            }
            level
        })
    }
}
