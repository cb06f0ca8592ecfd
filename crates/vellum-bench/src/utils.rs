//! Benchmark utilities and helpers.

use rand::distributions::Alphanumeric;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

/// Generates random string data for benchmarks.
pub fn random_string(rng: &mut StdRng, len: usize) -> String {
    rng.sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

/// Generates sequential keys for benchmarks.
pub fn generate_sequential_keys(count: usize, prefix: &str) -> Vec<String> {
    (0..count).map(|i| format!("{}{:08}", prefix, i)).collect()
}

/// Generates `count` distinct integer keys in random order.
pub fn generate_shuffled_keys(count: usize) -> Vec<u64> {
    let mut rng = StdRng::seed_from_u64(42);
    let mut keys: Vec<u64> = (0..count as u64).collect();
    keys.shuffle(&mut rng);
    keys
}

/// Generates random string keys of a fixed length.
pub fn generate_random_keys(count: usize, len: usize) -> Vec<String> {
    let mut rng = StdRng::seed_from_u64(42);
    (0..count).map(|_| random_string(&mut rng, len)).collect()
}
