//! Key comparison for sorted containers.

use std::cmp::Ordering;

/// Total order over keys used by a sorted container.
///
/// Comparers are shared by every thread operating on the container, so they
/// must be `Send + Sync`.
pub trait KeyComparer<K>: Send + Sync {
    /// Compares two keys.
    fn compare(&self, a: &K, b: &K) -> Ordering;
}

/// Comparer using the key's [`Ord`] implementation.
#[derive(Debug, Default, Clone, Copy)]
pub struct OrdComparer;

impl<K: Ord> KeyComparer<K> for OrdComparer {
    #[inline]
    fn compare(&self, a: &K, b: &K) -> Ordering {
        a.cmp(b)
    }
}

/// Comparer backed by a closure.
///
/// # Example
///
/// ```rust
/// use vellum_index::{ConcurrentSkipList, FnComparer};
///
/// // Descending order
/// let list = ConcurrentSkipList::with_comparer(FnComparer(|a: &i32, b: &i32| b.cmp(a)));
/// list.try_add(1, ());
/// list.try_add(2, ());
/// let keys: Vec<i32> = list.iter().map(|(k, _)| k).collect();
/// assert_eq!(keys, vec![2, 1]);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct FnComparer<F>(pub F);

impl<K, F> KeyComparer<K> for FnComparer<F>
where
    F: Fn(&K, &K) -> Ordering + Send + Sync,
{
    #[inline]
    fn compare(&self, a: &K, b: &K) -> Ordering {
        (self.0)(a, b)
    }
}
