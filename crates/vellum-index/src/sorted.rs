//! Sorted container abstraction.

use vellum_common::VellumResult;

/// A concurrent sorted map with unique keys.
///
/// Mutations are linearizable per key; reads and enumeration are
/// read-committed (they never observe a partially inserted entry).
pub trait SortedList<K, V> {
    /// Iterator over `(key, value)` pairs in ascending key order.
    type Iter<'a>: Iterator<Item = (K, V)>
    where
        Self: 'a;

    /// Returns true if `key` is present.
    fn contains(&self, key: &K) -> bool;

    /// Returns a copy of the value stored under `key`.
    fn try_get_value(&self, key: &K) -> Option<V>;

    /// Inserts `key` if absent. Returns false if the key is already present.
    fn try_add(&self, key: K, value: V) -> bool;

    /// Replaces the value of an existing key.
    ///
    /// Fails with [`KeyNotFound`](vellum_common::VellumError::KeyNotFound)
    /// if the key is absent.
    fn update(&self, key: &K, value: V) -> VellumResult<()>;

    /// Replaces the value of an existing key with `f(key, current)`.
    fn update_with<F>(&self, key: &K, f: F) -> VellumResult<()>
    where
        F: FnOnce(&K, &V) -> V;

    /// Removes `key`. Returns false if it was not present.
    fn try_remove(&self, key: &K) -> bool;

    /// Enumerates entries in ascending key order.
    fn iter(&self) -> Self::Iter<'_>;
}
