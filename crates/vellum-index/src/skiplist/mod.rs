//! Lazy concurrent skip list.
//!
//! Every node is a tower linked at levels `0..=top_level`. Readers walk the
//! towers without locking; writers lock only the nodes whose forward pointers
//! they change. A node becomes visible once it is linked at every level and
//! flagged inserted, and stops being visible the moment it is flagged
//! deleted, before it is unlinked.
//!
//! Node locks are always taken in descending key order (victim first, then
//! predecessors bottom-up), so writers cannot deadlock each other.

mod level;
mod node;

use std::fmt;
use std::sync::atomic::Ordering as MemoryOrdering;

use crossbeam_epoch::{self as epoch, Atomic, Guard, Owned, Shared};
use parking_lot::ReentrantMutexGuard;
use vellum_common::config::SkipListConfig;
use vellum_common::{VellumError, VellumResult};

use crate::comparer::{KeyComparer, OrdComparer};
use crate::sorted::SortedList;

use self::level::LevelGenerator;
use self::node::Node;

/// Outcome of a weak search.
///
/// `preds[l]` is the last node at level `l` ordered before the key and
/// `succs[l]` the first node at level `l` not ordered before it.
struct Search<'g, K, V> {
    level_found: Option<usize>,
    preds: Vec<Shared<'g, Node<K, V>>>,
    succs: Vec<Shared<'g, Node<K, V>>>,
}

/// A concurrent sorted map.
///
/// Keys are unique under the comparer `C`. Values are cloned out on read.
pub struct ConcurrentSkipList<K, V, C = OrdComparer> {
    head: Atomic<Node<K, V>>,
    comparer: C,
    levels: LevelGenerator,
    max_level: usize,
}

impl<K, V> ConcurrentSkipList<K, V, OrdComparer>
where
    K: Ord + Send + Sync + 'static,
    V: Send + Sync + 'static,
{
    /// Creates an empty list ordered by `K: Ord`.
    pub fn new() -> Self {
        Self::with_comparer(OrdComparer)
    }
}

impl<K, V> Default for ConcurrentSkipList<K, V, OrdComparer>
where
    K: Ord + Send + Sync + 'static,
    V: Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V, C> ConcurrentSkipList<K, V, C>
where
    K: Send + Sync + 'static,
    V: Send + Sync + 'static,
    C: KeyComparer<K>,
{
    /// Creates an empty list with a custom comparer and default levels.
    pub fn with_comparer(comparer: C) -> Self {
        let config = SkipListConfig::default();
        Self::build(comparer, config.max_level, config.promotion_probability)
    }

    /// Creates an empty list with explicit level parameters.
    ///
    /// Fails if the configuration is out of range.
    pub fn with_config(comparer: C, config: SkipListConfig) -> VellumResult<Self> {
        config.validate()?;
        Ok(Self::build(
            comparer,
            config.max_level,
            config.promotion_probability,
        ))
    }

    fn build(comparer: C, max_level: usize, probability: f64) -> Self {
        let head = Node::head(max_level);
        let tail = Owned::new(Node::tail(max_level));
        // SAFETY: the list is not shared yet.
        let guard = unsafe { epoch::unprotected() };
        let tail = tail.into_shared(guard);
        for level in 0..max_level {
            head.set_next(level, tail);
        }
        Self {
            head: Atomic::new(head),
            comparer,
            levels: LevelGenerator::new(max_level, probability),
            max_level,
        }
    }

    /// Number of levels in the list.
    #[inline]
    pub fn max_level(&self) -> usize {
        self.max_level
    }

    fn weak_search<'g>(&self, key: &K, guard: &'g Guard) -> Search<'g, K, V> {
        let mut preds = vec![Shared::null(); self.max_level];
        let mut succs = vec![Shared::null(); self.max_level];
        let mut level_found = None;

        let mut pred = self.head.load(MemoryOrdering::Acquire, guard);
        for level in (0..self.max_level).rev() {
            // SAFETY: nodes reachable from the head are protected by `guard`.
            let mut curr = unsafe { pred.deref() }.next(level, guard);
            loop {
                let node = unsafe { curr.deref() };
                match node.compare_to(key, &self.comparer) {
                    std::cmp::Ordering::Less => {
                        pred = curr;
                        curr = node.next(level, guard);
                    }
                    std::cmp::Ordering::Equal => {
                        if level_found.is_none() {
                            level_found = Some(level);
                        }
                        break;
                    }
                    std::cmp::Ordering::Greater => break,
                }
            }
            preds[level] = pred;
            succs[level] = curr;
        }

        Search {
            level_found,
            preds,
            succs,
        }
    }

    /// Finds the live node holding `key`.
    fn find_live<'g>(&self, key: &K, guard: &'g Guard) -> Option<&'g Node<K, V>> {
        let search = self.weak_search(key, guard);
        let level = search.level_found?;
        // SAFETY: protected by `guard`.
        let node = unsafe { search.succs[level].deref() };
        node.is_live().then_some(node)
    }

    /// Returns true if `key` is present.
    pub fn contains(&self, key: &K) -> bool {
        let guard = &epoch::pin();
        self.find_live(key, guard).is_some()
    }

    /// Returns a copy of the value stored under `key`.
    pub fn try_get_value(&self, key: &K) -> Option<V>
    where
        V: Clone,
    {
        let guard = &epoch::pin();
        self.find_live(key, guard).and_then(|node| node.value())
    }

    /// Inserts `key` if it is absent.
    ///
    /// Returns false if the key is already present. If a concurrent insert
    /// of the same key is in flight, waits for it to become visible first so
    /// that a false return always means the key can be read.
    pub fn try_add(&self, key: K, value: V) -> bool {
        let top_level = self.levels.next_level();
        let guard = &epoch::pin();

        loop {
            let search = self.weak_search(&key, guard);

            if let Some(level) = search.level_found {
                // SAFETY: protected by `guard`.
                let found = unsafe { search.succs[level].deref() };
                if !found.is_deleted() {
                    while !found.is_inserted() {
                        std::thread::yield_now();
                    }
                    return false;
                }
                // Being removed; retry once it is unlinked.
                continue;
            }

            let Some(held) = self.lock_insert_preds(&search, top_level, guard) else {
                continue;
            };

            let node = Owned::new(Node::entry(key, value, top_level + 1));
            for level in 0..=top_level {
                node.set_next(level, search.succs[level]);
            }
            let node = node.into_shared(guard);
            for level in 0..=top_level {
                // SAFETY: protected by `guard`; locked above.
                unsafe { search.preds[level].deref() }.set_next(level, node);
            }
            unsafe { node.deref() }.mark_inserted();
            drop(held);
            return true;
        }
    }

    /// Locks `preds[0..=top_level]` and validates that each still points to
    /// its recorded successor. Returns `None` if validation fails.
    fn lock_insert_preds<'g>(
        &self,
        search: &Search<'g, K, V>,
        top_level: usize,
        guard: &'g Guard,
    ) -> Option<Vec<ReentrantMutexGuard<'g, ()>>> {
        let mut held = Vec::with_capacity(top_level + 1);
        for level in 0..=top_level {
            // SAFETY: protected by `guard`.
            let pred = unsafe { search.preds[level].deref() };
            let succ_ptr = search.succs[level];
            let succ = unsafe { succ_ptr.deref() };
            held.push(pred.lock());
            if pred.is_deleted() || succ.is_deleted() || pred.next(level, guard) != succ_ptr {
                return None;
            }
        }
        Some(held)
    }

    /// Replaces the value of an existing key.
    pub fn update(&self, key: &K, value: V) -> VellumResult<()> {
        self.update_with(key, move |_, _| value)
    }

    /// Replaces the value of an existing key with `f(key, current)`.
    ///
    /// `f` runs under the node lock, so updates of one key are serialized
    /// with each other and with its removal.
    pub fn update_with<F>(&self, key: &K, f: F) -> VellumResult<()>
    where
        F: FnOnce(&K, &V) -> V,
    {
        let guard = &epoch::pin();
        let node = self.find_live(key, guard).ok_or(VellumError::KeyNotFound)?;
        let _held = node.lock();
        if node.is_deleted() || !node.replace_value(f) {
            return Err(VellumError::KeyNotFound);
        }
        Ok(())
    }

    /// Removes `key`. Returns false if it was not present.
    pub fn try_remove(&self, key: &K) -> bool {
        let guard = &epoch::pin();
        let mut search = self.weak_search(key, guard);

        let Some(level) = search.level_found else {
            return false;
        };
        let victim_ptr = search.succs[level];
        // SAFETY: protected by `guard`.
        let victim = unsafe { victim_ptr.deref() };
        if !victim.is_inserted() || victim.top_level() != level || victim.is_deleted() {
            return false;
        }

        let victim_held = victim.lock();
        if victim.is_deleted() {
            return false;
        }
        victim.mark_deleted(&victim_held);

        let top_level = victim.top_level();
        loop {
            if let Some(held) = self.lock_remove_preds(&search, victim_ptr, top_level, guard) {
                for level in (0..=top_level).rev() {
                    let pred = unsafe { search.preds[level].deref() };
                    pred.set_next(level, victim.next(level, guard));
                }
                drop(held);
                drop(victim_held);
                // SAFETY: the victim is unlinked at every level; readers that
                // still hold it are pinned.
                unsafe { guard.defer_destroy(victim_ptr) };
                return true;
            }
            search = self.weak_search(key, guard);
        }
    }

    fn lock_remove_preds<'g>(
        &self,
        search: &Search<'g, K, V>,
        victim: Shared<'g, Node<K, V>>,
        top_level: usize,
        guard: &'g Guard,
    ) -> Option<Vec<ReentrantMutexGuard<'g, ()>>> {
        let mut held = Vec::with_capacity(top_level + 1);
        for level in 0..=top_level {
            // SAFETY: protected by `guard`.
            let pred = unsafe { search.preds[level].deref() };
            held.push(pred.lock());
            if pred.is_deleted() || pred.next(level, guard) != victim {
                return None;
            }
        }
        Some(held)
    }

    /// Iterates live entries in ascending key order.
    ///
    /// The iterator pins the current epoch for its lifetime; long-lived
    /// iterators delay reclamation of removed nodes.
    pub fn iter(&self) -> Iter<'_, K, V, C> {
        let guard = epoch::pin();
        let current = self.head.load(MemoryOrdering::Acquire, &guard).as_raw();
        Iter {
            _list: self,
            guard,
            current,
        }
    }

    /// Collects the live keys in ascending order.
    pub fn keys(&self) -> Vec<K>
    where
        K: Clone,
        V: Clone,
    {
        self.iter().map(|(k, _)| k).collect()
    }

    /// Counts live entries. Walks level 0.
    pub fn len(&self) -> usize {
        let guard = &epoch::pin();
        let mut count = 0;
        let mut curr = unsafe { self.head.load(MemoryOrdering::Acquire, guard).deref() };
        loop {
            let next = curr.next(0, guard);
            // SAFETY: protected by `guard`; the tail terminates every level.
            curr = unsafe { next.deref() };
            if curr.is_tail() {
                return count;
            }
            if curr.is_live() {
                count += 1;
            }
        }
    }

    /// Returns true if there are no live entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Keys linked at `level`, including nodes that are mid-insert or
    /// logically deleted. Intended for diagnostics.
    pub fn keys_at_level(&self, level: usize) -> Vec<K>
    where
        K: Clone,
    {
        let guard = &epoch::pin();
        let mut keys = Vec::new();
        if level >= self.max_level {
            return keys;
        }
        let mut curr = unsafe { self.head.load(MemoryOrdering::Acquire, guard).deref() };
        loop {
            curr = unsafe { curr.next(level, guard).deref() };
            match curr.key() {
                Some(key) => keys.push(key.clone()),
                None => return keys,
            }
        }
    }
}

impl<K, V, C> Drop for ConcurrentSkipList<K, V, C> {
    fn drop(&mut self) {
        // SAFETY: `&mut self` means no other thread can reach the nodes.
        // Removed nodes were already handed to the collector and are no
        // longer linked at level 0.
        unsafe {
            let guard = epoch::unprotected();
            let mut curr = self.head.load(MemoryOrdering::Relaxed, guard);
            while !curr.is_null() {
                let next = curr.deref().next(0, guard);
                drop(curr.into_owned());
                curr = next;
            }
        }
    }
}

impl<K, V, C> fmt::Debug for ConcurrentSkipList<K, V, C>
where
    K: Send + Sync + 'static,
    V: Send + Sync + 'static,
    C: KeyComparer<K>,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConcurrentSkipList")
            .field("max_level", &self.max_level)
            .field("len", &self.len())
            .finish()
    }
}

/// Ascending iterator over a [`ConcurrentSkipList`].
///
/// Yields clones of entries that were live when visited. Entries added or
/// removed concurrently may or may not be observed.
pub struct Iter<'a, K, V, C> {
    _list: &'a ConcurrentSkipList<K, V, C>,
    guard: Guard,
    current: *const Node<K, V>,
}

impl<K, V, C> Iterator for Iter<'_, K, V, C>
where
    K: Clone,
    V: Clone,
{
    type Item = (K, V);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.current.is_null() {
                return None;
            }
            // SAFETY: `current` was reached from the head while `guard` was
            // pinned and the guard is still held.
            let node = unsafe { &*self.current };
            if node.is_tail() {
                self.current = std::ptr::null();
                return None;
            }
            let next = node.next(0, &self.guard);
            self.current = next.as_raw();
            let next_node = unsafe { next.deref() };
            if next_node.is_live() {
                if let Some(entry) = next_node.snapshot() {
                    return Some(entry);
                }
            }
        }
    }
}

impl<K, V, C> SortedList<K, V> for ConcurrentSkipList<K, V, C>
where
    K: Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
    C: KeyComparer<K>,
{
    type Iter<'a> = Iter<'a, K, V, C> where Self: 'a;

    fn contains(&self, key: &K) -> bool {
        ConcurrentSkipList::contains(self, key)
    }

    fn try_get_value(&self, key: &K) -> Option<V> {
        ConcurrentSkipList::try_get_value(self, key)
    }

    fn try_add(&self, key: K, value: V) -> bool {
        ConcurrentSkipList::try_add(self, key, value)
    }

    fn update(&self, key: &K, value: V) -> VellumResult<()> {
        ConcurrentSkipList::update(self, key, value)
    }

    fn update_with<F>(&self, key: &K, f: F) -> VellumResult<()>
    where
        F: FnOnce(&K, &V) -> V,
    {
        ConcurrentSkipList::update_with(self, key, f)
    }

    fn try_remove(&self, key: &K) -> bool {
        ConcurrentSkipList::try_remove(self, key)
    }

    fn iter(&self) -> Self::Iter<'_> {
        ConcurrentSkipList::iter(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering as AtomicOrdering};
    use std::sync::{Arc, Barrier};
    use std::thread;

    fn assert_levels_nested<K, V>(list: &ConcurrentSkipList<K, V>)
    where
        K: Clone + Ord + fmt::Debug + Send + Sync + 'static,
        V: Clone + Send + Sync + 'static,
    {
        for level in 1..list.max_level() {
            let upper = list.keys_at_level(level);
            let lower = list.keys_at_level(level - 1);
            assert!(
                upper.iter().all(|k| lower.binary_search(k).is_ok()),
                "level {level} is not a subset of level {}",
                level - 1
            );
        }
        assert_eq!(list.keys_at_level(0), list.keys());
    }

    #[test]
    fn test_add_get_duplicate() {
        let list = ConcurrentSkipList::new();
        assert!(list.try_add(5, "a"));
        assert!(!list.try_add(5, "b"));
        assert_eq!(list.try_get_value(&5), Some("a"));
        assert!(list.contains(&5));
        assert!(!list.contains(&6));
        assert_eq!(list.try_get_value(&6), None);
    }

    #[test]
    fn test_remove_then_readd() {
        let list = ConcurrentSkipList::new();
        for k in [1, 2, 3] {
            assert!(list.try_add(k, k * 10));
        }
        assert!(list.try_remove(&2));
        assert!(!list.try_remove(&2));
        assert_eq!(list.keys(), vec![1, 3]);

        assert!(list.try_add(2, 99));
        assert_eq!(list.try_get_value(&2), Some(99));
        assert_eq!(list.len(), 3);
    }

    #[test]
    fn test_update() {
        let list = ConcurrentSkipList::new();
        list.try_add("k".to_string(), 1);
        list.update(&"k".to_string(), 2).unwrap();
        assert_eq!(list.try_get_value(&"k".to_string()), Some(2));

        list.update_with(&"k".to_string(), |_, v| v + 40).unwrap();
        assert_eq!(list.try_get_value(&"k".to_string()), Some(42));

        let err = list.update(&"missing".to_string(), 0).unwrap_err();
        assert!(matches!(err, VellumError::KeyNotFound));
    }

    #[test]
    fn test_update_removed_key() {
        let list = ConcurrentSkipList::new();
        list.try_add(1, 1);
        list.try_remove(&1);
        assert!(list.update(&1, 2).is_err());
    }

    #[test]
    fn test_iteration_order() {
        let list = ConcurrentSkipList::new();
        for k in [9, 3, 7, 1, 5] {
            list.try_add(k, k.to_string());
        }
        let entries: Vec<_> = list.iter().collect();
        assert_eq!(
            entries,
            vec![
                (1, "1".to_string()),
                (3, "3".to_string()),
                (5, "5".to_string()),
                (7, "7".to_string()),
                (9, "9".to_string()),
            ]
        );
    }

    #[test]
    fn test_empty() {
        let list: ConcurrentSkipList<u32, u32> = ConcurrentSkipList::new();
        assert!(list.is_empty());
        assert_eq!(list.iter().count(), 0);
        assert!(!list.try_remove(&1));
        assert_eq!(list.keys_at_level(0), Vec::<u32>::new());
    }

    #[test]
    fn test_with_config() {
        let config = SkipListConfig::default().with_max_level(4);
        let list = ConcurrentSkipList::with_config(OrdComparer, config).unwrap();
        assert_eq!(list.max_level(), 4);
        for k in 0..200 {
            list.try_add(k, ());
        }
        assert_eq!(list.len(), 200);
        assert!(list.keys_at_level(4).is_empty());

        let bad = SkipListConfig::default().with_max_level(0);
        assert!(ConcurrentSkipList::<i32, (), _>::with_config(OrdComparer, bad).is_err());
    }

    #[test]
    fn test_levels_are_nested() {
        let list = ConcurrentSkipList::new();
        for k in 0..500 {
            list.try_add(k, ());
        }
        for k in (0..500).step_by(3) {
            list.try_remove(&k);
        }
        assert_levels_nested(&list);
    }

    #[test]
    fn test_concurrent_disjoint_adds() {
        let list = Arc::new(ConcurrentSkipList::new());
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let list = Arc::clone(&list);
                thread::spawn(move || {
                    for i in 0..500 {
                        assert!(list.try_add(t * 1_000 + i, t));
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(list.len(), 4_000);
        let keys = list.keys();
        assert!(keys.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_concurrent_same_key_single_winner() {
        let list = Arc::new(ConcurrentSkipList::new());
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let list = Arc::clone(&list);
                thread::spawn(move || list.try_add(42, t))
            })
            .collect();
        let winners = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|won| *won)
            .count();
        assert_eq!(winners, 1);
        assert!(list.contains(&42));
    }

    #[test]
    fn test_concurrent_add_remove() {
        let list = Arc::new(ConcurrentSkipList::new());
        for k in 0..1_000 {
            list.try_add(k, k);
        }

        let remover = {
            let list = Arc::clone(&list);
            thread::spawn(move || (0..1_000).filter(|k| k % 2 == 0).all(|k| list.try_remove(&k)))
        };
        let adder = {
            let list = Arc::clone(&list);
            thread::spawn(move || (1_000..2_000).all(|k| list.try_add(k, k)))
        };
        let reader = {
            let list = Arc::clone(&list);
            thread::spawn(move || {
                for _ in 0..20 {
                    let keys = list.keys();
                    assert!(keys.windows(2).all(|w| w[0] < w[1]));
                }
            })
        };

        assert!(remover.join().unwrap());
        assert!(adder.join().unwrap());
        reader.join().unwrap();

        assert_eq!(list.len(), 1_500);
        assert!(!list.contains(&0));
        assert!(list.contains(&1));
        assert!(list.contains(&1_999));
    }

    #[test]
    fn test_concurrent_add_loser_sees_key() {
        const THREADS: usize = 8;
        let list = Arc::new(ConcurrentSkipList::new());
        let start = Arc::new(Barrier::new(THREADS));
        let handles: Vec<_> = (0..THREADS)
            .map(|t| {
                let list = Arc::clone(&list);
                let start = Arc::clone(&start);
                thread::spawn(move || {
                    start.wait();
                    let mut won = 0;
                    for k in 0..300 {
                        if list.try_add(k, t) {
                            won += 1;
                        } else {
                            // A losing insert returns only once the winner is visible.
                            assert!(list.contains(&k));
                        }
                    }
                    won
                })
            })
            .collect();
        let total: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(total, 300);
        assert_eq!(list.len(), 300);
        assert_levels_nested(&list);
    }

    #[test]
    fn test_concurrent_remove_single_winner() {
        const THREADS: usize = 8;
        const KEYS: usize = 500;
        let list = Arc::new(ConcurrentSkipList::new());
        for k in 0..KEYS {
            list.try_add(k, k);
        }
        let wins: Arc<Vec<AtomicUsize>> =
            Arc::new((0..KEYS).map(|_| AtomicUsize::new(0)).collect());
        let start = Arc::new(Barrier::new(THREADS));

        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                let list = Arc::clone(&list);
                let wins = Arc::clone(&wins);
                let start = Arc::clone(&start);
                thread::spawn(move || {
                    start.wait();
                    for k in 0..KEYS {
                        if list.try_remove(&k) {
                            wins[k].fetch_add(1, AtomicOrdering::Relaxed);
                        }
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        for (k, count) in wins.iter().enumerate() {
            assert_eq!(count.load(AtomicOrdering::Relaxed), 1, "key {k}");
        }
        assert!(list.is_empty());
        assert_levels_nested(&list);
    }

    #[test]
    fn test_update_excludes_concurrent_remove() {
        const KEYS: usize = 200;
        let list = Arc::new(ConcurrentSkipList::new());
        for k in 0..KEYS {
            list.try_add(k, 0u64);
        }
        let removed: Arc<Vec<AtomicBool>> =
            Arc::new((0..KEYS).map(|_| AtomicBool::new(false)).collect());
        let late_updates = Arc::new(AtomicUsize::new(0));

        let updaters: Vec<_> = (0..4)
            .map(|_| {
                let list = Arc::clone(&list);
                let removed = Arc::clone(&removed);
                let late_updates = Arc::clone(&late_updates);
                thread::spawn(move || {
                    for _ in 0..20 {
                        for k in 0..KEYS {
                            let was_removed = removed[k].load(AtomicOrdering::SeqCst);
                            let result = list.update_with(&k, |_, v| {
                                if removed[k].load(AtomicOrdering::SeqCst) {
                                    late_updates.fetch_add(1, AtomicOrdering::SeqCst);
                                }
                                v + 1
                            });
                            if was_removed {
                                // Once removed, the key stays gone.
                                assert!(result.is_err());
                            }
                        }
                    }
                })
            })
            .collect();
        let remover = {
            let list = Arc::clone(&list);
            let removed = Arc::clone(&removed);
            thread::spawn(move || {
                for k in 0..KEYS {
                    assert!(list.try_remove(&k));
                    removed[k].store(true, AtomicOrdering::SeqCst);
                }
            })
        };

        remover.join().unwrap();
        for h in updaters {
            h.join().unwrap();
        }
        assert_eq!(late_updates.load(AtomicOrdering::SeqCst), 0);
        assert!(list.is_empty());
        assert_levels_nested(&list);
    }

    #[test]
    fn test_sorted_list_trait() {
        fn fill<L: SortedList<u8, u8>>(list: &L) {
            for k in (0..10).rev() {
                assert!(list.try_add(k, k));
            }
            list.update(&3, 33).unwrap();
            assert!(list.try_remove(&0));
        }

        let list = ConcurrentSkipList::new();
        fill(&list);
        let entries: Vec<_> = SortedList::iter(&list).collect();
        assert_eq!(entries.len(), 9);
        assert_eq!(entries[0], (1, 1));
        assert_eq!(entries[2], (3, 33));
    }
}
