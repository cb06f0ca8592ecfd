//! Skip list nodes.

use std::cmp::Ordering;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering as MemoryOrdering};

use crossbeam_epoch::{Atomic, Guard, Shared};
use parking_lot::{ReentrantMutex, ReentrantMutexGuard, RwLock};

use crate::comparer::KeyComparer;

/// What a node stands for in the key order.
pub(crate) enum Slot<K, V> {
    /// Sorts below every key.
    Head,
    /// Sorts above every key.
    Tail,
    /// A data entry.
    Entry { key: K, value: RwLock<V> },
}

/// A tower in the skip list.
///
/// `next` has one forward pointer per level the node participates in. The
/// forward pointers are written before the node is published and afterwards
/// only by threads holding this node's lock.
pub(crate) struct Node<K, V> {
    slot: Slot<K, V>,
    next: Box<[Atomic<Node<K, V>>]>,
    lock: ReentrantMutex<()>,
    inserted: AtomicBool,
    deleted: AtomicBool,
}

impl<K, V> Node<K, V> {
    fn with_slot(slot: Slot<K, V>, height: usize, inserted: bool) -> Self {
        debug_assert!(height > 0);
        Self {
            slot,
            next: (0..height).map(|_| Atomic::null()).collect(),
            lock: ReentrantMutex::new(()),
            inserted: AtomicBool::new(inserted),
            deleted: AtomicBool::new(false),
        }
    }

    /// Creates the head sentinel spanning every level.
    pub(crate) fn head(height: usize) -> Self {
        Self::with_slot(Slot::Head, height, true)
    }

    /// Creates the tail sentinel spanning every level.
    pub(crate) fn tail(height: usize) -> Self {
        Self::with_slot(Slot::Tail, height, true)
    }

    /// Creates an unpublished data node of the given height.
    pub(crate) fn entry(key: K, value: V, height: usize) -> Self {
        Self::with_slot(
            Slot::Entry {
                key,
                value: RwLock::new(value),
            },
            height,
            false,
        )
    }

    /// Highest level this node is linked at.
    #[inline]
    pub(crate) fn top_level(&self) -> usize {
        self.next.len() - 1
    }

    /// Returns the key, or `None` for sentinels.
    #[inline]
    pub(crate) fn key(&self) -> Option<&K> {
        match &self.slot {
            Slot::Entry { key, .. } => Some(key),
            Slot::Head | Slot::Tail => None,
        }
    }

    #[inline]
    pub(crate) fn is_tail(&self) -> bool {
        matches!(self.slot, Slot::Tail)
    }

    /// Orders this node relative to `key`.
    #[inline]
    pub(crate) fn compare_to<C: KeyComparer<K>>(&self, key: &K, comparer: &C) -> Ordering {
        match &self.slot {
            Slot::Head => Ordering::Less,
            Slot::Tail => Ordering::Greater,
            Slot::Entry { key: own, .. } => comparer.compare(own, key),
        }
    }

    #[inline]
    pub(crate) fn next<'g>(&self, level: usize, guard: &'g Guard) -> Shared<'g, Node<K, V>> {
        self.next[level].load(MemoryOrdering::Acquire, guard)
    }

    #[inline]
    pub(crate) fn set_next(&self, level: usize, node: Shared<'_, Node<K, V>>) {
        self.next[level].store(node, MemoryOrdering::Release);
    }

    /// Takes the node lock.
    #[inline]
    pub(crate) fn lock(&self) -> ReentrantMutexGuard<'_, ()> {
        self.lock.lock()
    }

    #[inline]
    pub(crate) fn is_inserted(&self) -> bool {
        self.inserted.load(MemoryOrdering::Acquire)
    }

    /// Marks the node as fully linked at every level.
    pub(crate) fn mark_inserted(&self) {
        let was = self.inserted.swap(true, MemoryOrdering::AcqRel);
        debug_assert!(!was, "node inserted twice");
    }

    #[inline]
    pub(crate) fn is_deleted(&self) -> bool {
        self.deleted.load(MemoryOrdering::Acquire)
    }

    /// Logically deletes the node. `held` must be a guard of this node's lock.
    pub(crate) fn mark_deleted(&self, held: &ReentrantMutexGuard<'_, ()>) {
        debug_assert!(
            std::ptr::eq(ReentrantMutexGuard::remutex(held), &self.lock),
            "mark_deleted called without holding the node lock"
        );
        let was = self.deleted.swap(true, MemoryOrdering::AcqRel);
        debug_assert!(!was, "node deleted twice");
    }

    /// True if the node is visible to readers.
    #[inline]
    pub(crate) fn is_live(&self) -> bool {
        self.is_inserted() && !self.is_deleted()
    }

    /// Clones the key and current value. `None` for sentinels.
    pub(crate) fn snapshot(&self) -> Option<(K, V)>
    where
        K: Clone,
        V: Clone,
    {
        match &self.slot {
            Slot::Entry { key, value } => Some((key.clone(), value.read().clone())),
            Slot::Head | Slot::Tail => None,
        }
    }

    /// Clones the current value. `None` for sentinels.
    pub(crate) fn value(&self) -> Option<V>
    where
        V: Clone,
    {
        match &self.slot {
            Slot::Entry { value, .. } => Some(value.read().clone()),
            Slot::Head | Slot::Tail => None,
        }
    }

    /// Replaces the value with `f(key, current)`. Returns false for sentinels.
    pub(crate) fn replace_value<F>(&self, f: F) -> bool
    where
        F: FnOnce(&K, &V) -> V,
    {
        match &self.slot {
            Slot::Entry { key, value } => {
                let mut value = value.write();
                let replacement = f(key, &value);
                *value = replacement;
                true
            }
            Slot::Head | Slot::Tail => false,
        }
    }
}

impl<K: fmt::Debug, V> fmt::Debug for Node<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("Node");
        match &self.slot {
            Slot::Head => s.field("slot", &"head"),
            Slot::Tail => s.field("slot", &"tail"),
            Slot::Entry { key, .. } => s.field("key", key),
        };
        s.field("top_level", &self.top_level())
            .field("inserted", &self.is_inserted())
            .field("deleted", &self.is_deleted())
            .finish()
    }
}
