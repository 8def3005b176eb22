//! Ghost list: recently evicted keys, without their values.
//!
//! Adaptive policies (ARC) keep a bounded recency list of keys that were
//! pushed out of the resident cache. A lookup that misses the cache but
//! hits a ghost list is evidence that the cache is sized or partitioned
//! wrong for the workload, and drives the adaptation of the T1/T2 target.
//!
//! The list stores keys only. Recording an already-present key promotes it
//! to the newest position; recording at capacity drops the oldest key.

use crate::ds::linked_slab::{LinkedSlab, NodeId};
use rustc_hash::FxHashMap;
use std::hash::Hash;

/// Capacity-bounded recency list of keys with O(1) membership tests.
#[derive(Debug)]
pub struct GhostList<K> {
    list: LinkedSlab<K>,
    index: FxHashMap<K, NodeId>,
    capacity: usize,
}

impl<K> GhostList<K>
where
    K: Eq + Hash + Clone,
{
    /// Creates a ghost list holding at most `capacity` keys.
    ///
    /// Capacity 0 produces a list that ignores every `record`.
    pub fn new(capacity: usize) -> Self {
        Self {
            list: LinkedSlab::with_capacity(capacity),
            index: FxHashMap::with_capacity_and_hasher(capacity, Default::default()),
            capacity,
        }
    }

    /// Returns the configured capacity.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns the number of tracked keys.
    pub fn len(&self) -> usize {
        self.list.len()
    }

    /// Returns `true` if no keys are tracked.
    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    /// Returns `true` if `key` is present — a ghost hit.
    pub fn contains(&self, key: &K) -> bool {
        self.index.contains_key(key)
    }

    /// Records `key` as the most recently evicted.
    ///
    /// An already-tracked key is promoted to the newest position. At
    /// capacity, the oldest key is dropped first.
    pub fn record(&mut self, key: K) {
        if self.capacity == 0 {
            return;
        }
        if let Some(&id) = self.index.get(&key) {
            self.list.move_to_back(id);
            return;
        }
        if self.list.len() >= self.capacity {
            if let Some(old) = self.list.pop_front() {
                self.index.remove(&old);
            }
        }
        let id = self.list.push_back(key.clone());
        self.index.insert(key, id);
    }

    /// Removes `key`; returns `true` if it was tracked.
    ///
    /// Called after a ghost hit so the same eviction is not counted twice.
    pub fn remove(&mut self, key: &K) -> bool {
        match self.index.remove(key) {
            Some(id) => {
                self.list.unlink(id);
                true
            }
            None => false,
        }
    }

    /// Drops and returns the oldest tracked key.
    pub fn pop_oldest(&mut self) -> Option<K> {
        let key = self.list.pop_front()?;
        self.index.remove(&key);
        Some(key)
    }

    /// Iterates tracked keys from oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &K> {
        self.list.iter()
    }

    /// Forgets every tracked key.
    pub fn clear(&mut self) {
        self.list.clear();
        self.index.clear();
    }

}

impl<K> GhostList<K>
where
    K: Eq + Hash + Clone + std::fmt::Debug,
{
    #[cfg(any(test, debug_assertions))]
    pub fn debug_validate_invariants(&self) {
        assert_eq!(self.list.len(), self.index.len());
        assert!(self.list.len() <= self.capacity);
        for (key, &id) in &self.index {
            assert_eq!(self.list.get(id), Some(key));
        }
        self.list.debug_validate_invariants();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_and_membership() {
        let mut ghost = GhostList::new(4);
        ghost.record("a");
        ghost.record("b");
        assert!(ghost.contains(&"a"));
        assert!(ghost.contains(&"b"));
        assert!(!ghost.contains(&"c"));
        assert_eq!(ghost.len(), 2);
    }

    #[test]
    fn capacity_evicts_oldest() {
        let mut ghost = GhostList::new(2);
        ghost.record("a");
        ghost.record("b");
        ghost.record("c");
        assert!(!ghost.contains(&"a"));
        assert!(ghost.contains(&"b"));
        assert!(ghost.contains(&"c"));
        assert_eq!(ghost.len(), 2);
    }

    #[test]
    fn rerecord_promotes_to_newest() {
        let mut ghost = GhostList::new(2);
        ghost.record("a");
        ghost.record("b");
        ghost.record("a"); // now newest
        ghost.record("c"); // evicts "b"
        assert!(ghost.contains(&"a"));
        assert!(!ghost.contains(&"b"));
        assert!(ghost.contains(&"c"));
        ghost.debug_validate_invariants();
    }

    #[test]
    fn remove_and_pop_oldest() {
        let mut ghost = GhostList::new(3);
        ghost.record(1);
        ghost.record(2);
        ghost.record(3);

        assert!(ghost.remove(&2));
        assert!(!ghost.remove(&2));
        assert_eq!(ghost.pop_oldest(), Some(1));
        assert_eq!(ghost.pop_oldest(), Some(3));
        assert_eq!(ghost.pop_oldest(), None);
        assert!(ghost.is_empty());
    }

    #[test]
    fn zero_capacity_ignores_records() {
        let mut ghost = GhostList::new(0);
        ghost.record("a");
        assert!(ghost.is_empty());
        assert!(!ghost.contains(&"a"));
    }

    #[test]
    fn clear_forgets_everything() {
        let mut ghost = GhostList::new(4);
        ghost.record("a");
        ghost.record("b");
        ghost.clear();
        assert!(ghost.is_empty());
        assert!(!ghost.contains(&"a"));
        ghost.debug_validate_invariants();
    }
}
