//! LRU-K eviction policy: an admission filter in front of a main LRU.
//!
//! A plain LRU is defenseless against one-shot scans: every touched key
//! displaces something that was actually hot. LRU-K counts references in a
//! separate bounded *history* LRU whose values are visit counts, and only
//! admits a key into the main cache once it has been referenced `k` times.
//! References one through `k - 1` are recorded but keep the key
//! non-resident.
//!
//! The history list is itself an LRU of capacity `history_capacity`, so a
//! key that goes cold mid-count falls out of the history and starts over
//! on its next reference.

use std::fmt;
use std::hash::Hash;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::policy::lru::LruCore;
use crate::traits::CachePolicy;

/// Default admission threshold (LRU-2).
pub const DEFAULT_K: u64 = 2;

/// Single-threaded LRU-K core: main LRU plus a visit-count history LRU.
pub struct LrukCore<K, V>
where
    K: Eq + Hash + Clone,
{
    main: LruCore<K, V>,
    /// Visit counts for keys that have been seen but not (yet) admitted.
    history: LruCore<K, u64>,
    k: u64,
}

impl<K, V> LrukCore<K, V>
where
    K: Eq + Hash + Clone,
{
    /// Creates a core with a main capacity, a history capacity, and the
    /// admission threshold `k` (clamped to ≥ 1).
    pub fn new(capacity: usize, history_capacity: usize, k: u64) -> Self {
        Self {
            main: LruCore::new(capacity),
            history: LruCore::new(history_capacity),
            k: k.max(1),
        }
    }

    /// Records a reference and inserts or overwrites.
    ///
    /// The key is admitted into the main cache on its `k`-th observed
    /// reference; earlier references only update the history count. A key
    /// that is already resident is overwritten in place while counting
    /// continues.
    pub fn put(&mut self, key: K, value: V) -> Option<V> {
        let count = self.history.peek(&key).copied().unwrap_or(0) + 1;

        if count >= self.k {
            self.history.remove(&key);
            return self.main.insert(key, value);
        }

        self.history.insert(key.clone(), count);
        if self.main.contains(&key) {
            self.main.insert(key, value)
        } else {
            None
        }
    }

    /// Records a reference and looks the key up in the main cache.
    ///
    /// The history count is incremented on every call, hit or miss: the
    /// attempt itself is evidence of interest.
    pub fn get(&mut self, key: &K) -> Option<&V> {
        let count = self.history.peek(key).copied().unwrap_or(0) + 1;
        self.history.insert(key.clone(), count);
        self.main.get(key)
    }

    /// Removes `key` from the main cache and forgets its history.
    pub fn remove(&mut self, key: &K) -> Option<V> {
        self.history.remove(key);
        self.main.remove(key)
    }

    /// Returns `true` if `key` is resident in the main cache.
    pub fn contains(&self, key: &K) -> bool {
        self.main.contains(key)
    }

    /// Returns the number of resident entries (history excluded).
    pub fn len(&self) -> usize {
        self.main.len()
    }

    /// Returns `true` if the main cache is empty.
    pub fn is_empty(&self) -> bool {
        self.main.is_empty()
    }

    /// Returns the main cache capacity.
    pub fn capacity(&self) -> usize {
        self.main.capacity()
    }

    /// Returns the admission threshold.
    pub fn k(&self) -> u64 {
        self.k
    }

    /// Returns the recorded visit count for a not-yet-admitted key.
    pub fn history_count(&self, key: &K) -> Option<u64> {
        self.history.peek(key).copied()
    }

    /// Drops all resident entries and all history counts.
    pub fn clear(&mut self) {
        self.main.clear();
        self.history.clear();
    }
}

impl<K, V> fmt::Debug for LrukCore<K, V>
where
    K: Eq + Hash + Clone,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LrukCore")
            .field("len", &self.len())
            .field("capacity", &self.capacity())
            .field("k", &self.k)
            .field("history_len", &self.history.len())
            .finish_non_exhaustive()
    }
}

/// Thread-safe LRU-K cache.
pub struct LrukCache<K, V>
where
    K: Eq + Hash + Clone,
{
    inner: Mutex<LrukCore<K, Arc<V>>>,
}

impl<K, V> LrukCache<K, V>
where
    K: Eq + Hash + Clone,
{
    /// Creates a cache with the given main capacity, history capacity, and
    /// admission threshold (clamped to ≥ 1).
    pub fn new(capacity: usize, history_capacity: usize, k: u64) -> Self {
        Self {
            inner: Mutex::new(LrukCore::new(capacity, history_capacity, k)),
        }
    }

    /// Records a reference; inserts once the admission threshold is met.
    pub fn put(&self, key: K, value: V) -> Option<Arc<V>> {
        self.inner.lock().put(key, Arc::new(value))
    }

    /// Records a reference and looks `key` up in the main cache.
    pub fn get(&self, key: &K) -> Option<Arc<V>> {
        self.inner.lock().get(key).cloned()
    }

    /// Removes `key` and forgets its history.
    pub fn remove(&self, key: &K) -> Option<Arc<V>> {
        self.inner.lock().remove(key)
    }

    /// Drops all resident entries and history counts.
    pub fn purge(&self) {
        self.inner.lock().clear();
    }

    /// Returns `true` if `key` is resident in the main cache.
    pub fn contains(&self, key: &K) -> bool {
        self.inner.lock().contains(key)
    }

    /// Returns the number of resident entries.
    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    /// Returns `true` if the main cache is empty.
    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    /// Returns the main cache capacity.
    pub fn capacity(&self) -> usize {
        self.inner.lock().capacity()
    }
}

impl<K, V> CachePolicy<K, V> for LrukCache<K, V>
where
    K: Eq + Hash + Clone,
{
    fn put(&self, key: K, value: V) -> Option<Arc<V>> {
        LrukCache::put(self, key, value)
    }

    fn get(&self, key: &K) -> Option<Arc<V>> {
        LrukCache::get(self, key)
    }

    fn remove(&self, key: &K) -> Option<Arc<V>> {
        LrukCache::remove(self, key)
    }

    fn purge(&self) {
        LrukCache::purge(self)
    }

    fn contains(&self, key: &K) -> bool {
        LrukCache::contains(self, key)
    }

    fn len(&self) -> usize {
        LrukCache::len(self)
    }

    fn capacity(&self) -> usize {
        LrukCache::capacity(self)
    }
}

impl<K, V> fmt::Debug for LrukCache<K, V>
where
    K: Eq + Hash + Clone,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let core = self.inner.lock();
        f.debug_struct("LrukCache")
            .field("len", &core.len())
            .field("capacity", &core.capacity())
            .field("k", &core.k())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admitted_on_second_reference() {
        let mut core = LrukCore::new(2, 4, 2);

        core.put(1, "a");
        assert!(!core.contains(&1), "first reference must not admit");
        assert_eq!(core.get(&1), None);

        // get counted as the second reference; the next put admits.
        core.put(1, "a");
        assert!(core.contains(&1));
        assert_eq!(core.get(&1), Some(&"a"));
    }

    #[test]
    fn admission_clears_history() {
        let mut core = LrukCore::new(2, 4, 2);
        core.put(1, "a");
        assert_eq!(core.history_count(&1), Some(1));
        core.put(1, "a");
        assert_eq!(core.history_count(&1), None);
        assert!(core.contains(&1));
    }

    #[test]
    fn scan_does_not_displace_admitted_keys() {
        let mut core = LrukCore::new(2, 8, 2);
        core.put(1, "a");
        core.put(1, "a");
        core.put(2, "b");
        core.put(2, "b");
        assert_eq!(core.len(), 2);

        // One-shot scan over cold keys: none reach the threshold.
        for key in 10..20 {
            core.put(key, "scan");
        }
        assert!(core.contains(&1));
        assert!(core.contains(&2));
        assert_eq!(core.len(), 2);
    }

    #[test]
    fn history_eviction_resets_count() {
        let mut core = LrukCore::new(2, 2, 3);
        core.put(1, "a"); // count 1
        core.put(2, "b");
        core.put(3, "c"); // history holds 2 and 3; 1 fell out

        // 1 starts over: two more references are not enough for k = 3.
        core.put(1, "a");
        core.put(1, "a");
        assert!(!core.contains(&1));
        assert_eq!(core.history_count(&1), Some(2));
    }

    #[test]
    fn resident_overwrite_keeps_counting() {
        let mut core = LrukCore::new(2, 4, 2);
        core.put(1, "a");
        core.put(1, "b"); // admitted with the second reference
        assert_eq!(core.get(&1), Some(&"b"));

        let old = core.put(1, "c");
        assert_eq!(old, Some("b"));
        assert_eq!(core.get(&1), Some(&"c"));
    }

    #[test]
    fn main_capacity_governs_admitted_entries() {
        let mut core = LrukCore::new(2, 8, 2);
        for key in 1..=3 {
            core.put(key, key);
            core.put(key, key);
        }
        // 1 was the coldest admitted entry.
        assert!(!core.contains(&1));
        assert!(core.contains(&2));
        assert!(core.contains(&3));
        assert_eq!(core.len(), 2);
    }

    #[test]
    fn remove_forgets_key_and_history() {
        let mut core = LrukCore::new(2, 4, 2);
        core.put(1, "a");
        core.put(1, "a");
        assert_eq!(core.remove(&1), Some("a"));
        assert!(!core.contains(&1));
        assert_eq!(core.history_count(&1), None);

        // Counting starts from scratch.
        core.put(1, "a");
        assert!(!core.contains(&1));
    }

    #[test]
    fn k_is_clamped_to_one() {
        let mut core = LrukCore::new(2, 4, 0);
        assert_eq!(core.k(), 1);
        core.put(1, "a");
        assert!(core.contains(&1), "k = 1 behaves like plain LRU");
    }

    #[test]
    fn cache_wrapper_round_trip() {
        let cache: LrukCache<u32, String> = LrukCache::new(2, 4, 2);
        cache.put(1, "one".to_string());
        assert!(cache.get(&1).is_none());
        cache.put(1, "one".to_string());
        assert_eq!(cache.get(&1).as_deref(), Some(&"one".to_string()));

        cache.purge();
        assert!(cache.is_empty());
        assert!(cache.get(&1).is_none());
    }
}
