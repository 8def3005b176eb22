//! Least Frequently Used (LFU) eviction policy with aging.
//!
//! Entries are grouped into per-frequency lists: a hash map from frequency
//! to a doubly-linked list of every resident entry with that access count,
//! plus a `min_freq` scalar naming the lowest non-empty frequency. Eviction
//! pops the oldest entry of the `min_freq` list, so ties break lowest
//! frequency first, then least recently used within that frequency.
//!
//! Entries live in a policy-local slab and the frequency lists link them by
//! slot index, which keeps the whole structure in safe code.
//!
//! ## Aging
//!
//! A long-lived entry can accumulate a frequency no new entry could ever
//! compete with. The core therefore tracks `cur_total`, incremented once
//! per access event and reduced by the victim's frequency on eviction.
//! When `cur_total / len` exceeds the configured `max_average`, every
//! resident frequency drops by `max_average / 2` (clamped to at least 1)
//! and the frequency lists are rebuilt. The sweep is O(n) but rare
//! relative to the accesses that trigger it.

use std::fmt;
use std::hash::Hash;
use std::sync::Arc;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;

#[cfg(any(test, debug_assertions))]
use crate::error::InvariantError;
use crate::traits::CachePolicy;

/// Default frequency-ceiling threshold.
pub const DEFAULT_MAX_AVERAGE: u64 = 10;

#[derive(Debug)]
struct Entry<K, V> {
    key: K,
    value: V,
    freq: u64,
}

#[derive(Debug)]
struct Slot<K, V> {
    entry: Option<Entry<K, V>>,
    prev: Option<usize>,
    next: Option<usize>,
}

/// One doubly-linked list of slots sharing a frequency.
/// Head is the oldest entry at that frequency, tail the newest.
#[derive(Debug, Default)]
struct FreqList {
    head: Option<usize>,
    tail: Option<usize>,
    len: usize,
}

/// Single-threaded LFU core.
pub struct LfuCore<K, V>
where
    K: Eq + Hash + Clone,
{
    slots: Vec<Slot<K, V>>,
    free: Vec<usize>,
    index: FxHashMap<K, usize>,
    freq_lists: FxHashMap<u64, FreqList>,
    /// Lowest frequency with a non-empty list; 0 while the cache is empty.
    min_freq: u64,
    /// Access events minus evicted frequencies, drives aging.
    cur_total: u64,
    max_average: u64,
    capacity: usize,
}

impl<K, V> LfuCore<K, V>
where
    K: Eq + Hash + Clone,
{
    /// Creates a core with the given capacity and the default aging ceiling.
    pub fn new(capacity: usize) -> Self {
        Self::with_max_average(capacity, DEFAULT_MAX_AVERAGE)
    }

    /// Creates a core with an explicit aging ceiling (clamped to ≥ 1).
    pub fn with_max_average(capacity: usize, max_average: u64) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            free: Vec::new(),
            index: FxHashMap::with_capacity_and_hasher(capacity, Default::default()),
            freq_lists: FxHashMap::default(),
            min_freq: 0,
            cur_total: 0,
            max_average: max_average.max(1),
            capacity,
        }
    }

    /// Inserts or overwrites; an overwrite counts as an access.
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        if let Some(&idx) = self.index.get(&key) {
            let entry = self.slots[idx].entry.as_mut().expect("lfu entry missing");
            let previous = std::mem::replace(&mut entry.value, value);
            self.touch(idx);
            return Some(previous);
        }

        if self.capacity == 0 {
            return None;
        }

        if self.index.len() >= self.capacity {
            self.evict_lfu();
        }

        let idx = self.alloc_slot(Entry {
            key: key.clone(),
            value,
            freq: 1,
        });
        self.index.insert(key, idx);
        Self::list_push_back(&mut self.slots, self.freq_lists.entry(1).or_default(), idx);
        self.min_freq = 1;
        self.record_access();

        None
    }

    /// Looks up a value; a hit raises the entry's frequency by one.
    pub fn get(&mut self, key: &K) -> Option<&V> {
        let idx = *self.index.get(key)?;
        self.touch(idx);
        self.slots[idx].entry.as_ref().map(|entry| &entry.value)
    }

    /// Reads a value without recording an access.
    pub fn peek(&self, key: &K) -> Option<&V> {
        let idx = *self.index.get(key)?;
        self.slots[idx].entry.as_ref().map(|entry| &entry.value)
    }

    /// Removes `key` and returns its value, if present.
    pub fn remove(&mut self, key: &K) -> Option<V> {
        let idx = self.index.remove(key)?;
        let freq = self.slots[idx].entry.as_ref().expect("lfu entry missing").freq;
        self.unlink_from_freq(idx, freq);
        if self.index.is_empty() {
            self.min_freq = 0;
        } else if freq == self.min_freq && !self.freq_lists.contains_key(&freq) {
            self.min_freq = self.freq_lists.keys().copied().min().unwrap_or(0);
        }
        let entry = self.free_slot(idx);
        self.cur_total = self.cur_total.saturating_sub(entry.freq);
        Some(entry.value)
    }

    /// Removes and returns the least frequently used entry.
    pub fn pop_lfu(&mut self) -> Option<(K, V)> {
        self.evict_lfu()
    }

    /// Returns the access frequency recorded for `key`.
    pub fn frequency(&self, key: &K) -> Option<u64> {
        let idx = *self.index.get(key)?;
        self.slots[idx].entry.as_ref().map(|entry| entry.freq)
    }

    /// Returns `true` if `key` is resident.
    pub fn contains(&self, key: &K) -> bool {
        self.index.contains_key(key)
    }

    /// Returns the number of resident entries.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// Returns `true` if no entries are resident.
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Returns the configured capacity.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Drops every entry and resets the aging counters.
    pub fn clear(&mut self) {
        self.slots.clear();
        self.free.clear();
        self.index.clear();
        self.freq_lists.clear();
        self.min_freq = 0;
        self.cur_total = 0;
    }

    /// Moves a slot from its current frequency list to the next one up
    /// and records the access event.
    fn touch(&mut self, idx: usize) {
        let old_freq = self.slots[idx].entry.as_ref().expect("lfu entry missing").freq;
        let new_freq = old_freq.saturating_add(1);

        self.unlink_from_freq(idx, old_freq);
        if self.min_freq == old_freq && !self.freq_lists.contains_key(&old_freq) {
            // The lowest list just drained into the next frequency.
            self.min_freq = new_freq;
        }

        self.slots[idx].entry.as_mut().expect("lfu entry missing").freq = new_freq;
        Self::list_push_back(
            &mut self.slots,
            self.freq_lists.entry(new_freq).or_default(),
            idx,
        );

        self.record_access();
    }

    /// Evicts the oldest entry of the lowest non-empty frequency.
    fn evict_lfu(&mut self) -> Option<(K, V)> {
        if self.index.is_empty() {
            return None;
        }

        let min = self.min_freq;
        let idx = {
            let list = match self.freq_lists.get_mut(&min) {
                Some(list) => list,
                None => {
                    log::error!("lfu min_freq {min} has no frequency list; policy state is corrupt");
                    panic!("lfu min_freq list missing");
                }
            };
            match Self::list_pop_front(&mut self.slots, list) {
                Some(idx) => idx,
                None => {
                    log::error!("lfu min_freq {min} list is empty; policy state is corrupt");
                    panic!("lfu min_freq list empty");
                }
            }
        };
        if self.freq_lists.get(&min).map(|l| l.len == 0).unwrap_or(false) {
            self.freq_lists.remove(&min);
            if self.min_freq == min {
                self.min_freq = self.freq_lists.keys().copied().min().unwrap_or(0);
            }
        }

        let entry = self.free_slot(idx);
        self.index.remove(&entry.key);
        self.cur_total = self.cur_total.saturating_sub(entry.freq);
        Some((entry.key, entry.value))
    }

    /// Counts one access event and fires age-decay past the ceiling.
    fn record_access(&mut self) {
        self.cur_total += 1;
        let len = self.index.len() as u64;
        if len > 0 && self.cur_total / len > self.max_average {
            self.age_decay();
        }
    }

    /// Subtracts `max_average / 2` from every resident frequency (floor 1)
    /// and rebuilds the frequency lists.
    fn age_decay(&mut self) {
        let decay = self.max_average / 2;
        self.freq_lists.clear();

        let live: Vec<usize> = self.index.values().copied().collect();
        let mut new_min = u64::MAX;
        for idx in live {
            let entry = self.slots[idx].entry.as_mut().expect("lfu entry missing");
            entry.freq = entry.freq.saturating_sub(decay).max(1);
            let freq = entry.freq;
            new_min = new_min.min(freq);
            Self::list_push_back(
                &mut self.slots,
                self.freq_lists.entry(freq).or_default(),
                idx,
            );
        }

        self.min_freq = if new_min == u64::MAX { 0 } else { new_min };
    }

    /// Unlinks a slot from the list at `freq`, dropping the list if emptied.
    fn unlink_from_freq(&mut self, idx: usize, freq: u64) {
        let emptied = if let Some(list) = self.freq_lists.get_mut(&freq) {
            Self::list_unlink(&mut self.slots, list, idx);
            list.len == 0
        } else {
            log::error!("lfu entry at freq {freq} has no frequency list; policy state is corrupt");
            panic!("lfu frequency list missing");
        };
        if emptied {
            self.freq_lists.remove(&freq);
        }
    }

    fn alloc_slot(&mut self, entry: Entry<K, V>) -> usize {
        if let Some(idx) = self.free.pop() {
            self.slots[idx] = Slot {
                entry: Some(entry),
                prev: None,
                next: None,
            };
            idx
        } else {
            self.slots.push(Slot {
                entry: Some(entry),
                prev: None,
                next: None,
            });
            self.slots.len() - 1
        }
    }

    fn free_slot(&mut self, idx: usize) -> Entry<K, V> {
        let entry = self.slots[idx].entry.take().expect("lfu entry missing");
        self.slots[idx].prev = None;
        self.slots[idx].next = None;
        self.free.push(idx);
        entry
    }

    fn list_push_back(slots: &mut [Slot<K, V>], list: &mut FreqList, idx: usize) {
        slots[idx].prev = list.tail;
        slots[idx].next = None;
        match list.tail {
            Some(old) => slots[old].next = Some(idx),
            None => list.head = Some(idx),
        }
        list.tail = Some(idx);
        list.len += 1;
    }

    fn list_unlink(slots: &mut [Slot<K, V>], list: &mut FreqList, idx: usize) {
        let prev = slots[idx].prev;
        let next = slots[idx].next;
        match prev {
            Some(p) => slots[p].next = next,
            None => list.head = next,
        }
        match next {
            Some(n) => slots[n].prev = prev,
            None => list.tail = prev,
        }
        slots[idx].prev = None;
        slots[idx].next = None;
        list.len -= 1;
    }

    fn list_pop_front(slots: &mut [Slot<K, V>], list: &mut FreqList) -> Option<usize> {
        let idx = list.head?;
        Self::list_unlink(slots, list, idx);
        Some(idx)
    }

    #[cfg(any(test, debug_assertions))]
    pub fn check_invariants(&self) -> Result<(), InvariantError> {
        if self.index.len() > self.capacity {
            return Err(InvariantError::new("resident count exceeds capacity"));
        }

        let live = self.slots.iter().filter(|s| s.entry.is_some()).count();
        if live != self.index.len() {
            return Err(InvariantError::new("index and slab disagree on size"));
        }

        if self.index.is_empty() {
            if self.min_freq != 0 || !self.freq_lists.is_empty() {
                return Err(InvariantError::new("empty cache with stale freq state"));
            }
            return Ok(());
        }

        if !self.freq_lists.contains_key(&self.min_freq) {
            return Err(InvariantError::new("min_freq names an absent list"));
        }
        if let Some(smallest) = self.freq_lists.keys().copied().min() {
            if smallest != self.min_freq {
                return Err(InvariantError::new("min_freq is not the smallest frequency"));
            }
        }

        let mut chained = 0usize;
        for (&freq, list) in &self.freq_lists {
            if list.len == 0 {
                return Err(InvariantError::new("empty frequency list retained"));
            }
            let mut current = list.head;
            let mut prev = None;
            let mut count = 0usize;
            while let Some(idx) = current {
                let slot = &self.slots[idx];
                let entry = slot
                    .entry
                    .as_ref()
                    .ok_or_else(|| InvariantError::new("freed slot still chained"))?;
                if entry.freq != freq {
                    return Err(InvariantError::new("entry chained under wrong frequency"));
                }
                if slot.prev != prev {
                    return Err(InvariantError::new("broken prev link in frequency list"));
                }
                prev = Some(idx);
                current = slot.next;
                count += 1;
                if count > list.len {
                    return Err(InvariantError::new("cycle in frequency list"));
                }
            }
            if list.tail != prev || count != list.len {
                return Err(InvariantError::new("frequency list length mismatch"));
            }
            chained += count;
        }

        if chained != self.index.len() {
            return Err(InvariantError::new("entries not all chained exactly once"));
        }

        Ok(())
    }
}

impl<K, V> fmt::Debug for LfuCore<K, V>
where
    K: Eq + Hash + Clone,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LfuCore")
            .field("len", &self.len())
            .field("capacity", &self.capacity)
            .field("min_freq", &self.min_freq)
            .finish_non_exhaustive()
    }
}

/// Thread-safe LFU cache with aging.
pub struct LfuCache<K, V>
where
    K: Eq + Hash + Clone,
{
    inner: Mutex<LfuCore<K, Arc<V>>>,
}

impl<K, V> LfuCache<K, V>
where
    K: Eq + Hash + Clone,
{
    /// Creates a cache with the default aging ceiling.
    pub fn new(capacity: usize) -> Self {
        Self::with_max_average(capacity, DEFAULT_MAX_AVERAGE)
    }

    /// Creates a cache with an explicit aging ceiling (clamped to ≥ 1).
    pub fn with_max_average(capacity: usize, max_average: u64) -> Self {
        Self {
            inner: Mutex::new(LfuCore::with_max_average(capacity, max_average)),
        }
    }

    /// Inserts or overwrites; an overwrite counts as an access.
    pub fn put(&self, key: K, value: V) -> Option<Arc<V>> {
        self.inner.lock().insert(key, Arc::new(value))
    }

    /// Looks up `key`; a hit raises its frequency.
    pub fn get(&self, key: &K) -> Option<Arc<V>> {
        self.inner.lock().get(key).cloned()
    }

    /// Reads `key` without recording an access.
    pub fn peek(&self, key: &K) -> Option<Arc<V>> {
        self.inner.lock().peek(key).cloned()
    }

    /// Removes `key`, returning its value if it was resident.
    pub fn remove(&self, key: &K) -> Option<Arc<V>> {
        self.inner.lock().remove(key)
    }

    /// Drops every entry and resets the aging counters.
    pub fn purge(&self) {
        self.inner.lock().clear();
    }

    /// Returns the access frequency recorded for `key`.
    pub fn frequency(&self, key: &K) -> Option<u64> {
        self.inner.lock().frequency(key)
    }

    /// Returns `true` if `key` is resident.
    pub fn contains(&self, key: &K) -> bool {
        self.inner.lock().contains(key)
    }

    /// Returns the number of resident entries.
    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    /// Returns `true` if no entries are resident.
    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    /// Returns the configured capacity.
    pub fn capacity(&self) -> usize {
        self.inner.lock().capacity()
    }
}

impl<K, V> CachePolicy<K, V> for LfuCache<K, V>
where
    K: Eq + Hash + Clone,
{
    fn put(&self, key: K, value: V) -> Option<Arc<V>> {
        LfuCache::put(self, key, value)
    }

    fn get(&self, key: &K) -> Option<Arc<V>> {
        LfuCache::get(self, key)
    }

    fn remove(&self, key: &K) -> Option<Arc<V>> {
        LfuCache::remove(self, key)
    }

    fn purge(&self) {
        LfuCache::purge(self)
    }

    fn contains(&self, key: &K) -> bool {
        LfuCache::contains(self, key)
    }

    fn len(&self) -> usize {
        LfuCache::len(self)
    }

    fn capacity(&self) -> usize {
        LfuCache::capacity(self)
    }
}

impl<K, V> fmt::Debug for LfuCache<K, V>
where
    K: Eq + Hash + Clone,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let core = self.inner.lock();
        f.debug_struct("LfuCache")
            .field("len", &core.len())
            .field("capacity", &core.capacity())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frequent_entries_survive_eviction() {
        let mut core = LfuCore::new(2);
        core.insert(1, "a");
        core.insert(2, "b");
        core.get(&1);
        core.get(&1);

        // 2 has the lowest frequency and goes first.
        core.insert(3, "c");
        assert!(!core.contains(&2));
        assert_eq!(core.get(&1), Some(&"a"));
        assert_eq!(core.get(&3), Some(&"c"));
        core.check_invariants().unwrap();
    }

    #[test]
    fn ties_break_oldest_first() {
        let mut core = LfuCore::new(3);
        core.insert(1, "a");
        core.insert(2, "b");
        core.insert(3, "c");

        // All at frequency 1: the oldest insert (1) is the victim.
        core.insert(4, "d");
        assert!(!core.contains(&1));
        assert!(core.contains(&2));
        assert!(core.contains(&3));
        assert!(core.contains(&4));
    }

    #[test]
    fn overwrite_counts_as_access() {
        let mut core = LfuCore::new(2);
        core.insert(1, "a");
        assert_eq!(core.frequency(&1), Some(1));
        assert_eq!(core.insert(1, "a2"), Some("a"));
        assert_eq!(core.frequency(&1), Some(2));
        assert_eq!(core.peek(&1), Some(&"a2"));
    }

    #[test]
    fn min_freq_follows_promotions() {
        let mut core = LfuCore::new(2);
        core.insert(1, "a");
        core.insert(2, "b");
        core.get(&1);
        core.get(&2);
        // Both promoted to 2; min_freq must have followed, so the next
        // eviction still works and picks the older of the two.
        core.insert(3, "c");
        assert!(!core.contains(&1));
        assert!(core.contains(&2));
        core.check_invariants().unwrap();
    }

    #[test]
    fn remove_keeps_structure_consistent() {
        let mut core = LfuCore::new(4);
        core.insert(1, "a");
        core.insert(2, "b");
        core.get(&2);

        assert_eq!(core.remove(&2), Some("b"));
        assert_eq!(core.remove(&2), None);
        assert_eq!(core.len(), 1);
        core.check_invariants().unwrap();

        // Removing the last entry resets min_freq tracking.
        assert_eq!(core.remove(&1), Some("a"));
        assert!(core.is_empty());
        core.check_invariants().unwrap();
        core.insert(5, "e");
        assert_eq!(core.frequency(&5), Some(1));
    }

    #[test]
    fn zero_capacity_rejects_inserts() {
        let mut core = LfuCore::new(0);
        assert_eq!(core.insert(1, "a"), None);
        assert!(core.is_empty());
        assert_eq!(core.get(&1), None);
    }

    #[test]
    fn age_decay_caps_runaway_frequencies() {
        let mut core = LfuCore::with_max_average(3, 2);
        core.insert(1, "a");
        core.insert(2, "b");
        core.insert(3, "c");
        for _ in 0..5 {
            core.get(&1);
        }
        for _ in 0..5 {
            core.get(&2);
        }
        for _ in 0..5 {
            core.get(&3);
        }

        // Decay has fired along the way; nothing was evicted and no
        // frequency is left above the ceiling.
        assert_eq!(core.len(), 3);
        for key in 1..=3 {
            assert!(core.contains(&key));
            assert!(core.frequency(&key).unwrap() <= 2);
        }
        core.check_invariants().unwrap();
    }

    #[test]
    fn eviction_unbiases_the_average() {
        let mut core = LfuCore::with_max_average(2, 10);
        core.insert(1, "a");
        for _ in 0..6 {
            core.get(&1);
        }
        core.insert(2, "b");
        // Evicting 2 (freq 1) then 1 (freq 7) drains cur_total with them.
        assert_eq!(core.pop_lfu(), Some((2, "b")));
        assert_eq!(core.pop_lfu(), Some((1, "a")));
        assert_eq!(core.pop_lfu(), None);
        core.check_invariants().unwrap();
    }

    #[test]
    fn cache_wrapper_round_trip() {
        let cache: LfuCache<u32, String> = LfuCache::with_max_average(2, 10);
        cache.put(1, "one".to_string());
        cache.put(2, "two".to_string());
        cache.get(&1);

        cache.put(3, "three".to_string());
        assert!(cache.get(&2).is_none());
        assert_eq!(cache.get(&1).as_deref(), Some(&"one".to_string()));
        assert_eq!(cache.frequency(&1), Some(3));

        cache.purge();
        assert!(cache.is_empty());
        assert!(cache.get(&1).is_none());
    }
}
