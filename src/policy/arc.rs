//! Adaptive Replacement Cache (ARC) eviction policy.
//!
//! ARC splits the resident entries across two pointer-linked lists:
//!
//! - **T1** holds entries referenced exactly once (recency half);
//! - **T2** holds entries referenced more than once (frequency half).
//!
//! Behind them sit two ghost lists holding keys without values: **B1** for
//! keys recently evicted from T1 and **B2** for keys recently evicted from
//! T2. A request that misses the cache but lands in a ghost list reveals
//! which half was sized wrong, and the target size `p` of T1 shifts toward
//! the half that would have hit:
//!
//! - B1 hit: the recency half was too small, `p` grows by
//!   `max(1, |B2| / |B1|)`, saturating at the capacity;
//! - B2 hit: the frequency half was too small, `p` shrinks by
//!   `max(1, |B1| / |B2|)`, saturating at zero.
//!
//! Eviction (`replace`) takes the LRU entry of T1 while `|T1| > p` (or
//! `|T1| == p` when resolving a B2 hit) and of T2 otherwise, recording the
//! victim's key in the matching ghost list. Ghost lists are themselves
//! bounded by the capacity, shedding their oldest keys.
//!
//! A key is in at most one of {T1, T2, B1, B2} at any moment.

use std::fmt;
use std::hash::Hash;
use std::ptr::NonNull;
use std::sync::Arc;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use crate::ds::GhostList;
#[cfg(any(test, debug_assertions))]
use crate::error::InvariantError;
use crate::traits::CachePolicy;

/// Which resident list a node is chained into.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
enum ListKind {
    T1,
    T2,
}

/// Node in a resident list. Pointers first for locality.
#[repr(C)]
struct Node<K, V> {
    prev: Option<NonNull<Node<K, V>>>,
    next: Option<NonNull<Node<K, V>>>,
    list: ListKind,
    key: K,
    value: V,
}

/// Single-threaded ARC core.
pub struct ArcCore<K, V>
where
    K: Eq + Hash + Clone,
{
    map: FxHashMap<K, NonNull<Node<K, V>>>,

    /// T1 (referenced once): head = MRU, tail = LRU.
    t1_head: Option<NonNull<Node<K, V>>>,
    t1_tail: Option<NonNull<Node<K, V>>>,
    t1_len: usize,

    /// T2 (referenced repeatedly): head = MRU, tail = LRU.
    t2_head: Option<NonNull<Node<K, V>>>,
    t2_tail: Option<NonNull<Node<K, V>>>,
    t2_len: usize,

    /// Keys recently evicted from T1.
    b1: GhostList<K>,
    /// Keys recently evicted from T2.
    b2: GhostList<K>,

    /// Target size for T1, adapted in `[0, capacity]`.
    p: usize,
    capacity: usize,
}

// SAFETY: the raw pointers only reference heap nodes owned by this struct.
unsafe impl<K, V> Send for ArcCore<K, V>
where
    K: Eq + Hash + Clone + Send,
    V: Send,
{
}

// SAFETY: mutation requires `&mut self`; shared access is read-only.
unsafe impl<K, V> Sync for ArcCore<K, V>
where
    K: Eq + Hash + Clone + Sync,
    V: Sync,
{
}

impl<K, V> ArcCore<K, V>
where
    K: Eq + Hash + Clone,
{
    /// Creates a core with the given total capacity.
    ///
    /// Each ghost list can hold up to `capacity` keys. The adaptation
    /// target starts at 0 (pure frequency preference) and moves with the
    /// workload.
    pub fn new(capacity: usize) -> Self {
        Self {
            map: FxHashMap::with_capacity_and_hasher(capacity, Default::default()),
            t1_head: None,
            t1_tail: None,
            t1_len: 0,
            t2_head: None,
            t2_tail: None,
            t2_len: 0,
            b1: GhostList::new(capacity),
            b2: GhostList::new(capacity),
            p: 0,
            capacity,
        }
    }

    /// Inserts or overwrites; returns the previous value on overwrite.
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        if self.capacity == 0 {
            return None;
        }

        // Resident: overwrite and promote to the frequency half.
        if let Some(&node_ptr) = self.map.get(&key) {
            let previous = unsafe {
                let node = &mut *node_ptr.as_ptr();
                std::mem::replace(&mut node.value, value)
            };
            self.detach(node_ptr);
            self.attach_t2_head(node_ptr);
            return Some(previous);
        }

        // Ghost hit in B1: the recency half deserved more room.
        if self.b1.contains(&key) {
            self.adapt_on_b1_hit();
            self.b1.remove(&key);
            if self.t1_len + self.t2_len >= self.capacity {
                self.replace(false);
            }
            self.link_new(key, value, ListKind::T2);
            return None;
        }

        // Ghost hit in B2: the frequency half deserved more room.
        if self.b2.contains(&key) {
            self.adapt_on_b2_hit();
            self.b2.remove(&key);
            if self.t1_len + self.t2_len >= self.capacity {
                self.replace(true);
            }
            self.link_new(key, value, ListKind::T2);
            return None;
        }

        // Cold miss: trim whichever history has outgrown its budget.
        let l1 = self.t1_len + self.b1.len();
        if l1 >= self.capacity && self.t1_len < self.capacity {
            self.b1.pop_oldest();
        } else if self.t1_len + self.t2_len + self.b1.len() + self.b2.len() >= 2 * self.capacity {
            self.b2.pop_oldest();
        }
        if self.t1_len + self.t2_len >= self.capacity {
            self.replace(false);
        }
        self.link_new(key, value, ListKind::T1);
        None
    }

    /// Looks up a value; a resident hit promotes the entry to T2 MRU.
    ///
    /// A miss still consults the ghost lists and adapts `p`, but never
    /// inserts and leaves ghost membership intact: the eviction feedback
    /// is consumed by the `insert` that typically follows.
    pub fn get(&mut self, key: &K) -> Option<&V> {
        if let Some(&node_ptr) = self.map.get(key) {
            self.detach(node_ptr);
            self.attach_t2_head(node_ptr);
            return unsafe { Some(&(*node_ptr.as_ptr()).value) };
        }

        if self.b1.contains(key) {
            self.adapt_on_b1_hit();
        } else if self.b2.contains(key) {
            self.adapt_on_b2_hit();
        }
        None
    }

    /// Reads a resident value without promoting it.
    pub fn peek(&self, key: &K) -> Option<&V> {
        self.map
            .get(key)
            .map(|node_ptr| unsafe { &(*node_ptr.as_ptr()).value })
    }

    /// Removes a resident key. Ghost lists are left untouched.
    pub fn remove(&mut self, key: &K) -> Option<V> {
        let node_ptr = self.map.remove(key)?;
        self.detach(node_ptr);
        let node = unsafe { Box::from_raw(node_ptr.as_ptr()) };
        Some(node.value)
    }

    /// Returns `true` if `key` is resident (ghosts do not count).
    pub fn contains(&self, key: &K) -> bool {
        self.map.contains_key(key)
    }

    /// Returns the number of resident entries.
    pub fn len(&self) -> usize {
        self.t1_len + self.t2_len
    }

    /// Returns `true` if no entries are resident.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the configured capacity.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns the current T1 target size.
    pub fn p_value(&self) -> usize {
        self.p
    }

    /// Returns the number of entries in T1.
    pub fn t1_len(&self) -> usize {
        self.t1_len
    }

    /// Returns the number of entries in T2.
    pub fn t2_len(&self) -> usize {
        self.t2_len
    }

    /// Returns the number of keys ghosted from T1.
    pub fn b1_len(&self) -> usize {
        self.b1.len()
    }

    /// Returns the number of keys ghosted from T2.
    pub fn b2_len(&self) -> usize {
        self.b2.len()
    }

    /// Drops all resident entries and ghosts and resets the target.
    pub fn clear(&mut self) {
        let mut current = self.t1_head;
        while let Some(node_ptr) = current {
            unsafe {
                current = node_ptr.as_ref().next;
                drop(Box::from_raw(node_ptr.as_ptr()));
            }
        }
        let mut current = self.t2_head;
        while let Some(node_ptr) = current {
            unsafe {
                current = node_ptr.as_ref().next;
                drop(Box::from_raw(node_ptr.as_ptr()));
            }
        }

        self.map.clear();
        self.t1_head = None;
        self.t1_tail = None;
        self.t1_len = 0;
        self.t2_head = None;
        self.t2_tail = None;
        self.t2_len = 0;
        self.b1.clear();
        self.b2.clear();
        self.p = 0;
    }

    /// Evicts one resident entry, ghosting its key.
    ///
    /// Takes T1's LRU while T1 exceeds its target (or meets it while
    /// resolving a B2 hit), T2's LRU otherwise. Falls back to whichever
    /// list is non-empty when the preferred one is drained.
    fn replace(&mut self, in_b2: bool) {
        let prefer_t1 = if self.t1_len > 0
            && (self.t1_len > self.p || (in_b2 && self.t1_len == self.p))
        {
            true
        } else if self.t2_len > 0 {
            false
        } else if self.t1_len > 0 {
            true
        } else {
            log::error!("arc replace requested with both resident lists empty");
            return;
        };

        let victim_ptr = if prefer_t1 { self.t1_tail } else { self.t2_tail };
        if let Some(victim_ptr) = victim_ptr {
            self.detach(victim_ptr);
            let node = unsafe { Box::from_raw(victim_ptr.as_ptr()) };
            self.map.remove(&node.key);
            if prefer_t1 {
                self.b1.record(node.key);
            } else {
                self.b2.record(node.key);
            }
        }
    }

    fn adapt_on_b1_hit(&mut self) {
        let delta = if self.b1.is_empty() {
            1
        } else {
            (self.b2.len() / self.b1.len()).max(1)
        };
        self.p = (self.p + delta).min(self.capacity);
    }

    fn adapt_on_b2_hit(&mut self) {
        let delta = if self.b2.is_empty() {
            1
        } else {
            (self.b1.len() / self.b2.len()).max(1)
        };
        self.p = self.p.saturating_sub(delta);
    }

    /// Allocates a node for a new key and links it at the MRU of `list`.
    fn link_new(&mut self, key: K, value: V, list: ListKind) {
        let node = Box::new(Node {
            prev: None,
            next: None,
            list,
            key: key.clone(),
            value,
        });
        let node_ptr = NonNull::from(Box::leak(node));
        self.map.insert(key, node_ptr);
        match list {
            ListKind::T1 => self.attach_t1_head(node_ptr),
            ListKind::T2 => self.attach_t2_head(node_ptr),
        }
    }

    /// Splices a node out of whichever list it is chained into.
    #[inline(always)]
    fn detach(&mut self, node_ptr: NonNull<Node<K, V>>) {
        unsafe {
            let node = node_ptr.as_ref();
            let prev = node.prev;
            let next = node.next;

            let (head, tail, len) = match node.list {
                ListKind::T1 => (&mut self.t1_head, &mut self.t1_tail, &mut self.t1_len),
                ListKind::T2 => (&mut self.t2_head, &mut self.t2_tail, &mut self.t2_len),
            };

            match prev {
                Some(mut p) => p.as_mut().next = next,
                None => *head = next,
            }
            match next {
                Some(mut n) => n.as_mut().prev = prev,
                None => *tail = prev,
            }
            *len -= 1;
        }
    }

    #[inline(always)]
    fn attach_t1_head(&mut self, mut node_ptr: NonNull<Node<K, V>>) {
        unsafe {
            let node = node_ptr.as_mut();
            node.prev = None;
            node.next = self.t1_head;
            node.list = ListKind::T1;

            match self.t1_head {
                Some(mut h) => h.as_mut().prev = Some(node_ptr),
                None => self.t1_tail = Some(node_ptr),
            }
            self.t1_head = Some(node_ptr);
            self.t1_len += 1;
        }
    }

    #[inline(always)]
    fn attach_t2_head(&mut self, mut node_ptr: NonNull<Node<K, V>>) {
        unsafe {
            let node = node_ptr.as_mut();
            node.prev = None;
            node.next = self.t2_head;
            node.list = ListKind::T2;

            match self.t2_head {
                Some(mut h) => h.as_mut().prev = Some(node_ptr),
                None => self.t2_tail = Some(node_ptr),
            }
            self.t2_head = Some(node_ptr);
            self.t2_len += 1;
        }
    }

    #[cfg(any(test, debug_assertions))]
    pub fn check_invariants(&self) -> Result<(), InvariantError> {
        if self.len() > self.capacity {
            return Err(InvariantError::new("resident count exceeds capacity"));
        }
        if self.map.len() != self.t1_len + self.t2_len {
            return Err(InvariantError::new("index disagrees with list lengths"));
        }
        if self.p > self.capacity {
            return Err(InvariantError::new("p outside [0, capacity]"));
        }
        if self.b1.len() > self.capacity || self.b2.len() > self.capacity {
            return Err(InvariantError::new("ghost list over capacity"));
        }

        for (kind, head, expected) in [
            (ListKind::T1, self.t1_head, self.t1_len),
            (ListKind::T2, self.t2_head, self.t2_len),
        ] {
            let mut count = 0usize;
            let mut current = head;
            while let Some(node_ptr) = current {
                let node = unsafe { node_ptr.as_ref() };
                if node.list != kind {
                    return Err(InvariantError::new("node chained under wrong list tag"));
                }
                if !self.map.contains_key(&node.key) {
                    return Err(InvariantError::new("chained node missing from index"));
                }
                count += 1;
                if count > expected {
                    return Err(InvariantError::new("cycle in resident list"));
                }
                current = node.next;
            }
            if count != expected {
                return Err(InvariantError::new("resident list length mismatch"));
            }
        }

        for key in self.map.keys() {
            if self.b1.contains(key) || self.b2.contains(key) {
                return Err(InvariantError::new("key resident and ghosted at once"));
            }
        }
        for key in self.b1.iter() {
            if self.b2.contains(key) {
                return Err(InvariantError::new("key ghosted in both B1 and B2"));
            }
        }

        Ok(())
    }
}

impl<K, V> Drop for ArcCore<K, V>
where
    K: Eq + Hash + Clone,
{
    fn drop(&mut self) {
        self.clear();
    }
}

impl<K, V> fmt::Debug for ArcCore<K, V>
where
    K: Eq + Hash + Clone,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArcCore")
            .field("capacity", &self.capacity)
            .field("t1_len", &self.t1_len)
            .field("t2_len", &self.t2_len)
            .field("b1_len", &self.b1.len())
            .field("b2_len", &self.b2.len())
            .field("p", &self.p)
            .finish()
    }
}

/// Thread-safe ARC cache.
pub struct ArcCache<K, V>
where
    K: Eq + Hash + Clone,
{
    inner: Mutex<ArcCore<K, Arc<V>>>,
}

impl<K, V> ArcCache<K, V>
where
    K: Eq + Hash + Clone,
{
    /// Creates a cache with the given total capacity.
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(ArcCore::new(capacity)),
        }
    }

    /// Inserts or overwrites; returns the previous value on overwrite.
    pub fn put(&self, key: K, value: V) -> Option<Arc<V>> {
        self.inner.lock().insert(key, Arc::new(value))
    }

    /// Looks up `key`; a resident hit promotes it to the frequency half.
    pub fn get(&self, key: &K) -> Option<Arc<V>> {
        self.inner.lock().get(key).cloned()
    }

    /// Removes a resident key.
    pub fn remove(&self, key: &K) -> Option<Arc<V>> {
        self.inner.lock().remove(key)
    }

    /// Drops all resident entries and ghosts; capacity is preserved.
    pub fn purge(&self) {
        self.inner.lock().clear();
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

    /// Returns the current T1 target size.
    pub fn p_value(&self) -> usize {
        self.inner.lock().p_value()
    }

    /// Returns `(|T1|, |T2|, |B1|, |B2|)` for inspection.
    pub fn partition_sizes(&self) -> (usize, usize, usize, usize) {
        let core = self.inner.lock();
        (core.t1_len(), core.t2_len(), core.b1_len(), core.b2_len())
    }
}

impl<K, V> CachePolicy<K, V> for ArcCache<K, V>
where
    K: Eq + Hash + Clone,
{
    fn put(&self, key: K, value: V) -> Option<Arc<V>> {
        ArcCache::put(self, key, value)
    }

    fn get(&self, key: &K) -> Option<Arc<V>> {
        ArcCache::get(self, key)
    }

    fn remove(&self, key: &K) -> Option<Arc<V>> {
        ArcCache::remove(self, key)
    }

    fn purge(&self) {
        ArcCache::purge(self)
    }

    fn contains(&self, key: &K) -> bool {
        ArcCache::contains(self, key)
    }

    fn len(&self) -> usize {
        ArcCache::len(self)
    }

    fn capacity(&self) -> usize {
        ArcCache::capacity(self)
    }
}

impl<K, V> fmt::Debug for ArcCache<K, V>
where
    K: Eq + Hash + Clone,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let core = self.inner.lock();
        f.debug_struct("ArcCache")
            .field("len", &core.len())
            .field("capacity", &core.capacity())
            .field("p", &core.p_value())
            .finish_non_exhaustive()
    }
}
