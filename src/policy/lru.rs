//! Least Recently Used (LRU) eviction policy.
//!
//! One doubly-linked recency list plus a hash index. The list is built from
//! heap nodes chained through `NonNull` pointers: the head is the most
//! recently used entry, the tail is the eviction victim. Every hit and
//! every overwrite splices the node to the head; a full insert pops the
//! tail and drops its index entry first.
//!
//! Two layers:
//!
//! - [`LruCore`]: single-threaded state machine (`&mut self` operations).
//!   Also reused internally by the LRU-K policy for its history list.
//! - [`LruCache`]: thread-safe wrapper holding one `parking_lot::Mutex`
//!   around a core with `Arc<V>` values, so `get` hands out an owned
//!   handle without cloning the payload.

use std::fmt;
use std::hash::Hash;
use std::ptr::NonNull;
use std::sync::Arc;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use crate::traits::CachePolicy;

/// Node in the recency list. Pointers first for locality.
#[repr(C)]
struct Node<K, V> {
    prev: Option<NonNull<Node<K, V>>>,
    next: Option<NonNull<Node<K, V>>>,
    key: K,
    value: V,
}

/// Single-threaded LRU core: hash index + pointer-linked recency list.
pub struct LruCore<K, V>
where
    K: Eq + Hash + Clone,
{
    map: FxHashMap<K, NonNull<Node<K, V>>>,
    /// Most recently used entry.
    head: Option<NonNull<Node<K, V>>>,
    /// Least recently used entry, next eviction victim.
    tail: Option<NonNull<Node<K, V>>>,
    capacity: usize,
}

// SAFETY: the raw pointers only reference heap nodes owned by this struct,
// so the core moves between threads whenever K and V do.
unsafe impl<K, V> Send for LruCore<K, V>
where
    K: Eq + Hash + Clone + Send,
    V: Send,
{
}

// SAFETY: shared access never mutates through the pointers; mutation
// requires `&mut self`, which the outer lock serializes.
unsafe impl<K, V> Sync for LruCore<K, V>
where
    K: Eq + Hash + Clone + Sync,
    V: Sync,
{
}

impl<K, V> LruCore<K, V>
where
    K: Eq + Hash + Clone,
{
    /// Creates a core with the given capacity. Capacity 0 accepts nothing.
    pub fn new(capacity: usize) -> Self {
        Self {
            map: FxHashMap::with_capacity_and_hasher(capacity, Default::default()),
            head: None,
            tail: None,
            capacity,
        }
    }

    /// Inserts or overwrites; returns the previous value on overwrite.
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        if let Some(&node_ptr) = self.map.get(&key) {
            let previous = unsafe {
                let node = &mut *node_ptr.as_ptr();
                std::mem::replace(&mut node.value, value)
            };
            self.detach(node_ptr);
            self.attach_front(node_ptr);
            return Some(previous);
        }

        if self.capacity == 0 {
            return None;
        }

        if self.map.len() >= self.capacity {
            if let Some(evicted) = self.pop_tail() {
                self.map.remove(&evicted.key);
            }
        }

        let node = Box::new(Node {
            prev: None,
            next: None,
            key: key.clone(),
            value,
        });
        let node_ptr = NonNull::from(Box::leak(node));
        self.map.insert(key, node_ptr);
        self.attach_front(node_ptr);

        #[cfg(debug_assertions)]
        self.debug_validate_invariants();

        None
    }

    /// Looks up a value and refreshes its recency on a hit.
    pub fn get(&mut self, key: &K) -> Option<&V> {
        let node_ptr = *self.map.get(key)?;
        self.detach(node_ptr);
        self.attach_front(node_ptr);
        unsafe { Some(&(*node_ptr.as_ptr()).value) }
    }

    /// Reads a value without touching the recency order.
    pub fn peek(&self, key: &K) -> Option<&V> {
        self.map
            .get(key)
            .map(|node_ptr| unsafe { &(*node_ptr.as_ptr()).value })
    }

    /// Removes `key` and returns its value, if present.
    pub fn remove(&mut self, key: &K) -> Option<V> {
        let node_ptr = self.map.remove(key)?;
        self.detach(node_ptr);
        let node = unsafe { Box::from_raw(node_ptr.as_ptr()) };
        Some(node.value)
    }

    /// Removes and returns the least recently used entry.
    pub fn pop_lru(&mut self) -> Option<(K, V)> {
        let node = self.pop_tail()?;
        self.map.remove(&node.key);
        Some((node.key, node.value))
    }

    /// Returns `true` if `key` is resident.
    pub fn contains(&self, key: &K) -> bool {
        self.map.contains_key(key)
    }

    /// Returns the number of resident entries.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Returns `true` if no entries are resident.
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Returns the configured capacity.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Drops every entry; capacity is preserved.
    pub fn clear(&mut self) {
        while self.pop_tail().is_some() {}
        self.map.clear();
    }

    /// Splices a node out of the list without touching the index.
    #[inline(always)]
    fn detach(&mut self, node_ptr: NonNull<Node<K, V>>) {
        unsafe {
            let node = node_ptr.as_ref();
            let prev = node.prev;
            let next = node.next;

            match prev {
                Some(mut p) => p.as_mut().next = next,
                None => self.head = next,
            }
            match next {
                Some(mut n) => n.as_mut().prev = prev,
                None => self.tail = prev,
            }
        }
    }

    /// Links a node at the head (most recent position).
    #[inline(always)]
    fn attach_front(&mut self, mut node_ptr: NonNull<Node<K, V>>) {
        unsafe {
            let node = node_ptr.as_mut();
            node.prev = None;
            node.next = self.head;

            match self.head {
                Some(mut h) => h.as_mut().prev = Some(node_ptr),
                None => self.tail = Some(node_ptr),
            }
            self.head = Some(node_ptr);
        }
    }

    /// Unlinks the tail node and takes ownership of it.
    #[inline(always)]
    fn pop_tail(&mut self) -> Option<Box<Node<K, V>>> {
        self.tail.map(|tail_ptr| unsafe {
            let node = Box::from_raw(tail_ptr.as_ptr());
            self.tail = node.prev;
            match self.tail {
                Some(mut t) => t.as_mut().next = None,
                None => self.head = None,
            }
            node
        })
    }

    #[cfg(any(test, debug_assertions))]
    fn debug_validate_invariants(&self) {
        if self.map.is_empty() {
            assert!(self.head.is_none());
            assert!(self.tail.is_none());
            return;
        }
        let mut count = 0usize;
        let mut current = self.head;
        while let Some(ptr) = current {
            count += 1;
            assert!(count <= self.map.len(), "cycle in recency list");
            unsafe {
                let node = ptr.as_ref();
                assert!(self.map.contains_key(&node.key));
                current = node.next;
            }
        }
        assert_eq!(count, self.map.len());
    }
}

impl<K, V> Drop for LruCore<K, V>
where
    K: Eq + Hash + Clone,
{
    fn drop(&mut self) {
        while self.pop_tail().is_some() {}
    }
}

impl<K, V> fmt::Debug for LruCore<K, V>
where
    K: Eq + Hash + Clone,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LruCore")
            .field("len", &self.len())
            .field("capacity", &self.capacity)
            .finish_non_exhaustive()
    }
}

/// Thread-safe LRU cache.
///
/// One mutex guards the whole core; every operation holds it from start to
/// finish, so operations on a single cache are totally ordered.
///
/// # Example
///
/// ```
/// use replacer::policy::lru::LruCache;
///
/// let cache: LruCache<u32, &str> = LruCache::new(2);
/// cache.put(1, "one");
/// cache.put(2, "two");
/// cache.put(3, "three"); // evicts key 1
///
/// assert!(cache.get(&1).is_none());
/// assert_eq!(*cache.get(&2).unwrap(), "two");
/// assert_eq!(*cache.get(&3).unwrap(), "three");
/// ```
pub struct LruCache<K, V>
where
    K: Eq + Hash + Clone,
{
    inner: Mutex<LruCore<K, Arc<V>>>,
}

impl<K, V> LruCache<K, V>
where
    K: Eq + Hash + Clone,
{
    /// Creates a cache with the given capacity.
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(LruCore::new(capacity)),
        }
    }

    /// Inserts or overwrites; returns the previous value on overwrite.
    pub fn put(&self, key: K, value: V) -> Option<Arc<V>> {
        self.put_arc(key, Arc::new(value))
    }

    /// Inserts an already-shared value without re-wrapping it.
    pub fn put_arc(&self, key: K, value: Arc<V>) -> Option<Arc<V>> {
        self.inner.lock().insert(key, value)
    }

    /// Looks up `key`, refreshing its recency on a hit.
    pub fn get(&self, key: &K) -> Option<Arc<V>> {
        self.inner.lock().get(key).cloned()
    }

    /// Reads `key` without touching the recency order.
    pub fn peek(&self, key: &K) -> Option<Arc<V>> {
        self.inner.lock().peek(key).cloned()
    }

    /// Removes `key`, returning its value if it was resident.
    pub fn remove(&self, key: &K) -> Option<Arc<V>> {
        self.inner.lock().remove(key)
    }

    /// Drops every entry; capacity is preserved.
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
}

impl<K, V> CachePolicy<K, V> for LruCache<K, V>
where
    K: Eq + Hash + Clone,
{
    fn put(&self, key: K, value: V) -> Option<Arc<V>> {
        LruCache::put(self, key, value)
    }

    fn get(&self, key: &K) -> Option<Arc<V>> {
        LruCache::get(self, key)
    }

    fn remove(&self, key: &K) -> Option<Arc<V>> {
        LruCache::remove(self, key)
    }

    fn purge(&self) {
        LruCache::purge(self)
    }

    fn contains(&self, key: &K) -> bool {
        LruCache::contains(self, key)
    }

    fn len(&self) -> usize {
        LruCache::len(self)
    }

    fn capacity(&self) -> usize {
        LruCache::capacity(self)
    }
}

impl<K, V> fmt::Debug for LruCache<K, V>
where
    K: Eq + Hash + Clone,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let core = self.inner.lock();
        f.debug_struct("LruCache")
            .field("len", &core.len())
            .field("capacity", &core.capacity())
            .finish_non_exhaustive()
    }
}
