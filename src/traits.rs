//! The capability surface shared by every eviction policy.
//!
//! All policies answer to the same contract: bounded capacity, expected
//! O(1) `put`/`get`/`remove`, and thread-safety through one internal mutex
//! per instance. Code that does not care which replacement strategy backs
//! the cache programs against [`CachePolicy`] and picks a policy at
//! construction time, either directly or through
//! [`CacheBuilder`](crate::builder::CacheBuilder).
//!
//! Values are handed out as `Arc<V>`: a hit clones the handle, never the
//! payload, and the entry may be evicted by a concurrent writer while the
//! caller still holds the value.

use std::sync::Arc;

/// Uniform cache surface over `{LRU, LFU, LRU-K, ARC, sharded}`.
///
/// A miss is not an error: `get` and `remove` return `None`, and a cache
/// built with capacity 0 simply misses everything while `put` becomes a
/// no-op.
///
/// # Example
///
/// ```
/// use replacer::policy::lru::LruCache;
/// use replacer::traits::CachePolicy;
///
/// fn warm<C: CachePolicy<u64, String>>(cache: &C, pages: &[(u64, &str)]) {
///     for (id, body) in pages {
///         cache.put(*id, body.to_string());
///     }
/// }
///
/// let cache: LruCache<u64, String> = LruCache::new(16);
/// warm(&cache, &[(1, "alpha"), (2, "beta")]);
/// assert!(cache.contains(&1));
/// assert_eq!(cache.get(&2).as_deref(), Some(&"beta".to_string()));
/// ```
pub trait CachePolicy<K, V> {
    /// Inserts or updates `key`, returning the previous value on update.
    ///
    /// May evict another entry according to the policy. With capacity 0
    /// this is a no-op.
    fn put(&self, key: K, value: V) -> Option<Arc<V>>;

    /// Looks up `key`, updating whatever access bookkeeping the policy
    /// keeps (recency, frequency, visit history).
    fn get(&self, key: &K) -> Option<Arc<V>>;

    /// Removes `key` if resident; a miss is a no-op returning `None`.
    fn remove(&self, key: &K) -> Option<Arc<V>>;

    /// Drops every resident entry and resets internal counters.
    /// The capacity is preserved.
    fn purge(&self);

    /// Returns `true` if `key` is resident, without touching access state.
    fn contains(&self, key: &K) -> bool;

    /// Returns the number of resident entries.
    fn len(&self) -> usize;

    /// Returns `true` if no entries are resident.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the configured capacity.
    fn capacity(&self) -> usize;
}
