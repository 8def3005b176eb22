//! Unified builder over all eviction policies.
//!
//! Callers that choose a policy from configuration get a single concrete
//! type, [`Cache`], dispatching over the policy tagged at construction.
//! Runtime policy switching is deliberately not supported.
//!
//! ```
//! use replacer::builder::{CacheBuilder, EvictionPolicy};
//!
//! let cache = CacheBuilder::new(128).build::<u64, String>(EvictionPolicy::Lru);
//! cache.put(1, "hello".to_string());
//! assert_eq!(cache.get(&1).as_deref(), Some(&"hello".to_string()));
//! ```

use std::fmt;
use std::hash::Hash;
use std::sync::Arc;

use crate::error::ConfigError;
use crate::policy::arc::ArcCache;
use crate::policy::lfu::{LfuCache, DEFAULT_MAX_AVERAGE};
use crate::policy::lru::LruCache;
use crate::policy::lru_k::{LrukCache, DEFAULT_K};
use crate::policy::sharded::{ShardedCache, ShardedLfuCache, ShardedLruCache};
use crate::traits::CachePolicy;

/// Eviction policy selector for [`CacheBuilder`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EvictionPolicy {
    /// Least Recently Used.
    Lru,
    /// Least Frequently Used with an aging ceiling.
    Lfu { max_average: u64 },
    /// LRU with an admission filter: resident only after `k` references.
    LruK { history_capacity: usize, k: u64 },
    /// Adaptive Replacement Cache.
    Arc,
    /// LRU partitioned over `shards` instances (0 ⇒ available parallelism).
    ShardedLru { shards: usize },
    /// LFU partitioned over `shards` instances (0 ⇒ available parallelism).
    ShardedLfu { shards: usize, max_average: u64 },
}

impl EvictionPolicy {
    /// LFU with the default aging ceiling.
    pub fn lfu() -> Self {
        EvictionPolicy::Lfu {
            max_average: DEFAULT_MAX_AVERAGE,
        }
    }

    /// LRU-K with the default threshold and a history as large as `capacity`.
    pub fn lru_k(history_capacity: usize) -> Self {
        EvictionPolicy::LruK {
            history_capacity,
            k: DEFAULT_K,
        }
    }
}

/// Cache with the eviction policy chosen at construction time.
pub struct Cache<K, V>
where
    K: Eq + Hash + Clone,
{
    inner: CacheInner<K, V>,
}

enum CacheInner<K, V>
where
    K: Eq + Hash + Clone,
{
    Lru(LruCache<K, V>),
    Lfu(LfuCache<K, V>),
    LruK(LrukCache<K, V>),
    Arc(ArcCache<K, V>),
    ShardedLru(ShardedLruCache<K, V>),
    ShardedLfu(ShardedLfuCache<K, V>),
}

impl<K, V> Cache<K, V>
where
    K: Eq + Hash + Clone,
{
    /// Inserts or updates; returns the previous value on update.
    pub fn put(&self, key: K, value: V) -> Option<Arc<V>> {
        match &self.inner {
            CacheInner::Lru(cache) => cache.put(key, value),
            CacheInner::Lfu(cache) => cache.put(key, value),
            CacheInner::LruK(cache) => cache.put(key, value),
            CacheInner::Arc(cache) => cache.put(key, value),
            CacheInner::ShardedLru(cache) => CachePolicy::put(cache, key, value),
            CacheInner::ShardedLfu(cache) => CachePolicy::put(cache, key, value),
        }
    }

    /// Looks up `key` through the chosen policy.
    pub fn get(&self, key: &K) -> Option<Arc<V>> {
        match &self.inner {
            CacheInner::Lru(cache) => cache.get(key),
            CacheInner::Lfu(cache) => cache.get(key),
            CacheInner::LruK(cache) => cache.get(key),
            CacheInner::Arc(cache) => cache.get(key),
            CacheInner::ShardedLru(cache) => CachePolicy::get(cache, key),
            CacheInner::ShardedLfu(cache) => CachePolicy::get(cache, key),
        }
    }

    /// Removes `key` if resident.
    pub fn remove(&self, key: &K) -> Option<Arc<V>> {
        match &self.inner {
            CacheInner::Lru(cache) => cache.remove(key),
            CacheInner::Lfu(cache) => cache.remove(key),
            CacheInner::LruK(cache) => cache.remove(key),
            CacheInner::Arc(cache) => cache.remove(key),
            CacheInner::ShardedLru(cache) => CachePolicy::remove(cache, key),
            CacheInner::ShardedLfu(cache) => CachePolicy::remove(cache, key),
        }
    }

    /// Drops every resident entry; capacity is preserved.
    pub fn purge(&self) {
        match &self.inner {
            CacheInner::Lru(cache) => cache.purge(),
            CacheInner::Lfu(cache) => cache.purge(),
            CacheInner::LruK(cache) => cache.purge(),
            CacheInner::Arc(cache) => cache.purge(),
            CacheInner::ShardedLru(cache) => CachePolicy::purge(cache),
            CacheInner::ShardedLfu(cache) => CachePolicy::purge(cache),
        }
    }

    /// Returns `true` if `key` is resident.
    pub fn contains(&self, key: &K) -> bool {
        match &self.inner {
            CacheInner::Lru(cache) => cache.contains(key),
            CacheInner::Lfu(cache) => cache.contains(key),
            CacheInner::LruK(cache) => cache.contains(key),
            CacheInner::Arc(cache) => cache.contains(key),
            CacheInner::ShardedLru(cache) => CachePolicy::contains(cache, key),
            CacheInner::ShardedLfu(cache) => CachePolicy::contains(cache, key),
        }
    }

    /// Returns the number of resident entries.
    pub fn len(&self) -> usize {
        match &self.inner {
            CacheInner::Lru(cache) => cache.len(),
            CacheInner::Lfu(cache) => cache.len(),
            CacheInner::LruK(cache) => cache.len(),
            CacheInner::Arc(cache) => cache.len(),
            CacheInner::ShardedLru(cache) => CachePolicy::len(cache),
            CacheInner::ShardedLfu(cache) => CachePolicy::len(cache),
        }
    }

    /// Returns `true` if no entries are resident.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the configured capacity (summed over shards when sharded).
    pub fn capacity(&self) -> usize {
        match &self.inner {
            CacheInner::Lru(cache) => cache.capacity(),
            CacheInner::Lfu(cache) => cache.capacity(),
            CacheInner::LruK(cache) => cache.capacity(),
            CacheInner::Arc(cache) => cache.capacity(),
            CacheInner::ShardedLru(cache) => CachePolicy::capacity(cache),
            CacheInner::ShardedLfu(cache) => CachePolicy::capacity(cache),
        }
    }
}

impl<K, V> CachePolicy<K, V> for Cache<K, V>
where
    K: Eq + Hash + Clone,
{
    fn put(&self, key: K, value: V) -> Option<Arc<V>> {
        Cache::put(self, key, value)
    }

    fn get(&self, key: &K) -> Option<Arc<V>> {
        Cache::get(self, key)
    }

    fn remove(&self, key: &K) -> Option<Arc<V>> {
        Cache::remove(self, key)
    }

    fn purge(&self) {
        Cache::purge(self)
    }

    fn contains(&self, key: &K) -> bool {
        Cache::contains(self, key)
    }

    fn len(&self) -> usize {
        Cache::len(self)
    }

    fn capacity(&self) -> usize {
        Cache::capacity(self)
    }
}

impl<K, V> fmt::Debug for Cache<K, V>
where
    K: Eq + Hash + Clone,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let policy = match &self.inner {
            CacheInner::Lru(_) => "lru",
            CacheInner::Lfu(_) => "lfu",
            CacheInner::LruK(_) => "lru-k",
            CacheInner::Arc(_) => "arc",
            CacheInner::ShardedLru(_) => "sharded-lru",
            CacheInner::ShardedLfu(_) => "sharded-lfu",
        };
        f.debug_struct("Cache")
            .field("policy", &policy)
            .field("len", &self.len())
            .field("capacity", &self.capacity())
            .finish()
    }
}

/// Builder for [`Cache`] instances.
#[derive(Debug, Clone)]
pub struct CacheBuilder {
    capacity: usize,
}

impl CacheBuilder {
    /// Starts a builder for a cache of the given total capacity.
    pub fn new(capacity: usize) -> Self {
        Self { capacity }
    }

    /// Builds a cache, clamping degenerate policy parameters
    /// (`k`, `max_average`) to their minimum of 1.
    pub fn build<K, V>(self, policy: EvictionPolicy) -> Cache<K, V>
    where
        K: Eq + Hash + Clone,
    {
        let inner = match policy {
            EvictionPolicy::Lru => CacheInner::Lru(LruCache::new(self.capacity)),
            EvictionPolicy::Lfu { max_average } => {
                CacheInner::Lfu(LfuCache::with_max_average(self.capacity, max_average))
            }
            EvictionPolicy::LruK {
                history_capacity,
                k,
            } => CacheInner::LruK(LrukCache::new(self.capacity, history_capacity, k)),
            EvictionPolicy::Arc => CacheInner::Arc(ArcCache::new(self.capacity)),
            EvictionPolicy::ShardedLru { shards } => {
                CacheInner::ShardedLru(ShardedCache::lru(self.capacity, shards))
            }
            EvictionPolicy::ShardedLfu {
                shards,
                max_average,
            } => CacheInner::ShardedLfu(ShardedCache::lfu_with_max_average(
                self.capacity,
                shards,
                max_average,
            )),
        };
        Cache { inner }
    }

    /// Builds a cache, rejecting degenerate policy parameters instead of
    /// clamping them.
    pub fn try_build<K, V>(self, policy: EvictionPolicy) -> Result<Cache<K, V>, ConfigError>
    where
        K: Eq + Hash + Clone,
    {
        match &policy {
            EvictionPolicy::LruK { k: 0, .. } => {
                return Err(ConfigError::new("admission threshold k must be > 0"));
            }
            EvictionPolicy::Lfu { max_average: 0 }
            | EvictionPolicy::ShardedLfu { max_average: 0, .. } => {
                return Err(ConfigError::new("max_average must be > 0"));
            }
            _ => {}
        }
        Ok(self.build(policy))
    }
}
