//! Sharded wrapper: hash-partitioned fan-out over independent policies.
//!
//! Contention on a cache is per-mutex, so the cheapest way to scale writes
//! is to run N independent policy instances and route every key to one of
//! them by hash. Each shard gets capacity `⌈C / N⌉` and its own lock; the
//! wrapper itself holds no lock and never reaches into a shard's
//! internals. There is no cross-shard coordination of any kind — eviction
//! pressure in one shard cannot displace keys in another.

use std::hash::Hash;
use std::sync::Arc;

use crate::ds::ShardSelector;
use crate::policy::lfu::LfuCache;
use crate::policy::lru::LruCache;
use crate::traits::CachePolicy;

/// Sharded LRU cache.
pub type ShardedLruCache<K, V> = ShardedCache<LruCache<K, V>>;

/// Sharded LFU cache.
pub type ShardedLfuCache<K, V> = ShardedCache<LfuCache<K, V>>;

/// Hash-partitioned collection of independent policy instances.
#[derive(Debug)]
pub struct ShardedCache<P> {
    shards: Vec<P>,
    selector: ShardSelector,
}

impl<P> ShardedCache<P> {
    /// Builds `shards` instances via `make`, each receiving the per-shard
    /// capacity `⌈capacity / shards⌉`.
    ///
    /// A shard count of 0 resolves to the machine's available parallelism.
    pub fn with_shards<F>(capacity: usize, shards: usize, mut make: F) -> Self
    where
        F: FnMut(usize) -> P,
    {
        let count = resolve_shard_count(shards);
        let per_shard = capacity.div_ceil(count);
        Self {
            shards: (0..count).map(|_| make(per_shard)).collect(),
            selector: ShardSelector::new(count, 0),
        }
    }

    /// Returns the number of shards.
    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }

    fn shard_for<K: Hash>(&self, key: &K) -> &P {
        &self.shards[self.selector.shard_for_key(key)]
    }
}

impl<K, V> ShardedCache<LruCache<K, V>>
where
    K: Eq + Hash + Clone,
{
    /// Creates a sharded LRU cache with `capacity` split over `shards`.
    pub fn lru(capacity: usize, shards: usize) -> Self {
        Self::with_shards(capacity, shards, LruCache::new)
    }
}

impl<K, V> ShardedCache<LfuCache<K, V>>
where
    K: Eq + Hash + Clone,
{
    /// Creates a sharded LFU cache with `capacity` split over `shards`.
    pub fn lfu(capacity: usize, shards: usize) -> Self {
        Self::with_shards(capacity, shards, LfuCache::new)
    }

    /// Creates a sharded LFU cache with an explicit aging ceiling.
    pub fn lfu_with_max_average(capacity: usize, shards: usize, max_average: u64) -> Self {
        Self::with_shards(capacity, shards, |per_shard| {
            LfuCache::with_max_average(per_shard, max_average)
        })
    }
}

impl<K, V, P> CachePolicy<K, V> for ShardedCache<P>
where
    K: Hash,
    P: CachePolicy<K, V>,
{
    fn put(&self, key: K, value: V) -> Option<Arc<V>> {
        self.shard_for(&key).put(key, value)
    }

    fn get(&self, key: &K) -> Option<Arc<V>> {
        self.shard_for(key).get(key)
    }

    fn remove(&self, key: &K) -> Option<Arc<V>> {
        self.shard_for(key).remove(key)
    }

    fn purge(&self) {
        for shard in &self.shards {
            shard.purge();
        }
    }

    fn contains(&self, key: &K) -> bool {
        self.shard_for(key).contains(key)
    }

    fn len(&self) -> usize {
        self.shards.iter().map(|shard| shard.len()).sum()
    }

    fn capacity(&self) -> usize {
        self.shards.iter().map(|shard| shard.capacity()).sum()
    }
}

/// 0 means "one shard per available core".
fn resolve_shard_count(shards: usize) -> usize {
    if shards > 0 {
        return shards;
    }
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}
