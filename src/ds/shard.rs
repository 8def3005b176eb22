//! Deterministic key-to-shard mapping for the sharded wrapper.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Maps any `Hash`able key to a shard index in `[0, shards)`.
///
/// The mapping is deterministic for a given `(key, seed, shards)` triple,
/// so a key always routes to the same shard for the lifetime of a sharded
/// cache. Different seeds give unrelated distributions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShardSelector {
    shards: usize,
    seed: u64,
}

impl ShardSelector {
    /// Creates a selector over `shards` shards (clamped to at least 1).
    pub fn new(shards: usize, seed: u64) -> Self {
        Self {
            shards: shards.max(1),
            seed,
        }
    }

    /// Returns the number of shards.
    pub fn shard_count(&self) -> usize {
        self.shards
    }

    /// Returns the shard index for `key`.
    pub fn shard_for_key<K: Hash>(&self, key: &K) -> usize {
        let mut hasher = DefaultHasher::new();
        self.seed.hash(&mut hasher);
        key.hash(&mut hasher);
        (hasher.finish() as usize) % self.shards
    }
}

impl Default for ShardSelector {
    fn default() -> Self {
        Self::new(1, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mapping_is_deterministic() {
        let selector = ShardSelector::new(8, 7);
        let first = selector.shard_for_key(&"page:42");
        assert_eq!(selector.shard_for_key(&"page:42"), first);
        assert!(first < 8);
    }

    #[test]
    fn zero_shards_clamps_to_one() {
        let selector = ShardSelector::new(0, 0);
        assert_eq!(selector.shard_count(), 1);
        assert_eq!(selector.shard_for_key(&123u64), 0);
    }
}
