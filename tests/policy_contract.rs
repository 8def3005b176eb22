// ==============================================
// CROSS-POLICY CONTRACT TESTS (integration)
// ==============================================
//
// Behavioral properties every policy must satisfy, plus the pinned
// observable scenarios for each individual policy. These span the public
// API only; structural invariants are covered by the per-module unit
// tests.

use replacer::builder::{CacheBuilder, EvictionPolicy};
use replacer::policy::arc::ArcCache;
use replacer::policy::lfu::LfuCache;
use replacer::policy::lru::LruCache;
use replacer::policy::lru_k::LrukCache;
use replacer::policy::sharded::ShardedCache;
use replacer::traits::CachePolicy;

fn all_policies() -> Vec<EvictionPolicy> {
    vec![
        EvictionPolicy::Lru,
        EvictionPolicy::Lfu { max_average: 10 },
        EvictionPolicy::LruK {
            history_capacity: 64,
            k: 2,
        },
        EvictionPolicy::Arc,
        EvictionPolicy::ShardedLru { shards: 2 },
        EvictionPolicy::ShardedLfu {
            shards: 2,
            max_average: 10,
        },
    ]
}

/// References a key twice so admission-filtered policies admit it too.
fn put_admitted(cache: &replacer::builder::Cache<u64, u64>, key: u64, value: u64) {
    cache.put(key, value);
    cache.put(key, value);
}

// ==============================================
// Universal invariants
// ==============================================

#[test]
fn resident_count_never_exceeds_capacity() {
    for policy in all_policies() {
        let cache = CacheBuilder::new(4).build::<u64, u64>(policy.clone());
        for key in 0..64 {
            put_admitted(&cache, key, key);
            assert!(cache.len() <= cache.capacity(), "{policy:?}");
        }
    }
}

#[test]
fn admitted_put_is_immediately_readable() {
    for policy in all_policies() {
        let cache = CacheBuilder::new(4).build::<u64, u64>(policy.clone());
        put_admitted(&cache, 1, 11);
        assert_eq!(cache.get(&1).as_deref(), Some(&11), "{policy:?}");
    }
}

#[test]
fn overwrite_is_idempotent() {
    for policy in all_policies() {
        let cache = CacheBuilder::new(4).build::<u64, u64>(policy.clone());
        put_admitted(&cache, 1, 11);
        cache.put(1, 11);
        cache.put(1, 11);
        assert_eq!(cache.get(&1).as_deref(), Some(&11), "{policy:?}");
        assert_eq!(cache.len(), 1, "{policy:?}");
    }
}

#[test]
fn remove_makes_a_key_miss() {
    for policy in all_policies() {
        let cache = CacheBuilder::new(4).build::<u64, u64>(policy.clone());
        put_admitted(&cache, 1, 11);
        assert!(cache.remove(&1).is_some(), "{policy:?}");
        assert!(cache.get(&1).is_none(), "{policy:?}");
        assert!(cache.remove(&1).is_none(), "removing twice, {policy:?}");
    }
}

#[test]
fn purge_misses_every_previous_key() {
    for policy in all_policies() {
        let cache = CacheBuilder::new(8).build::<u64, u64>(policy.clone());
        for key in 0..8 {
            put_admitted(&cache, key, key);
        }
        cache.purge();
        assert!(cache.is_empty(), "{policy:?}");
        for key in 0..8 {
            assert!(cache.get(&key).is_none(), "{policy:?}");
        }
        // The cache stays usable after a purge.
        put_admitted(&cache, 100, 1);
        assert_eq!(cache.get(&100).as_deref(), Some(&1), "{policy:?}");
    }
}

#[test]
fn zero_capacity_caches_miss_everything() {
    for policy in all_policies() {
        let cache = CacheBuilder::new(0).build::<u64, u64>(policy.clone());
        put_admitted(&cache, 1, 11);
        assert_eq!(cache.len(), 0, "{policy:?}");
        assert!(cache.get(&1).is_none(), "{policy:?}");
    }
}

// ==============================================
// LRU
// ==============================================

#[test]
fn lru_evicts_the_oldest_untouched_key() {
    let cache: LruCache<u32, char> = LruCache::new(2);
    cache.put(1, 'A');
    cache.put(2, 'B');
    cache.put(3, 'C');

    assert!(cache.get(&1).is_none());
    assert_eq!(cache.get(&2).as_deref(), Some(&'B'));
    assert_eq!(cache.get(&3).as_deref(), Some(&'C'));
}

#[test]
fn lru_eviction_order_follows_insertion_without_gets() {
    let capacity = 4;
    let cache: LruCache<u32, u32> = LruCache::new(capacity);
    for key in 0..=capacity as u32 {
        cache.put(key, key);
    }
    assert!(cache.get(&0).is_none(), "k1 must be gone");
    for key in 1..=capacity as u32 {
        assert_eq!(cache.get(&key).as_deref(), Some(&key));
    }
}

// ==============================================
// LFU
// ==============================================

#[test]
fn lfu_keeps_the_hotter_key() {
    let cache: LfuCache<u32, char> = LfuCache::new(2);
    cache.put(1, 'A');
    cache.put(2, 'B');
    cache.get(&1);
    cache.get(&1);
    cache.put(3, 'C');

    assert!(cache.get(&2).is_none());
    assert_eq!(cache.get(&1).as_deref(), Some(&'A'));
}

#[test]
fn lfu_age_decay_bounds_frequencies() {
    let cache: LfuCache<u32, u32> = LfuCache::with_max_average(3, 2);
    for key in 1..=3 {
        cache.put(key, key);
    }
    for key in 1..=3 {
        for _ in 0..5 {
            cache.get(&key);
        }
    }

    // The decay fired along the way: every key is still resident and no
    // frequency is left above the ceiling.
    assert_eq!(cache.len(), 3);
    for key in 1..=3 {
        assert!(cache.contains(&key));
        assert!(cache.frequency(&key).unwrap() <= 2, "key {key}");
    }
}

// ==============================================
// LRU-K
// ==============================================

#[test]
fn lru_k_admits_on_the_second_reference() {
    let cache: LrukCache<u32, char> = LrukCache::new(2, 4, 2);

    cache.put(1, 'A');
    assert!(cache.get(&1).is_none(), "one reference is not enough");
    cache.put(1, 'A');
    assert_eq!(cache.get(&1).as_deref(), Some(&'A'));
}

#[test]
fn lru_k_requires_k_references_in_any_order() {
    let cache: LrukCache<u32, char> = LrukCache::new(4, 16, 3);

    cache.put(5, 'X'); // reference 1
    cache.get(&5); // reference 2
    assert!(!cache.contains(&5));
    cache.put(5, 'X'); // reference 3: admitted
    assert!(cache.contains(&5));
}

// ==============================================
// ARC
// ==============================================

#[test]
fn arc_ghost_hit_grows_p() {
    let cache: ArcCache<u32, char> = ArcCache::new(2);
    cache.put(1, 'A');
    cache.put(2, 'B');
    cache.put(3, 'C'); // 1 is ghosted into B1

    let (_, _, b1, _) = cache.partition_sizes();
    assert_eq!(b1, 1);
    let p_before = cache.p_value();

    cache.put(1, 'A'); // B1 hit
    assert!(cache.p_value() > p_before);
    assert!(cache.contains(&1));
    assert!(cache.p_value() <= cache.capacity());
}

#[test]
fn arc_resident_and_ghost_sets_stay_disjoint() {
    let cache: ArcCache<u32, u32> = ArcCache::new(3);
    for round in 0..4 {
        for key in 0..8 {
            cache.put(key, round);
            cache.get(&(key / 2));
        }
    }
    // Structural disjointness is asserted inside the core on every unit
    // test; here we check the observable consequence: a resident key hits.
    let mut resident = 0;
    for key in 0..8 {
        if cache.contains(&key) {
            assert!(cache.get(&key).is_some());
            resident += 1;
        }
    }
    assert!(resident <= cache.capacity());
}

// ==============================================
// Sharded
// ==============================================

#[test]
fn sharded_aggregate_hits_equal_per_shard_sum() {
    let cache = ShardedCache::lru(16, 4);
    for key in 0..16u64 {
        CachePolicy::put(&cache, key, key);
    }

    let mut aggregate_hits = 0usize;
    for key in 0..16u64 {
        if CachePolicy::get(&cache, &key).is_some() {
            aggregate_hits += 1;
        }
    }
    // Shard capacities round up to 16 / 4 = 4 each, and no shard receives
    // more than its capacity only if hashing spread perfectly; what must
    // hold regardless is that every resident key hits and the counts add
    // up across shards.
    assert_eq!(aggregate_hits, CachePolicy::len(&cache));
}
