//! replacer: in-memory caches with interchangeable eviction policies.
//!
//! Four policies behind one [`CachePolicy`](traits::CachePolicy) surface —
//! [`LruCache`](policy::lru::LruCache), [`LfuCache`](policy::lfu::LfuCache)
//! with aging, [`LrukCache`](policy::lru_k::LrukCache) with an admission
//! filter, and [`ArcCache`](policy::arc::ArcCache) — plus a
//! [`ShardedCache`](policy::sharded::ShardedCache) wrapper that partitions
//! any of them over independent instances for concurrency.
//!
//! Every cache is bounded, thread-safe behind a single internal mutex, and
//! O(1) per operation (ARC amortized). Values are shared out as `Arc<V>`.
//!
//! ```
//! use replacer::prelude::*;
//!
//! let cache = CacheBuilder::new(1024).build::<u64, Vec<u8>>(EvictionPolicy::Arc);
//! cache.put(7, vec![1, 2, 3]);
//! assert_eq!(cache.get(&7).as_deref(), Some(&vec![1, 2, 3]));
//! ```

pub mod builder;
pub mod ds;
pub mod error;
pub mod policy;
pub mod prelude;
pub mod traits;
