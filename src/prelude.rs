//! Convenience re-exports for the common entry points.

pub use crate::builder::{Cache, CacheBuilder, EvictionPolicy};
pub use crate::error::{ConfigError, InvariantError};
pub use crate::policy::{
    ArcCache, LfuCache, LruCache, LrukCache, ShardedCache, ShardedLfuCache, ShardedLruCache,
};
pub use crate::traits::CachePolicy;
