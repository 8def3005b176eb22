//! Data structures shared by the eviction policies.

pub mod ghost_list;
pub mod linked_slab;
pub mod shard;

pub use ghost_list::GhostList;
pub use linked_slab::{LinkedSlab, NodeId};
pub use shard::ShardSelector;
