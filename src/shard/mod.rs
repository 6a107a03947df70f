pub mod shard_index;

pub use shard_index::ShardIndex;
