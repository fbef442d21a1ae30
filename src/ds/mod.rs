pub mod recency_list;
pub mod shard;

pub use recency_list::{RecencyList, SlotId};
pub use shard::{ShardSelector, MAX_SHARDS};
