//! Eviction policies.
//!
//! Only LRU is provided: [`lru::LruShard`] is the bounded map each shard of a
//! [`ShardedLruCache`](crate::ShardedLruCache) is built on.

pub mod lru;
