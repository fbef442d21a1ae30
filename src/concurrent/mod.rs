//! Thread-safe cache built from per-shard guards.
//!
//! - [`guard`]: versioned reader-writer lock and the lazily allocating
//!   [`ShardGuard`](guard::ShardGuard).
//! - [`sharded`]: [`ShardedLruCache`](sharded::ShardedLruCache), the router
//!   and aggregator over an array of guards.

pub mod guard;
pub mod sharded;

pub use guard::{ReadPath, ShardGuard, VersionedLock};
pub use sharded::ShardedLruCache;
