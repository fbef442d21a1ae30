//! shardkit: a bounded, concurrent, sharded LRU cache.
//!
//! The keyspace is split across a power-of-two number of shards. Each shard
//! is an independent [`LruShard`](policy::lru::LruShard) with a hard capacity
//! and exact LRU eviction, guarded by its own versioned reader-writer lock.
//! Lookups take a non-blocking optimistic path and fall back to a blocking
//! shared lock at most once; writes lock a single shard exclusively.
//!
//! ## Layout
//!
//! | Module          | Contents                                            |
//! |-----------------|-----------------------------------------------------|
//! | `ds`            | Recency list and key-to-shard routing               |
//! | `policy::lru`   | Single-shard bounded LRU map                        |
//! | `concurrent`    | Versioned lock, shard guard, sharded cache          |
//! | `builder`       | Validated configuration and fluent builder          |
//! | `traits`        | `ConcurrentCache` shared-access contract            |
//! | `metrics`       | Per-shard counters and snapshots (feature `metrics`)|
//!
//! ## Example
//!
//! ```
//! use shardkit::ShardedLruCache;
//!
//! let cache: ShardedLruCache<&str, u32> = ShardedLruCache::with_shards(4, 2);
//! cache.put("a", 1);
//! cache.put("b", 2);
//! assert_eq!(cache.get(&"a"), Some(1));
//! assert!(cache.len() <= cache.max_len());
//! ```

pub mod builder;
pub mod concurrent;
pub mod ds;
pub mod error;
pub mod policy;
pub mod prelude;
pub mod traits;

#[cfg(feature = "metrics")]
pub mod metrics;

pub use crate::builder::{ShardedLruBuilder, ShardedLruConfig};
pub use crate::concurrent::sharded::ShardedLruCache;
pub use crate::ds::{RecencyList, ShardSelector, SlotId};
pub use crate::error::{ConfigError, InvariantError};
#[cfg(feature = "metrics")]
pub use crate::metrics::snapshot::ShardedMetricsSnapshot;
pub use crate::policy::lru::LruShard;
pub use crate::traits::ConcurrentCache;
