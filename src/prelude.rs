pub use crate::builder::{ShardedLruBuilder, ShardedLruConfig};
pub use crate::concurrent::sharded::ShardedLruCache;
pub use crate::error::ConfigError;
pub use crate::policy::lru::LruShard;
pub use crate::traits::ConcurrentCache;

#[cfg(feature = "metrics")]
pub use crate::metrics::{MetricsReset, MetricsSnapshotProvider, ShardedMetricsSnapshot};
