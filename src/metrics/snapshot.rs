/// Point-in-time view of a sharded cache's counters and gauges.
///
/// Counters are summed shard by shard without a global lock, so a snapshot
/// taken under concurrent load is approximate in the same way as
/// [`ShardedLruCache::len`](crate::ShardedLruCache::len).
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ShardedMetricsSnapshot {
    pub optimistic_reads: u64,
    pub read_fallbacks: u64, // optimistic attempts that retried under a blocking read lock
    pub exclusive_writes: u64,
    pub shard_allocations: u64,

    pub get_hits: u64,
    pub get_misses: u64,
    pub evictions: u64,

    // gauges captured at snapshot time
    pub len: usize,
    pub allocated_shards: usize,
    pub shard_count: usize,
    pub max_len: usize,
}

impl ShardedMetricsSnapshot {
    /// Fraction of `get` calls that found a value, or 0.0 with no calls.
    pub fn hit_rate(&self) -> f64 {
        let total = self.get_hits + self.get_misses;
        if total == 0 {
            0.0
        } else {
            self.get_hits as f64 / total as f64
        }
    }

    /// Fraction of optimistic reads that needed the blocking fallback.
    pub fn fallback_rate(&self) -> f64 {
        if self.optimistic_reads == 0 {
            0.0
        } else {
            self.read_fallbacks as f64 / self.optimistic_reads as f64
        }
    }
}
