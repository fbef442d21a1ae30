use std::sync::atomic::{AtomicU64, Ordering};

use crate::metrics::snapshot::ShardedMetricsSnapshot;

/// Per-shard counters, updated without holding the shard lock.
///
/// All counters use relaxed ordering: they are observational and never
/// participate in the cache's synchronization.
#[derive(Debug, Default)]
pub struct GuardCounters {
    optimistic_reads: AtomicU64,
    read_fallbacks: AtomicU64,
    exclusive_writes: AtomicU64,
    shard_allocations: AtomicU64,
    get_hits: AtomicU64,
    get_misses: AtomicU64,
    evictions: AtomicU64,
}

impl GuardCounters {
    #[inline]
    pub fn record_optimistic_read(&self) {
        self.optimistic_reads.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_read_fallback(&self) {
        self.read_fallbacks.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_exclusive_write(&self) {
        self.exclusive_writes.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_allocation(&self) {
        self.shard_allocations.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_get(&self, hit: bool) {
        if hit {
            self.get_hits.fetch_add(1, Ordering::Relaxed);
        } else {
            self.get_misses.fetch_add(1, Ordering::Relaxed);
        }
    }

    #[inline]
    pub fn record_eviction(&self) {
        self.evictions.fetch_add(1, Ordering::Relaxed);
    }

    /// Adds this shard's counters into `snapshot`.
    pub fn accumulate_into(&self, snapshot: &mut ShardedMetricsSnapshot) {
        snapshot.optimistic_reads += self.optimistic_reads.load(Ordering::Relaxed);
        snapshot.read_fallbacks += self.read_fallbacks.load(Ordering::Relaxed);
        snapshot.exclusive_writes += self.exclusive_writes.load(Ordering::Relaxed);
        snapshot.shard_allocations += self.shard_allocations.load(Ordering::Relaxed);
        snapshot.get_hits += self.get_hits.load(Ordering::Relaxed);
        snapshot.get_misses += self.get_misses.load(Ordering::Relaxed);
        snapshot.evictions += self.evictions.load(Ordering::Relaxed);
    }

    /// Zeroes every counter. The allocation counter is kept: shards are never
    /// deallocated, so resetting it would make it disagree with the gauge.
    pub fn reset(&self) {
        self.optimistic_reads.store(0, Ordering::Relaxed);
        self.read_fallbacks.store(0, Ordering::Relaxed);
        self.exclusive_writes.store(0, Ordering::Relaxed);
        self.get_hits.store(0, Ordering::Relaxed);
        self.get_misses.store(0, Ordering::Relaxed);
        self.evictions.store(0, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accumulate_sums_across_guards() {
        let a = GuardCounters::default();
        let b = GuardCounters::default();
        a.record_get(true);
        a.record_get(false);
        b.record_get(true);
        b.record_eviction();
        b.record_read_fallback();

        let mut snapshot = ShardedMetricsSnapshot::default();
        a.accumulate_into(&mut snapshot);
        b.accumulate_into(&mut snapshot);

        assert_eq!(snapshot.get_hits, 2);
        assert_eq!(snapshot.get_misses, 1);
        assert_eq!(snapshot.evictions, 1);
        assert_eq!(snapshot.read_fallbacks, 1);
    }

    #[test]
    fn reset_keeps_allocation_count() {
        let counters = GuardCounters::default();
        counters.record_allocation();
        counters.record_exclusive_write();
        counters.reset();

        let mut snapshot = ShardedMetricsSnapshot::default();
        counters.accumulate_into(&mut snapshot);
        assert_eq!(snapshot.exclusive_writes, 0);
        assert_eq!(snapshot.shard_allocations, 1);
    }
}
