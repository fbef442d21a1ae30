//! # Sharded concurrent LRU cache
//!
//! A bounded key/value cache split into a fixed number of independently
//! locked shards. Each shard is an [`LruShard`] with its own capacity, so LRU
//! order is exact within a shard and approximate across the whole cache.
//!
//! ## Architecture
//!
//! ```text
//!   ┌───────────────────────────────────────────────────────────────────────┐
//!   │                    ShardedLruCache<K, V, S>                           │
//!   │                                                                       │
//!   │   selector: ShardSelector<S>   key ─► spread(hash) & (N - 1)          │
//!   │                                                                       │
//!   │   shards: [ShardGuard<K, V>; N]          N = power of two             │
//!   │   ┌────────────┬────────────┬────────────┬────────────┐               │
//!   │   │ guard 0    │ guard 1    │ guard 2    │ guard 3    │               │
//!   │   │ LruShard   │ (empty)    │ LruShard   │ (empty)    │  lazy alloc   │
//!   │   │ cap = C    │            │ cap = C    │            │               │
//!   │   └────────────┴────────────┴────────────┴────────────┘               │
//!   │                                                                       │
//!   │   max_len = N * C                                                     │
//!   └───────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Operations
//!
//! Point operations route to exactly one shard:
//!
//! | Method               | Guard protocol        | Allocates shard |
//! |----------------------|-----------------------|-----------------|
//! | `get`, `contains_key`| optimistic read       | no              |
//! | `peek`               | optimistic read       | no              |
//! | `put`                | exclusive write       | yes             |
//! | `put_if_absent`      | exclusive write       | yes             |
//! | `remove(_if)`        | exclusive write       | no              |
//! | `replace(_if)`       | exclusive write       | no              |
//!
//! Aggregates (`len`, `is_empty`, `contains_value`, `keys`, `values`,
//! `entries`, `clear`, `Display`) walk the shards in index order and hold at
//! most one shard lock at a time. They are not atomic across the cache: a
//! concurrent writer can change shards that were already visited.
//!
//! ## Example Usage
//!
//! ```
//! use std::sync::Arc;
//! use std::thread;
//!
//! use shardkit::ShardedLruCache;
//!
//! let cache: Arc<ShardedLruCache<u64, String>> = Arc::new(ShardedLruCache::new(128));
//!
//! let handles: Vec<_> = (0..4u64)
//!     .map(|t| {
//!         let cache = Arc::clone(&cache);
//!         thread::spawn(move || {
//!             for i in 0..100 {
//!                 cache.put(t * 1000 + i, format!("value-{i}"));
//!             }
//!         })
//!     })
//!     .collect();
//! for h in handles {
//!     h.join().unwrap();
//! }
//!
//! assert_eq!(cache.get(&1005), Some("value-5".to_string()));
//! assert!(cache.len() <= cache.max_len());
//! ```

use std::fmt;
use std::hash::{BuildHasher, Hash};

use rustc_hash::{FxBuildHasher, FxHashSet};
use tracing::debug;

use crate::builder::{ShardedLruBuilder, ShardedLruConfig, DEFAULT_SHARD_COUNT};
use crate::concurrent::guard::ShardGuard;
use crate::ds::shard::{round_shard_count, ShardSelector};
use crate::error::{ConfigError, InvariantError};
#[cfg(feature = "metrics")]
use crate::metrics::snapshot::ShardedMetricsSnapshot;
#[cfg(feature = "metrics")]
use crate::metrics::traits::{MetricsReset, MetricsSnapshotProvider};
use crate::policy::lru::{LruShard, ShardParams};

/// Bounded, thread-safe LRU cache partitioned into independently locked
/// shards.
///
/// All methods take `&self`; share the cache between threads with `Arc`.
pub struct ShardedLruCache<K, V, S = FxBuildHasher> {
    shards: Box<[ShardGuard<K, V>]>,
    selector: ShardSelector<S>,
    params: ShardParams,
}

impl<K, V> ShardedLruCache<K, V, FxBuildHasher>
where
    K: Hash + Eq + Clone,
{
    /// Creates a cache with [`DEFAULT_SHARD_COUNT`] shards of
    /// `per_shard_capacity` entries each.
    ///
    /// # Panics
    ///
    /// Panics if `per_shard_capacity` is 0.
    pub fn new(per_shard_capacity: usize) -> Self {
        Self::try_new(per_shard_capacity).unwrap_or_else(|err| panic!("{err}"))
    }

    /// Fallible version of [`new`](Self::new).
    pub fn try_new(per_shard_capacity: usize) -> Result<Self, ConfigError> {
        Self::try_with_shards(DEFAULT_SHARD_COUNT, per_shard_capacity)
    }

    /// Creates a cache with `shard_count` shards, rounded up to a power of two.
    ///
    /// # Panics
    ///
    /// Panics if `per_shard_capacity` is 0.
    pub fn with_shards(shard_count: usize, per_shard_capacity: usize) -> Self {
        Self::try_with_shards(shard_count, per_shard_capacity)
            .unwrap_or_else(|err| panic!("{err}"))
    }

    pub fn try_with_shards(shard_count: usize, per_shard_capacity: usize) -> Result<Self, ConfigError> {
        let config = ShardedLruConfig {
            shard_count,
            ..ShardedLruConfig::new(per_shard_capacity)
        };
        Self::from_config(&config, FxBuildHasher)
    }

    /// Starts a builder for a cache with `per_shard_capacity` entries per shard.
    pub fn builder(per_shard_capacity: usize) -> ShardedLruBuilder {
        ShardedLruBuilder::new(per_shard_capacity)
    }
}

impl<K, V, S> ShardedLruCache<K, V, S>
where
    K: Hash + Eq + Clone,
{
    /// Creates a cache from a validated configuration and a routing hasher.
    pub fn from_config(config: &ShardedLruConfig, hasher: S) -> Result<Self, ConfigError> {
        config.validate()?;

        let shard_count = round_shard_count(config.shard_count);
        let params = config.shard_params();
        let shards = (0..shard_count)
            .map(|index| ShardGuard::new(index, params))
            .collect::<Vec<_>>()
            .into_boxed_slice();

        debug!(
            requested_shards = config.shard_count,
            shard_count,
            per_shard_capacity = params.capacity,
            initial_size = params.initial_size,
            load_factor = params.load_factor,
            "created sharded LRU cache"
        );

        Ok(Self {
            shards,
            selector: ShardSelector::with_hasher(shard_count, hasher),
            params,
        })
    }

    /// Number of shards (a power of two).
    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }

    /// Maximum number of entries a single shard holds.
    pub fn per_shard_capacity(&self) -> usize {
        self.params.capacity
    }

    /// Upper bound on [`len`](Self::len): `shard_count * per_shard_capacity`.
    ///
    /// Skewed key distributions can start evicting well before this is reached.
    pub fn max_len(&self) -> usize {
        self.shard_count().saturating_mul(self.params.capacity)
    }

    /// Number of entries in shard `index`, or `None` if out of range.
    pub fn shard_len(&self, index: usize) -> Option<usize> {
        self.shards
            .get(index)
            .map(|guard| guard.read(|shard| shard.map_or(0, LruShard::len)))
    }

    /// Number of shards that have been allocated by a write.
    pub fn allocated_shards(&self) -> usize {
        self.shards.iter().filter(|guard| guard.is_allocated()).count()
    }

    /// Total number of entries, summed shard by shard.
    pub fn len(&self) -> usize {
        self.shards
            .iter()
            .map(|guard| guard.read(|shard| shard.map_or(0, LruShard::len)))
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.shards
            .iter()
            .all(|guard| guard.read(|shard| shard.map_or(true, LruShard::is_empty)))
    }

    /// Removes every entry. Allocated shards are emptied in place, one at a
    /// time; unallocated shards are skipped without locking.
    pub fn clear(&self) {
        let mut cleared = 0usize;
        for guard in self.shards.iter() {
            if guard.write_if_allocated(LruShard::clear).is_some() {
                cleared += 1;
            }
        }
        debug!(shards_cleared = cleared, "cleared sharded LRU cache");
    }

    /// Set of all keys currently cached.
    pub fn keys(&self) -> FxHashSet<K> {
        let mut keys = FxHashSet::default();
        for guard in self.shards.iter() {
            let part = guard.read(|shard| {
                shard.map_or_else(Vec::new, |shard| shard.keys().cloned().collect())
            });
            keys.extend(part);
        }
        keys
    }

    /// Validates every allocated shard's internal structure.
    pub fn check_invariants(&self) -> Result<(), InvariantError> {
        for guard in self.shards.iter() {
            guard.read_locked(|shard| match shard {
                Some(shard) => shard.check_invariants().map_err(|err| {
                    InvariantError::new(format!("shard {}: {}", guard.index(), err.message()))
                }),
                None => Ok(()),
            })?;
        }
        Ok(())
    }

    #[inline]
    fn guard_at(&self, index: usize) -> &ShardGuard<K, V> {
        &self.shards[index]
    }
}

impl<K, V, S> ShardedLruCache<K, V, S>
where
    K: Hash + Eq + Clone,
    S: BuildHasher,
{
    /// Index of the shard `key` routes to. Stable for the life of the cache.
    #[inline]
    pub fn shard_index(&self, key: &K) -> usize {
        self.selector.shard_for_key(key)
    }

    /// Returns `true` if `key` is cached. Does not touch recency.
    pub fn contains_key(&self, key: &K) -> bool {
        self.guard_for(key)
            .read(|shard| shard.is_some_and(|shard| shard.contains_key(key)))
    }

    /// Inserts or overwrites `key`, returning the previous value.
    ///
    /// The entry becomes most recently used in its shard; if the shard
    /// overflows, its least recently used entry is evicted.
    pub fn put(&self, key: K, value: V) -> Option<V> {
        let guard = self.guard_for(&key);
        let (previous, evicted) = guard.write(|shard| shard.put_evicting(key, value));
        Self::note_eviction(guard, evicted);
        previous
    }

    /// Removes `key`, returning its value. Never allocates a shard.
    pub fn remove(&self, key: &K) -> Option<V> {
        self.guard_for(key)
            .write_if_allocated(|shard| shard.remove(key))
            .flatten()
    }

    /// Overwrites `key` only if present, returning the previous value.
    /// The entry becomes most recently used. Never allocates a shard.
    pub fn replace(&self, key: &K, value: V) -> Option<V> {
        self.guard_for(key)
            .write_if_allocated(|shard| shard.replace(key, value))
            .flatten()
    }

    /// Inserts every pair in order, one `put` each.
    pub fn put_all<I>(&self, entries: I)
    where
        I: IntoIterator<Item = (K, V)>,
    {
        for (key, value) in entries {
            self.put(key, value);
        }
    }

    #[inline]
    fn guard_for(&self, key: &K) -> &ShardGuard<K, V> {
        self.guard_at(self.shard_index(key))
    }

    // Evicted entries are dropped here, after the shard lock is released.
    #[inline]
    fn note_eviction(_guard: &ShardGuard<K, V>, evicted: Option<(K, V)>) {
        #[cfg(feature = "metrics")]
        if evicted.is_some() {
            _guard.counters().record_eviction();
        }
        drop(evicted);
    }
}

impl<K, V, S> ShardedLruCache<K, V, S>
where
    K: Hash + Eq + Clone,
    V: Clone,
    S: BuildHasher,
{
    /// Returns a clone of the value for `key` and marks it most recently used.
    pub fn get(&self, key: &K) -> Option<V> {
        let guard = self.guard_for(key);
        let value = guard.read(|shard| shard.and_then(|shard| shard.get(key).cloned()));

        #[cfg(feature = "metrics")]
        guard.counters().record_get(value.is_some());

        value
    }

    /// Returns a clone of the value for `key` without touching recency.
    pub fn peek(&self, key: &K) -> Option<V> {
        self.guard_for(key)
            .read(|shard| shard.and_then(|shard| shard.peek(key).cloned()))
    }

    /// Inserts only if `key` is missing.
    ///
    /// Returns a clone of the existing value when present, leaving its value
    /// and recency unchanged; returns `None` after a fresh insert.
    pub fn put_if_absent(&self, key: K, value: V) -> Option<V> {
        let guard = self.guard_for(&key);
        let (existing, evicted) = guard.write(|shard| {
            let (existing, evicted) = shard.put_if_absent_evicting(key, value);
            (existing.cloned(), evicted)
        });
        Self::note_eviction(guard, evicted);
        existing
    }

    /// Returns the cached value for `key`, computing and inserting it with
    /// `init` on a miss.
    ///
    /// `init` runs with no lock held. If another thread inserts `key` while
    /// `init` runs, that value wins and is returned.
    ///
    /// ```
    /// use shardkit::ShardedLruCache;
    ///
    /// let cache: ShardedLruCache<u64, u64> = ShardedLruCache::new(16);
    /// assert_eq!(cache.get_or_insert_with(7, || 49), 49);
    /// assert_eq!(cache.get_or_insert_with(7, || unreachable!()), 49);
    /// ```
    pub fn get_or_insert_with<F>(&self, key: K, init: F) -> V
    where
        F: FnOnce() -> V,
    {
        if let Some(value) = self.get(&key) {
            return value;
        }
        let value = init();
        match self.put_if_absent(key, value.clone()) {
            Some(existing) => existing,
            None => value,
        }
    }

    /// Clones of all cached values, shard by shard, MRU first within a shard.
    pub fn values(&self) -> Vec<V> {
        let mut values = Vec::new();
        for guard in self.shards.iter() {
            let part = guard.read(|shard| {
                shard.map_or_else(Vec::new, |shard| shard.values().cloned().collect())
            });
            values.extend(part);
        }
        values
    }

    /// Clones of all cached entries, shard by shard, MRU first within a shard.
    pub fn entries(&self) -> Vec<(K, V)> {
        let mut entries = Vec::new();
        for guard in self.shards.iter() {
            let part = guard.read(|shard| {
                shard.map_or_else(Vec::new, |shard| {
                    shard
                        .iter()
                        .map(|(key, value)| (key.clone(), value.clone()))
                        .collect()
                })
            });
            entries.extend(part);
        }
        entries
    }
}

impl<K, V, S> ShardedLruCache<K, V, S>
where
    K: Hash + Eq + Clone,
    V: PartialEq,
    S: BuildHasher,
{
    /// Removes `key` only if it currently maps to `expected`.
    pub fn remove_if(&self, key: &K, expected: &V) -> bool {
        self.guard_for(key)
            .write_if_allocated(|shard| shard.remove_if(key, expected))
            .unwrap_or(false)
    }

    /// Replaces the value of `key` with `new` only if it currently maps to
    /// `expected`.
    pub fn replace_if(&self, key: &K, expected: &V, new: V) -> bool {
        self.guard_for(key)
            .write_if_allocated(|shard| shard.replace_if(key, expected, new))
            .unwrap_or(false)
    }

    /// Returns `true` if any shard holds `value`. Scans every entry.
    pub fn contains_value(&self, value: &V) -> bool {
        self.shards
            .iter()
            .any(|guard| guard.read(|shard| shard.is_some_and(|shard| shard.contains_value(value))))
    }
}

impl<K, V, S> Extend<(K, V)> for ShardedLruCache<K, V, S>
where
    K: Hash + Eq + Clone,
    S: BuildHasher,
{
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        self.put_all(iter);
    }
}

#[cfg(feature = "metrics")]
impl<K, V, S> ShardedLruCache<K, V, S>
where
    K: Hash + Eq + Clone,
{
    /// Sums every guard's counters and captures the size gauges.
    pub fn metrics_snapshot(&self) -> ShardedMetricsSnapshot {
        let mut snapshot = ShardedMetricsSnapshot {
            len: self.len(),
            allocated_shards: self.allocated_shards(),
            shard_count: self.shard_count(),
            max_len: self.max_len(),
            ..Default::default()
        };
        for guard in self.shards.iter() {
            guard.counters().accumulate_into(&mut snapshot);
        }
        snapshot
    }
}

#[cfg(feature = "metrics")]
impl<K, V, S> MetricsSnapshotProvider<ShardedMetricsSnapshot> for ShardedLruCache<K, V, S>
where
    K: Hash + Eq + Clone,
{
    fn snapshot(&self) -> ShardedMetricsSnapshot {
        self.metrics_snapshot()
    }
}

#[cfg(feature = "metrics")]
impl<K, V, S> MetricsReset for ShardedLruCache<K, V, S>
where
    K: Hash + Eq + Clone,
{
    fn reset_metrics(&self) {
        for guard in self.shards.iter() {
            guard.counters().reset();
        }
    }
}

/// Formats allocated shards as `{{(i)k=v,k=v},{(j)k=v}}`, entries MRU first.
impl<K, V, S> fmt::Display for ShardedLruCache<K, V, S>
where
    K: Hash + Eq + Clone + fmt::Display,
    V: fmt::Display,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        let mut first_shard = true;
        for guard in self.shards.iter() {
            guard.read_locked(|shard| {
                let Some(shard) = shard else {
                    return Ok(());
                };
                if !first_shard {
                    f.write_str(",")?;
                }
                first_shard = false;
                write!(f, "{{({})", guard.index())?;
                for (i, (key, value)) in shard.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{key}={value}")?;
                }
                f.write_str("}")
            })?;
        }
        f.write_str("}")
    }
}

impl<K, V, S> fmt::Debug for ShardedLruCache<K, V, S>
where
    K: Hash + Eq + Clone,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShardedLruCache")
            .field("shard_count", &self.shard_count())
            .field("per_shard_capacity", &self.per_shard_capacity())
            .field("len", &self.len())
            .field("allocated_shards", &self.allocated_shards())
            .finish()
    }
}
