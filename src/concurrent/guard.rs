//! Per-shard concurrency control.
//!
//! ## Architecture
//!
//! ```text
//!   ┌─────────────────────────────────────────────────────────────────────┐
//!   │                        ShardGuard<K, V>                             │
//!   │                                                                     │
//!   │   allocated: AtomicBool           (lock-free "unallocated" check)   │
//!   │                                                                     │
//!   │   ┌─────────────────────────────────────────────────────────────┐   │
//!   │   │ VersionedLock<Option<LruShard<K, V>>>                       │   │
//!   │   │                                                             │   │
//!   │   │   version: AtomicU64   even = no writer, odd = writer in    │   │
//!   │   │   lock:    parking_lot::RwLock                              │   │
//!   │   └─────────────────────────────────────────────────────────────┘   │
//!   └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Protocols
//!
//! **Optimistic read** (`get`, `contains_key`, `contains_value`, aggregates):
//!
//! ```text
//!   stamp = version
//!   stamp odd?           ──yes──►┐
//!   try_read() failed?   ──yes──►┤
//!   run read                     │
//!   version != stamp?    ──yes──►┤
//!   return (Optimistic)          ▼
//!                          read() (blocking), run read once more
//!                          return (Fallback)
//! ```
//!
//! The optimistic attempt never blocks, and the fallback happens at most once,
//! so a read costs at most one blocking acquisition. Shard contents are only
//! ever touched while the lock is held in some mode; the version stamp decides
//! whether the non-blocking attempt can stand.
//!
//! **Exclusive write** (`put`, `remove`, `replace`, `clear`): acquire the
//! write lock, bump the version to odd, mutate, and bump back to even when the
//! [`VersionedWriteGuard`] drops. The drop runs on every exit path, including
//! unwinding out of the mutation.
//!
//! **Lazy allocation**: a guard starts without a shard. The first allocating
//! write re-checks the slot under the exclusive lock and creates the shard
//! there, so two racing first writers allocate exactly once. Readers and
//! non-allocating writers of an unallocated guard return without locking.

use std::fmt;
use std::hash::Hash;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, trace};

#[cfg(feature = "metrics")]
use crate::metrics::counters::GuardCounters;
use crate::policy::lru::{LruShard, ShardParams};

/// Which path an optimistic read finished on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadPath {
    /// The non-blocking attempt validated.
    Optimistic,
    /// The read was repeated under a blocking shared lock.
    Fallback,
}

/// Reader-writer lock paired with a write version counter.
///
/// The version is even while no writer holds the lock and odd while one
/// does; every completed write advances it by 2.
pub struct VersionedLock<T> {
    version: AtomicU64,
    lock: RwLock<T>,
}

impl<T> VersionedLock<T> {
    pub fn new(value: T) -> Self {
        Self {
            version: AtomicU64::new(0),
            lock: RwLock::new(value),
        }
    }

    /// Current version stamp.
    #[inline]
    pub fn stamp(&self) -> u64 {
        self.version.load(Ordering::Acquire)
    }

    /// Returns `true` if no write started or finished since `stamp` was taken.
    #[inline]
    pub fn validate(&self, stamp: u64) -> bool {
        stamp & 1 == 0 && self.version.load(Ordering::Acquire) == stamp
    }

    /// Runs `f` on the optimistic path, falling back once to a blocking read.
    ///
    /// `f` runs once or twice; it must not have side effects that break when
    /// repeated.
    pub fn optimistic_read<R>(&self, mut f: impl FnMut(&T) -> R) -> (R, ReadPath) {
        let stamp = self.stamp();
        if stamp & 1 == 0 {
            if let Some(guard) = self.lock.try_read() {
                let result = f(&guard);
                // Writers bump the version only while holding the lock, so
                // checking before release is enough.
                if self.validate(stamp) {
                    return (result, ReadPath::Optimistic);
                }
            }
        }

        let guard = self.lock.read();
        (f(&guard), ReadPath::Fallback)
    }

    /// Blocking shared access.
    pub fn read(&self) -> RwLockReadGuard<'_, T> {
        self.lock.read()
    }

    /// Exclusive access; the version is odd until the returned guard drops.
    pub fn write(&self) -> VersionedWriteGuard<'_, T> {
        let guard = self.lock.write();
        self.version.fetch_add(1, Ordering::AcqRel);
        VersionedWriteGuard {
            guard,
            version: &self.version,
        }
    }

    pub fn into_inner(self) -> T {
        self.lock.into_inner()
    }
}

impl<T: Default> Default for VersionedLock<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T> fmt::Debug for VersionedLock<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VersionedLock")
            .field("version", &self.stamp())
            .finish_non_exhaustive()
    }
}

/// Write guard that restores an even version when dropped.
pub struct VersionedWriteGuard<'a, T> {
    guard: RwLockWriteGuard<'a, T>,
    version: &'a AtomicU64,
}

impl<T> Deref for VersionedWriteGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.guard
    }
}

impl<T> DerefMut for VersionedWriteGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.guard
    }
}

impl<T> Drop for VersionedWriteGuard<'_, T> {
    fn drop(&mut self) {
        // Runs before `guard` is dropped, so the lock is still held here.
        self.version.fetch_add(1, Ordering::Release);
    }
}

/// Concurrency guard owning one lazily allocated [`LruShard`].
pub struct ShardGuard<K, V> {
    lock: VersionedLock<Option<LruShard<K, V>>>,
    allocated: AtomicBool,
    params: ShardParams,
    index: usize,
    #[cfg(feature = "metrics")]
    counters: GuardCounters,
}

impl<K, V> ShardGuard<K, V>
where
    K: Hash + Eq + Clone,
{
    /// Creates an unallocated guard. `params` must already be validated.
    pub fn new(index: usize, params: ShardParams) -> Self {
        Self {
            lock: VersionedLock::new(None),
            allocated: AtomicBool::new(false),
            params,
            index,
            #[cfg(feature = "metrics")]
            counters: GuardCounters::default(),
        }
    }

    /// Position of this guard in the owning cache.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn params(&self) -> &ShardParams {
        &self.params
    }

    /// Returns `true` once the shard has been allocated. Never reverts.
    #[inline]
    pub fn is_allocated(&self) -> bool {
        self.allocated.load(Ordering::Acquire)
    }

    /// Runs a read through the optimistic protocol.
    ///
    /// `f` receives `None` while the shard is unallocated.
    pub fn read<R>(&self, mut f: impl FnMut(Option<&LruShard<K, V>>) -> R) -> R {
        if !self.is_allocated() {
            return f(None);
        }

        let (result, path) = self.lock.optimistic_read(|slot| f(slot.as_ref()));

        #[cfg(feature = "metrics")]
        {
            self.counters.record_optimistic_read();
            if path == ReadPath::Fallback {
                self.counters.record_read_fallback();
            }
        }
        if path == ReadPath::Fallback {
            trace!(shard = self.index, "optimistic read fell back to shared lock");
        }
        result
    }

    /// Runs a read under a blocking shared lock.
    pub fn read_locked<R>(&self, f: impl FnOnce(Option<&LruShard<K, V>>) -> R) -> R {
        if !self.is_allocated() {
            return f(None);
        }
        let slot = self.lock.read();
        f(slot.as_ref())
    }

    /// Runs a mutation under the exclusive lock, allocating the shard first if
    /// this is the first write.
    pub fn write<R>(&self, f: impl FnOnce(&mut LruShard<K, V>) -> R) -> R {
        let mut slot = self.lock.write();

        #[cfg(feature = "metrics")]
        self.counters.record_exclusive_write();

        let shard = slot.get_or_insert_with(|| {
            debug!(
                shard = self.index,
                capacity = self.params.capacity,
                "allocating shard"
            );
            #[cfg(feature = "metrics")]
            self.counters.record_allocation();
            self.allocated.store(true, Ordering::Release);
            LruShard::from_params(&self.params)
        });
        f(shard)
    }

    /// Runs a mutation under the exclusive lock only if the shard exists.
    ///
    /// Returns `None` without locking while the guard is unallocated.
    pub fn write_if_allocated<R>(&self, f: impl FnOnce(&mut LruShard<K, V>) -> R) -> Option<R> {
        if !self.is_allocated() {
            return None;
        }
        let mut slot = self.lock.write();

        #[cfg(feature = "metrics")]
        self.counters.record_exclusive_write();

        slot.as_mut().map(f)
    }

    #[cfg(feature = "metrics")]
    pub fn counters(&self) -> &GuardCounters {
        &self.counters
    }
}

impl<K, V> fmt::Debug for ShardGuard<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShardGuard")
            .field("index", &self.index)
            .field("allocated", &self.allocated.load(Ordering::Relaxed))
            .field("capacity", &self.params.capacity)
            .finish_non_exhaustive()
    }
}
