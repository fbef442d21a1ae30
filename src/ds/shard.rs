//! Key-to-shard routing.
//!
//! Maps keys to a shard index in `[0, shards)` where `shards` is always a
//! power of two, so the index is a bit-mask of the hash rather than a modulo.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Shard Selection Flow                            │
//! │                                                                         │
//! │   Input Key                                                             │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │   ┌───────────────────────────────────────────────────────────────┐     │
//! │   │  ShardSelector { mask: 3, hasher: S }                         │     │
//! │   │                                                               │     │
//! │   │  1. h = hasher.hash_one(key)            (64-bit)              │     │
//! │   │  2. spread: h ^ (h >> 32)               (fold high bits)      │     │
//! │   │  3. index:  spread & mask                                     │     │
//! │   └───────────────────────────────────────────────────────────────┘     │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │   ┌─────────┬─────────┬─────────┬─────────┐                             │
//! │   │ Shard 0 │ Shard 1 │ Shard 2 │ Shard 3 │                             │
//! │   └─────────┴─────────┴─────────┴─────────┘                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The spread step matters for multiplicative hashers like FxHash, whose low
//! bits depend only on the low bits of the input: without folding, small
//! integer keys that differ only in high bits would pile into one shard.
//!
//! ## Example Usage
//!
//! ```
//! use shardkit::ds::ShardSelector;
//!
//! // 5 is rounded up to 8 shards
//! let selector: ShardSelector = ShardSelector::new(5);
//! assert_eq!(selector.shard_count(), 8);
//!
//! let shard = selector.shard_for_key(&"user:123");
//! assert!(shard < 8);
//! assert_eq!(selector.shard_for_key(&"user:123"), shard);
//! ```

use std::fmt;
use std::hash::{BuildHasher, Hash};

use rustc_hash::FxBuildHasher;

/// Upper bound on the number of shards a selector will route to.
pub const MAX_SHARDS: usize = 1 << 16;

/// Rounds a requested shard count up to the next power of two in
/// `[1, MAX_SHARDS]`.
///
/// ```
/// use shardkit::ds::shard::round_shard_count;
///
/// assert_eq!(round_shard_count(0), 1);
/// assert_eq!(round_shard_count(3), 4);
/// assert_eq!(round_shard_count(16), 16);
/// assert_eq!(round_shard_count(17), 32);
/// ```
#[inline]
pub fn round_shard_count(requested: usize) -> usize {
    requested.clamp(1, MAX_SHARDS).next_power_of_two()
}

/// Folds the high half of a 64-bit hash into the low half.
#[inline]
pub fn spread(hash: u64) -> u64 {
    hash ^ (hash >> 32)
}

/// Deterministic shard selector over a power-of-two shard count.
///
/// The same key always maps to the same shard for a given selector. With the
/// default [`FxBuildHasher`] the mapping is also stable across selectors and
/// process runs; a randomly seeded hasher makes it stable per instance only.
#[derive(Clone)]
pub struct ShardSelector<S = FxBuildHasher> {
    mask: usize,
    hasher: S,
}

impl<S: Default> ShardSelector<S> {
    /// Creates a selector for `shards` shards (rounded up to a power of two).
    pub fn new(shards: usize) -> Self {
        Self::with_hasher(shards, S::default())
    }
}

impl<S> ShardSelector<S> {
    /// Creates a selector using a caller-supplied hasher.
    pub fn with_hasher(shards: usize, hasher: S) -> Self {
        Self {
            mask: round_shard_count(shards) - 1,
            hasher,
        }
    }

    /// Returns the number of shards (always a power of two).
    #[inline]
    pub fn shard_count(&self) -> usize {
        self.mask + 1
    }

    /// Returns the hasher used for routing.
    pub fn hasher(&self) -> &S {
        &self.hasher
    }
}

impl<S: BuildHasher> ShardSelector<S> {
    /// Maps a key to a shard index in `[0, shard_count)`.
    #[inline]
    pub fn shard_for_key<Q: Hash + ?Sized>(&self, key: &Q) -> usize {
        (spread(self.hasher.hash_one(key)) as usize) & self.mask
    }
}

impl<S: Default> Default for ShardSelector<S> {
    /// Creates a single-shard selector.
    fn default() -> Self {
        Self::new(1)
    }
}

impl<S> fmt::Debug for ShardSelector<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShardSelector")
            .field("shards", &self.shard_count())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::hash_map::RandomState;

    use super::*;

    #[test]
    fn shard_count_is_rounded_to_power_of_two() {
        for (requested, expected) in [(0, 1), (1, 1), (2, 2), (3, 4), (9, 16), (64, 64)] {
            let selector: ShardSelector = ShardSelector::new(requested);
            assert_eq!(selector.shard_count(), expected, "requested {}", requested);
        }
    }

    #[test]
    fn shard_count_is_capped() {
        assert_eq!(round_shard_count(usize::MAX), MAX_SHARDS);
        assert_eq!(round_shard_count(MAX_SHARDS + 1), MAX_SHARDS);
    }

    #[test]
    fn shard_selector_is_deterministic() {
        let selector: ShardSelector = ShardSelector::new(8);

        let a = selector.shard_for_key(&"key");
        let b = selector.shard_for_key(&"key");
        assert_eq!(a, b);
        assert!(a < selector.shard_count());
    }

    #[test]
    fn seeded_hasher_is_deterministic_per_instance() {
        let selector = ShardSelector::with_hasher(16, RandomState::new());
        for key in 0..100u64 {
            assert_eq!(selector.shard_for_key(&key), selector.shard_for_key(&key));
        }
    }

    #[test]
    fn spread_folds_high_bits() {
        assert_eq!(spread(0), 0);
        assert_eq!(spread(1 << 32), (1 << 32) | 1);
        assert_eq!(spread(0xFFFF_FFFF), 0xFFFF_FFFF);
    }

    #[test]
    fn sequential_keys_reach_every_shard() {
        let selector: ShardSelector = ShardSelector::new(16);
        let mut seen = [false; 16];
        for key in 0..4096u64 {
            seen[selector.shard_for_key(&key)] = true;
        }
        assert!(seen.iter().all(|&hit| hit));
    }
}
