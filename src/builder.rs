//! Validated construction for [`ShardedLruCache`].
//!
//! ## Example
//!
//! ```rust
//! use shardkit::builder::ShardedLruBuilder;
//!
//! let cache = ShardedLruBuilder::new(256)
//!     .shard_count(12) // rounded up to 16
//!     .per_shard_initial_size(64)
//!     .per_shard_load_factor(0.75)
//!     .build::<u64, String>();
//!
//! cache.put(1, "hello".to_string());
//! assert_eq!(cache.get(&1), Some("hello".to_string()));
//! assert_eq!(cache.shard_count(), 16);
//! assert_eq!(cache.max_len(), 16 * 256);
//! ```
//!
//! ## Settings
//!
//! | Setting                  | Default | Constraint                          |
//! |--------------------------|---------|-------------------------------------|
//! | `shard_count`            | 16      | rounded up to a power of two        |
//! | `per_shard_capacity`     | -       | required, >= 1                      |
//! | `per_shard_initial_size` | 16      | storage reserved on allocation      |
//! | `per_shard_load_factor`  | 1.0     | finite and > 0                      |
//! | `hasher`                 | Fx      | any `BuildHasher`                   |

use std::fmt;
use std::hash::Hash;

use rustc_hash::FxBuildHasher;

use crate::concurrent::sharded::ShardedLruCache;
use crate::error::ConfigError;
use crate::policy::lru::{ShardParams, DEFAULT_INITIAL_SIZE, DEFAULT_LOAD_FACTOR};

/// Shard count used when none is requested.
pub const DEFAULT_SHARD_COUNT: usize = 16;

/// Entries each shard reserves storage for when it is first allocated.
pub const DEFAULT_PER_SHARD_INITIAL_SIZE: usize = DEFAULT_INITIAL_SIZE;

pub const DEFAULT_PER_SHARD_LOAD_FACTOR: f32 = DEFAULT_LOAD_FACTOR;

/// Plain configuration for a sharded cache.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShardedLruConfig {
    /// Requested shard count; rounded up to a power of two at construction.
    pub shard_count: usize,
    pub per_shard_capacity: usize,
    pub per_shard_initial_size: usize,
    pub per_shard_load_factor: f32,
}

impl ShardedLruConfig {
    /// Configuration with the given per-shard capacity and default settings.
    pub fn new(per_shard_capacity: usize) -> Self {
        Self {
            shard_count: DEFAULT_SHARD_COUNT,
            per_shard_capacity,
            per_shard_initial_size: DEFAULT_PER_SHARD_INITIAL_SIZE,
            per_shard_load_factor: DEFAULT_PER_SHARD_LOAD_FACTOR,
        }
    }

    /// Parameters every shard of the cache is allocated with.
    pub fn shard_params(&self) -> ShardParams {
        ShardParams {
            capacity: self.per_shard_capacity,
            initial_size: self.per_shard_initial_size,
            load_factor: self.per_shard_load_factor,
        }
    }

    /// Rejects a zero per-shard capacity and a non-finite or non-positive
    /// load factor. Any shard count is accepted.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.shard_params().validate()
    }
}

/// Fluent builder for [`ShardedLruCache`].
#[derive(Clone)]
pub struct ShardedLruBuilder<S = FxBuildHasher> {
    config: ShardedLruConfig,
    hasher: S,
}

impl ShardedLruBuilder<FxBuildHasher> {
    pub fn new(per_shard_capacity: usize) -> Self {
        Self {
            config: ShardedLruConfig::new(per_shard_capacity),
            hasher: FxBuildHasher,
        }
    }
}

impl<S> ShardedLruBuilder<S> {
    pub fn shard_count(mut self, shard_count: usize) -> Self {
        self.config.shard_count = shard_count;
        self
    }

    pub fn per_shard_capacity(mut self, capacity: usize) -> Self {
        self.config.per_shard_capacity = capacity;
        self
    }

    pub fn per_shard_initial_size(mut self, initial_size: usize) -> Self {
        self.config.per_shard_initial_size = initial_size;
        self
    }

    pub fn per_shard_load_factor(mut self, load_factor: f32) -> Self {
        self.config.per_shard_load_factor = load_factor;
        self
    }

    /// Routes keys with `hasher` instead of the default Fx hasher.
    ///
    /// A randomly seeded hasher (such as `std`'s `RandomState`) keeps key to
    /// shard mapping stable for one cache instance only.
    pub fn hasher<H>(self, hasher: H) -> ShardedLruBuilder<H> {
        ShardedLruBuilder {
            config: self.config,
            hasher,
        }
    }

    pub fn config(&self) -> &ShardedLruConfig {
        &self.config
    }

    /// Builds the cache, returning an error for invalid settings.
    pub fn try_build<K, V>(self) -> Result<ShardedLruCache<K, V, S>, ConfigError>
    where
        K: Hash + Eq + Clone,
    {
        ShardedLruCache::from_config(&self.config, self.hasher)
    }

    /// Builds the cache.
    ///
    /// # Panics
    ///
    /// Panics if the configuration is invalid; see [`try_build`](Self::try_build).
    pub fn build<K, V>(self) -> ShardedLruCache<K, V, S>
    where
        K: Hash + Eq + Clone,
    {
        self.try_build().unwrap_or_else(|err| panic!("{err}"))
    }
}

impl<S> fmt::Debug for ShardedLruBuilder<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShardedLruBuilder")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::hash_map::RandomState;

    use super::*;

    #[test]
    fn config_defaults() {
        let config = ShardedLruConfig::new(32);
        assert_eq!(config.shard_count, 16);
        assert_eq!(config.per_shard_initial_size, 16);
        assert_eq!(config.per_shard_load_factor, 1.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn builder_applies_every_setting() {
        let builder = ShardedLruBuilder::new(8)
            .shard_count(3)
            .per_shard_capacity(10)
            .per_shard_initial_size(4)
            .per_shard_load_factor(0.5);
        assert_eq!(
            *builder.config(),
            ShardedLruConfig {
                shard_count: 3,
                per_shard_capacity: 10,
                per_shard_initial_size: 4,
                per_shard_load_factor: 0.5,
            }
        );

        let cache = builder.build::<u64, u64>();
        assert_eq!(cache.shard_count(), 4);
        assert_eq!(cache.per_shard_capacity(), 10);
    }

    #[test]
    fn invalid_settings_are_rejected() {
        assert!(ShardedLruBuilder::new(0).try_build::<u64, u64>().is_err());
        for bad in [0.0, -1.0, f32::NAN, f32::INFINITY] {
            let result = ShardedLruBuilder::new(4)
                .per_shard_load_factor(bad)
                .try_build::<u64, u64>();
            assert!(result.is_err(), "load factor {bad} accepted");
        }
    }

    #[test]
    #[should_panic(expected = "load factor")]
    fn build_panics_on_invalid_load_factor() {
        let _ = ShardedLruBuilder::new(4).per_shard_load_factor(0.0).build::<u64, u64>();
    }

    #[test]
    fn custom_hasher_routes_consistently() {
        let cache = ShardedLruBuilder::new(4)
            .shard_count(8)
            .hasher(RandomState::new())
            .build::<String, u32>();

        let key = "stable".to_string();
        let shard = cache.shard_index(&key);
        for _ in 0..10 {
            assert_eq!(cache.shard_index(&key), shard);
        }
        cache.put(key.clone(), 1);
        assert_eq!(cache.get(&key), Some(1));
    }
}
