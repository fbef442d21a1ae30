//! Error types for the shardkit library.
//!
//! ## Key Components
//!
//! - [`ConfigError`]: Returned when cache configuration parameters are invalid
//!   (zero per-shard capacity, non-positive load factor).
//! - [`InvariantError`]: Returned by `check_invariants` when a shard's index,
//!   slot storage and recency list disagree.
//!
//! Misses are never errors: lookups return `None` / `false`.
//!
//! ## Example Usage
//!
//! ```
//! use shardkit::error::ConfigError;
//! use shardkit::ShardedLruCache;
//!
//! let cache: Result<ShardedLruCache<String, i32>, ConfigError> = ShardedLruCache::try_new(64);
//! assert!(cache.is_ok());
//!
//! // Zero per-shard capacity is caught without panicking
//! let bad = ShardedLruCache::<String, i32>::try_new(0);
//! assert!(bad.is_err());
//! ```

use std::fmt;

// ---------------------------------------------------------------------------
// ConfigError
// ---------------------------------------------------------------------------

/// Error returned when cache configuration parameters are invalid.
///
/// Produced by fallible constructors such as
/// [`ShardedLruCache::try_new`](crate::ShardedLruCache::try_new),
/// [`LruShard::try_new`](crate::policy::lru::LruShard::try_new) and
/// [`ShardedLruBuilder::try_build`](crate::builder::ShardedLruBuilder::try_build).
///
/// # Example
///
/// ```
/// use shardkit::policy::lru::LruShard;
///
/// let err = LruShard::<u64, u64>::try_new(0).unwrap_err();
/// assert!(err.to_string().contains("capacity"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigError(String);

impl ConfigError {
    /// Creates a new `ConfigError` with the given description.
    #[inline]
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }

    /// Returns the error description.
    #[inline]
    pub fn message(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid cache configuration: {}", self.0)
    }
}

impl std::error::Error for ConfigError {}

// ---------------------------------------------------------------------------
// InvariantError
// ---------------------------------------------------------------------------

/// Error returned when a shard's internal bookkeeping is inconsistent.
///
/// Carries a description of which invariant failed, e.g. the index length
/// disagreeing with the recency list length.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvariantError(String);

impl InvariantError {
    /// Creates a new `InvariantError` with the given description.
    #[inline]
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }

    /// Returns the error description.
    #[inline]
    pub fn message(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for InvariantError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "shard invariant violated: {}", self.0)
    }
}

impl std::error::Error for InvariantError {}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    // -- ConfigError ------------------------------------------------------

    #[test]
    fn config_display_prefixes_message() {
        let err = ConfigError::new("per_shard_capacity must be >= 1");
        assert_eq!(
            err.to_string(),
            "invalid cache configuration: per_shard_capacity must be >= 1"
        );
    }

    #[test]
    fn config_message_accessor_is_unprefixed() {
        let err = ConfigError::new("bad load factor");
        assert_eq!(err.message(), "bad load factor");
    }

    #[test]
    fn config_clone_and_eq() {
        let a = ConfigError::new("x");
        assert_eq!(a.clone(), a);
        assert_ne!(a, ConfigError::new("y"));
    }

    #[test]
    fn config_boxes_as_std_error() {
        let boxed: Box<dyn std::error::Error + Send + Sync> = Box::new(ConfigError::new("zero"));
        assert!(boxed.to_string().contains("zero"));
    }

    // -- InvariantError ---------------------------------------------------

    #[test]
    fn invariant_display_prefixes_message() {
        let err = InvariantError::new("index has 3 keys, recency list has 2");
        assert_eq!(
            err.to_string(),
            "shard invariant violated: index has 3 keys, recency list has 2"
        );
    }

    #[test]
    fn invariant_debug_includes_message() {
        let err = InvariantError::new("dangling slot");
        assert!(format!("{:?}", err).contains("dangling slot"));
    }

    #[test]
    fn invariant_implements_std_error() {
        fn assert_error<T: std::error::Error + Send + Sync + 'static>() {}
        assert_error::<InvariantError>();
        assert_error::<ConfigError>();
    }
}
