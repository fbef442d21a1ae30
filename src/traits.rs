//! # Shared-access cache contract
//!
//! ```text
//!   ┌─────────────────────────────────────────────┐
//!   │        ConcurrentCache<K, V>: Send + Sync   │
//!   │                                             │
//!   │  get(&, &K) → Option<V>                     │
//!   │  put(&, K, V) → Option<V>                   │
//!   │  put_if_absent(&, K, V) → Option<V>         │
//!   │  remove(&, &K) → Option<V>                  │
//!   │  replace(&, &K, V) → Option<V>              │
//!   │  contains_key(&, &K) → bool                 │
//!   │  len(&) → usize / is_empty(&) → bool        │
//!   │  max_len(&) → usize                         │
//!   │  clear(&)                                   │
//!   │  get_or_insert_with(&, K, FnOnce() → V)     │
//!   └─────────────────────────────────────────────┘
//! ```
//!
//! Every method takes `&self`: implementations synchronize internally, so a
//! single instance can sit behind an `Arc` and be called from any thread.
//! Reads return owned values rather than references because no lock is held
//! once the call returns.
//!
//! Code that only needs a lookup memoizer (resolvers, converters, reflective
//! lookups) can depend on this trait instead of a concrete cache type.
//!
//! ## Example Usage
//!
//! ```
//! use shardkit::traits::ConcurrentCache;
//! use shardkit::ShardedLruCache;
//!
//! fn resolve<C: ConcurrentCache<String, usize>>(cache: &C, name: &str) -> usize {
//!     cache.get_or_insert_with(name.to_string(), || name.len())
//! }
//!
//! let cache: ShardedLruCache<String, usize> = ShardedLruCache::new(64);
//! assert_eq!(resolve(&cache, "converter"), 9);
//! assert!(cache.contains_key(&"converter".to_string()));
//! ```

use std::hash::{BuildHasher, Hash};

use crate::concurrent::sharded::ShardedLruCache;

/// Bounded cache usable through a shared reference from many threads.
pub trait ConcurrentCache<K, V>: Send + Sync {
    /// Returns the value for `key`, updating its recency.
    fn get(&self, key: &K) -> Option<V>;

    /// Inserts or overwrites, returning the previous value. May evict.
    fn put(&self, key: K, value: V) -> Option<V>;

    /// Inserts only if `key` is absent, returning the existing value otherwise.
    fn put_if_absent(&self, key: K, value: V) -> Option<V>;

    fn remove(&self, key: &K) -> Option<V>;

    /// Overwrites an existing key only.
    fn replace(&self, key: &K, value: V) -> Option<V>;

    fn contains_key(&self, key: &K) -> bool;

    /// Current number of entries; approximate under concurrent writes.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Upper bound on [`len`](Self::len).
    fn max_len(&self) -> usize;

    fn clear(&self);

    /// Returns the cached value or computes, inserts and returns it.
    ///
    /// `init` may run even if another thread inserts the same key
    /// concurrently; the value that ends up cached is returned.
    fn get_or_insert_with<F>(&self, key: K, init: F) -> V
    where
        F: FnOnce() -> V,
        V: Clone,
        Self: Sized,
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
}

impl<K, V, S> ConcurrentCache<K, V> for ShardedLruCache<K, V, S>
where
    K: Hash + Eq + Clone + Send + Sync,
    V: Clone + Send + Sync,
    S: BuildHasher + Send + Sync,
{
    fn get(&self, key: &K) -> Option<V> {
        ShardedLruCache::get(self, key)
    }

    fn put(&self, key: K, value: V) -> Option<V> {
        ShardedLruCache::put(self, key, value)
    }

    fn put_if_absent(&self, key: K, value: V) -> Option<V> {
        ShardedLruCache::put_if_absent(self, key, value)
    }

    fn remove(&self, key: &K) -> Option<V> {
        ShardedLruCache::remove(self, key)
    }

    fn replace(&self, key: &K, value: V) -> Option<V> {
        ShardedLruCache::replace(self, key, value)
    }

    fn contains_key(&self, key: &K) -> bool {
        ShardedLruCache::contains_key(self, key)
    }

    fn len(&self) -> usize {
        ShardedLruCache::len(self)
    }

    fn is_empty(&self) -> bool {
        ShardedLruCache::is_empty(self)
    }

    fn max_len(&self) -> usize {
        ShardedLruCache::max_len(self)
    }

    fn clear(&self) {
        ShardedLruCache::clear(self)
    }
}
