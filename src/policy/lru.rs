//! # Bounded LRU shard
//!
//! A single-partition, access-ordered map with a hard entry-count capacity.
//! [`ShardedLruCache`](crate::ShardedLruCache) owns one of these per shard
//! behind a [`ShardGuard`](crate::concurrent::guard::ShardGuard); it is also
//! usable on its own as a plain LRU map.
//!
//! ## Architecture
//!
//! ```text
//!   ┌──────────────────────────────────────────────────────────────────────┐
//!   │                          LruShard<K, V>                              │
//!   │                                                                      │
//!   │   index: FxHashMap<K, SlotId>          slots: Vec<Option<Entry>>     │
//!   │   ┌─────────┬────────┐                 ┌──────┬──────────────────┐   │
//!   │   │  "a"    │ slot 0 │ ──────────────► │  0   │ Entry { a, 1 }   │   │
//!   │   │  "c"    │ slot 2 │ ──────┐         │  1   │ None (free)      │   │
//!   │   └─────────┴────────┘       └───────► │  2   │ Entry { c, 3 }   │   │
//!   │                                        └──────┴──────────────────┘   │
//!   │                                                                      │
//!   │   recency: Mutex<RecencyList>                                        │
//!   │     head ──► [2] ◄──► [0] ◄── tail                                   │
//!   │      (MRU)                (LRU)                                      │
//!   └──────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Recency under shared access
//!
//! `get` takes `&self` so that concurrent readers holding a shard's shared
//! lock can still mark an entry most-recently-used. The recency list sits
//! behind its own small mutex for that purpose; it is a leaf lock and is only
//! ever taken while the caller already has shared access to the shard.
//! Mutating methods take `&mut self` and reach the list through
//! `Mutex::get_mut`, without locking.
//!
//! ## Eviction
//!
//! ```text
//!   put(D) with capacity = 3
//!
//!   Before:  head ──► [A] ◄──► [B] ◄──► [C] ◄── tail
//!   insert:  head ──► [D] ◄──► [A] ◄──► [B] ◄──► [C]    (len 4 > 3)
//!   evict:   head ──► [D] ◄──► [A] ◄──► [B] ◄── tail    (C returned)
//! ```
//!
//! Exactly one entry is evicted per overflowing insert, synchronously inside
//! the same call.
//!
//! ## Operations
//!
//! | Method            | Recency | Description                              |
//! |-------------------|---------|------------------------------------------|
//! | `get`             | MRU     | Value lookup                             |
//! | `peek`            | -       | Value lookup without reordering          |
//! | `put`             | MRU     | Insert or overwrite, may evict LRU       |
//! | `put_if_absent`   | MRU*    | Insert only if missing (*new keys only)  |
//! | `replace(_if)`    | MRU     | Overwrite existing keys only             |
//! | `remove(_if)`     | -       | Unlink and free the slot                 |
//! | `pop_lru`         | -       | Remove the eviction candidate            |
//! | `set_capacity`    | -       | Resize, evicting LRU entries on shrink   |
//!
//! ## Example Usage
//!
//! ```
//! use shardkit::policy::lru::LruShard;
//!
//! let mut shard: LruShard<&str, u32> = LruShard::new(2);
//! shard.put("a", 1);
//! shard.put("b", 2);
//!
//! // Reading "a" makes "b" the eviction candidate
//! assert_eq!(shard.get(&"a"), Some(&1));
//! shard.put("c", 3);
//!
//! assert!(shard.contains_key(&"a"));
//! assert!(!shard.contains_key(&"b"));
//! ```

use std::fmt;
use std::hash::Hash;
use std::mem;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use tracing::debug;

use crate::ds::recency_list::{RecencyList, SlotId};
use crate::error::{ConfigError, InvariantError};

/// Default number of entries a shard pre-sizes its storage for.
pub const DEFAULT_INITIAL_SIZE: usize = 16;

/// Default load factor applied to [`DEFAULT_INITIAL_SIZE`].
///
/// Shards are bounded by capacity, not by load factor, so a high value only
/// affects how much storage is reserved up front.
pub const DEFAULT_LOAD_FACTOR: f32 = 1.0;

/// Construction parameters for a single shard.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShardParams {
    /// Maximum number of entries; must be at least 1.
    pub capacity: usize,
    /// Number of entries to reserve storage for up front.
    pub initial_size: usize,
    /// Divisor applied to `initial_size` when reserving; must be finite and > 0.
    pub load_factor: f32,
}

impl ShardParams {
    /// Parameters with the given capacity and default sizing.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            initial_size: DEFAULT_INITIAL_SIZE,
            load_factor: DEFAULT_LOAD_FACTOR,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.capacity == 0 {
            return Err(ConfigError::new("per-shard capacity must be >= 1"));
        }
        if !self.load_factor.is_finite() || self.load_factor <= 0.0 {
            return Err(ConfigError::new(format!(
                "per-shard load factor must be finite and > 0, got {}",
                self.load_factor
            )));
        }
        Ok(())
    }

    /// Number of entries to reserve: `ceil(initial_size / load_factor)`,
    /// never more than `capacity`.
    pub fn reserve_hint(&self) -> usize {
        let wanted = (self.initial_size as f64 / f64::from(self.load_factor)).ceil();
        (wanted as usize).min(self.capacity)
    }
}

struct Entry<K, V> {
    key: K,
    value: V,
}

/// Bounded, access-ordered LRU map.
///
/// Invariant: `len() <= capacity()` after every call returns.
pub struct LruShard<K, V> {
    index: FxHashMap<K, SlotId>,
    slots: Vec<Option<Entry<K, V>>>,
    free: Vec<SlotId>,
    recency: Mutex<RecencyList>,
    capacity: usize,
}

impl<K, V> LruShard<K, V>
where
    K: Hash + Eq + Clone,
{
    /// Creates a shard holding at most `capacity` entries.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is 0. Use [`try_new`](Self::try_new) for
    /// user-supplied values.
    pub fn new(capacity: usize) -> Self {
        Self::try_new(capacity).unwrap_or_else(|err| panic!("{err}"))
    }

    /// Fallible constructor; rejects a zero capacity.
    pub fn try_new(capacity: usize) -> Result<Self, ConfigError> {
        Self::try_with_params(ShardParams::new(capacity))
    }

    /// Creates a shard with explicit sizing parameters.
    ///
    /// ```
    /// use shardkit::policy::lru::{LruShard, ShardParams};
    ///
    /// let params = ShardParams { capacity: 1024, initial_size: 64, load_factor: 0.75 };
    /// let shard: LruShard<u64, u64> = LruShard::try_with_params(params).unwrap();
    /// assert_eq!(shard.capacity(), 1024);
    /// ```
    pub fn try_with_params(params: ShardParams) -> Result<Self, ConfigError> {
        params.validate()?;
        Ok(Self::from_params(&params))
    }

    /// Builds a shard from parameters that were already validated.
    pub(crate) fn from_params(params: &ShardParams) -> Self {
        let reserve = params.reserve_hint();
        Self {
            index: FxHashMap::with_capacity_and_hasher(reserve, Default::default()),
            slots: Vec::with_capacity(reserve),
            free: Vec::new(),
            recency: Mutex::new(RecencyList::with_capacity(reserve)),
            capacity: params.capacity,
        }
    }

    /// Returns the value for `key` and marks it most recently used.
    pub fn get(&self, key: &K) -> Option<&V> {
        let id = *self.index.get(key)?;
        self.recency.lock().move_to_front(id);
        self.entry(id).map(|entry| &entry.value)
    }

    /// Returns the value for `key` without touching recency.
    pub fn peek(&self, key: &K) -> Option<&V> {
        let id = *self.index.get(key)?;
        self.entry(id).map(|entry| &entry.value)
    }

    /// Marks `key` most recently used without reading it.
    pub fn touch(&self, key: &K) -> bool {
        match self.index.get(key) {
            Some(&id) => self.recency.lock().move_to_front(id),
            None => false,
        }
    }

    /// Inserts or overwrites `key`, returning the previous value.
    ///
    /// The entry becomes most recently used; if the insert pushes the shard
    /// over capacity, the least recently used entry is evicted.
    pub fn put(&mut self, key: K, value: V) -> Option<V> {
        self.put_evicting(key, value).0
    }

    /// Like [`put`](Self::put), additionally returning the evicted entry.
    pub fn put_evicting(&mut self, key: K, value: V) -> (Option<V>, Option<(K, V)>) {
        if let Some(&id) = self.index.get(&key) {
            self.recency.get_mut().move_to_front(id);
            let previous = self
                .entry_mut(id)
                .map(|entry| mem::replace(&mut entry.value, value));
            return (previous, None);
        }

        let id = self.alloc_slot(Entry {
            key: key.clone(),
            value,
        });
        self.index.insert(key, id);
        self.recency.get_mut().push_front(id);

        let evicted = if self.index.len() > self.capacity {
            self.pop_lru()
        } else {
            None
        };
        (None, evicted)
    }

    /// Inserts only if `key` is missing.
    ///
    /// Returns the existing value (leaving value and recency untouched) when
    /// the key is present, `None` after a fresh insert.
    pub fn put_if_absent(&mut self, key: K, value: V) -> Option<&V> {
        self.put_if_absent_evicting(key, value).0
    }

    /// Like [`put_if_absent`](Self::put_if_absent), additionally returning the
    /// entry evicted by a fresh insert.
    pub fn put_if_absent_evicting(&mut self, key: K, value: V) -> (Option<&V>, Option<(K, V)>) {
        if let Some(&id) = self.index.get(&key) {
            return (self.entry(id).map(|entry| &entry.value), None);
        }
        let (_, evicted) = self.put_evicting(key, value);
        (None, evicted)
    }

    /// Removes `key`, returning its value.
    pub fn remove(&mut self, key: &K) -> Option<V> {
        let id = self.index.remove(key)?;
        self.recency.get_mut().unlink(id);
        self.release_slot(id).map(|entry| entry.value)
    }

    /// Overwrites `key` only if it is present; the entry becomes most recently
    /// used. Returns the previous value.
    pub fn replace(&mut self, key: &K, value: V) -> Option<V> {
        let id = *self.index.get(key)?;
        self.recency.get_mut().move_to_front(id);
        self.entry_mut(id)
            .map(|entry| mem::replace(&mut entry.value, value))
    }

    /// Returns `true` if `key` is present.
    pub fn contains_key(&self, key: &K) -> bool {
        self.index.contains_key(key)
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Maximum number of live entries.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Changes the capacity, evicting LRU entries until `len() <= capacity`.
    ///
    /// Returns the evicted entries in eviction order.
    pub fn set_capacity(&mut self, capacity: usize) -> Result<Vec<(K, V)>, ConfigError> {
        if capacity == 0 {
            return Err(ConfigError::new("per-shard capacity must be >= 1"));
        }
        self.capacity = capacity;
        let mut evicted = Vec::with_capacity(self.index.len().saturating_sub(capacity));
        while self.index.len() > self.capacity {
            match self.pop_lru() {
                Some(entry) => evicted.push(entry),
                None => break,
            }
        }
        debug!(capacity, evicted = evicted.len(), "shard capacity changed");
        Ok(evicted)
    }

    /// Drops every entry, keeping allocated storage for reuse.
    pub fn clear(&mut self) {
        self.index.clear();
        self.slots.clear();
        self.free.clear();
        self.recency.get_mut().clear();
    }

    /// The entry that the next overflowing insert would evict.
    pub fn peek_lru(&self) -> Option<(&K, &V)> {
        let id = self.recency.lock().back()?;
        self.entry(id).map(|entry| (&entry.key, &entry.value))
    }

    /// Removes and returns the least recently used entry.
    pub fn pop_lru(&mut self) -> Option<(K, V)> {
        let id = self.recency.get_mut().pop_back()?;
        let entry = self.release_slot(id)?;
        self.index.remove(&entry.key);
        Some((entry.key, entry.value))
    }

    /// Iterates entries from most to least recently used.
    ///
    /// The order is captured when the iterator is created.
    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> + '_ {
        let order: Vec<SlotId> = self.recency.lock().iter().collect();
        order
            .into_iter()
            .filter_map(move |id| self.entry(id).map(|entry| (&entry.key, &entry.value)))
    }

    /// Keys from most to least recently used.
    pub fn keys(&self) -> impl Iterator<Item = &K> + '_ {
        self.iter().map(|(key, _)| key)
    }

    /// Values from most to least recently used.
    pub fn values(&self) -> impl Iterator<Item = &V> + '_ {
        self.iter().map(|(_, value)| value)
    }

    /// Checks that the index, slot storage and recency list agree.
    pub fn check_invariants(&self) -> Result<(), InvariantError> {
        if self.index.len() > self.capacity {
            return Err(InvariantError::new(format!(
                "len {} exceeds capacity {}",
                self.index.len(),
                self.capacity
            )));
        }

        let recency = self.recency.lock();
        recency.check_links()?;
        if recency.len() != self.index.len() {
            return Err(InvariantError::new(format!(
                "index has {} keys, recency list has {}",
                self.index.len(),
                recency.len()
            )));
        }

        let occupied = self.slots.iter().filter(|slot| slot.is_some()).count();
        if occupied != self.index.len() {
            return Err(InvariantError::new(format!(
                "index has {} keys, {} slots are occupied",
                self.index.len(),
                occupied
            )));
        }

        for (key, &id) in &self.index {
            match self.entry(id) {
                Some(entry) if entry.key == *key => {},
                Some(_) => {
                    return Err(InvariantError::new(format!(
                        "slot {} holds a different key than the index",
                        id.index()
                    )));
                },
                None => {
                    return Err(InvariantError::new(format!(
                        "index points at empty slot {}",
                        id.index()
                    )));
                },
            }
            if !recency.contains(id) {
                return Err(InvariantError::new(format!(
                    "slot {} is missing from the recency list",
                    id.index()
                )));
            }
        }
        Ok(())
    }

    fn entry(&self, id: SlotId) -> Option<&Entry<K, V>> {
        self.slots.get(id.0).and_then(Option::as_ref)
    }

    fn entry_mut(&mut self, id: SlotId) -> Option<&mut Entry<K, V>> {
        self.slots.get_mut(id.0).and_then(Option::as_mut)
    }

    fn alloc_slot(&mut self, entry: Entry<K, V>) -> SlotId {
        match self.free.pop() {
            Some(id) => {
                self.slots[id.0] = Some(entry);
                id
            },
            None => {
                self.slots.push(Some(entry));
                SlotId(self.slots.len() - 1)
            },
        }
    }

    fn release_slot(&mut self, id: SlotId) -> Option<Entry<K, V>> {
        let entry = self.slots.get_mut(id.0)?.take()?;
        self.free.push(id);
        Some(entry)
    }
}

impl<K, V> LruShard<K, V>
where
    K: Hash + Eq + Clone,
    V: PartialEq,
{
    /// Removes `key` only if its current value equals `expected`.
    pub fn remove_if(&mut self, key: &K, expected: &V) -> bool {
        if self.peek(key) != Some(expected) {
            return false;
        }
        self.remove(key).is_some()
    }

    /// Overwrites `key` with `new` only if its current value equals `expected`.
    pub fn replace_if(&mut self, key: &K, expected: &V, new: V) -> bool {
        if self.peek(key) != Some(expected) {
            return false;
        }
        self.replace(key, new).is_some()
    }

    /// Returns `true` if any entry holds `value`. O(n).
    pub fn contains_value(&self, value: &V) -> bool {
        self.slots.iter().flatten().any(|entry| entry.value == *value)
    }
}

impl<K, V> fmt::Debug for LruShard<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LruShard")
            .field("len", &self.index.len())
            .field("capacity", &self.capacity)
            .finish_non_exhaustive()
    }
}

impl<K, V> Extend<(K, V)> for LruShard<K, V>
where
    K: Hash + Eq + Clone,
{
    fn extend<T: IntoIterator<Item = (K, V)>>(&mut self, iter: T) {
        for (key, value) in iter {
            self.put(key, value);
        }
    }
}
