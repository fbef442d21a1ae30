//! Index-linked recency list.
//!
//! Tracks most-recently-used to least-recently-used order over [`SlotId`]s
//! that are allocated elsewhere (the owning shard's slot storage). Links are
//! stored in a flat `Vec` indexed by slot, so relinking is O(1) and never
//! allocates once the table has grown to the shard's high-water mark.
//!
//! ## Architecture
//!
//! ```text
//!   links (Vec<Link>, indexed by SlotId)
//!   ┌────────┬────────────────────────────────────────┐
//!   │ slot 0 │ { prev: Some(2), next: None,  linked } │  ◄── tail (LRU)
//!   │ slot 1 │ { prev: None,    next: None,  free   } │
//!   │ slot 2 │ { prev: None,    next: Some(0), linked}│  ◄── head (MRU)
//!   └────────┴────────────────────────────────────────┘
//!
//!   head ─► [2] ◄──► [0] ◄── tail
//! ```
//!
//! ## Operations
//! - `push_front(id)`: link a fresh slot at the MRU end
//! - `move_to_front(id)`: detach + attach at the MRU end
//! - `pop_back()`: unlink and return the LRU slot
//! - `unlink(id)`: detach an arbitrary slot
//!
//! All operations are O(1) except `iter` and `check_links`.

use crate::error::InvariantError;

/// Stable handle of an entry slot inside a shard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SlotId(pub(crate) usize);

impl SlotId {
    /// Returns the raw slot index.
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct Link {
    prev: Option<SlotId>,
    next: Option<SlotId>,
    linked: bool,
}

/// Doubly linked MRU -> LRU ordering of slot ids.
#[derive(Debug, Default)]
pub struct RecencyList {
    links: Vec<Link>,
    head: Option<SlotId>,
    tail: Option<SlotId>,
    len: usize,
}

impl RecencyList {
    /// Creates an empty list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty list with room for `capacity` slots.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            links: Vec::with_capacity(capacity),
            ..Self::default()
        }
    }

    /// Number of linked slots.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns `true` if `id` is currently linked.
    pub fn contains(&self, id: SlotId) -> bool {
        self.links.get(id.0).is_some_and(|link| link.linked)
    }

    /// Most recently used slot.
    pub fn front(&self) -> Option<SlotId> {
        self.head
    }

    /// Least recently used slot.
    pub fn back(&self) -> Option<SlotId> {
        self.tail
    }

    /// Links `id` at the MRU end. Returns `false` if it was already linked.
    pub fn push_front(&mut self, id: SlotId) -> bool {
        if id.0 >= self.links.len() {
            self.links.resize(id.0 + 1, Link::default());
        }
        if self.links[id.0].linked {
            return false;
        }
        self.links[id.0].linked = true;
        self.attach_front(id);
        self.len += 1;
        true
    }

    /// Moves a linked slot to the MRU end. Returns `false` if `id` is not linked.
    pub fn move_to_front(&mut self, id: SlotId) -> bool {
        if !self.contains(id) {
            return false;
        }
        if self.head != Some(id) {
            self.detach(id);
            self.attach_front(id);
        }
        true
    }

    /// Unlinks `id`. Returns `false` if it was not linked.
    pub fn unlink(&mut self, id: SlotId) -> bool {
        if !self.contains(id) {
            return false;
        }
        self.detach(id);
        self.links[id.0].linked = false;
        self.len -= 1;
        true
    }

    /// Unlinks and returns the LRU slot.
    pub fn pop_back(&mut self) -> Option<SlotId> {
        let id = self.tail?;
        self.unlink(id);
        Some(id)
    }

    /// Unlinks every slot, keeping the link table allocation.
    pub fn clear(&mut self) {
        self.links.iter_mut().for_each(|link| *link = Link::default());
        self.head = None;
        self.tail = None;
        self.len = 0;
    }

    /// Iterates slot ids from MRU to LRU.
    pub fn iter(&self) -> Iter<'_> {
        Iter {
            list: self,
            current: self.head,
            remaining: self.len,
        }
    }

    /// Walks the list in both directions and checks it against `len`.
    pub fn check_links(&self) -> Result<(), InvariantError> {
        let mut count = 0usize;
        let mut prev: Option<SlotId> = None;
        let mut current = self.head;
        while let Some(id) = current {
            let link = self
                .links
                .get(id.0)
                .ok_or_else(|| InvariantError::new(format!("slot {} has no link entry", id.0)))?;
            if !link.linked {
                return Err(InvariantError::new(format!(
                    "slot {} reachable but not marked linked",
                    id.0
                )));
            }
            if link.prev != prev {
                return Err(InvariantError::new(format!(
                    "slot {} prev pointer is inconsistent",
                    id.0
                )));
            }
            count += 1;
            if count > self.len {
                return Err(InvariantError::new("cycle detected in recency list"));
            }
            prev = current;
            current = link.next;
        }
        if prev != self.tail {
            return Err(InvariantError::new("tail does not match last reachable slot"));
        }
        if count != self.len {
            return Err(InvariantError::new(format!(
                "recency list reaches {} slots but len is {}",
                count, self.len
            )));
        }
        Ok(())
    }

    fn detach(&mut self, id: SlotId) {
        let Link { prev, next, .. } = self.links[id.0];
        match prev {
            Some(p) => self.links[p.0].next = next,
            None => self.head = next,
        }
        match next {
            Some(n) => self.links[n.0].prev = prev,
            None => self.tail = prev,
        }
        let link = &mut self.links[id.0];
        link.prev = None;
        link.next = None;
    }

    fn attach_front(&mut self, id: SlotId) {
        let old_head = self.head;
        {
            let link = &mut self.links[id.0];
            link.prev = None;
            link.next = old_head;
        }
        match old_head {
            Some(h) => self.links[h.0].prev = Some(id),
            None => self.tail = Some(id),
        }
        self.head = Some(id);
    }
}

/// MRU -> LRU iterator over linked slot ids.
pub struct Iter<'a> {
    list: &'a RecencyList,
    current: Option<SlotId>,
    remaining: usize,
}

impl Iterator for Iter<'_> {
    type Item = SlotId;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.current?;
        self.current = self.list.links[id.0].next;
        self.remaining = self.remaining.saturating_sub(1);
        Some(id)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}
