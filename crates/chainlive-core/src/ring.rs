//! Bounded newest-first FIFO with an optional identity key.
//!
//! Every "recent N" collection in the stores is one of these: insertion
//! prepends, anything past capacity falls off the old end, and a keyed
//! buffer silently refuses a second entry with a key it already holds.

use std::collections::VecDeque;

use serde::{Serialize, Serializer};

/// What happened to an item handed to [`BoundedFifo::push`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    /// Stored; nothing was dropped.
    Inserted,
    /// Stored; the oldest entry was dropped to stay within capacity.
    Evicted,
    /// An entry with the same identity key is already present; nothing changed.
    Duplicate,
}

impl PushOutcome {
    /// Returns `true` if the item was stored.
    pub fn is_stored(self) -> bool {
        !matches!(self, Self::Duplicate)
    }
}

/// Fixed-capacity buffer ordered newest first.
///
/// `K` is the identity key type. Buffers built with [`BoundedFifo::new`] have
/// no key (`K = ()`) and accept every push.
#[derive(Clone)]
pub struct BoundedFifo<T, K = ()> {
    /// Front = newest.
    items: VecDeque<T>,
    capacity: usize,
    key_of: Option<fn(&T) -> K>,
}

impl<T> BoundedFifo<T, ()> {
    /// Unkeyed buffer: an append-only log capped at `capacity`.
    pub fn new(capacity: usize) -> Self {
        Self {
            items: VecDeque::with_capacity(capacity),
            capacity,
            key_of: None,
        }
    }
}

impl<T, K: PartialEq> BoundedFifo<T, K> {
    /// Keyed buffer: at most one entry per `key_of(item)`.
    pub fn keyed(capacity: usize, key_of: fn(&T) -> K) -> Self {
        Self {
            items: VecDeque::with_capacity(capacity),
            capacity,
            key_of: Some(key_of),
        }
    }

    /// Prepend `item`, dropping the oldest entry if the buffer is full.
    pub fn push(&mut self, item: T) -> PushOutcome {
        if let Some(key_of) = self.key_of {
            let key = key_of(&item);
            if self.items.iter().any(|existing| key_of(existing) == key) {
                return PushOutcome::Duplicate;
            }
        }
        self.items.push_front(item);
        if self.items.len() > self.capacity {
            self.items.truncate(self.capacity);
            PushOutcome::Evicted
        } else {
            PushOutcome::Inserted
        }
    }

    /// Returns `true` if an entry with `key` is present.
    ///
    /// Always `false` for an unkeyed buffer.
    pub fn contains_key(&self, key: &K) -> bool {
        match self.key_of {
            Some(key_of) => self.items.iter().any(|item| key_of(item) == *key),
            None => false,
        }
    }
}

impl<T, K> BoundedFifo<T, K> {
    /// Most recently inserted entry.
    pub fn newest(&self) -> Option<&T> {
        self.items.front()
    }

    /// Entries, newest first.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &T> + ExactSizeIterator {
        self.items.iter()
    }

    /// First entry (newest first) matching `pred`, mutably.
    pub fn find_mut(&mut self, mut pred: impl FnMut(&T) -> bool) -> Option<&mut T> {
        self.items.iter_mut().find(|item| pred(item))
    }

    /// Keep only entries matching `pred`.
    pub fn retain(&mut self, pred: impl FnMut(&T) -> bool) {
        self.items.retain(pred);
    }

    /// Remove every entry matching `pred`, returning how many were removed.
    pub fn remove_where(&mut self, mut pred: impl FnMut(&T) -> bool) -> usize {
        let before = self.items.len();
        self.items.retain(|item| !pred(item));
        before - self.items.len()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Owned copy of the entries, newest first.
    pub fn to_vec(&self) -> Vec<T>
    where
        T: Clone,
    {
        self.items.iter().cloned().collect()
    }
}

impl<T: std::fmt::Debug, K> std::fmt::Debug for BoundedFifo<T, K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoundedFifo")
            .field("capacity", &self.capacity)
            .field("keyed", &self.key_of.is_some())
            .field("items", &self.items)
            .finish()
    }
}

/// Serialized as a plain list, newest first.
impl<T: Serialize, K> Serialize for BoundedFifo<T, K> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.items.iter())
    }
}
