// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use std::borrow::Borrow;
use std::hash::Hash;
use std::sync::atomic::{AtomicBool, Ordering};

use ahash::{HashMap, HashMapExt as _};
use parking_lot::RwLock;

const ORDERING: Ordering = Ordering::SeqCst;

/// Thread-safe map from a queue key to the values maturing under it, bounded
/// by a maximum number of keys.
///
/// Reads and writes copy values in and out, so nothing handed to or returned
/// from the entry aliases its state. The `dirty` and `full` flags are plain
/// atomics so callers can check them without taking the lock; `full` is only
/// ever changed while holding the write lock.
#[derive(Debug)]
pub struct CacheEntry<K, T> {
    data: RwLock<HashMap<K, Vec<T>>>,
    dirty: AtomicBool,
    full: AtomicBool,
    /// `0` means unlimited.
    max: usize,
}

impl<K, T> CacheEntry<K, T>
where
    K: Eq + Hash + Clone,
    T: Clone,
{
    /// Creates an empty entry. New entries start dirty, so the first read
    /// through the owning cache populates them from the store.
    pub fn new(max: usize) -> Self {
        Self {
            data: RwLock::new(HashMap::new()),
            dirty: AtomicBool::new(true),
            full: AtomicBool::new(false),
            max,
        }
    }

    /// Returns a deep copy of every key and its values.
    pub fn get(&self) -> HashMap<K, Vec<T>> {
        self.data.read().clone()
    }

    /// Returns a copy of the values under `key`, or an empty list.
    pub fn get_entry<Q>(&self, key: &Q) -> Vec<T>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.data.read().get(key).cloned().unwrap_or_default()
    }

    /// Inserts or replaces the values under `key` and returns `true`. Once the
    /// entry is full this is a no-op returning `false`, overwrites of existing
    /// keys included.
    pub fn set_entry(&self, key: K, values: impl Into<Vec<T>>) -> bool {
        if self.is_full() {
            return false;
        }
        let values = values.into();
        let mut data = self.data.write();
        // Another writer may have filled the entry since the unlocked check.
        if self.is_full() {
            return false;
        }
        data.insert(key, values);
        if self.max > 0 && data.len() >= self.max {
            self.full.store(true, ORDERING);
        }
        true
    }

    /// Removes `key`. Clears the full flag once the entry is back under its
    /// bound.
    pub fn delete_entry<Q>(&self, key: &Q)
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let mut data = self.data.write();
        data.remove(key);
        if self.max > 0 && data.len() < self.max {
            self.full.store(false, ORDERING);
        }
    }

    /// Drops every key and clears the full flag. The dirty flag is left alone.
    pub fn clear(&self) {
        let mut data = self.data.write();
        *data = HashMap::new();
        self.full.store(false, ORDERING);
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty.load(ORDERING)
    }

    pub fn set_dirty(&self, dirty: bool) {
        self.dirty.store(dirty, ORDERING);
    }

    pub fn is_full(&self) -> bool {
        self.full.load(ORDERING)
    }

    /// Number of keys currently held.
    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.read().is_empty()
    }

    pub fn max_size(&self) -> usize {
        self.max
    }
}
