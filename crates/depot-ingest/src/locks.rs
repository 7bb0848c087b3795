//! Per-key mutual exclusion.
//!
//! [`KeyedLocks`] serializes work on the same key (an artifact's
//! `(collection, path)` or a release version) while letting different keys
//! proceed in parallel. Only keys that are currently held occupy memory.

use std::collections::HashSet;
use std::hash::Hash;
use std::sync::{Condvar, Mutex};

/// Set of currently held keys plus a condition variable to wait on.
#[derive(Debug)]
pub struct KeyedLocks<K> {
    held: Mutex<HashSet<K>>,
    released: Condvar,
}

impl<K: Eq + Hash + Clone> KeyedLocks<K> {
    pub fn new() -> Self {
        Self {
            held: Mutex::new(HashSet::new()),
            released: Condvar::new(),
        }
    }

    /// Block until `key` is free, then hold it until the guard drops.
    pub fn lock(&self, key: &K) -> KeyGuard<'_, K> {
        // The set is only ever mutated by single insert/remove calls, so a
        // poisoned lock still guards a consistent set.
        let mut held = self.held.lock().unwrap_or_else(|e| e.into_inner());
        while held.contains(key) {
            held = self.released.wait(held).unwrap_or_else(|e| e.into_inner());
        }
        held.insert(key.clone());
        KeyGuard {
            locks: self,
            key: key.clone(),
        }
    }

    /// Number of keys currently held.
    pub fn held_count(&self) -> usize {
        self.held.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

impl<K: Eq + Hash + Clone> Default for KeyedLocks<K> {
    fn default() -> Self {
        Self::new()
    }
}

/// Holds one key of a [`KeyedLocks`]; releases it on drop.
#[derive(Debug)]
pub struct KeyGuard<'a, K: Eq + Hash + Clone> {
    locks: &'a KeyedLocks<K>,
    key: K,
}

impl<K: Eq + Hash + Clone> Drop for KeyGuard<'_, K> {
    fn drop(&mut self) {
        let mut held = self.locks.held.lock().unwrap_or_else(|e| e.into_inner());
        held.remove(&self.key);
        self.locks.released.notify_all();
    }
}
