//! In-memory TTL store
//!
//! Provides a `CacheStore` that keeps values in a process-local map with a
//! per-entry time-to-live. Expiry is lazy: a stale entry is only dropped when
//! its key is next read (or when `purge_expired` is called explicitly).

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// A stored value together with its freshness window
#[derive(Debug, Clone)]
struct CacheEntry<V> {
    /// The cached value
    value: V,
    /// When the value was stored
    stored_at: Instant,
    /// How long the value stays fresh
    ttl: Duration,
}

impl<V> CacheEntry<V> {
    fn is_expired(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.stored_at) >= self.ttl
    }
}

/// Process-local key/value map with lazy TTL expiry
///
/// Cloning a `CacheStore` yields another handle to the same map. Values are
/// always returned by clone; callers never hold a reference into the map.
#[derive(Debug)]
pub struct CacheStore<V> {
    entries: Arc<Mutex<HashMap<String, CacheEntry<V>>>>,
}

impl<V> Clone for CacheStore<V> {
    fn clone(&self) -> Self {
        Self {
            entries: Arc::clone(&self.entries),
        }
    }
}

impl<V> Default for CacheStore<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> CacheStore<V> {
    /// Creates an empty store
    pub fn new() -> Self {
        Self {
            entries: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Stores `value` under `key`, replacing any existing entry
    ///
    /// # Arguments
    /// * `key` - Cache key (e.g., "market_data:5:^JKSE,4:GC=F")
    /// * `value` - The value to store
    /// * `ttl` - How long the entry should be considered fresh
    pub fn set(&self, key: &str, value: V, ttl: Duration) {
        let entry = CacheEntry {
            value,
            stored_at: Instant::now(),
            ttl,
        };
        self.entries.lock().insert(key.to_string(), entry);
    }

    /// Removes the entry for `key`, fresh or not
    ///
    /// Returns `true` if an entry was present.
    pub fn remove(&self, key: &str) -> bool {
        self.entries.lock().remove(key).is_some()
    }

    /// Drops every entry
    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    /// Removes all expired entries and returns how many were dropped
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired(now));
        before - entries.len()
    }

    /// Number of entries currently held, including expired ones not yet read
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

impl<V: Clone> CacheStore<V> {
    /// Reads the value for `key`
    ///
    /// Returns `None` if there is no entry, or if the entry has outlived its
    /// TTL. In the latter case the stale entry is removed.
    pub fn get(&self, key: &str) -> Option<V> {
        let now = Instant::now();
        let mut entries = self.entries.lock();

        match entries.get(key) {
            Some(entry) if !entry.is_expired(now) => Some(entry.value.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }
}
