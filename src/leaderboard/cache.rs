//! Short-lived get-or-compute result cache
//!
//! Entries expire a fixed TTL after they are stored and are never
//! invalidated by writes. Readers may therefore see results up to one TTL
//! old.

use ahash::AHashMap;
use parking_lot::Mutex;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tracing::trace;

struct CachedValue<V> {
    value: V,
    expires_at: Instant,
}

/// Hit/miss counters since construction
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
}

pub struct ResultCache<K, V> {
    ttl: Duration,
    max_entries: usize,
    entries: Mutex<AHashMap<K, CachedValue<V>>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl<K, V> ResultCache<K, V>
where
    K: Hash + Eq + Clone,
    V: Clone,
{
    pub fn new(ttl: Duration, max_entries: usize) -> Self {
        assert!(max_entries > 0, "Cache size must be larger than zero");
        ResultCache {
            ttl,
            max_entries,
            entries: Mutex::new(AHashMap::new()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Returns the live value for `key`, if any.
    pub fn get(&self, key: &K) -> Option<V> {
        let now = Instant::now();
        let entries = self.entries.lock();
        let found = entries
            .get(key)
            .filter(|cached| cached.expires_at > now)
            .map(|cached| cached.value.clone());
        drop(entries);

        match found {
            Some(value) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(value)
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Store `value` under `key`, expiring one TTL from now.
    pub fn insert(&self, key: K, value: V) {
        let now = Instant::now();
        let mut entries = self.entries.lock();

        if entries.len() >= self.max_entries && !entries.contains_key(&key) {
            entries.retain(|_, cached| cached.expires_at > now);
            if entries.len() >= self.max_entries {
                let oldest = entries
                    .iter()
                    .min_by_key(|(_, cached)| cached.expires_at)
                    .map(|(k, _)| k.clone());
                if let Some(oldest) = oldest {
                    entries.remove(&oldest);
                }
            }
        }

        entries.insert(
            key,
            CachedValue {
                value,
                expires_at: now + self.ttl,
            },
        );
    }

    /// Return the cached value, or compute, store and return it.
    ///
    /// `compute` runs without the cache lock held; concurrent misses on the
    /// same key may both compute, and the last store wins.
    pub fn get_or_compute<F>(&self, key: K, compute: F) -> V
    where
        F: FnOnce() -> V,
    {
        if let Some(value) = self.get(&key) {
            return value;
        }

        let value = compute();
        self.insert(key, value.clone());
        value
    }

    /// Drop expired entries. Returns how many were removed.
    pub fn evict_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|_, cached| cached.expires_at > now);
        let evicted = before - entries.len();
        if evicted > 0 {
            trace!(evicted, remaining = entries.len(), "evicted expired cache entries");
        }
        evicted
    }

    /// Number of stored entries, expired or not
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}
