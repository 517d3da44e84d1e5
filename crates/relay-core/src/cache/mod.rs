//! TTL key-value stores for RPC responses and token metadata.
//!
//! Entries expire passively on read and eagerly via a periodic sweep task.
//! Values are inserted only after JSON validation upstream, so a store can
//! never hold a body that failed to parse.

use dashmap::DashMap;
use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::{Duration, Instant},
};
use tracing::debug;

struct Entry<V> {
    value: V,
    inserted_at: Instant,
}

/// Point-in-time counters for one cache namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub keys: usize,
}

/// A TTL cache namespace.
///
/// Two instances exist process-wide: a short-TTL store for generic RPC
/// responses and a long-TTL store for token metadata. Thread-safe via
/// `DashMap`; counters are atomics.
pub struct TtlCache<V> {
    name: &'static str,
    ttl: Duration,
    entries: DashMap<String, Entry<V>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl<V: Clone + Send + Sync + 'static> TtlCache<V> {
    #[must_use]
    pub fn new(name: &'static str, ttl: Duration) -> Self {
        Self { name, ttl, entries: DashMap::new(), hits: AtomicU64::new(0), misses: AtomicU64::new(0) }
    }

    /// Looks up a key, removing it first if its TTL has elapsed.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<V> {
        if let Some(entry) = self.entries.get(key) {
            if entry.inserted_at.elapsed() < self.ttl {
                self.hits.fetch_add(1, Ordering::Relaxed);
                return Some(entry.value.clone());
            }
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
            return None;
        }

        // Expired: drop the read guard before removing.
        self.entries.remove(key);
        self.misses.fetch_add(1, Ordering::Relaxed);
        None
    }

    /// Stores a value, resetting its TTL clock.
    pub fn insert(&self, key: impl Into<String>, value: V) {
        self.entries.insert(key.into(), Entry { value, inserted_at: Instant::now() });
    }

    /// Removes every entry past its TTL, returning how many were evicted.
    pub fn purge_expired(&self) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.inserted_at.elapsed() < self.ttl);
        before - self.entries.len()
    }

    /// Number of stored (possibly expired, not yet swept) entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            keys: self.entries.len(),
        }
    }

    /// Clones out every unexpired entry. Used by the metadata dump endpoint.
    #[must_use]
    pub fn entries_snapshot(&self) -> Vec<(String, V)> {
        self.entries
            .iter()
            .filter(|entry| entry.inserted_at.elapsed() < self.ttl)
            .map(|entry| (entry.key().clone(), entry.value.clone()))
            .collect()
    }

    /// Spawns the periodic expiry sweep for this store.
    pub fn start_sweep_task(self: &Arc<Self>, interval: Duration) {
        let cache = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // The first tick fires immediately; skip it so a fresh store
            // is not swept before it has seen any traffic.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let evicted = cache.purge_expired();
                if evicted > 0 {
                    debug!(cache = cache.name, evicted, "swept expired cache entries");
                }
            }
        });
    }
}
