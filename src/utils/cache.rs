//! High-Performance In-Memory Cache Module
//!
//! Thread-safe TTL cache backed by DashMap. Used for the native price,
//! which is read-mostly and refreshed at most once per TTL window.
//!
//! Features:
//! - TTL-based freshness with stale reads kept available
//! - Key normalization (lowercase)
//! - Cache HIT/MISS logging and counters
//! - Last-writer-wins on concurrent refresh, no explicit locking

use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

/// Cache entry dengan timestamp untuk TTL validation
#[derive(Clone, Debug)]
pub struct CacheEntry<V> {
    pub value: V,
    pub created_at: Instant,
    pub ttl: Duration,
}

impl<V> CacheEntry<V> {
    pub fn new(value: V, ttl: Duration) -> Self {
        Self {
            value,
            created_at: Instant::now(),
            ttl,
        }
    }

    /// Cek apakah entry sudah expired
    pub fn is_expired(&self) -> bool {
        self.created_at.elapsed() >= self.ttl
    }

    /// Remaining lifetime, zero once expired
    pub fn remaining_ttl(&self) -> Duration {
        self.ttl.saturating_sub(self.created_at.elapsed())
    }
}

/// TTL cache. Expired entries are not evicted on read so a caller can
/// still fall back to the last good value when a refresh fails.
#[derive(Clone)]
pub struct TtlCache<V: Clone> {
    store: Arc<DashMap<String, CacheEntry<V>>>,
    ttl: Duration,
    hits: Arc<AtomicU64>,
    misses: Arc<AtomicU64>,
}

impl<V: Clone> TtlCache<V> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            store: Arc::new(DashMap::new()),
            ttl,
            hits: Arc::new(AtomicU64::new(0)),
            misses: Arc::new(AtomicU64::new(0)),
        }
    }

    #[inline]
    fn normalize_key(key: &str) -> String {
        key.to_lowercase()
    }

    /// Fresh value only. Counts a hit or a miss.
    pub fn get(&self, key: &str) -> Option<V> {
        let key = Self::normalize_key(key);
        match self.store.get(&key) {
            Some(entry) if !entry.is_expired() => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                debug!(
                    "✅ CACHE HIT: {} (TTL: {}ms remaining)",
                    key,
                    entry.remaining_ttl().as_millis()
                );
                Some(entry.value.clone())
            }
            Some(_) => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                debug!("📭 CACHE MISS (expired): {}", key);
                None
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                debug!("📭 CACHE MISS: {}", key);
                None
            }
        }
    }

    /// Last stored value regardless of age
    pub fn get_stale(&self, key: &str) -> Option<V> {
        self.store
            .get(&Self::normalize_key(key))
            .map(|entry| entry.value.clone())
    }

    pub fn set(&self, key: &str, value: V) {
        let key = Self::normalize_key(key);
        debug!("💾 CACHE SET: {} (TTL: {}ms)", key, self.ttl.as_millis());
        self.store.insert(key, CacheEntry::new(value, self.ttl));
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn stats(&self) -> CacheStats {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;
        let hit_rate = if total > 0 {
            (hits as f64 / total as f64) * 100.0
        } else {
            0.0
        };

        CacheStats {
            entries: self.store.len(),
            hits,
            misses,
            hit_rate,
            ttl_secs: self.ttl.as_secs(),
        }
    }
}

/// Statistik cache untuk monitoring
#[derive(Debug, Clone)]
pub struct CacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
    pub hit_rate: f64,
    pub ttl_secs: u64,
}
