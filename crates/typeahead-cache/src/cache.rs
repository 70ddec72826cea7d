//! Bounded FIFO cache with TTL expiry

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::metrics::{CacheMetrics, CacheStats};

/// Cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Maximum resident entries
    #[serde(default = "default_capacity")]
    pub capacity: usize,
    /// Time-to-live for every entry
    #[serde(default = "default_ttl")]
    pub ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: default_capacity(),
            ttl: default_ttl(),
        }
    }
}

impl CacheConfig {
    /// Profile for dashboard deployments: 100 entries, 5 minute TTL
    pub fn dashboard() -> Self {
        Self {
            capacity: 100,
            ttl: Duration::from_secs(5 * 60),
        }
    }

    /// Profile for storefront deployments: 50 entries, 3 minute TTL
    pub fn storefront() -> Self {
        Self {
            capacity: 50,
            ttl: Duration::from_secs(3 * 60),
        }
    }
}

fn default_capacity() -> usize {
    100
}

fn default_ttl() -> Duration {
    Duration::from_secs(5 * 60)
}

struct Entry<T> {
    value: T,
    inserted_at: Instant,
}

struct Inner<T> {
    entries: HashMap<String, Entry<T>>,
    // Insertion order; front is the next eviction victim
    order: VecDeque<String>,
}

/// Bounded in-memory cache with insertion-order eviction
///
/// `get` removes entries whose TTL has elapsed, so an expired value is
/// never returned. `put` evicts the oldest-inserted entry once the cache
/// is at capacity; a read does not refresh an entry's position.
pub struct FifoCache<T> {
    inner: Mutex<Inner<T>>,
    config: CacheConfig,
    metrics: CacheMetrics,
}

impl<T: Clone> FifoCache<T> {
    /// Create a cache with the given configuration
    pub fn new(config: CacheConfig) -> Self {
        Self {
            inner: Mutex::new(Inner {
                entries: HashMap::with_capacity(config.capacity),
                order: VecDeque::with_capacity(config.capacity),
            }),
            config,
            metrics: CacheMetrics::new(),
        }
    }

    /// Look up `key`, expiring it first if its TTL has elapsed
    pub fn get(&self, key: &str) -> Option<T> {
        let mut inner = self.inner.lock().expect("cache lock poisoned");

        let expired = match inner.entries.get(key) {
            None => {
                self.metrics.record_miss();
                return None;
            }
            Some(entry) => entry.inserted_at.elapsed() >= self.config.ttl,
        };

        if expired {
            inner.entries.remove(key);
            inner.order.retain(|k| k != key);
            self.metrics.record_expiration();
            self.metrics.record_miss();
            debug!("cache entry expired: {key}");
            return None;
        }

        self.metrics.record_hit();
        inner.entries.get(key).map(|entry| entry.value.clone())
    }

    /// Insert `value` under `key`, evicting the oldest entries if needed
    ///
    /// Re-inserting an existing key counts as a fresh insertion: the
    /// entry moves to the back of the eviction order and its TTL restarts.
    pub fn put(&self, key: &str, value: T) {
        let mut inner = self.inner.lock().expect("cache lock poisoned");

        if inner.entries.remove(key).is_some() {
            inner.order.retain(|k| k != key);
        }

        while inner.entries.len() >= self.config.capacity {
            let Some(victim) = inner.order.pop_front() else {
                break;
            };
            inner.entries.remove(&victim);
            self.metrics.record_eviction();
            debug!("cache evicted oldest entry: {victim}");
        }

        inner.entries.insert(
            key.to_string(),
            Entry {
                value,
                inserted_at: Instant::now(),
            },
        );
        inner.order.push_back(key.to_string());
    }

    /// Remove `key` if present
    pub fn remove(&self, key: &str) -> bool {
        let mut inner = self.inner.lock().expect("cache lock poisoned");
        if inner.entries.remove(key).is_some() {
            inner.order.retain(|k| k != key);
            true
        } else {
            false
        }
    }

    /// Drop every entry
    pub fn clear(&self) {
        let mut inner = self.inner.lock().expect("cache lock poisoned");
        inner.entries.clear();
        inner.order.clear();
    }

    /// Number of resident entries (expired ones included until read)
    pub fn len(&self) -> usize {
        self.inner.lock().expect("cache lock poisoned").entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Configured capacity and TTL
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Snapshot of hit/miss/eviction counters
    pub fn stats(&self) -> CacheStats {
        self.metrics.snapshot(self.len())
    }
}
