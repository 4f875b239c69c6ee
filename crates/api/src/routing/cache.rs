//! Bounded in-memory hostname cache
//!
//! Caches raw Host header -> cleaned hostname so hot hosts skip the
//! normalization work. Insertion-ordered: once full, the oldest entry is
//! evicted. The cache holds no authority; a miss recomputes the same value.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

/// Default cache capacity
pub const DEFAULT_CACHE_CAPACITY: usize = 100;

#[derive(Default)]
struct CacheInner {
    entries: HashMap<String, String>,
    /// Keys in insertion order, oldest first
    order: VecDeque<String>,
    evictions: u64,
}

/// Thread-safe bounded hostname cache
pub struct HostnameCache {
    inner: Mutex<CacheInner>,
    capacity: usize,
}

impl Default for HostnameCache {
    fn default() -> Self {
        Self::new()
    }
}

impl HostnameCache {
    /// Create a new cache with default capacity
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CACHE_CAPACITY)
    }

    /// Create a new cache with custom capacity (minimum 1)
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(CacheInner::default()),
            capacity: capacity.max(1),
        }
    }

    /// Get the cleaned hostname for a raw host value
    pub fn get(&self, raw: &str) -> Option<String> {
        let inner = self.inner.lock().ok()?;
        inner.entries.get(raw).cloned()
    }

    /// Cache a raw -> cleaned mapping, evicting the oldest entry when full
    pub fn insert(&self, raw: &str, cleaned: &str) {
        let Ok(mut inner) = self.inner.lock() else {
            return;
        };

        if inner.entries.contains_key(raw) {
            inner.entries.insert(raw.to_string(), cleaned.to_string());
            return;
        }

        while inner.entries.len() >= self.capacity {
            let Some(oldest) = inner.order.pop_front() else {
                break;
            };
            inner.entries.remove(&oldest);
            inner.evictions += 1;
        }

        inner.order.push_back(raw.to_string());
        inner.entries.insert(raw.to_string(), cleaned.to_string());
    }

    /// Return the cached value or compute, cache and return it
    pub fn get_or_insert_with<F>(&self, raw: &str, compute: F) -> String
    where
        F: FnOnce() -> String,
    {
        if let Some(cleaned) = self.get(raw) {
            return cleaned;
        }
        let cleaned = compute();
        self.insert(raw, &cleaned);
        cleaned
    }

    /// Drop every entry
    pub fn clear(&self) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.entries.clear();
            inner.order.clear();
        }
    }

    pub fn len(&self) -> usize {
        self.inner.lock().map(|inner| inner.entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Get cache statistics
    pub fn stats(&self) -> CacheStats {
        if let Ok(inner) = self.inner.lock() {
            CacheStats {
                entries: inner.entries.len(),
                capacity: self.capacity,
                evictions: inner.evictions,
            }
        } else {
            CacheStats {
                capacity: self.capacity,
                ..CacheStats::default()
            }
        }
    }
}

/// Cache statistics
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub entries: usize,
    pub capacity: usize,
    pub evictions: u64,
}
