//! # Result caching for progressive repo loads
//!
//! This module implements a process-local, type-erased cache from query
//! identity to the most recent full-stage payload, supporting:
//! - **Lazy expiration**: entries are checked against a caller-supplied TTL on
//!   lookup and removed on the spot; there is no background sweep.
//! - **Shared storage**: one cache instance is cheap to clone and shared by
//!   every loader in the process, regardless of their generic payload types.
//! - **Explicit injection**: a cache is constructed and handed to its
//!   consumers, so tests can supply an isolated instance and assert TTL
//!   behavior deterministically.
//!
//! ## Example
//! ```rust,no_run
//! use dioxus_repo_pulse::cache::ResultCache;
//! use std::time::Duration;
//!
//! let cache = ResultCache::new();
//! cache.set("octocat/hello-world:30d:bots=false".to_string(), 42);
//! let value: Option<i32> =
//!     cache.get_fresh("octocat/hello-world:30d:bots=false", Duration::from_secs(300));
//! ```

use std::{
    any::Any,
    collections::HashMap,
    sync::{Arc, Mutex},
    time::Duration,
};

use crate::platform::Instant;

/// A type-erased cache entry holding a value and the instant it was stored.
#[derive(Clone)]
pub struct CacheEntry {
    data: Arc<dyn Any + Send + Sync>,
    cached_at: Instant,
}

impl CacheEntry {
    /// Creates a new cache entry stamped with the current instant.
    pub fn new<T: Clone + Send + Sync + 'static>(data: T) -> Self {
        Self {
            data: Arc::new(data),
            cached_at: Instant::now(),
        }
    }

    /// Retrieves the cached data of type `T`, or `None` on a type mismatch.
    pub fn get<T: Clone + Send + Sync + 'static>(&self) -> Option<T> {
        self.data.downcast_ref::<T>().cloned()
    }

    /// Whether the entry is older than `ttl`.
    pub fn is_expired(&self, ttl: Duration) -> bool {
        self.cached_at.elapsed() > ttl
    }

    /// Time since the entry was stored.
    pub fn age(&self) -> Duration {
        self.cached_at.elapsed()
    }
}

/// Process-local result cache shared across loader instances.
#[derive(Clone, Default)]
pub struct ResultCache {
    entries: Arc<Mutex<HashMap<String, CacheEntry>>>,
}

impl ResultCache {
    /// Creates a new, empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Looks up `key`, treating entries older than `ttl` as absent.
    ///
    /// Expiry is checked lazily here, on lookup: an expired entry is removed
    /// before returning `None`.
    pub fn get_fresh<T: Clone + Send + Sync + 'static>(
        &self,
        key: &str,
        ttl: Duration,
    ) -> Option<T> {
        let mut entries = self.entries.lock().ok()?;
        let entry = entries.get(key)?;
        if entry.is_expired(ttl) {
            entries.remove(key);
            crate::log_cache_invalidate!("removed expired entry for key: {}", key);
            return None;
        }
        let value = entry.get::<T>();
        if value.is_some() {
            crate::log_cache_hit!("fresh entry for key: {}", key);
        }
        value
    }

    /// Looks up `key` without an expiry check.
    pub fn get<T: Clone + Send + Sync + 'static>(&self, key: &str) -> Option<T> {
        self.entries.lock().ok()?.get(key)?.get::<T>()
    }

    /// Stores `value` under `key`, stamping it with the current instant.
    pub fn set<T: Clone + Send + Sync + 'static>(&self, key: String, value: T) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(key.clone(), CacheEntry::new(value));
            crate::log_cache_store!("stored payload for key: {}", key);
        }
    }

    /// Removes a cached result by key, reporting whether an entry existed.
    pub fn remove(&self, key: &str) -> bool {
        if let Ok(mut entries) = self.entries.lock() {
            entries.remove(key).is_some()
        } else {
            false
        }
    }

    /// Invalidates a cached result by key (alias for remove).
    pub fn invalidate(&self, key: &str) {
        self.remove(key);
        crate::log_cache_invalidate!("invalidated entry for key: {}", key);
    }

    /// Clears all cached results.
    pub fn clear(&self) {
        if let Ok(mut entries) = self.entries.lock() {
            #[cfg(feature = "tracing")]
            let count = entries.len();
            entries.clear();
            #[cfg(feature = "tracing")]
            crate::debug_log!("cleared {} cache entries", count);
        }
    }

    /// Number of cached entries.
    pub fn size(&self) -> usize {
        self.entries.lock().map(|entries| entries.len()).unwrap_or(0)
    }

    /// Point-in-time introspection over the cache contents.
    pub fn stats(&self) -> CacheStats {
        if let Ok(entries) = self.entries.lock() {
            let entry_count = entries.len();
            let total_age: Duration = entries.values().map(CacheEntry::age).sum();
            let avg_age = if entry_count > 0 {
                total_age / entry_count as u32
            } else {
                Duration::ZERO
            };
            CacheStats { entry_count, avg_age }
        } else {
            CacheStats::default()
        }
    }
}

/// General cache statistics.
#[derive(Debug, Clone, Default)]
pub struct CacheStats {
    pub entry_count: usize,
    pub avg_age: Duration,
}
