//! Response cache for answered prompts.
//!
//! [`ResponseCache`] maps a truncated prompt to the answer the backend gave
//! for it. Entries live for a fixed TTL and the store is bounded; once full,
//! inserting a new key evicts the least recently *accessed* entry, where
//! both [`get`](ResponseCache::get) and [`put`](ResponseCache::put) count
//! as access.
//!
//! # Expiry
//!
//! Expiry is evaluated on read. There is no background timer: an entry past
//! its TTL is treated as a miss (and dropped) the moment someone asks for
//! it, whether or not anything else has touched the store since. Expired
//! entries that are never read again linger until LRU pressure pushes them
//! out, which is harmless since they are never returned.
//!
//! # Concurrency
//!
//! One `parking_lot::Mutex` guards the whole store. It is held for a single
//! lookup or insert, never across an `.await`, so callers can share the
//! cache freely between request handlers and background jobs.

use std::num::NonZeroUsize;
use std::time::Duration;

use lru::LruCache;
use parking_lot::Mutex;
use tokio::time::Instant;

use crate::telemetry;

/// Configuration for the response cache.
///
/// ```rust
/// # use tollgate::CacheConfig;
/// # use std::time::Duration;
/// let config = CacheConfig::new()
///     .max_entries(10_000)
///     .ttl(Duration::from_secs(600));
/// ```
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Maximum number of cached entries. Default: 1,000.
    pub max_entries: usize,
    /// Time-to-live for cached entries. Default: 1 hour.
    pub ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 1_000,
            ttl: Duration::from_secs(3600),
        }
    }
}

impl CacheConfig {
    /// Create a new config with sensible defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum number of cached entries.
    pub fn max_entries(mut self, n: usize) -> Self {
        self.max_entries = n;
        self
    }

    /// Set the time-to-live for cached entries.
    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }
}

#[derive(Debug)]
struct CacheEntry {
    answer: String,
    inserted_at: Instant,
}

impl CacheEntry {
    fn is_fresh(&self, now: Instant, ttl: Duration) -> bool {
        now.saturating_duration_since(self.inserted_at) < ttl
    }
}

/// Bounded LRU + TTL cache of backend answers, keyed on truncated prompt.
pub struct ResponseCache {
    entries: Mutex<LruCache<String, CacheEntry>>,
    ttl: Duration,
}

impl ResponseCache {
    /// Create a new response cache with the given configuration.
    ///
    /// A `max_entries` of zero is treated as one; the builder rejects zero
    /// before it gets here.
    pub fn new(config: &CacheConfig) -> Self {
        let capacity = NonZeroUsize::new(config.max_entries).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
            ttl: config.ttl,
        }
    }

    /// Look up a cached answer.
    ///
    /// Returns `None` if the key was never stored, was evicted, or has
    /// outlived the TTL. A hit marks the entry as most recently used.
    pub fn get(&self, key: &str) -> Option<String> {
        let now = Instant::now();
        let mut entries = self.entries.lock();

        let mut expired = false;
        let hit = match entries.get(key) {
            Some(entry) if entry.is_fresh(now, self.ttl) => Some(entry.answer.clone()),
            Some(_) => {
                expired = true;
                None
            }
            None => None,
        };
        if expired {
            entries.pop(key);
        }
        drop(entries);

        match hit {
            Some(answer) => {
                metrics::counter!(telemetry::CACHE_HITS_TOTAL).increment(1);
                Some(answer)
            }
            None => {
                metrics::counter!(telemetry::CACHE_MISSES_TOTAL).increment(1);
                None
            }
        }
    }

    /// Insert (or overwrite) an answer, restarting its TTL.
    ///
    /// Evicts the least recently used entry when the cache is full.
    pub fn put(&self, key: impl Into<String>, answer: impl Into<String>) {
        let entry = CacheEntry {
            answer: answer.into(),
            inserted_at: Instant::now(),
        };
        self.entries.lock().put(key.into(), entry);
    }

    /// Whether a fresh entry exists for `key`.
    ///
    /// This is a probe: it does not refresh the entry's LRU position and
    /// does not emit hit/miss metrics.
    pub fn contains(&self, key: &str) -> bool {
        let now = Instant::now();
        self.entries
            .lock()
            .peek(key)
            .is_some_and(|entry| entry.is_fresh(now, self.ttl))
    }

    /// Number of stored entries, including expired ones not yet dropped.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Whether the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Maximum number of entries.
    pub fn capacity(&self) -> usize {
        self.entries.lock().cap().get()
    }

    /// Evict all entries.
    pub fn clear(&self) {
        self.entries.lock().clear();
    }
}

impl Default for ResponseCache {
    fn default() -> Self {
        Self::new(&CacheConfig::default())
    }
}
