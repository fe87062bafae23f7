//! Sliding-window rate limiter keyed on caller identity.
//!
//! Each identity key owns a queue of the timestamps of its accepted calls.
//! A call is accepted while fewer than `limit` timestamps fall inside the
//! trailing `window`; denied calls are not recorded, so hammering a
//! saturated key does not extend its lockout.
//!
//! Old timestamps are purged lazily whenever a key is touched. Keys that go
//! quiet keep an empty (or stale) queue until [`RateLimiter::prune`] runs,
//! which the gateway's maintenance loop does on every sweep.

use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::Instant;

use crate::telemetry;

/// Rate limit policy.
///
/// ```rust
/// # use tollgate::RateLimitConfig;
/// # use std::time::Duration;
/// let config = RateLimitConfig::new()
///     .limit(10)
///     .window(Duration::from_secs(30));
/// ```
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Accepted calls per window. Default: 5.
    pub limit: usize,
    /// Length of the trailing window. Default: 60 seconds.
    pub window: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            limit: 5,
            window: Duration::from_secs(60),
        }
    }
}

impl RateLimitConfig {
    /// Create a config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the number of calls accepted per window.
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    /// Set the window length.
    pub fn window(mut self, window: Duration) -> Self {
        self.window = window;
        self
    }
}

/// Per-key sliding-window rate limiter.
pub struct RateLimiter {
    windows: Mutex<HashMap<String, VecDeque<Instant>>>,
    config: RateLimitConfig,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            windows: Mutex::new(HashMap::new()),
            config,
        }
    }

    /// The policy this limiter enforces.
    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    /// Record a call for `key` if the window has room.
    ///
    /// Returns `false` (and records nothing) when `key` already has `limit`
    /// calls inside the trailing window.
    pub fn allow(&self, key: &str) -> bool {
        let now = Instant::now();
        let mut windows = self.windows.lock();
        let window = windows.entry(key.to_string()).or_default();
        purge(window, now, self.config.window);

        if window.len() < self.config.limit {
            window.push_back(now);
            true
        } else {
            drop(windows);
            metrics::counter!(telemetry::RATE_LIMITED_TOTAL).increment(1);
            false
        }
    }

    /// How long until `key` may make another call.
    ///
    /// `None` when a call would be accepted right now.
    pub fn retry_after(&self, key: &str) -> Option<Duration> {
        let now = Instant::now();
        let mut windows = self.windows.lock();
        let window = windows.get_mut(key)?;
        purge(window, now, self.config.window);

        if window.len() < self.config.limit {
            return None;
        }
        // The window frees a slot when its oldest entry ages out. A window too
        // long to land on the clock never frees one.
        let oldest = *window.front()?;
        Some(
            oldest
                .checked_add(self.config.window)
                .map_or(Duration::MAX, |freed| freed.saturating_duration_since(now)),
        )
    }

    /// Calls `key` may still make in the current window.
    pub fn remaining(&self, key: &str) -> usize {
        let now = Instant::now();
        let mut windows = self.windows.lock();
        match windows.get_mut(key) {
            Some(window) => {
                purge(window, now, self.config.window);
                self.config.limit.saturating_sub(window.len())
            }
            None => self.config.limit,
        }
    }

    /// Drop the windows of keys with no call inside the trailing window.
    ///
    /// Returns the number of keys removed.
    pub fn prune(&self) -> usize {
        let now = Instant::now();
        let mut windows = self.windows.lock();
        let before = windows.len();
        windows.retain(|_, window| {
            purge(window, now, self.config.window);
            !window.is_empty()
        });
        before - windows.len()
    }

    /// Number of identity keys currently tracked.
    pub fn tracked_keys(&self) -> usize {
        self.windows.lock().len()
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(RateLimitConfig::default())
    }
}

/// Pop timestamps that have left the trailing window.
fn purge(window: &mut VecDeque<Instant>, now: Instant, length: Duration) {
    while let Some(&oldest) = window.front() {
        if now.saturating_duration_since(oldest) >= length {
            window.pop_front();
        } else {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_policy_is_five_per_minute() {
        let config = RateLimitConfig::default();
        assert_eq!(config.limit, 5);
        assert_eq!(config.window, Duration::from_secs(60));
    }

    #[test]
    fn zero_limit_denies_everything() {
        let limiter = RateLimiter::new(RateLimitConfig::new().limit(0));
        assert!(!limiter.allow("k"));
        assert_eq!(limiter.remaining("k"), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn retry_after_with_unbounded_window_does_not_overflow() {
        let limiter = RateLimiter::new(RateLimitConfig::new().limit(1).window(Duration::MAX));
        assert!(limiter.allow("k"));
        assert!(!limiter.allow("k"));
        assert_eq!(limiter.retry_after("k"), Some(Duration::MAX));
    }

    #[tokio::test(start_paused = true)]
    async fn purge_keeps_entries_inside_window() {
        let mut window = VecDeque::new();
        let start = Instant::now();
        window.push_back(start);
        tokio::time::advance(Duration::from_secs(30)).await;
        window.push_back(Instant::now());

        tokio::time::advance(Duration::from_secs(30)).await;
        purge(&mut window, Instant::now(), Duration::from_secs(60));

        assert_eq!(window.len(), 1);
    }
}
