//! Tests for [`RateLimiter`]: sliding window per identity key.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use tollgate::{RateLimitConfig, RateLimiter};

#[tokio::test(start_paused = true)]
async fn limit_calls_succeed_then_deny() {
    let limiter = RateLimiter::default();

    for i in 0..5 {
        assert!(limiter.allow("user:alice"), "call {i} should be allowed");
    }
    assert!(!limiter.allow("user:alice"));
    assert_eq!(limiter.remaining("user:alice"), 0);
}

#[tokio::test(start_paused = true)]
async fn window_elapsing_restores_quota() {
    let limiter = RateLimiter::default();
    for _ in 0..5 {
        assert!(limiter.allow("k"));
    }
    assert!(!limiter.allow("k"));

    tokio::time::advance(Duration::from_secs(59)).await;
    assert!(!limiter.allow("k"));

    tokio::time::advance(Duration::from_secs(1)).await;
    assert!(limiter.allow("k"));
}

#[tokio::test(start_paused = true)]
async fn window_slides_rather_than_resets() {
    let limiter = RateLimiter::new(RateLimitConfig::new().limit(2));

    assert!(limiter.allow("k")); // t = 0
    tokio::time::advance(Duration::from_secs(30)).await;
    assert!(limiter.allow("k")); // t = 30
    assert!(!limiter.allow("k"));

    // t = 60: only the t = 0 call has aged out.
    tokio::time::advance(Duration::from_secs(30)).await;
    assert!(limiter.allow("k"));
    assert!(!limiter.allow("k"));
}

#[tokio::test(start_paused = true)]
async fn denied_calls_are_not_recorded() {
    let limiter = RateLimiter::new(RateLimitConfig::new().limit(1));
    assert!(limiter.allow("k"));

    // Hammering while saturated must not push the unlock time out.
    for _ in 0..10 {
        tokio::time::advance(Duration::from_secs(5)).await;
        assert!(!limiter.allow("k"));
    }
    tokio::time::advance(Duration::from_secs(10)).await;
    assert!(limiter.allow("k"));
}

#[tokio::test(start_paused = true)]
async fn keys_are_independent() {
    let limiter = RateLimiter::new(RateLimitConfig::new().limit(1));
    assert!(limiter.allow("user:alice"));
    assert!(!limiter.allow("user:alice"));
    assert!(limiter.allow("user:bob"));
    assert!(limiter.allow("addr:127.0.0.1"));
}

#[tokio::test(start_paused = true)]
async fn retry_after_reports_time_to_oldest_expiry() {
    let limiter = RateLimiter::new(RateLimitConfig::new().limit(2));
    assert_eq!(limiter.retry_after("k"), None);

    limiter.allow("k");
    tokio::time::advance(Duration::from_secs(20)).await;
    limiter.allow("k");

    assert_eq!(limiter.retry_after("k"), Some(Duration::from_secs(40)));

    tokio::time::advance(Duration::from_secs(40)).await;
    assert_eq!(limiter.retry_after("k"), None);
}

#[tokio::test(start_paused = true)]
async fn prune_drops_idle_keys_only() {
    let limiter = RateLimiter::default();
    limiter.allow("old");
    tokio::time::advance(Duration::from_secs(30)).await;
    limiter.allow("recent");
    assert_eq!(limiter.tracked_keys(), 2);

    tokio::time::advance(Duration::from_secs(30)).await;
    assert_eq!(limiter.prune(), 1);
    assert_eq!(limiter.tracked_keys(), 1);
    assert_eq!(limiter.remaining("recent"), 4);
}

#[test]
fn concurrent_callers_get_exactly_limit() {
    let limiter = RateLimiter::new(
        RateLimitConfig::new()
            .limit(5)
            .window(Duration::from_secs(3600)),
    );
    let allowed = AtomicUsize::new(0);

    std::thread::scope(|scope| {
        for _ in 0..16 {
            scope.spawn(|| {
                for _ in 0..10 {
                    if limiter.allow("shared") {
                        allowed.fetch_add(1, Ordering::Relaxed);
                    }
                }
            });
        }
    });

    assert_eq!(allowed.load(Ordering::Relaxed), 5);
}
