//! Tests for the limiter module
//!
//! Timing tests run on tokio's paused clock, so sleeps advance virtual time
//! and elapsed durations are exact.

use super::*;
use crate::error::Error;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;

fn budget(rate: f64, burst: f64, max_concurrent: usize, min_interval_ms: u64) -> RateBudget {
    RateBudget::builder()
        .requests_per_second(rate)
        .burst_capacity(burst)
        .max_concurrent(max_concurrent)
        .min_interval_ms(min_interval_ms)
        .build()
        .unwrap()
}

// ============================================================================
// RateBudget Tests
// ============================================================================

#[test]
fn test_rate_budget_default() {
    let budget = RateBudget::default();
    assert!((budget.requests_per_second() - 2.0).abs() < f64::EPSILON);
    assert!((budget.burst_capacity() - 2.0).abs() < f64::EPSILON);
    assert_eq!(budget.max_concurrent(), 2);
    assert_eq!(budget.min_interval(), Duration::from_millis(200));
    assert_eq!(budget.retry_attempts(), 3);
    assert_eq!(budget.retry_base_delay(), Duration::from_millis(1000));

    let built = RateBudget::builder().build().unwrap();
    assert_eq!(built, budget);
}

#[test]
fn test_rate_budget_burst_defaults_to_rate() {
    let budget = RateBudget::builder()
        .requests_per_second(5.0)
        .build()
        .unwrap();
    assert!((budget.burst_capacity() - 5.0).abs() < f64::EPSILON);

    // Fractional rates still get a bucket that can hold one token
    let slow = RateBudget::builder()
        .requests_per_second(0.5)
        .build()
        .unwrap();
    assert!((slow.burst_capacity() - 1.0).abs() < f64::EPSILON);
}

#[test]
fn test_rate_budget_rejects_invalid_values() {
    let cases = [
        RateBudget::builder().requests_per_second(0.0).build(),
        RateBudget::builder().requests_per_second(-1.0).build(),
        RateBudget::builder().requests_per_second(f64::NAN).build(),
        RateBudget::builder()
            .requests_per_second(10.0)
            .burst_capacity(5.0)
            .build(),
        RateBudget::builder()
            .requests_per_second(0.5)
            .burst_capacity(0.5)
            .build(),
        RateBudget::builder().max_concurrent(0).build(),
    ];

    for result in cases {
        match result {
            Err(Error::InvalidConfigValue { .. }) => {}
            other => panic!("expected InvalidConfigValue, got {other:?}"),
        }
    }
}

#[test]
fn test_rate_budget_unthrottled() {
    let budget = RateBudget::unthrottled(4).unwrap();
    assert!(budget.is_unthrottled());
    assert_eq!(budget.max_concurrent(), 4);
    assert_eq!(budget.min_interval(), Duration::ZERO);
}

// ============================================================================
// Acquire Tests
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_first_acquire_is_immediate() {
    let limiter = TokenBucketLimiter::new(budget(2.0, 2.0, 2, 100));

    let start = Instant::now();
    drop(limiter.acquire().await);
    assert_eq!(start.elapsed(), Duration::ZERO);

    let metrics = limiter.metrics();
    assert_eq!(metrics.requests_made, 1);
    assert_eq!(metrics.requests_queued, 0);
}

#[tokio::test(start_paused = true)]
async fn test_min_interval_between_grants() {
    let limiter = TokenBucketLimiter::new(budget(100.0, 100.0, 4, 100));

    drop(limiter.acquire().await);
    let start = Instant::now();
    drop(limiter.acquire().await);

    assert!(start.elapsed() >= Duration::from_millis(100));
}

#[tokio::test(start_paused = true)]
async fn test_grants_are_spaced_by_min_interval() {
    let limiter = TokenBucketLimiter::new(budget(50.0, 50.0, 8, 30));
    let grants = Arc::new(Mutex::new(Vec::new()));

    let mut handles = Vec::new();
    for _ in 0..8 {
        let limiter = limiter.clone();
        let grants = Arc::clone(&grants);
        handles.push(tokio::spawn(async move {
            let _permit = limiter.acquire().await;
            grants.lock().unwrap().push(Instant::now());
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    let mut grants = grants.lock().unwrap().clone();
    grants.sort();
    for pair in grants.windows(2) {
        assert!(pair[1] - pair[0] >= Duration::from_millis(30));
    }
}

#[tokio::test(start_paused = true)]
async fn test_three_concurrent_acquires_wait_for_rate() {
    let limiter = TokenBucketLimiter::new(budget(2.0, 2.0, 2, 200));

    let start = Instant::now();
    tokio::join!(
        async { drop(limiter.acquire().await) },
        async { drop(limiter.acquire().await) },
        async { drop(limiter.acquire().await) },
    );

    assert!(start.elapsed() >= Duration::from_millis(200));
    assert_eq!(limiter.metrics().requests_made, 3);
    assert_eq!(limiter.metrics().requests_queued, 0);
}

#[tokio::test(start_paused = true)]
async fn test_steady_state_never_exceeds_burst_per_second() {
    let limiter = TokenBucketLimiter::new(budget(5.0, 5.0, 10, 0));
    let start = Instant::now();

    let mut grants = Vec::new();
    for _ in 0..30 {
        drop(limiter.acquire().await);
        grants.push(start.elapsed());
    }

    // The first five grants drain the initial burst. After any later grant the
    // bucket holds less than one token, so the following second admits at most
    // `rate` more.
    for (i, &window_start) in grants.iter().enumerate().skip(5) {
        let window_end = window_start + Duration::from_secs(1);
        let in_window = grants[i + 1..]
            .iter()
            .take_while(|&&granted| granted <= window_end)
            .count();
        assert!(in_window <= 5, "{in_window} grants in window after {window_start:?}");
    }
}

#[tokio::test(start_paused = true)]
async fn test_initial_burst_is_immediate() {
    let limiter = TokenBucketLimiter::new(budget(5.0, 5.0, 10, 0));

    let start = Instant::now();
    for _ in 0..5 {
        drop(limiter.acquire().await);
    }
    assert_eq!(start.elapsed(), Duration::ZERO);

    drop(limiter.acquire().await);
    assert!(start.elapsed() >= Duration::from_millis(200));
}

#[tokio::test(start_paused = true)]
async fn test_max_concurrent_is_never_exceeded() {
    let limiter = TokenBucketLimiter::new(RateBudget::unthrottled(2).unwrap());
    let current = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));

    let mut handles = Vec::new();
    for _ in 0..6 {
        let limiter = limiter.clone();
        let current = Arc::clone(&current);
        let peak = Arc::clone(&peak);
        handles.push(tokio::spawn(async move {
            let permit = limiter.acquire().await;
            let now = current.fetch_add(1, Ordering::SeqCst) + 1;
            peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(50)).await;
            current.fetch_sub(1, Ordering::SeqCst);
            drop(permit);
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    assert_eq!(peak.load(Ordering::SeqCst), 2);
    assert_eq!(limiter.metrics().requests_made, 6);
    assert_eq!(limiter.in_flight(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_admission_is_fifo() {
    let limiter = TokenBucketLimiter::new(budget(1000.0, 1000.0, 10, 10));
    let order = Arc::new(Mutex::new(Vec::new()));

    let mut handles = Vec::new();
    for id in 0..5 {
        let limiter = limiter.clone();
        let order = Arc::clone(&order);
        handles.push(tokio::spawn(async move {
            let _permit = limiter.acquire().await;
            order.lock().unwrap().push(id);
        }));
        // Let the task reach its place in the queue before spawning the next
        tokio::task::yield_now().await;
    }
    for handle in handles {
        handle.await.unwrap();
    }

    assert_eq!(*order.lock().unwrap(), vec![0, 1, 2, 3, 4]);
}

#[tokio::test(start_paused = true)]
async fn test_unthrottled_still_enforces_min_interval() {
    let budget = RateBudget::builder()
        .requests_per_second(f64::INFINITY)
        .max_concurrent(1)
        .min_interval_ms(100)
        .build()
        .unwrap();
    let limiter = TokenBucketLimiter::new(budget);

    let start = Instant::now();
    for _ in 0..3 {
        drop(limiter.acquire().await);
    }
    assert!(start.elapsed() >= Duration::from_millis(200));
}

#[tokio::test(start_paused = true)]
async fn test_unthrottled_without_interval_never_waits() {
    let limiter = TokenBucketLimiter::new(RateBudget::unthrottled(1).unwrap());

    let start = Instant::now();
    for _ in 0..100 {
        drop(limiter.acquire().await);
    }
    assert_eq!(start.elapsed(), Duration::ZERO);
    assert_eq!(limiter.metrics().requests_made, 100);
}

// ============================================================================
// Metrics Tests
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_record_failure_does_not_touch_tokens() {
    let limiter = TokenBucketLimiter::new(budget(1.0, 1.0, 1, 0));

    limiter.record_failure();
    limiter.record_failure();

    let metrics = limiter.metrics();
    assert_eq!(metrics.requests_failed, 2);
    assert_eq!(metrics.requests_made, 0);

    // The single token is still there
    let start = Instant::now();
    drop(limiter.acquire().await);
    assert_eq!(start.elapsed(), Duration::ZERO);
}

#[tokio::test(start_paused = true)]
async fn test_average_wait_time() {
    let limiter = TokenBucketLimiter::new(budget(100.0, 100.0, 2, 200));

    drop(limiter.acquire().await);
    drop(limiter.acquire().await);

    let metrics = limiter.metrics();
    assert!((metrics.average_wait_ms - 100.0).abs() < 1.0);
}

#[tokio::test(start_paused = true)]
async fn test_queue_size_while_waiting() {
    let limiter = TokenBucketLimiter::new(budget(1.0, 1.0, 4, 0));
    drop(limiter.acquire().await);
    assert!(limiter.is_limiting());

    let waiter = {
        let limiter = limiter.clone();
        tokio::spawn(async move { drop(limiter.acquire().await) })
    };
    tokio::task::yield_now().await;
    assert_eq!(limiter.queue_size(), 1);

    waiter.await.unwrap();
    assert_eq!(limiter.queue_size(), 0);
    assert_eq!(limiter.metrics().requests_made, 2);
}

#[tokio::test(start_paused = true)]
async fn test_abandoned_acquire_leaves_queue() {
    let limiter = TokenBucketLimiter::new(budget(1.0, 1.0, 4, 0));
    drop(limiter.acquire().await);

    let result = tokio::time::timeout(Duration::from_millis(10), limiter.acquire()).await;
    assert!(result.is_err());

    let metrics = limiter.metrics();
    assert_eq!(metrics.requests_queued, 0);
    assert_eq!(metrics.requests_made, 1);
}

#[tokio::test(start_paused = true)]
async fn test_in_flight_tracks_permits() {
    let limiter = TokenBucketLimiter::new(RateBudget::unthrottled(3).unwrap());

    let first = limiter.acquire().await;
    let second = limiter.acquire().await;
    assert_eq!(limiter.in_flight(), 2);
    assert_eq!(limiter.metrics().in_flight, 2);

    drop(first);
    assert_eq!(limiter.in_flight(), 1);
    drop(second);
    assert_eq!(limiter.in_flight(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_metrics_snapshot_is_a_copy() {
    let limiter = TokenBucketLimiter::new(RateBudget::unthrottled(1).unwrap());
    let before = limiter.metrics();

    drop(limiter.acquire().await);

    assert_eq!(before.requests_made, 0);
    assert_eq!(limiter.metrics().requests_made, 1);
}

#[tokio::test(start_paused = true)]
async fn test_clear_resets_state() {
    let limiter = TokenBucketLimiter::new(budget(1.0, 1.0, 2, 500));

    drop(limiter.acquire().await);
    limiter.record_failure();
    assert!(limiter.is_limiting());

    limiter.clear();

    assert_eq!(limiter.metrics(), MetricsSnapshot::default());
    assert!(!limiter.is_limiting());

    // Full bucket and no previous grant, so no waiting at all
    let start = Instant::now();
    drop(limiter.acquire().await);
    assert_eq!(start.elapsed(), Duration::ZERO);
}

#[tokio::test(start_paused = true)]
async fn test_reset_metrics_keeps_tokens() {
    let limiter = TokenBucketLimiter::new(budget(1.0, 1.0, 2, 0));

    drop(limiter.acquire().await);
    limiter.reset_metrics();

    assert_eq!(limiter.metrics().requests_made, 0);
    // Bucket is still drained
    assert!(limiter.is_limiting());
}

#[tokio::test(start_paused = true)]
async fn test_acquire_is_pending_until_refill() {
    use tokio_test::{assert_pending, assert_ready, task};

    let limiter = TokenBucketLimiter::new(budget(1.0, 1.0, 4, 0));
    drop(limiter.acquire().await);

    let mut acquire = task::spawn(limiter.acquire());
    assert_pending!(acquire.poll());
    assert_eq!(limiter.queue_size(), 1);

    tokio::time::advance(Duration::from_millis(1001)).await;
    drop(assert_ready!(acquire.poll()));

    assert_eq!(limiter.queue_size(), 0);
    assert_eq!(limiter.metrics().requests_made, 2);
}

#[tokio::test(start_paused = true)]
async fn test_clear_keeps_waiters_counted() {
    use tokio_test::{assert_pending, assert_ready, task};

    let limiter = TokenBucketLimiter::new(budget(1.0, 1.0, 4, 0));
    drop(limiter.acquire().await);

    let mut first = task::spawn(limiter.acquire());
    let mut second = task::spawn(limiter.acquire());
    assert_pending!(first.poll());
    assert_pending!(second.poll());
    assert_eq!(limiter.queue_size(), 2);

    limiter.clear();
    assert_eq!(limiter.queue_size(), 2);
    assert_eq!(limiter.metrics().requests_made, 0);

    let mut third = task::spawn(limiter.acquire());
    assert_pending!(third.poll());
    assert_eq!(limiter.queue_size(), 3);

    tokio::time::advance(Duration::from_millis(1001)).await;
    drop(assert_ready!(first.poll()));

    assert_eq!(limiter.queue_size(), 2);
    assert!(limiter.is_limiting());
    assert_eq!(limiter.metrics().requests_made, 1);

    drop(second);
    drop(third);
    assert_eq!(limiter.queue_size(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_reset_metrics_keeps_waiters_counted() {
    use tokio_test::{assert_pending, task};

    let limiter = TokenBucketLimiter::new(budget(1.0, 1.0, 4, 0));
    drop(limiter.acquire().await);

    let mut waiter = task::spawn(limiter.acquire());
    assert_pending!(waiter.poll());

    limiter.reset_metrics();
    assert_eq!(limiter.queue_size(), 1);

    drop(waiter);
    assert_eq!(limiter.queue_size(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_tiny_rate_waits_instead_of_panicking() {
    use tokio_test::{assert_pending, task};

    let limiter = TokenBucketLimiter::new(budget(1e-30, 1.0, 1, 0));
    drop(limiter.acquire().await);

    let mut starved = task::spawn(limiter.acquire());
    assert_pending!(starved.poll());

    tokio::time::advance(Duration::from_secs(3600)).await;
    assert_pending!(starved.poll());
    assert!(limiter.is_limiting());
    assert_eq!(limiter.metrics().requests_made, 1);
}

#[tokio::test(start_paused = true)]
async fn test_in_flight_excludes_queued_callers() {
    use tokio_test::{assert_pending, assert_ready, task};

    let limiter = TokenBucketLimiter::new(budget(1.0, 1.0, 4, 0));
    let held = limiter.acquire().await;

    let mut waiter = task::spawn(limiter.acquire());
    assert_pending!(waiter.poll());
    assert_eq!(limiter.in_flight(), 1);
    assert_eq!(limiter.metrics().in_flight, 1);
    assert_eq!(limiter.metrics().requests_queued, 1);

    tokio::time::advance(Duration::from_millis(1001)).await;
    let second = assert_ready!(waiter.poll());
    assert_eq!(limiter.in_flight(), 2);

    drop(held);
    drop(second);
    assert_eq!(limiter.in_flight(), 0);
}
