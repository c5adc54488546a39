//! Limiter metrics
//!
//! Counters are owned by the limiter and only touched under its state lock.
//! Callers get [`MetricsSnapshot`] copies.

use serde::Serialize;
use std::collections::VecDeque;
use std::time::Duration;

/// Number of grants kept in the rolling wait-time window
pub(crate) const WAIT_WINDOW: usize = 100;

/// Point-in-time copy of the limiter counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct MetricsSnapshot {
    /// Acquisitions granted
    pub requests_made: u64,
    /// Acquisitions waiting for admission
    pub requests_queued: u64,
    /// Failures reported through `record_failure`
    pub requests_failed: u64,
    /// Mean wait of the last 100 grants, in milliseconds
    pub average_wait_ms: f64,
    /// Permits currently held by callers
    pub in_flight: usize,
}

#[derive(Debug, Default)]
pub(crate) struct Metrics {
    requests_made: u64,
    requests_queued: u64,
    requests_failed: u64,
    waits: VecDeque<Duration>,
}

impl Metrics {
    pub(crate) fn enqueue(&mut self) {
        self.requests_queued += 1;
    }

    pub(crate) fn dequeue(&mut self) {
        self.requests_queued = self.requests_queued.saturating_sub(1);
    }

    pub(crate) fn record_grant(&mut self, waited: Duration) {
        self.requests_made += 1;
        if self.waits.len() == WAIT_WINDOW {
            self.waits.pop_front();
        }
        self.waits.push_back(waited);
    }

    pub(crate) fn record_failure(&mut self) {
        self.requests_failed += 1;
    }

    pub(crate) fn queued(&self) -> u64 {
        self.requests_queued
    }

    pub(crate) fn average_wait_ms(&self) -> f64 {
        if self.waits.is_empty() {
            return 0.0;
        }
        let total: f64 = self.waits.iter().map(|w| w.as_secs_f64() * 1000.0).sum();
        total / self.waits.len() as f64
    }

    pub(crate) fn snapshot(&self, in_flight: usize) -> MetricsSnapshot {
        MetricsSnapshot {
            requests_made: self.requests_made,
            requests_queued: self.requests_queued,
            requests_failed: self.requests_failed,
            average_wait_ms: self.average_wait_ms(),
            in_flight,
        }
    }

    /// Zero the counters and the wait window; live waiters stay counted
    pub(crate) fn reset(&mut self) {
        *self = Self {
            requests_queued: self.requests_queued,
            ..Self::default()
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wait_window_evicts_oldest() {
        let mut metrics = Metrics::default();

        // One slow grant followed by a full window of instant grants
        metrics.record_grant(Duration::from_millis(10_000));
        assert!((metrics.average_wait_ms() - 10_000.0).abs() < f64::EPSILON);

        for _ in 0..WAIT_WINDOW {
            metrics.record_grant(Duration::ZERO);
        }

        assert_eq!(metrics.waits.len(), WAIT_WINDOW);
        assert!(metrics.average_wait_ms().abs() < f64::EPSILON);
        assert_eq!(metrics.snapshot(0).requests_made, WAIT_WINDOW as u64 + 1);
    }

    #[test]
    fn test_average_wait() {
        let mut metrics = Metrics::default();
        assert!(metrics.average_wait_ms().abs() < f64::EPSILON);

        metrics.record_grant(Duration::from_millis(100));
        metrics.record_grant(Duration::from_millis(300));
        assert!((metrics.average_wait_ms() - 200.0).abs() < 1e-9);
    }

    #[test]
    fn test_queue_counter_saturates() {
        let mut metrics = Metrics::default();
        metrics.dequeue();
        assert_eq!(metrics.queued(), 0);

        metrics.enqueue();
        metrics.enqueue();
        metrics.dequeue();
        assert_eq!(metrics.queued(), 1);
    }

    #[test]
    fn test_reset() {
        let mut metrics = Metrics::default();
        metrics.enqueue();
        metrics.record_failure();
        metrics.record_grant(Duration::from_millis(5));
        metrics.reset();

        let snapshot = metrics.snapshot(0);
        assert_eq!(snapshot.requests_made, 0);
        assert_eq!(snapshot.requests_failed, 0);
        assert!(snapshot.average_wait_ms.abs() < f64::EPSILON);
        assert_eq!(snapshot.requests_queued, 1);
    }
}
