//! Token bucket limiter
//!
//! Admission goes through three gates, in order:
//!
//! 1. a fair semaphore bounding how many permits are held at once,
//! 2. a fair async mutex that serializes admission in request order,
//! 3. the token bucket and the minimum-interval check.
//!
//! Tokens are refilled lazily from elapsed time whenever an acquisition looks
//! at the bucket. The state mutex is never held across an `.await`.

use super::budget::RateBudget;
use super::metrics::{Metrics, MetricsSnapshot};
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::{Mutex as AsyncMutex, OwnedSemaphorePermit, Semaphore};
use tokio::time::{sleep, Instant};
use tracing::trace;

/// Shortest sleep while waiting for a token
const MIN_TOKEN_WAIT: Duration = Duration::from_millis(10);

/// Float slack when comparing refilled tokens against one whole token
const TOKEN_EPSILON: f64 = 1e-9;

struct BucketState {
    tokens: f64,
    last_refill: Instant,
    last_grant: Option<Instant>,
    metrics: Metrics,
}

impl BucketState {
    fn full(budget: &RateBudget) -> Self {
        Self {
            tokens: budget.burst_capacity(),
            last_refill: Instant::now(),
            last_grant: None,
            metrics: Metrics::default(),
        }
    }

    /// Tokens the bucket would hold at `now`, without touching the state
    fn projected_tokens(&self, now: Instant, budget: &RateBudget) -> f64 {
        if budget.is_unthrottled() {
            return budget.burst_capacity();
        }
        let elapsed = now.saturating_duration_since(self.last_refill);
        (self.tokens + elapsed.as_secs_f64() * budget.requests_per_second())
            .min(budget.burst_capacity())
    }

    fn refill(&mut self, now: Instant, budget: &RateBudget) {
        self.tokens = self.projected_tokens(now, budget);
        self.last_refill = now;
    }

    /// Time until one whole token is available, or `None` if one is already there
    fn token_wait(&self, budget: &RateBudget) -> Option<Duration> {
        if self.tokens + TOKEN_EPSILON >= 1.0 {
            return None;
        }
        let shortfall = 1.0 - self.tokens;
        // Tiny rates overflow `Duration`; `sleep` clamps `Duration::MAX` to its far future
        let needed = Duration::try_from_secs_f64(shortfall / budget.requests_per_second())
            .unwrap_or(Duration::MAX);
        Some(needed.max(MIN_TOKEN_WAIT))
    }

    /// Time until `min_interval` has passed since the last grant
    fn interval_wait(&self, now: Instant, budget: &RateBudget) -> Option<Duration> {
        let last = self.last_grant?;
        let since = now.saturating_duration_since(last);
        let min = budget.min_interval();
        (since < min).then(|| min - since)
    }

    fn consume(&mut self, now: Instant, budget: &RateBudget, waited: Duration) {
        self.refill(now, budget);
        if !budget.is_unthrottled() {
            self.tokens = (self.tokens - 1.0).max(0.0);
        }
        self.last_grant = Some(now);
        self.metrics.dequeue();
        self.metrics.record_grant(waited);
    }
}

struct Shared {
    budget: RateBudget,
    gate: AsyncMutex<()>,
    slots: Arc<Semaphore>,
    granted: AtomicUsize,
    state: Mutex<BucketState>,
}

impl Shared {
    fn state(&self) -> MutexGuard<'_, BucketState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Permits handed out and not yet dropped; queued callers are not counted
    fn in_flight(&self) -> usize {
        self.granted.load(Ordering::Acquire)
    }
}

/// Shared token bucket limiter
///
/// Cloning is cheap; all clones share one budget, one bucket and one set of
/// metrics.
#[derive(Clone)]
pub struct TokenBucketLimiter {
    inner: Arc<Shared>,
}

impl TokenBucketLimiter {
    /// Create a limiter with a full bucket
    pub fn new(budget: RateBudget) -> Self {
        Self {
            inner: Arc::new(Shared {
                budget,
                gate: AsyncMutex::new(()),
                slots: Arc::new(Semaphore::new(budget.max_concurrent())),
                granted: AtomicUsize::new(0),
                state: Mutex::new(BucketState::full(&budget)),
            }),
        }
    }

    /// The budget this limiter enforces
    pub fn budget(&self) -> &RateBudget {
        &self.inner.budget
    }

    /// Wait for admission
    ///
    /// Resolves once a concurrency slot, a token and the minimum interval are
    /// all available. Callers are admitted in the order they called. The
    /// returned [`Permit`] holds the concurrency slot until it is dropped.
    pub async fn acquire(&self) -> Permit {
        let shared = &*self.inner;
        let budget = &shared.budget;
        let started = Instant::now();
        let queued = QueuedGuard::enter(shared);

        // The semaphore is never closed, so this only yields `None` in theory
        let slot = Arc::clone(&shared.slots).acquire_owned().await.ok();
        let _turn = shared.gate.lock().await;

        loop {
            let wait = {
                let mut state = shared.state();
                state.refill(Instant::now(), budget);
                state.token_wait(budget)
            };
            match wait {
                Some(delay) => {
                    trace!(?delay, "waiting for token");
                    sleep(delay).await;
                }
                None => break,
            }
        }

        let spacing = shared.state().interval_wait(Instant::now(), budget);
        if let Some(delay) = spacing {
            trace!(?delay, "enforcing minimum interval");
            sleep(delay).await;
        }

        shared
            .state()
            .consume(Instant::now(), budget, started.elapsed());
        queued.disarm();
        shared.granted.fetch_add(1, Ordering::AcqRel);

        Permit {
            _slot: slot,
            shared: Arc::clone(&self.inner),
        }
    }

    /// Count a failed request; token accounting is unaffected
    pub fn record_failure(&self) {
        self.inner.state().metrics.record_failure();
    }

    /// Snapshot of the current counters
    pub fn metrics(&self) -> MetricsSnapshot {
        let in_flight = self.inner.in_flight();
        self.inner.state().metrics.snapshot(in_flight)
    }

    /// Number of callers waiting for admission
    pub fn queue_size(&self) -> u64 {
        self.inner.state().metrics.queued()
    }

    /// Number of permits currently held
    pub fn in_flight(&self) -> usize {
        self.inner.in_flight()
    }

    /// True when a new caller would have to wait
    pub fn is_limiting(&self) -> bool {
        let state = self.inner.state();
        state.metrics.queued() > 0
            || state.projected_tokens(Instant::now(), &self.inner.budget) + TOKEN_EPSILON < 1.0
    }

    /// Zero all counters and the wait window
    ///
    /// The queued count tracks live waiters and is kept.
    pub fn reset_metrics(&self) {
        self.inner.state().metrics.reset();
    }

    /// Refill the bucket, forget the last grant and zero all counters
    ///
    /// Callers already waiting keep their place, stay counted in
    /// [`queue_size`](Self::queue_size) and are admitted against the fresh
    /// state.
    pub fn clear(&self) {
        let mut state = self.inner.state();
        let mut metrics = std::mem::take(&mut state.metrics);
        metrics.reset();
        *state = BucketState {
            metrics,
            ..BucketState::full(&self.inner.budget)
        };
    }
}

impl fmt::Debug for TokenBucketLimiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenBucketLimiter")
            .field("budget", &self.inner.budget)
            .field("in_flight", &self.inner.in_flight())
            .finish_non_exhaustive()
    }
}

/// Admission granted by [`TokenBucketLimiter::acquire`]
///
/// Holds one concurrency slot until dropped.
#[must_use = "dropping the permit releases its concurrency slot immediately"]
pub struct Permit {
    _slot: Option<OwnedSemaphorePermit>,
    shared: Arc<Shared>,
}

impl Drop for Permit {
    fn drop(&mut self) {
        self.shared.granted.fetch_sub(1, Ordering::AcqRel);
    }
}

impl fmt::Debug for Permit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Permit").finish_non_exhaustive()
    }
}

/// Keeps `requests_queued` honest when an acquisition is abandoned mid-wait
struct QueuedGuard<'a> {
    shared: &'a Shared,
    armed: bool,
}

impl<'a> QueuedGuard<'a> {
    fn enter(shared: &'a Shared) -> Self {
        shared.state().metrics.enqueue();
        Self {
            shared,
            armed: true,
        }
    }

    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for QueuedGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.shared.state().metrics.dequeue();
        }
    }
}
