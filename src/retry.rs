//! Retry policy with exponential backoff
//!
//! Retries only [`FailureClass::Transient`] failures. Backoff doubles from the
//! base delay and is capped at four times the base delay.
//!
//! [`FailureClass::Transient`]: crate::error::FailureClass::Transient

use crate::error::{Error, Result};
use crate::limiter::RateBudget;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// Backoff grows by this factor per retry
const BACKOFF_FACTOR: u32 = 2;

/// Backoff never exceeds this multiple of the base delay
const MAX_BACKOFF_MULTIPLIER: u32 = 4;

/// Retry classification and backoff schedule
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_retries: u32,
    base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_budget(&RateBudget::default())
    }
}

impl RetryPolicy {
    /// Create a policy allowing `max_retries` retries after the first attempt
    pub fn new(max_retries: u32, base_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
        }
    }

    /// Take the retry settings from a rate budget
    pub fn from_budget(budget: &RateBudget) -> Self {
        Self::new(budget.retry_attempts(), budget.retry_base_delay())
    }

    /// A policy that never retries
    pub fn none() -> Self {
        Self::new(0, Duration::ZERO)
    }

    /// Maximum number of retries
    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Delay before the first retry
    pub fn base_delay(&self) -> Duration {
        self.base_delay
    }

    /// Whether to retry after `attempts_so_far` failed attempts ending in `error`
    pub fn should_retry(&self, error: &Error, attempts_so_far: u32) -> bool {
        error.is_retryable() && attempts_so_far <= self.max_retries
    }

    /// Delay before retry number `attempt` (1-based)
    pub fn next_delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1);
        let factor = BACKOFF_FACTOR.saturating_pow(exponent);
        let delay = self.base_delay.saturating_mul(factor);
        delay.min(self.base_delay.saturating_mul(MAX_BACKOFF_MULTIPLIER))
    }

    /// Run `op` until it succeeds, fails terminally, or the retries run out
    ///
    /// `op` receives the 1-based attempt number. The error returned is the one
    /// produced by the last attempt, unchanged.
    pub async fn run<T, F, Fut>(&self, mut op: F) -> Result<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 1;
        loop {
            match op(attempt).await {
                Ok(value) => return Ok(value),
                Err(e) if self.should_retry(&e, attempt) => {
                    let delay = self.next_delay(attempt);
                    warn!(
                        "Request failed ({}), attempt {}/{}, retrying in {:?}",
                        e,
                        attempt,
                        self.max_retries + 1,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    if e.is_retryable() {
                        debug!("Giving up after {attempt} attempts: {e}");
                    }
                    return Err(e);
                }
            }
        }
    }
}
