//! Rate budget configuration
//!
//! A [`RateBudget`] is immutable once built. The builder validates every
//! field in `build()`, so an invalid budget never exists.

use crate::error::{Error, Result};
use std::time::Duration;

/// Validated limiter configuration
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateBudget {
    requests_per_second: f64,
    burst_capacity: f64,
    max_concurrent: usize,
    min_interval: Duration,
    retry_attempts: u32,
    retry_base_delay: Duration,
}

impl RateBudget {
    /// Start building a budget from the defaults
    pub fn builder() -> RateBudgetBuilder {
        RateBudgetBuilder::default()
    }

    /// Budget with no rate limit and no spacing, still bounded by `max_concurrent`
    pub fn unthrottled(max_concurrent: usize) -> Result<Self> {
        Self::builder()
            .requests_per_second(f64::INFINITY)
            .max_concurrent(max_concurrent)
            .min_interval(Duration::ZERO)
            .build()
    }

    /// Sustained request rate
    pub fn requests_per_second(&self) -> f64 {
        self.requests_per_second
    }

    /// Maximum tokens held in the bucket
    pub fn burst_capacity(&self) -> f64 {
        self.burst_capacity
    }

    /// Maximum permits held at the same time
    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }

    /// Minimum spacing between two granted acquisitions
    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Number of retries after the first failed attempt
    pub fn retry_attempts(&self) -> u32 {
        self.retry_attempts
    }

    /// Delay before the first retry
    pub fn retry_base_delay(&self) -> Duration {
        self.retry_base_delay
    }

    /// True when the token rate is infinite
    pub fn is_unthrottled(&self) -> bool {
        self.requests_per_second.is_infinite()
    }
}

impl Default for RateBudget {
    fn default() -> Self {
        Self {
            requests_per_second: 2.0,
            burst_capacity: 2.0,
            max_concurrent: 2,
            min_interval: Duration::from_millis(200),
            retry_attempts: 3,
            retry_base_delay: Duration::from_millis(1000),
        }
    }
}

/// Builder for [`RateBudget`]
#[derive(Debug, Clone)]
pub struct RateBudgetBuilder {
    requests_per_second: f64,
    burst_capacity: Option<f64>,
    max_concurrent: usize,
    min_interval: Duration,
    retry_attempts: u32,
    retry_base_delay: Duration,
}

impl Default for RateBudgetBuilder {
    fn default() -> Self {
        let defaults = RateBudget::default();
        Self {
            requests_per_second: defaults.requests_per_second,
            burst_capacity: None,
            max_concurrent: defaults.max_concurrent,
            min_interval: defaults.min_interval,
            retry_attempts: defaults.retry_attempts,
            retry_base_delay: defaults.retry_base_delay,
        }
    }
}

impl RateBudgetBuilder {
    /// Set the sustained rate
    #[must_use]
    pub fn requests_per_second(mut self, rate: f64) -> Self {
        self.requests_per_second = rate;
        self
    }

    /// Set the burst capacity (defaults to the rate, at least one token)
    #[must_use]
    pub fn burst_capacity(mut self, burst: f64) -> Self {
        self.burst_capacity = Some(burst);
        self
    }

    /// Set the concurrency bound
    #[must_use]
    pub fn max_concurrent(mut self, max: usize) -> Self {
        self.max_concurrent = max;
        self
    }

    /// Set the minimum spacing between grants
    #[must_use]
    pub fn min_interval(mut self, interval: Duration) -> Self {
        self.min_interval = interval;
        self
    }

    /// Set the minimum spacing in milliseconds
    #[must_use]
    pub fn min_interval_ms(self, ms: u64) -> Self {
        self.min_interval(Duration::from_millis(ms))
    }

    /// Set the retry budget
    #[must_use]
    pub fn retry_attempts(mut self, attempts: u32) -> Self {
        self.retry_attempts = attempts;
        self
    }

    /// Set the base retry delay
    #[must_use]
    pub fn retry_base_delay(mut self, delay: Duration) -> Self {
        self.retry_base_delay = delay;
        self
    }

    /// Set the base retry delay in milliseconds
    #[must_use]
    pub fn retry_base_delay_ms(self, ms: u64) -> Self {
        self.retry_base_delay(Duration::from_millis(ms))
    }

    /// Validate and build the budget
    pub fn build(self) -> Result<RateBudget> {
        let rate = self.requests_per_second;
        if rate.is_nan() || rate <= 0.0 {
            return Err(Error::invalid_value(
                "requests_per_second",
                format!("must be greater than 0, got {rate}"),
            ));
        }

        // The bucket must be able to hold one whole token or no request is ever admitted
        let burst = self.burst_capacity.unwrap_or(rate.max(1.0));
        if burst.is_nan() || burst < rate {
            return Err(Error::invalid_value(
                "burst_capacity",
                format!("must be at least requests_per_second ({rate}), got {burst}"),
            ));
        }
        if burst < 1.0 {
            return Err(Error::invalid_value(
                "burst_capacity",
                format!("must hold at least one token, got {burst}"),
            ));
        }

        if self.max_concurrent == 0 {
            return Err(Error::invalid_value(
                "max_concurrent",
                "must be at least 1",
            ));
        }

        Ok(RateBudget {
            requests_per_second: rate,
            burst_capacity: burst,
            max_concurrent: self.max_concurrent,
            min_interval: self.min_interval,
            retry_attempts: self.retry_attempts,
            retry_base_delay: self.retry_base_delay,
        })
    }
}
