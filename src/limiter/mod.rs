//! Rate limiting module
//!
//! Provides the shared request budget used by every outbound call.
//!
//! # Features
//!
//! - **Token Bucket**: Lazy refill from elapsed time, no background timer
//! - **Minimum Interval**: Enforced spacing between granted requests
//! - **Bounded Concurrency**: At most `max_concurrent` permits held at once
//! - **FIFO Admission**: Callers are served in the order they asked
//! - **Metrics**: Request counters and a rolling wait-time average

mod bucket;
mod budget;
mod metrics;

pub use bucket::{Permit, TokenBucketLimiter};
pub use budget::{RateBudget, RateBudgetBuilder};
pub use metrics::MetricsSnapshot;

#[cfg(test)]
mod tests;
