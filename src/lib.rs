// Allow common clippy pedantic lints that aren't critical for this codebase
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_lossless)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::items_after_statements)]
#![allow(clippy::needless_pass_by_value)]

//! # jira-extract
//!
//! Rate-limited, cursor-paginated extraction of Jira issues.
//!
//! ## Features
//!
//! - **Token bucket limiter**: sustained rate, burst, minimum spacing and
//!   bounded concurrency, all shared by one client
//! - **Retries**: transient failures retried with capped exponential backoff
//! - **Lazy pagination**: a `Stream` of issues that only fetches the next page
//!   when the previous one has been consumed
//! - **Progress**: running counts with an estimated total
//! - **Output**: streaming JSON array or JSON Lines files
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use futures::TryStreamExt;
//! use jira_extract::{AuthConfig, JiraClient, JiraClientConfig, SearchOptions, StreamOptions};
//!
//! #[tokio::main]
//! async fn main() -> jira_extract::Result<()> {
//!     let config = JiraClientConfig::new(
//!         "https://company.atlassian.net",
//!         AuthConfig::basic("user@example.com", "api-token"),
//!     );
//!     let client = JiraClient::new(config)?;
//!
//!     let progress = StreamOptions::new().on_progress(|p| println!("{}%", p.percentage));
//!     let mut issues = client.search_issues("project = PROJ", SearchOptions::new(), progress);
//!     while let Some(issue) = issues.try_next().await? {
//!         println!("{} {}", issue.key, issue.summary().unwrap_or_default());
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  CLI (extract / check / issue)  →  Extractor  →  RecordWriter   │
//! └─────────────────────────────────────────────────────────────────┘
//!                                │
//! ┌──────────────────────────────┴──────────────────────────────────┐
//! │  JiraClient: auth header, search/jql fetcher, single requests   │
//! └─────────────────────────────────────────────────────────────────┘
//!                                │
//! ┌───────────────┬──────────────┴────────────┬─────────────────────┐
//! │   Paginate    │          Retry            │       Limiter       │
//! ├───────────────┼───────────────────────────┼─────────────────────┤
//! │ Cursor loop   │ Transient / terminal      │ Token bucket        │
//! │ Lazy stream   │ Exponential backoff       │ Min interval        │
//! │ Progress      │ Capped at 4x base         │ Max concurrent      │
//! └───────────────┴───────────────────────────┴─────────────────────┘
//! ```

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]

// ============================================================================
// Module declarations
// ============================================================================

/// Error types and failure classification
pub mod error;

/// Jira wire types
pub mod types;

/// Request budget enforcement
pub mod limiter;

/// Retry policy with exponential backoff
pub mod retry;

/// Cursor pagination engine
pub mod pagination;

/// Basic and Bearer authentication
pub mod auth;

/// Jira REST client
pub mod http;

/// Configuration file, environment and validation
pub mod config;

/// Streaming JSON / JSON Lines output
pub mod output;

/// Extraction runs
pub mod engine;

/// Command-line interface
pub mod cli;

// ============================================================================
// Re-exports
// ============================================================================

pub use auth::AuthConfig;
pub use config::ExtractorConfig;
pub use engine::{ExtractConfig, ExtractStats, Extractor};
pub use error::{Error, FailureClass, Result};
pub use http::{JiraClient, JiraClientConfig};
pub use limiter::{MetricsSnapshot, RateBudget, TokenBucketLimiter};
pub use pagination::{PageFetcher, PageResult, PaginationEngine, ProgressEvent, StreamOptions};
pub use retry::RetryPolicy;
pub use types::{Issue, SearchOptions};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
