//! Jira HTTP adapter
//!
//! Provides the Jira REST client and the JQL search fetcher.
//!
//! # Features
//!
//! - **Shared budget**: every request takes a permit from one limiter
//! - **Retries**: transient failures are retried with exponential backoff
//! - **Cursor search**: `search/jql` pages are streamed lazily
//! - **Error payloads**: Jira's `errorMessages` / `errors` are preserved

mod client;
mod search;

pub use client::{is_valid_issue_key, JiraClient, JiraClientConfig};
pub use search::{JqlSearchFetcher, MAX_PAGE_SIZE};
