//! Engine types
//!
//! Configuration and statistics for an extraction run.

use crate::limiter::MetricsSnapshot;
use crate::output::OutputFormat;
use crate::types::SearchOptions;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;

/// Default export file
pub const DEFAULT_OUTPUT: &str = "./jira-export.json";

/// Configuration for one extraction
#[derive(Debug, Clone)]
pub struct ExtractConfig {
    /// JQL query selecting the issues
    pub jql: String,
    /// Destination file
    pub output: PathBuf,
    /// File layout
    pub format: OutputFormat,
    /// Fields, expansions and page size
    pub search: SearchOptions,
    /// Log every page instead of throttled progress only
    pub verbose: bool,
    /// Minimum time between progress log lines
    pub progress_interval: Duration,
}

impl ExtractConfig {
    /// Extract `jql` into the default output file
    pub fn new(jql: impl Into<String>) -> Self {
        Self {
            jql: jql.into(),
            output: PathBuf::from(DEFAULT_OUTPUT),
            format: OutputFormat::Json,
            search: SearchOptions::default(),
            verbose: false,
            progress_interval: Duration::from_millis(500),
        }
    }

    /// Set the output file
    #[must_use]
    pub fn with_output(mut self, output: impl Into<PathBuf>) -> Self {
        self.output = output.into();
        self
    }

    /// Set the output format
    #[must_use]
    pub fn with_format(mut self, format: OutputFormat) -> Self {
        self.format = format;
        self
    }

    /// Set search options
    #[must_use]
    pub fn with_search(mut self, search: SearchOptions) -> Self {
        self.search = search;
        self
    }

    /// Enable per-page logging
    #[must_use]
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Set the progress log interval
    #[must_use]
    pub fn with_progress_interval(mut self, interval: Duration) -> Self {
        self.progress_interval = interval;
        self
    }
}

/// Statistics from an extraction
#[derive(Debug, Clone, Serialize)]
pub struct ExtractStats {
    /// Issues written
    pub issue_count: u64,
    /// Pages fetched
    pub pages: u64,
    /// Last total reported by the progress stream
    pub last_total: u64,
    /// Wall time in milliseconds
    pub duration_ms: u64,
    /// When the extraction started
    pub started_at: DateTime<Utc>,
    /// File the issues were written to
    pub output_path: PathBuf,
    /// Limiter counters at the end of the run
    pub metrics: MetricsSnapshot,
}

impl ExtractStats {
    /// Duration in seconds, for display
    pub fn duration_secs(&self) -> f64 {
        self.duration_ms as f64 / 1000.0
    }

    /// One-line human summary
    pub fn summary(&self) -> String {
        format!(
            "Successfully extracted {} issues in {:.1}s",
            self.issue_count,
            self.duration_secs()
        )
    }
}
