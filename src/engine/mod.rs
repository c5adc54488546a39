//! Extraction engine module
//!
//! Pulls a JQL search through the paginated client into a [`RecordWriter`].
//!
//! # Overview
//!
//! The engine module provides:
//! - `Extractor` - Runs one extraction and reports progress
//! - `ExtractConfig` - What to extract and where to put it
//! - `ExtractStats` - Counts, timing and limiter metrics of a run

mod types;

pub use types::{ExtractConfig, ExtractStats, DEFAULT_OUTPUT};

use crate::error::{Result, ResultExt};
use crate::http::JiraClient;
use crate::output::RecordWriter;
use crate::pagination::{ProgressEvent, StreamOptions};
use chrono::Utc;
use futures::TryStreamExt;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// How often a verbose run logs its running count
const VERBOSE_COUNT_EVERY: u64 = 50;

/// Throttled progress logging shared with the progress callback
#[derive(Debug, Default)]
struct ProgressLog {
    last_logged: Option<Instant>,
    last_page: u64,
    last_total: u64,
}

impl ProgressLog {
    fn observe(&mut self, event: ProgressEvent, interval: Duration, verbose: bool) {
        let now = Instant::now();
        let due = self
            .last_logged
            .map_or(true, |at| now.duration_since(at) > interval);
        if due {
            info!(
                "Extracting issues... {}/{} ({}%)",
                event.current, event.total, event.percentage
            );
            self.last_logged = Some(now);
        }
        if verbose && event.page != self.last_page {
            info!("Page {}: {}/{}", event.page, event.current, event.total);
        }
        self.last_page = event.page;
        self.last_total = event.total;
    }
}

/// Runs extractions against one client
#[derive(Debug, Clone)]
pub struct Extractor {
    client: JiraClient,
}

impl Extractor {
    /// Create an extractor
    pub fn new(client: JiraClient) -> Self {
        Self { client }
    }

    /// The client used for requests
    pub fn client(&self) -> &JiraClient {
        &self.client
    }

    /// Extract into `config.output`
    ///
    /// Issues are written to `<output>.partial` and the file is renamed into
    /// place only once the whole search has been written. On failure the
    /// partial file is left behind for inspection.
    pub async fn run(&self, config: &ExtractConfig) -> Result<ExtractStats> {
        let partial = partial_path(&config.output);
        let mut writer = RecordWriter::create(&partial, config.format)?;

        let mut stats = self.extract_to(config, &mut writer).await.inspect_err(|_| {
            warn!(
                "Extraction failed after {} issues; partial output kept at {}",
                writer.count(),
                partial.display()
            );
        })?;

        std::fs::rename(&partial, &config.output).with_context(|| {
            format!("Failed to move output into place at {}", config.output.display())
        })?;
        stats.output_path.clone_from(&config.output);
        Ok(stats)
    }

    /// Extract into an already open writer and finish it
    pub async fn extract_to<W: Write>(
        &self,
        config: &ExtractConfig,
        writer: &mut RecordWriter<W>,
    ) -> Result<ExtractStats> {
        let started_at = Utc::now();
        let start = Instant::now();
        info!(jql = %config.jql, "Starting extraction");

        let progress = Arc::new(Mutex::new(ProgressLog::default()));
        let sink = Arc::clone(&progress);
        let interval = config.progress_interval;
        let verbose = config.verbose;
        let options = StreamOptions::new().on_progress(move |event| {
            sink.lock()
                .unwrap_or_else(PoisonError::into_inner)
                .observe(event, interval, verbose);
        });

        let mut issues = self
            .client
            .search_issues(config.jql.clone(), config.search.clone(), options);
        while let Some(issue) = issues.try_next().await? {
            writer.write(&issue)?;
            if verbose && writer.count() % VERBOSE_COUNT_EVERY == 0 {
                debug!("Collected {} issues so far...", writer.count());
            }
        }
        let issue_count = writer.finish()?;

        let (pages, last_total) = {
            let log = progress.lock().unwrap_or_else(PoisonError::into_inner);
            (log.last_page, log.last_total)
        };
        if verbose {
            info!("Total issues collected: {issue_count}");
            info!("Expected total: {last_total}");
        }

        let stats = ExtractStats {
            issue_count,
            pages,
            last_total,
            duration_ms: start.elapsed().as_millis() as u64,
            started_at,
            output_path: writer.path().map(Path::to_path_buf).unwrap_or_default(),
            metrics: self.client.limiter_metrics(),
        };
        info!("{}", stats.summary());
        Ok(stats)
    }
}

fn partial_path(output: &Path) -> PathBuf {
    let mut name = output.as_os_str().to_owned();
    name.push(".partial");
    PathBuf::from(name)
}
