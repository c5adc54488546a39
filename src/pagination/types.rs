//! Pagination types and traits
//!
//! Defines the fetcher boundary and the values that cross it.

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// Opaque continuation token identifying where the next page begins
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cursor(String);

impl Cursor {
    /// Wrap a raw token
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// The raw token
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for Cursor {
    fn from(token: String) -> Self {
        Self(token)
    }
}

impl From<&str> for Cursor {
    fn from(token: &str) -> Self {
        Self(token.to_string())
    }
}

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One page returned by a [`PageFetcher`]
#[derive(Debug, Clone, PartialEq)]
pub struct PageResult<T> {
    /// Items in server order
    pub items: Vec<T>,
    /// Where the next page begins; `None` means there is no next page
    pub continuation: Option<Cursor>,
    /// Server marked this page as the last one
    pub is_last: bool,
}

impl<T> PageResult<T> {
    /// A page followed by more pages
    pub fn more(items: Vec<T>, continuation: impl Into<Cursor>) -> Self {
        Self {
            items,
            continuation: Some(continuation.into()),
            is_last: false,
        }
    }

    /// The final page
    pub fn last(items: Vec<T>) -> Self {
        Self {
            items,
            continuation: None,
            is_last: true,
        }
    }

    /// True when no further page should be requested
    ///
    /// `is_last` wins over a continuation that is present anyway.
    pub fn is_final(&self) -> bool {
        self.is_last || self.continuation.is_none()
    }
}

/// Fetches one page of items for a cursor
///
/// Implementations own the wire format and any request timeout. Failures must
/// be returned as [`crate::Error`] values so the retry policy can classify
/// them.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Item produced by this fetcher
    type Item: Send + 'static;

    /// Fetch the page starting at `cursor` (`None` for the first page)
    async fn fetch(
        &self,
        cursor: Option<&Cursor>,
        page_size_hint: usize,
    ) -> Result<PageResult<Self::Item>>;
}

/// [`PageFetcher`] backed by an async closure, see [`from_fn`]
pub struct FnFetcher<F> {
    f: F,
}

/// Build a [`PageFetcher`] from an async closure taking the cursor and page size
///
/// ```rust,ignore
/// let fetcher = from_fn(|cursor, size| async move {
///     Ok(PageResult::last(vec![1, 2, 3]))
/// });
/// ```
pub fn from_fn<F, Fut, T>(f: F) -> FnFetcher<F>
where
    F: Fn(Option<Cursor>, usize) -> Fut + Send + Sync,
    Fut: Future<Output = Result<PageResult<T>>> + Send,
    T: Send + 'static,
{
    FnFetcher { f }
}

#[async_trait]
impl<F, Fut, T> PageFetcher for FnFetcher<F>
where
    F: Fn(Option<Cursor>, usize) -> Fut + Send + Sync,
    Fut: Future<Output = Result<PageResult<T>>> + Send,
    T: Send + 'static,
{
    type Item = T;

    async fn fetch(&self, cursor: Option<&Cursor>, page_size_hint: usize) -> Result<PageResult<T>> {
        (self.f)(cursor.cloned(), page_size_hint).await
    }
}

impl<F> fmt::Debug for FnFetcher<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnFetcher").finish_non_exhaustive()
    }
}

/// Progress of a running traversal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ProgressEvent {
    /// Items emitted so far (1-based running count)
    pub current: u64,
    /// Total items, a running estimate while `estimated` is set
    pub total: u64,
    /// Completion percentage, 0 to 100
    pub percentage: u8,
    /// Page the current item came from (1-based)
    pub page: u64,
    /// The final page has not been seen yet
    pub estimated: bool,
}

impl ProgressEvent {
    /// Build an event, computing the rounded percentage
    pub fn new(current: u64, total: u64, page: u64, estimated: bool) -> Self {
        let percentage = if total == 0 {
            0
        } else {
            ((current as f64 / total as f64) * 100.0).round().min(100.0) as u8
        };
        Self {
            current,
            total,
            percentage,
            page,
            estimated,
        }
    }

    /// The closing event of a finished traversal
    pub fn complete(count: u64, page: u64) -> Self {
        Self {
            current: count,
            total: count,
            percentage: 100,
            page,
            estimated: false,
        }
    }
}

/// Callback receiving progress events
pub type ProgressCallback = Arc<dyn Fn(ProgressEvent) + Send + Sync>;

/// Per-stream options
#[derive(Clone, Default)]
pub struct StreamOptions {
    on_progress: Option<ProgressCallback>,
}

impl StreamOptions {
    /// Options with no progress reporting
    pub fn new() -> Self {
        Self::default()
    }

    /// Report progress to `callback`
    #[must_use]
    pub fn on_progress(mut self, callback: impl Fn(ProgressEvent) + Send + Sync + 'static) -> Self {
        self.on_progress = Some(Arc::new(callback));
        self
    }

    pub(crate) fn report(&self, event: ProgressEvent) {
        if let Some(callback) = &self.on_progress {
            callback(event);
        }
    }
}

impl fmt::Debug for StreamOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamOptions")
            .field("has_progress_callback", &self.on_progress.is_some())
            .finish()
    }
}
