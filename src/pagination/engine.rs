//! Pagination engine
//!
//! Turns a [`PageFetcher`] into a lazy stream of items.

use super::types::{Cursor, PageFetcher, PageResult, ProgressEvent, StreamOptions};
use crate::error::{Error, Result};
use crate::limiter::TokenBucketLimiter;
use crate::retry::RetryPolicy;
use async_stream::try_stream;
use futures::{Stream, TryStreamExt};
use pin_project_lite::pin_project;
use std::pin::Pin;
use std::task::{Context, Poll};
use tracing::{debug, warn};

/// Page size used when none is configured
pub const DEFAULT_PAGE_SIZE: usize = 100;

pin_project! {
    /// Lazy stream of items produced by [`PaginationEngine::stream`]
    ///
    /// Yields `Err` at most once, after which it ends.
    pub struct PageStream<T> {
        #[pin]
        inner: Pin<Box<dyn Stream<Item = Result<T>> + Send>>,
    }
}

impl<T> PageStream<T> {
    fn new(inner: impl Stream<Item = Result<T>> + Send + 'static) -> Self {
        Self {
            inner: Box::pin(inner),
        }
    }
}

impl<T> Stream for PageStream<T> {
    type Item = Result<T>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.project().inner.poll_next(cx)
    }
}

/// Running counts for one traversal
#[derive(Debug)]
struct Traversal {
    page_size: u64,
    page: u64,
    emitted: u64,
    total: u64,
    estimated: bool,
}

impl Traversal {
    fn new(page_size: usize) -> Self {
        Self {
            page_size: page_size as u64,
            page: 0,
            emitted: 0,
            total: 0,
            estimated: true,
        }
    }

    fn begin_page(&mut self) -> u64 {
        self.page += 1;
        self.page
    }

    /// Update the total estimate from a freshly fetched page
    ///
    /// A full page that is not the last one suggests another full page follows.
    fn observe(&mut self, len: usize, is_final: bool) {
        let len = len as u64;
        self.total = if !is_final && len == self.page_size {
            self.emitted + len + self.page_size
        } else {
            self.emitted + len
        };
        self.estimated = !is_final;
    }

    fn advance(&mut self) -> ProgressEvent {
        self.emitted += 1;
        ProgressEvent::new(self.emitted, self.total, self.page, self.estimated)
    }

    fn finish(&self) -> ProgressEvent {
        ProgressEvent::complete(self.emitted, self.page)
    }
}

/// Drives a [`PageFetcher`] to exhaustion through the limiter and retry policy
#[derive(Debug, Clone)]
pub struct PaginationEngine {
    limiter: TokenBucketLimiter,
    retry: RetryPolicy,
    page_size: usize,
}

impl PaginationEngine {
    /// Create an engine using the default page size
    pub fn new(limiter: TokenBucketLimiter, retry: RetryPolicy) -> Self {
        Self {
            limiter,
            retry,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    /// Set the page size hint passed to fetchers
    #[must_use]
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Page size hint passed to fetchers
    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// The shared limiter
    pub fn limiter(&self) -> &TokenBucketLimiter {
        &self.limiter
    }

    /// The retry policy applied to every page fetch
    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    /// Stream every item the fetcher produces, starting from the first page
    ///
    /// Nothing happens until the stream is polled. Items of one page are
    /// yielded back to back; the next page is only requested once the
    /// previous one has been drained. A fetch that fails terminally, or
    /// transiently after the retries ran out, is yielded as the stream's last
    /// element.
    pub fn stream<F>(&self, fetcher: F, options: StreamOptions) -> PageStream<F::Item>
    where
        F: PageFetcher + 'static,
    {
        let limiter = self.limiter.clone();
        let retry = self.retry;
        let page_size = self.page_size;

        let stream = try_stream! {
            let mut traversal = Traversal::new(page_size);
            let mut cursor: Option<Cursor> = None;

            loop {
                let page_number = traversal.begin_page();
                let page: PageResult<F::Item> = fetch_page(
                    &limiter,
                    &retry,
                    &fetcher,
                    cursor.as_ref(),
                    page_size,
                    page_number,
                )
                .await?;

                if page.is_last && page.continuation.is_some() {
                    warn!(page = page_number, "page marked last but carries a cursor, stopping");
                }
                let is_final = page.is_final();
                if !is_final && page.continuation == cursor {
                    Err::<(), _>(Error::decode(format!(
                        "pagination cursor did not advance after page {page_number}"
                    )))?;
                }

                debug!(
                    page = page_number,
                    items = page.items.len(),
                    last = is_final,
                    "fetched page"
                );
                traversal.observe(page.items.len(), is_final);
                cursor = page.continuation;

                for item in page.items {
                    options.report(traversal.advance());
                    yield item;
                }

                if is_final {
                    break;
                }
            }

            options.report(traversal.finish());
        };

        PageStream::new(stream)
    }

    /// Buffer a whole traversal into memory
    pub async fn collect<F>(&self, fetcher: F, options: StreamOptions) -> Result<Vec<F::Item>>
    where
        F: PageFetcher + 'static,
    {
        self.stream(fetcher, options).try_collect().await
    }
}

/// Fetch one page, taking a limiter permit for every attempt
async fn fetch_page<F: PageFetcher>(
    limiter: &TokenBucketLimiter,
    retry: &RetryPolicy,
    fetcher: &F,
    cursor: Option<&Cursor>,
    page_size: usize,
    page_number: u64,
) -> Result<PageResult<F::Item>> {
    retry
        .run(move |attempt| async move {
            let _permit = limiter.acquire().await;
            debug!(page = page_number, attempt, "requesting page");
            let result = fetcher.fetch(cursor, page_size).await;
            if result.is_err() {
                limiter.record_failure();
            }
            result
        })
        .await
}
