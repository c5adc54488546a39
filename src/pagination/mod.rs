//! Pagination module
//!
//! Drives cursor-based pagination through the shared rate limiter and the
//! retry policy, exposing the result as one lazy stream of items.
//!
//! # Overview
//!
//! - [`PageFetcher`] performs one network call for a cursor and returns a
//!   [`PageResult`]. It is supplied by the caller.
//! - [`PaginationEngine`] calls the fetcher page after page and yields the
//!   items in server order, reporting a [`ProgressEvent`] per item.
//!
//! The stream is pull-based: pages are only fetched while the consumer keeps
//! polling, and dropping the stream stops all further requests.

mod engine;
mod types;

pub use engine::{PageStream, PaginationEngine, DEFAULT_PAGE_SIZE};
pub use types::{
    from_fn, Cursor, FnFetcher, PageFetcher, PageResult, ProgressCallback, ProgressEvent,
    StreamOptions,
};
