//! JQL search fetcher
//!
//! Maps `GET /rest/api/3/search/jql` onto the [`PageFetcher`] contract.
//! The endpoint pages with an opaque `nextPageToken` and flags the final page
//! with `isLast`.

use super::client::{JiraClient, Query};
use crate::error::Result;
use crate::pagination::{Cursor, PageFetcher, PageResult};
use crate::types::{Issue, JqlSearchResponse, SearchOptions};
use async_trait::async_trait;
use tracing::debug;

/// Largest page the search endpoint returns
pub const MAX_PAGE_SIZE: usize = 100;

const SEARCH_PATH: &str = "rest/api/3/search/jql";

/// Fetches pages of a JQL search
#[derive(Debug, Clone)]
pub struct JqlSearchFetcher {
    client: JiraClient,
    jql: String,
    options: SearchOptions,
}

impl JqlSearchFetcher {
    /// Create a fetcher for `jql`
    pub fn new(client: JiraClient, jql: impl Into<String>, options: SearchOptions) -> Self {
        Self {
            client,
            jql: jql.into(),
            options,
        }
    }

    /// Page size sent as `maxResults`, between 1 and [`MAX_PAGE_SIZE`]
    pub fn page_size(&self) -> usize {
        self.options
            .max_results
            .unwrap_or(MAX_PAGE_SIZE)
            .clamp(1, MAX_PAGE_SIZE)
    }

    fn query(&self, cursor: Option<&Cursor>, page_size: usize) -> Query {
        let mut query: Query = vec![
            ("jql", self.jql.clone()),
            ("maxResults", page_size.clamp(1, MAX_PAGE_SIZE).to_string()),
        ];
        if let Some(cursor) = cursor {
            query.push(("nextPageToken", cursor.to_string()));
        }
        if !self.options.fields.is_empty() {
            query.push(("fields", self.options.fields.join(",")));
        }
        if !self.options.expand.is_empty() {
            query.push(("expand", self.options.expand.join(",")));
        }
        query
    }
}

#[async_trait]
impl PageFetcher for JqlSearchFetcher {
    type Item = Issue;

    async fn fetch(&self, cursor: Option<&Cursor>, page_size_hint: usize) -> Result<PageResult<Issue>> {
        let query = self.query(cursor, page_size_hint);
        let page: JqlSearchResponse = self.client.send_once(SEARCH_PATH, &query).await?;

        debug!(
            issues = page.issues.len(),
            is_last = page.is_last,
            has_next_page_token = page.next_page_token.is_some(),
            "search page received"
        );

        Ok(PageResult {
            items: page.issues,
            continuation: page.next_page_token.map(Cursor::from),
            is_last: page.is_last,
        })
    }
}
