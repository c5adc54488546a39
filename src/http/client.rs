//! Jira REST client
//!
//! Every request goes through the shared [`TokenBucketLimiter`] and the
//! [`RetryPolicy`]:
//! - one limiter permit per attempt, held while the request is in flight
//! - non-2xx responses become [`Error::Api`] carrying Jira's error payload
//! - every failed attempt is counted with `record_failure`

use super::search::JqlSearchFetcher;
use crate::auth::{AuthConfig, Authenticator};
use crate::error::{ApiErrorBody, Error, Result};
use crate::limiter::{MetricsSnapshot, RateBudget, TokenBucketLimiter};
use crate::pagination::{PageStream, PaginationEngine, StreamOptions};
use crate::retry::RetryPolicy;
use crate::types::{Issue, JiraUser, SearchOptions};
use regex::Regex;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE};
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::sync::{Arc, LazyLock};
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Issue keys (`PROJ-123`) or numeric issue ids
static ISSUE_KEY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:[A-Za-z][A-Za-z0-9_]*-[0-9]+|[0-9]+)$").unwrap());

/// Query parameters for one request
pub(crate) type Query = Vec<(&'static str, String)>;

/// Configuration for the Jira client
#[derive(Debug, Clone)]
pub struct JiraClientConfig {
    /// Jira instance URL, e.g. `https://company.atlassian.net`
    pub base_url: String,
    /// Credentials
    pub auth: AuthConfig,
    /// Shared request budget, including retry settings
    pub budget: RateBudget,
    /// Per-request timeout
    pub timeout: Duration,
    /// User agent string
    pub user_agent: String,
}

impl JiraClientConfig {
    /// Create a config with the default budget and timeout
    pub fn new(base_url: impl Into<String>, auth: AuthConfig) -> Self {
        Self {
            base_url: base_url.into(),
            auth,
            budget: RateBudget::default(),
            timeout: Duration::from_secs(30),
            user_agent: format!("jira-extract/{}", env!("CARGO_PKG_VERSION")),
        }
    }

    /// Set the request budget
    #[must_use]
    pub fn budget(mut self, budget: RateBudget) -> Self {
        self.budget = budget;
        self
    }

    /// Set the request timeout
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

struct Inner {
    http: Client,
    base_url: Url,
    auth: Authenticator,
    timeout: Duration,
}

/// Client for the Jira REST API v3
///
/// Cloning is cheap; clones share the connection pool and the limiter.
#[derive(Clone)]
pub struct JiraClient {
    inner: Arc<Inner>,
    engine: PaginationEngine,
}

impl JiraClient {
    /// Create a client, validating the base URL and credentials
    pub fn new(config: JiraClientConfig) -> Result<Self> {
        let auth = Authenticator::new(config.auth)?;
        let base_url = parse_base_url(&config.base_url)?;

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let http = Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .default_headers(headers)
            .build()?;

        let limiter = TokenBucketLimiter::new(config.budget);
        let retry = RetryPolicy::from_budget(&config.budget);

        Ok(Self {
            inner: Arc::new(Inner {
                http,
                base_url,
                auth,
                timeout: config.timeout,
            }),
            engine: PaginationEngine::new(limiter, retry),
        })
    }

    /// Stream every issue matching `jql`
    ///
    /// Issues are fetched page by page as the stream is polled.
    pub fn search_issues(
        &self,
        jql: impl Into<String>,
        options: SearchOptions,
        stream_options: StreamOptions,
    ) -> PageStream<Issue> {
        let fetcher = JqlSearchFetcher::new(self.clone(), jql, options);
        let engine = self.engine.clone().with_page_size(fetcher.page_size());
        engine.stream(fetcher, stream_options)
    }

    /// Collect every issue matching `jql` into memory
    pub async fn search_issues_all(
        &self,
        jql: impl Into<String>,
        options: SearchOptions,
    ) -> Result<Vec<Issue>> {
        let fetcher = JqlSearchFetcher::new(self.clone(), jql, options);
        let engine = self.engine.clone().with_page_size(fetcher.page_size());
        engine.collect(fetcher, StreamOptions::new()).await
    }

    /// Fetch a single issue by key (`PROJ-123`) or id
    pub async fn get_issue(&self, key: &str, fields: &[String]) -> Result<Issue> {
        if !ISSUE_KEY.is_match(key) {
            return Err(Error::validation(format!("Invalid issue key: '{key}'")));
        }
        let mut query = Query::new();
        if !fields.is_empty() {
            query.push(("fields", fields.join(",")));
        }
        self.call(&format!("rest/api/3/issue/{key}"), query).await
    }

    /// The authenticated user
    pub async fn current_user(&self) -> Result<JiraUser> {
        self.call("rest/api/3/myself", Query::new()).await
    }

    /// Verify the URL and credentials by fetching the current user
    pub async fn test_connection(&self) -> Result<bool> {
        let user = self.current_user().await?;
        debug!(account_id = %user.account_id, "connection verified");
        Ok(true)
    }

    /// Snapshot of the shared limiter's counters
    pub fn limiter_metrics(&self) -> MetricsSnapshot {
        self.engine.limiter().metrics()
    }

    /// The shared limiter
    pub fn limiter(&self) -> &TokenBucketLimiter {
        self.engine.limiter()
    }

    /// Jira instance URL
    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    /// Single request through the limiter and the retry policy
    async fn call<T: DeserializeOwned>(&self, path: &str, query: Query) -> Result<T> {
        let limiter = self.engine.limiter();
        let query = &query;
        self.engine
            .retry_policy()
            .run(move |attempt| async move {
                let _permit = limiter.acquire().await;
                debug!(path, attempt, "calling Jira");
                let result = self.send_once(path, query).await;
                if result.is_err() {
                    limiter.record_failure();
                }
                result
            })
            .await
    }

    /// One GET request without throttling or retries
    pub(crate) async fn send_once<T: DeserializeOwned>(&self, path: &str, query: &Query) -> Result<T> {
        let url = self.inner.base_url.join(path)?;
        let req = self.inner.http.get(url).query(query).timeout(self.inner.timeout);
        let req = self.inner.auth.apply(req);

        let response = req.send().await.map_err(|e| self.transport_error(e))?;
        let status = response.status();
        let bytes = response.bytes().await.map_err(|e| self.transport_error(e))?;

        if !status.is_success() {
            let body: ApiErrorBody = serde_json::from_slice(&bytes).unwrap_or_default();
            debug!(status = status.as_u16(), path, "Jira returned an error");
            return Err(Error::api(status.as_u16(), body));
        }

        Ok(serde_json::from_slice(&bytes)?)
    }

    fn transport_error(&self, e: reqwest::Error) -> Error {
        if e.is_timeout() {
            Error::Timeout {
                timeout_ms: self.inner.timeout.as_millis() as u64,
            }
        } else {
            Error::Http(e)
        }
    }
}

impl std::fmt::Debug for JiraClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JiraClient")
            .field("base_url", &self.inner.base_url.as_str())
            .field("auth", &self.inner.auth)
            .field("limiter", self.engine.limiter())
            .finish_non_exhaustive()
    }
}

/// Parse the instance URL so that API paths join beneath it
fn parse_base_url(raw: &str) -> Result<Url> {
    let trimmed = raw.trim().trim_end_matches('/');
    let url = Url::parse(&format!("{trimmed}/"))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(Error::invalid_value(
            "base_url",
            format!("unsupported scheme '{}'", url.scheme()),
        ));
    }
    Ok(url)
}

/// True when `key` looks like an issue key or id
pub fn is_valid_issue_key(key: &str) -> bool {
    ISSUE_KEY.is_match(key)
}
