//! Jira wire types shared across the crate
//!
//! Only the fields the extractor looks at are typed. Everything else is kept
//! as raw JSON so exported records carry the full server payload, custom
//! fields included.

use serde::{Deserialize, Serialize};

// ============================================================================
// Type Aliases
// ============================================================================

/// JSON value type (re-exported from serde_json)
pub type JsonValue = serde_json::Value;

/// JSON object type
pub type JsonObject = serde_json::Map<String, JsonValue>;

// ============================================================================
// Issues
// ============================================================================

/// A Jira issue as returned by the REST API v3
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    /// Numeric issue id (as a string)
    pub id: String,
    /// Issue key, e.g. `PROJ-123`
    pub key: String,
    /// Canonical API URL of the issue
    #[serde(rename = "self", default, skip_serializing_if = "Option::is_none")]
    pub self_url: Option<String>,
    /// Issue fields, including custom fields
    #[serde(default)]
    pub fields: JsonObject,
    /// Expansions applied by the server
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expand: Option<String>,
    /// Change history, present when `changelog` was expanded
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub changelog: Option<JsonValue>,
    /// Any other top-level properties (`renderedFields`, `names`, ...)
    #[serde(flatten)]
    pub extra: JsonObject,
}

impl Issue {
    /// The `summary` field, if present
    pub fn summary(&self) -> Option<&str> {
        self.fields.get("summary").and_then(JsonValue::as_str)
    }

    /// The status name, if present
    pub fn status_name(&self) -> Option<&str> {
        self.fields
            .get("status")
            .and_then(|status| status.get("name"))
            .and_then(JsonValue::as_str)
    }
}

/// Response of `GET /rest/api/3/search/jql`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JqlSearchResponse {
    /// Issues on this page
    #[serde(default)]
    pub issues: Vec<Issue>,
    /// Token for the next page
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_page_token: Option<String>,
    /// True on the final page
    #[serde(default)]
    pub is_last: bool,
}

// ============================================================================
// Users
// ============================================================================

/// The authenticated user, from `GET /rest/api/3/myself`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JiraUser {
    pub account_id: String,
    #[serde(default)]
    pub account_type: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub email_address: Option<String>,
    #[serde(default)]
    pub active: bool,
    #[serde(default)]
    pub time_zone: Option<String>,
    #[serde(flatten)]
    pub extra: JsonObject,
}

// ============================================================================
// Search Options
// ============================================================================

/// Options for a JQL search
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchOptions {
    /// Fields to include; empty means the server default
    pub fields: Vec<String>,
    /// Expansions such as `changelog` or `renderedFields`
    pub expand: Vec<String>,
    /// Page size; clamped to the server maximum of 100
    pub max_results: Option<usize>,
}

impl SearchOptions {
    /// Default options
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict the returned fields
    #[must_use]
    pub fn fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields = fields.into_iter().map(Into::into).collect();
        self
    }

    /// Request expansions
    #[must_use]
    pub fn expand<I, S>(mut self, expand: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.expand = expand.into_iter().map(Into::into).collect();
        self
    }

    /// Set the page size
    #[must_use]
    pub fn max_results(mut self, max_results: usize) -> Self {
        self.max_results = Some(max_results);
        self
    }
}

/// Split a comma separated list, dropping blanks
pub fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}
