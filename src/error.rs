//! Error types for jira-extract
//!
//! This module defines the error hierarchy for the whole crate.
//! All public APIs return `Result<T, Error>` where Error is defined here.
//!
//! Every error belongs to exactly one [`FailureClass`]. The class is decided
//! once, where a network result is interpreted, and the retry policy only
//! ever looks at the class.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// How a failure should be treated by the retry machinery
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureClass {
    /// Time-bound failure that is likely to succeed later (retried)
    Transient,
    /// Failure that will not succeed without different input (never retried)
    Terminal,
    /// Invalid configuration, detected before any network activity
    Config,
}

impl fmt::Display for FailureClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transient => f.write_str("transient"),
            Self::Terminal => f.write_str("terminal"),
            Self::Config => f.write_str("config"),
        }
    }
}

/// Structured error payload returned by the Jira REST API
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiErrorBody {
    /// General error messages
    #[serde(default)]
    pub error_messages: Vec<String>,
    /// Field-level errors keyed by field name
    #[serde(default)]
    pub errors: BTreeMap<String, String>,
}

impl ApiErrorBody {
    /// True when the payload carries no messages at all
    pub fn is_empty(&self) -> bool {
        self.error_messages.is_empty() && self.errors.is_empty()
    }
}

/// The main error type for jira-extract
#[derive(Error, Debug)]
pub enum Error {
    // ============================================================================
    // Configuration Errors
    // ============================================================================
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Missing required config field: {field}")]
    MissingConfigField { field: String },

    #[error("Invalid config value for '{field}': {message}")]
    InvalidConfigValue { field: String, message: String },

    #[error("Failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    // ============================================================================
    // Authentication Errors
    // ============================================================================
    #[error("Authentication failed: {message}")]
    Auth { message: String },

    // ============================================================================
    // HTTP Errors
    // ============================================================================
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{message}")]
    Api {
        status: u16,
        message: String,
        body: ApiErrorBody,
    },

    #[error("Request timeout after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    // ============================================================================
    // Data Processing Errors
    // ============================================================================
    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("Failed to decode response: {message}")]
    Decode { message: String },

    #[error("Validation failed: {message}")]
    Validation { message: String },

    // ============================================================================
    // I/O Errors
    // ============================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // ============================================================================
    // Generic Errors
    // ============================================================================
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a missing field error
    pub fn missing_field(field: impl Into<String>) -> Self {
        Self::MissingConfigField {
            field: field.into(),
        }
    }

    /// Create an invalid value error
    pub fn invalid_value(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidConfigValue {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create an auth error
    pub fn auth(message: impl Into<String>) -> Self {
        Self::Auth {
            message: message.into(),
        }
    }

    /// Create an API status error with the standard message for the status
    pub fn api(status: u16, body: ApiErrorBody) -> Self {
        Self::Api {
            status,
            message: status_message(status),
            body,
        }
    }

    /// Create a decode error
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }

    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Classify this error for retry decisions
    pub fn class(&self) -> FailureClass {
        match self {
            Error::Config { .. }
            | Error::MissingConfigField { .. }
            | Error::InvalidConfigValue { .. }
            | Error::YamlParse(_)
            | Error::InvalidUrl(_) => FailureClass::Config,

            Error::Timeout { .. } => FailureClass::Transient,
            Error::Api { status, .. } => {
                if is_retryable_status(*status) {
                    FailureClass::Transient
                } else {
                    FailureClass::Terminal
                }
            }
            // No usable response arrived: connect, timeout or send failures.
            // A body that arrived but could not be decoded will not change on retry.
            Error::Http(e) => {
                if e.is_decode() || e.is_builder() || e.is_redirect() {
                    FailureClass::Terminal
                } else {
                    FailureClass::Transient
                }
            }

            Error::Auth { .. }
            | Error::JsonParse(_)
            | Error::Decode { .. }
            | Error::Validation { .. }
            | Error::Io(_)
            | Error::Other(_) => FailureClass::Terminal,
        }
    }

    /// Check if this error is retryable
    pub fn is_retryable(&self) -> bool {
        self.class() == FailureClass::Transient
    }

    /// HTTP status carried by this error, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Api { status, .. } => Some(*status),
            Error::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Render the error with any structured API payload, one item per line
    pub fn detailed_message(&self) -> String {
        let Error::Api { message, body, .. } = self else {
            return self.to_string();
        };

        let mut parts = vec![message.clone()];
        if !body.error_messages.is_empty() {
            parts.push("Error messages:".to_string());
            for msg in &body.error_messages {
                parts.push(format!("  - {msg}"));
            }
        }
        if !body.errors.is_empty() {
            parts.push("Field errors:".to_string());
            for (field, error) in &body.errors {
                parts.push(format!("  - {field}: {error}"));
            }
        }
        parts.join("\n")
    }
}

/// Check if an HTTP status code is retryable
fn is_retryable_status(status: u16) -> bool {
    status == 429 || status >= 500
}

/// User-facing message for an HTTP status returned by Jira
pub fn status_message(status: u16) -> String {
    let message = match status {
        400 => "Bad Request: The request was invalid. Please check your JQL query.",
        401 => "Unauthorized: Invalid credentials. Please check your email and API token.",
        403 => "Forbidden: You do not have permission to access this resource.",
        404 => "Not Found: The requested resource was not found.",
        429 => "Too Many Requests: Rate limit exceeded. Please try again later.",
        500 => "Internal Server Error: Jira server encountered an error.",
        502 => "Bad Gateway: Jira server is temporarily unavailable.",
        503 => "Service Unavailable: Jira service is temporarily unavailable.",
        504 => "Gateway Timeout: Request to Jira server timed out.",
        _ => return format!("HTTP Error {status}: Request failed."),
    };
    message.to_string()
}

/// Result type alias for jira-extract
pub type Result<T> = std::result::Result<T, Error>;

/// Extension trait for adding context to errors
pub trait ResultExt<T> {
    /// Add context to an error
    fn context(self, message: impl Into<String>) -> Result<T>;

    /// Add context with a closure (lazy evaluation)
    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T>;
}

impl<T, E: Into<Error>> ResultExt<T> for std::result::Result<T, E> {
    fn context(self, message: impl Into<String>) -> Result<T> {
        self.map_err(|e| {
            let inner = e.into();
            Error::Other(format!("{}: {}", message.into(), inner))
        })
    }

    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T> {
        self.map_err(|e| {
            let inner = e.into();
            Error::Other(format!("{}: {}", f(), inner))
        })
    }
}
