//! Extractor configuration
//!
//! Settings come from three layers, later layers winning:
//! 1. an optional YAML file
//! 2. `JIRA_*` environment variables
//! 3. command line flags
//!
//! The merged result is validated once and turned into a [`JiraClientConfig`].

use crate::auth::{AuthConfig, Authenticator};
use crate::error::{Error, Result};
use crate::http::JiraClientConfig;
use crate::limiter::RateBudget;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use url::Url;

// ============================================================================
// Environment Variables
// ============================================================================

pub const ENV_BASE_URL: &str = "JIRA_BASE_URL";
pub const ENV_EMAIL: &str = "JIRA_EMAIL";
pub const ENV_API_TOKEN: &str = "JIRA_API_TOKEN";
pub const ENV_BEARER_TOKEN: &str = "JIRA_BEARER_TOKEN";
pub const ENV_RATE_LIMIT_RPS: &str = "JIRA_RATE_LIMIT_RPS";
pub const ENV_MAX_CONCURRENT: &str = "JIRA_MAX_CONCURRENT";

// ============================================================================
// Top-Level Config
// ============================================================================

/// Complete extractor configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractorConfig {
    /// Jira instance URL (must use HTTPS)
    #[serde(default, alias = "baseUrl")]
    pub base_url: Option<String>,

    /// Credentials
    #[serde(default)]
    pub auth: Option<AuthConfig>,

    /// Request budget
    #[serde(default, alias = "rateLimiting")]
    pub rate_limit: RateLimitConfig,

    /// Per-request timeout in milliseconds
    #[serde(default = "default_timeout_ms", alias = "timeout")]
    pub timeout_ms: u64,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            auth: None,
            rate_limit: RateLimitConfig::default(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

fn default_timeout_ms() -> u64 {
    30_000
}

// ============================================================================
// Rate Limit Config
// ============================================================================

/// Request budget as written in config files
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Sustained requests per second (0.1 to 100)
    #[serde(default = "default_rps", alias = "requestsPerSecond")]
    pub requests_per_second: f64,

    /// Requests in flight at once (1 to 10)
    #[serde(default = "default_max_concurrent", alias = "maxConcurrent")]
    pub max_concurrent: usize,

    /// Minimum spacing between request starts, in milliseconds
    #[serde(default = "default_min_delay_ms", alias = "minDelay")]
    pub min_delay_ms: u64,

    /// Retries after the first attempt (0 to 10)
    #[serde(default = "default_retry_attempts", alias = "retryAttempts")]
    pub retry_attempts: u32,

    /// Delay before the first retry, in milliseconds
    #[serde(default = "default_retry_delay_ms", alias = "retryDelay")]
    pub retry_delay_ms: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_second: default_rps(),
            max_concurrent: default_max_concurrent(),
            min_delay_ms: default_min_delay_ms(),
            retry_attempts: default_retry_attempts(),
            retry_delay_ms: default_retry_delay_ms(),
        }
    }
}

fn default_rps() -> f64 {
    2.0
}

fn default_max_concurrent() -> usize {
    2
}

fn default_min_delay_ms() -> u64 {
    200
}

fn default_retry_attempts() -> u32 {
    3
}

fn default_retry_delay_ms() -> u64 {
    1000
}

impl RateLimitConfig {
    /// Check the documented ranges
    pub fn validate(&self) -> Result<()> {
        let rps = self.requests_per_second;
        if !(0.1..=100.0).contains(&rps) {
            return Err(Error::invalid_value(
                "requests_per_second",
                format!("must be between 0.1 and 100, got {rps}"),
            ));
        }
        if !(1..=10).contains(&self.max_concurrent) {
            return Err(Error::invalid_value(
                "max_concurrent",
                format!("must be between 1 and 10, got {}", self.max_concurrent),
            ));
        }
        if self.retry_attempts > 10 {
            return Err(Error::invalid_value(
                "retry_attempts",
                format!("must be between 0 and 10, got {}", self.retry_attempts),
            ));
        }
        Ok(())
    }

    /// Build the limiter budget
    pub fn to_budget(&self) -> Result<RateBudget> {
        self.validate()?;
        RateBudget::builder()
            .requests_per_second(self.requests_per_second)
            .max_concurrent(self.max_concurrent)
            .min_interval_ms(self.min_delay_ms)
            .retry_attempts(self.retry_attempts)
            .retry_base_delay_ms(self.retry_delay_ms)
            .build()
    }
}

// ============================================================================
// Loading and Overlays
// ============================================================================

/// Credential fragments from one configuration layer
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CredentialOverlay {
    pub email: Option<String>,
    pub api_token: Option<String>,
    pub bearer: Option<String>,
}

impl ExtractorConfig {
    /// Parse a YAML document
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Read and parse a YAML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            Error::config(format!("Failed to read config file {}: {e}", path.display()))
        })?;
        Self::from_yaml(&raw)
    }

    /// Overlay values from the process environment
    pub fn with_env(self) -> Result<Self> {
        self.with_env_lookup(|key| std::env::var(key).ok())
    }

    /// Overlay values from an environment lookup; unset or blank variables are ignored
    pub fn with_env_lookup(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(url) = get(ENV_BASE_URL) {
            self.base_url = Some(url);
        }
        self.overlay_credentials(CredentialOverlay {
            email: get(ENV_EMAIL),
            api_token: get(ENV_API_TOKEN),
            bearer: get(ENV_BEARER_TOKEN),
        });
        if let Some(raw) = get(ENV_RATE_LIMIT_RPS) {
            self.rate_limit.requests_per_second = raw.trim().parse().map_err(|_| {
                Error::invalid_value(ENV_RATE_LIMIT_RPS, format!("not a number: '{raw}'"))
            })?;
        }
        if let Some(raw) = get(ENV_MAX_CONCURRENT) {
            self.rate_limit.max_concurrent = raw.trim().parse().map_err(|_| {
                Error::invalid_value(ENV_MAX_CONCURRENT, format!("not an integer: '{raw}'"))
            })?;
        }
        Ok(self)
    }

    /// Merge credential fragments into the current auth
    ///
    /// A bearer token replaces whatever was there. Email and API token
    /// update an existing Basic config field by field, or start a new one
    /// when both are given.
    pub fn overlay_credentials(&mut self, overlay: CredentialOverlay) {
        if let Some(token) = overlay.bearer {
            self.auth = Some(AuthConfig::Bearer { token });
            return;
        }
        if let Some(AuthConfig::Basic { email, api_token }) = &mut self.auth {
            if let Some(new_email) = overlay.email {
                *email = new_email;
            }
            if let Some(new_token) = overlay.api_token {
                *api_token = new_token;
            }
            return;
        }
        if let (Some(email), Some(api_token)) = (overlay.email, overlay.api_token) {
            self.auth = Some(AuthConfig::Basic { email, api_token });
        }
    }

    // ========================================================================
    // Validation
    // ========================================================================

    /// Check that the merged configuration is complete and in range
    pub fn validate(&self) -> Result<()> {
        let raw_url = self
            .base_url
            .as_deref()
            .filter(|u| !u.trim().is_empty())
            .ok_or_else(|| Error::missing_field("base_url"))?;
        let url = Url::parse(raw_url.trim())?;
        if url.scheme() != "https" {
            return Err(Error::invalid_value("base_url", "Jira URL must use HTTPS"));
        }

        let auth = self.auth.as_ref().ok_or_else(|| Error::missing_field("auth"))?;
        Authenticator::validate(auth)?;
        if let AuthConfig::Basic { email, .. } = auth {
            if !looks_like_email(email) {
                return Err(Error::invalid_value("email", "Invalid email address"));
            }
        }

        self.rate_limit.validate()?;
        if self.timeout_ms < 1000 {
            return Err(Error::invalid_value(
                "timeout_ms",
                format!("must be at least 1000, got {}", self.timeout_ms),
            ));
        }
        Ok(())
    }

    /// Per-request timeout
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Validate and build the client configuration
    pub fn to_client_config(&self) -> Result<JiraClientConfig> {
        self.validate()?;
        let base_url = self
            .base_url
            .clone()
            .ok_or_else(|| Error::missing_field("base_url"))?;
        let auth = self.auth.clone().ok_or_else(|| Error::missing_field("auth"))?;

        Ok(JiraClientConfig::new(base_url, auth)
            .budget(self.rate_limit.to_budget()?)
            .timeout(self.timeout()))
    }
}

fn looks_like_email(email: &str) -> bool {
    match email.trim().split_once('@') {
        Some((local, domain)) => !local.is_empty() && domain.contains('.') && !domain.ends_with('.'),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FailureClass;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;
    use std::io::Write;
    use test_case::test_case;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    fn valid() -> ExtractorConfig {
        ExtractorConfig {
            base_url: Some("https://company.atlassian.net".to_string()),
            auth: Some(AuthConfig::basic("user@example.com", "token")),
            ..ExtractorConfig::default()
        }
    }

    #[test]
    fn test_parse_yaml() {
        let yaml = r"
base_url: https://company.atlassian.net
auth:
  type: basic
  email: user@example.com
  api_token: secret
rate_limit:
  requests_per_second: 5
  max_concurrent: 3
timeout_ms: 10000
";
        let config = ExtractorConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.base_url.as_deref(), Some("https://company.atlassian.net"));
        assert_eq!(config.auth, Some(AuthConfig::basic("user@example.com", "secret")));
        assert!((config.rate_limit.requests_per_second - 5.0).abs() < f64::EPSILON);
        assert_eq!(config.rate_limit.max_concurrent, 3);
        assert_eq!(config.rate_limit.min_delay_ms, 200);
        assert_eq!(config.timeout_ms, 10000);
    }

    #[test]
    fn test_parse_camel_case_yaml() {
        let yaml = r"
baseUrl: https://company.atlassian.net
auth:
  type: bearer
  token: pat
rateLimiting:
  requestsPerSecond: 1.5
  minDelay: 500
  retryAttempts: 5
  retryDelay: 250
timeout: 5000
";
        let config = ExtractorConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.auth, Some(AuthConfig::bearer("pat")));
        assert_eq!(config.rate_limit.min_delay_ms, 500);
        assert_eq!(config.rate_limit.retry_attempts, 5);
        assert_eq!(config.rate_limit.retry_delay_ms, 250);
        assert_eq!(config.timeout_ms, 5000);
    }

    #[test]
    fn test_defaults() {
        let config = ExtractorConfig::from_yaml("{}").unwrap();
        assert_eq!(config, ExtractorConfig::default());
        assert_eq!(config.timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_invalid_yaml() {
        let err = ExtractorConfig::from_yaml("rate_limit: [").unwrap_err();
        assert!(matches!(err, Error::YamlParse(_)));
        assert_eq!(err.class(), FailureClass::Config);
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "base_url: https://x.atlassian.net").unwrap();

        let config = ExtractorConfig::from_file(file.path()).unwrap();
        assert_eq!(config.base_url.as_deref(), Some("https://x.atlassian.net"));

        let err = ExtractorConfig::from_file("/definitely/not/here.yaml").unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
        assert!(matches!(err, Error::Config { .. }));
        assert_eq!(err.class(), FailureClass::Config);
    }

    #[test]
    fn test_env_overlay() {
        let config = ExtractorConfig::default()
            .with_env_lookup(env(&[
                (ENV_BASE_URL, "https://env.atlassian.net"),
                (ENV_EMAIL, "env@example.com"),
                (ENV_API_TOKEN, "env-token"),
                (ENV_RATE_LIMIT_RPS, "4.5"),
                (ENV_MAX_CONCURRENT, "3"),
            ]))
            .unwrap();

        assert_eq!(config.base_url.as_deref(), Some("https://env.atlassian.net"));
        assert_eq!(config.auth, Some(AuthConfig::basic("env@example.com", "env-token")));
        assert!((config.rate_limit.requests_per_second - 4.5).abs() < f64::EPSILON);
        assert_eq!(config.rate_limit.max_concurrent, 3);
    }

    #[test]
    fn test_env_bearer_wins() {
        let config = valid()
            .with_env_lookup(env(&[(ENV_BEARER_TOKEN, "pat"), (ENV_EMAIL, "x@y.z")]))
            .unwrap();
        assert_eq!(config.auth, Some(AuthConfig::bearer("pat")));
    }

    #[test]
    fn test_env_updates_basic_fields() {
        let config = valid()
            .with_env_lookup(env(&[(ENV_API_TOKEN, "rotated"), (ENV_BASE_URL, "  ")]))
            .unwrap();
        assert_eq!(config.auth, Some(AuthConfig::basic("user@example.com", "rotated")));
        assert_eq!(config.base_url, valid().base_url);
    }

    #[test]
    fn test_env_partial_basic_is_ignored() {
        let config = ExtractorConfig::default()
            .with_env_lookup(env(&[(ENV_EMAIL, "user@example.com")]))
            .unwrap();
        assert!(config.auth.is_none());
    }

    #[test]
    fn test_env_bad_number() {
        let err = ExtractorConfig::default()
            .with_env_lookup(env(&[(ENV_RATE_LIMIT_RPS, "fast")]))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidConfigValue { .. }));
    }

    #[test]
    fn test_valid_config_builds_client_config() {
        let mut config = valid();
        config.rate_limit.requests_per_second = 0.5;
        config.rate_limit.retry_attempts = 0;

        let client = config.to_client_config().unwrap();
        assert_eq!(client.base_url, "https://company.atlassian.net");
        assert_eq!(client.timeout, Duration::from_secs(30));
        assert!((client.budget.requests_per_second() - 0.5).abs() < f64::EPSILON);
        assert!((client.budget.burst_capacity() - 1.0).abs() < f64::EPSILON);
        assert_eq!(client.budget.min_interval(), Duration::from_millis(200));
        assert_eq!(client.budget.retry_attempts(), 0);
    }

    #[test_case(|c: &mut ExtractorConfig| c.base_url = None ; "missing url")]
    #[test_case(|c: &mut ExtractorConfig| c.base_url = Some("http://company.atlassian.net".into()) ; "plain http")]
    #[test_case(|c: &mut ExtractorConfig| c.base_url = Some("company".into()) ; "not a url")]
    #[test_case(|c: &mut ExtractorConfig| c.auth = None ; "missing auth")]
    #[test_case(|c: &mut ExtractorConfig| c.auth = Some(AuthConfig::basic("not-an-email", "t")) ; "bad email")]
    #[test_case(|c: &mut ExtractorConfig| c.auth = Some(AuthConfig::bearer("")) ; "empty bearer")]
    #[test_case(|c: &mut ExtractorConfig| c.rate_limit.requests_per_second = 0.05 ; "rps too low")]
    #[test_case(|c: &mut ExtractorConfig| c.rate_limit.requests_per_second = 101.0 ; "rps too high")]
    #[test_case(|c: &mut ExtractorConfig| c.rate_limit.max_concurrent = 0 ; "no concurrency")]
    #[test_case(|c: &mut ExtractorConfig| c.rate_limit.max_concurrent = 11 ; "too much concurrency")]
    #[test_case(|c: &mut ExtractorConfig| c.rate_limit.retry_attempts = 11 ; "too many retries")]
    #[test_case(|c: &mut ExtractorConfig| c.timeout_ms = 999 ; "timeout too short")]
    fn test_validation_rejects(mutate: fn(&mut ExtractorConfig)) {
        let mut config = valid();
        mutate(&mut config);
        assert!(config.validate().is_err());
        assert!(config.to_client_config().is_err());
    }

    #[test]
    fn test_valid_config_passes() {
        assert!(valid().validate().is_ok());
    }
}
