//! Authenticator implementation
//!
//! Builds the `Authorization` header value once, at construction.

use super::types::AuthConfig;
use crate::error::{Error, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use reqwest::header::{HeaderValue, AUTHORIZATION};
use reqwest::RequestBuilder;

/// Applies validated credentials to HTTP requests
#[derive(Clone)]
pub struct Authenticator {
    config: AuthConfig,
    header: HeaderValue,
}

impl Authenticator {
    /// Validate `config` and prepare its header
    pub fn new(config: AuthConfig) -> Result<Self> {
        Self::validate(&config)?;
        let header = Self::header_for(&config)?;
        Ok(Self { config, header })
    }

    /// Reject empty credentials
    pub fn validate(config: &AuthConfig) -> Result<()> {
        match config {
            AuthConfig::Basic { email, api_token } => {
                if email.trim().is_empty() || api_token.trim().is_empty() {
                    return Err(Error::auth("Basic auth requires email and API token"));
                }
            }
            AuthConfig::Bearer { token } => {
                if token.trim().is_empty() {
                    return Err(Error::auth("Bearer auth requires a token"));
                }
            }
        }
        Ok(())
    }

    /// True when `config` would pass validation
    pub fn is_valid(config: &AuthConfig) -> bool {
        Self::validate(config).is_ok()
    }

    fn header_for(config: &AuthConfig) -> Result<HeaderValue> {
        let raw = match config {
            AuthConfig::Basic { email, api_token } => {
                format!("Basic {}", STANDARD.encode(format!("{email}:{api_token}")))
            }
            AuthConfig::Bearer { token } => format!("Bearer {token}"),
        };
        let mut value = HeaderValue::from_str(&raw)
            .map_err(|_| Error::auth("Credentials contain characters not allowed in a header"))?;
        value.set_sensitive(true);
        Ok(value)
    }

    /// The `Authorization` header value
    pub fn header_value(&self) -> &HeaderValue {
        &self.header
    }

    /// Short name of the scheme in use
    pub fn auth_type(&self) -> &'static str {
        self.config.kind()
    }

    /// Add the `Authorization` header to a request
    pub fn apply(&self, req: RequestBuilder) -> RequestBuilder {
        req.header(AUTHORIZATION, self.header.clone())
    }
}

impl std::fmt::Debug for Authenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Authenticator")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
