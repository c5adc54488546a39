//! Auth configuration types

use serde::{Deserialize, Serialize};
use std::fmt;

/// Credentials used to talk to Jira
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuthConfig {
    /// Jira Cloud: account email plus API token
    Basic {
        /// Account email
        email: String,
        /// API token
        #[serde(alias = "apiToken")]
        api_token: String,
    },

    /// Jira Data Center / Server: personal access token
    Bearer {
        /// The bearer token
        token: String,
    },
}

impl AuthConfig {
    /// Basic credentials
    pub fn basic(email: impl Into<String>, api_token: impl Into<String>) -> Self {
        Self::Basic {
            email: email.into(),
            api_token: api_token.into(),
        }
    }

    /// Bearer credentials
    pub fn bearer(token: impl Into<String>) -> Self {
        Self::Bearer {
            token: token.into(),
        }
    }

    /// Short name of the scheme: `basic` or `bearer`
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Basic { .. } => "basic",
            Self::Bearer { .. } => "bearer",
        }
    }
}

// Secrets never reach logs
impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Basic { email, .. } => f
                .debug_struct("Basic")
                .field("email", email)
                .field("api_token", &"***")
                .finish(),
            Self::Bearer { .. } => f.debug_struct("Bearer").field("token", &"***").finish(),
        }
    }
}
