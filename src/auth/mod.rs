//! Authentication module
//!
//! Supports: Basic (email + API token) and Bearer (personal access token)
//!
//! The `Authenticator` validates credentials once and stamps the
//! `Authorization` header onto every outgoing request.

mod authenticator;
mod types;

pub use authenticator::Authenticator;
pub use types::AuthConfig;
