//! CLI module
//!
//! Command-line interface for extracting Jira issues.
//!
//! # Commands
//!
//! - `extract` - Stream a JQL search into a JSON or JSON Lines file
//! - `check` - Test the connection and credentials
//! - `issue` - Print a single issue as JSON

mod commands;
mod runner;

pub use commands::{Cli, Commands};
pub use runner::Runner;
