//! CLI commands and argument parsing

use crate::output::OutputFormat;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Extract Jira issues with JQL queries, respecting API rate limits
#[derive(Parser, Debug)]
#[command(name = "jira-extract")]
#[command(author, version, about, long_about = None)]
#[command(after_help = "Environment variables: JIRA_BASE_URL, JIRA_EMAIL, JIRA_API_TOKEN, \
JIRA_BEARER_TOKEN, JIRA_RATE_LIMIT_RPS, JIRA_MAX_CONCURRENT")]
pub struct Cli {
    /// Configuration file (YAML)
    #[arg(short = 'C', long, global = true)]
    pub config: Option<PathBuf>,

    /// Jira instance URL (e.g. https://company.atlassian.net)
    #[arg(long, global = true)]
    pub url: Option<String>,

    /// Email for Basic auth
    #[arg(long, global = true)]
    pub email: Option<String>,

    /// API token for Basic auth
    #[arg(long, global = true)]
    pub token: Option<String>,

    /// Bearer token (takes precedence over email/token)
    #[arg(long, global = true)]
    pub bearer: Option<String>,

    /// Requests per second
    #[arg(long, global = true)]
    pub rps: Option<f64>,

    /// Max concurrent requests
    #[arg(long, global = true)]
    pub concurrent: Option<usize>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Extract every issue matching a JQL query into a file
    Extract {
        /// JQL query
        #[arg(long)]
        jql: String,

        /// Output file path
        #[arg(short, long, default_value = crate::engine::DEFAULT_OUTPUT)]
        output: PathBuf,

        /// Comma-separated fields to extract (default: all fields)
        #[arg(long)]
        fields: Option<String>,

        /// Comma-separated expansions (e.g. changelog,renderedFields)
        #[arg(long)]
        expand: Option<String>,

        /// Output format
        #[arg(short, long, default_value = "json")]
        format: OutputFormat,

        /// Issues per page (at most 100)
        #[arg(long)]
        page_size: Option<usize>,
    },

    /// Test connection to Jira
    Check,

    /// Print a single issue as JSON
    Issue {
        /// Issue key, e.g. PROJ-123
        key: String,

        /// Comma-separated fields to include
        #[arg(long)]
        fields: Option<String>,
    },
}
