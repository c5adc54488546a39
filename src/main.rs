#![allow(clippy::must_use_candidate)]
#![allow(clippy::needless_pass_by_value)]

//! jira-extract CLI
//!
//! Command-line interface for extracting Jira issues

use clap::Parser;
use jira_extract::cli::{Cli, Runner};
use tracing::Level;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize logging
    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let runner = Runner::new(cli);

    if let Err(e) = runner.run().await {
        eprintln!("Error: {}", e.detailed_message());
        std::process::exit(1);
    }
}
