//! CLI runner - executes commands

use crate::cli::commands::{Cli, Commands};
use crate::config::{CredentialOverlay, ExtractorConfig};
use crate::engine::{ExtractConfig, Extractor};
use crate::error::Result;
use crate::http::JiraClient;
use crate::types::{split_list, SearchOptions};
use std::path::Path;
use tracing::{debug, info};

/// CLI runner
pub struct Runner {
    cli: Cli,
}

impl Runner {
    /// Create a new runner
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Run the CLI command
    pub async fn run(&self) -> Result<()> {
        match &self.cli.command {
            Commands::Extract {
                jql,
                output,
                fields,
                expand,
                format,
                page_size,
            } => {
                let mut search = SearchOptions::new();
                if let Some(fields) = fields {
                    search = search.fields(split_list(fields));
                }
                if let Some(expand) = expand {
                    search = search.expand(split_list(expand));
                }
                if let Some(size) = page_size {
                    search = search.max_results(*size);
                }
                let config = ExtractConfig::new(jql.clone())
                    .with_output(output.clone())
                    .with_format(*format)
                    .with_search(search)
                    .with_verbose(self.cli.verbose);
                self.extract(&config).await
            }
            Commands::Check => self.check().await,
            Commands::Issue { key, fields } => {
                let fields = fields.as_deref().map(split_list).unwrap_or_default();
                self.issue(key, &fields).await
            }
        }
    }

    /// Merge config file, environment and flags
    pub fn resolve_config(&self) -> Result<ExtractorConfig> {
        self.resolve_config_with(|key| std::env::var(key).ok())
    }

    /// Merge config file, the given environment and flags
    pub fn resolve_config_with(
        &self,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<ExtractorConfig> {
        let base = match &self.cli.config {
            Some(path) => {
                debug!(path = %path.display(), "Loading config file");
                ExtractorConfig::from_file(path)?
            }
            None => ExtractorConfig::default(),
        };
        let mut config = base.with_env_lookup(env)?;

        if let Some(url) = &self.cli.url {
            config.base_url = Some(url.clone());
        }
        config.overlay_credentials(CredentialOverlay {
            email: self.cli.email.clone(),
            api_token: self.cli.token.clone(),
            bearer: self.cli.bearer.clone(),
        });
        if let Some(rps) = self.cli.rps {
            config.rate_limit.requests_per_second = rps;
        }
        if let Some(concurrent) = self.cli.concurrent {
            config.rate_limit.max_concurrent = concurrent;
        }

        config.validate()?;
        Ok(config)
    }

    fn client(&self) -> Result<JiraClient> {
        let config = self.resolve_config()?;
        JiraClient::new(config.to_client_config()?)
    }

    async fn extract(&self, config: &ExtractConfig) -> Result<()> {
        let client = self.client()?;
        info!("Connecting to {}", client.base_url());
        client.test_connection().await?;

        let stats = Extractor::new(client).run(config).await?;
        info!(
            requests = stats.metrics.requests_made,
            failed = stats.metrics.requests_failed,
            average_wait_ms = stats.metrics.average_wait_ms,
            "Rate limiter summary"
        );
        println!("{}", stats.summary());
        println!("Output ({}): {}", config.format, display_path(&stats.output_path));
        Ok(())
    }

    async fn check(&self) -> Result<()> {
        let client = self.client()?;
        let user = client.current_user().await?;
        let name = user.display_name.as_deref().unwrap_or(&user.account_id);
        println!("Connected to {} as {}", client.base_url(), name);
        Ok(())
    }

    async fn issue(&self, key: &str, fields: &[String]) -> Result<()> {
        let client = self.client()?;
        let issue = client.get_issue(key, fields).await?;
        println!("{}", serde_json::to_string_pretty(&issue)?);
        Ok(())
    }
}

fn display_path(path: &Path) -> String {
    std::path::absolute(path)
        .unwrap_or_else(|_| path.to_path_buf())
        .display()
        .to_string()
}
