use anyhow::{anyhow, Context, Result};
use std::sync::Arc;

use repo_warden::config::WardenConfig;
use repo_warden::github::types::PullRequest;
use repo_warden::github::GitHubClient;
use repo_warden::governance::MonitoredRepository;

pub mod config;
pub mod govern;
pub mod pull_request;
pub mod status;

#[allow(async_fn_in_trait)]
pub trait Command {
    async fn execute(&self) -> Result<()>;
}

/// Connect to the configured repository.
pub fn connect(config: &WardenConfig) -> Result<MonitoredRepository> {
    let client = GitHubClient::new(&config.github).with_context(|| {
        format!("Failed to create GitHub client for '{}'", config.github.full_name())
    })?;
    Ok(MonitoredRepository::new(
        Arc::new(client),
        Arc::new(config.governance.clone()),
    ))
}

pub async fn load_pull_request(
    repository: &MonitoredRepository,
    number: u64,
) -> Result<PullRequest> {
    repository
        .pull_request(number)
        .await
        .with_context(|| format!("Failed to load pull request #{number}"))?
        .ok_or_else(|| anyhow!("Pull request #{number} not found in {}", repository.full_name()))
}
