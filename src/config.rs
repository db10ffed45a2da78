use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;
use std::time::Duration;

use crate::github::retry::RetryConfig;

/// Default configuration file name, looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "repo-warden.toml";

/// Environment variable prefix; nested keys are separated by `__`
pub const ENV_PREFIX: &str = "REPO_WARDEN";

/// Main configuration structure for repo-warden
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct WardenConfig {
    /// GitHub connection settings
    pub github: GitHubConfig,
    /// Retention, deduplication and authorization policy
    pub governance: GovernanceSettings,
    /// Logging settings
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GitHubConfig {
    /// GitHub API token (falls back to GITHUB_TOKEN)
    pub token: Option<String>,
    /// Repository owner or organization
    pub owner: String,
    /// Repository name
    pub repo: String,
    /// Override for GitHub Enterprise or tests
    pub api_base_url: Option<String>,
    /// Upper bound for a single API call
    pub request_timeout_seconds: u64,
    /// Client-side rate limiting
    pub rate_limit: RateLimitConfig,
    /// Backoff for transient failures
    pub retry: RetryConfig,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            token: None,
            owner: String::new(),
            repo: String::new(),
            api_base_url: None,
            request_timeout_seconds: 30,
            rate_limit: RateLimitConfig::default(),
            retry: RetryConfig::default(),
        }
    }
}

impl GitHubConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds.max(1))
    }

    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.repo)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Requests per hour limit
    pub requests_per_hour: u32,
    /// Burst capacity
    pub burst_capacity: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_hour: 5000,
            burst_capacity: 100,
        }
    }
}

/// Immutable policy handed to every governance component at construction.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct GovernanceSettings {
    /// Name of the mainline branch
    pub mainline_branch: String,
    /// Pages branch names; a trailing `*` matches by prefix
    pub pages_branches: Vec<String>,
    /// Deployment branch names; a trailing `*` matches by prefix
    pub deployment_branches: Vec<String>,
    /// Logins allowed to resume CI and exempt from label-gated pruning
    pub trusted_committers: BTreeSet<String>,
    /// Label that lets untrusted pull requests keep their workflow runs
    pub ci_label: String,
    /// Exact comment body that resumes CI
    pub ci_resume_trigger: String,
    /// Runs untouched for this long are removed whatever their state
    pub stale_run_retention_days: i64,
    /// Successful push runs are kept this long
    pub success_retention_days: i64,
    /// Unsuccessful push runs are kept this long
    pub failure_retention_days: i64,
    /// Pages of run history inspected by each retention purge
    pub retention_scan_pages: u32,
    /// Page size for workflow run listings
    pub runs_per_page: u32,
    /// Concurrent read requests while enumerating branches
    pub max_concurrent_reads: usize,
    /// Link attached to commit statuses
    pub status_target_url: Option<String>,
    /// Build manifest holding the mainline version
    pub version_manifest_path: String,
    /// Property in the manifest holding the version
    pub version_manifest_key: String,
}

impl Default for GovernanceSettings {
    fn default() -> Self {
        Self {
            mainline_branch: "master".to_string(),
            pages_branches: vec!["gh-pages".to_string()],
            deployment_branches: vec!["heroku".to_string()],
            trusted_committers: BTreeSet::new(),
            ci_label: "CI".to_string(),
            ci_resume_trigger: "@repo-warden runci".to_string(),
            stale_run_retention_days: 30,
            success_retention_days: 7,
            failure_retention_days: 14,
            retention_scan_pages: 20,
            runs_per_page: 100,
            max_concurrent_reads: 4,
            status_target_url: None,
            version_manifest_path: "gradle.properties".to_string(),
            version_manifest_key: "version".to_string(),
        }
    }
}

impl GovernanceSettings {
    pub fn is_trusted_committer(&self, login: &str) -> bool {
        self.trusted_committers.contains(login)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level or EnvFilter directive
    pub log_level: String,
    /// Emit JSON lines instead of compact text
    pub json_logs: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: true,
        }
    }
}

impl WardenConfig {
    /// Load configuration from multiple sources with precedence:
    /// 1. Default values
    /// 2. Configuration file (`repo-warden.toml` or the given path)
    /// 3. Environment variables (`REPO_WARDEN__SECTION__KEY`)
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder();

        match path {
            Some(path) => {
                builder = builder.add_source(File::from(path).required(true));
            }
            None => {
                if Path::new(DEFAULT_CONFIG_FILE).exists() {
                    builder = builder.add_source(File::with_name(DEFAULT_CONFIG_FILE));
                }
            }
        }

        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("governance.pages_branches")
                .with_list_parse_key("governance.deployment_branches")
                .with_list_parse_key("governance.trusted_committers"),
        );

        let mut warden_config: WardenConfig = builder
            .build()
            .context("Failed to read configuration sources")?
            .try_deserialize()
            .context("Invalid configuration")?;

        if warden_config.github.token.is_none() {
            if let Ok(token) = std::env::var("GITHUB_TOKEN") {
                if !token.trim().is_empty() {
                    warden_config.github.token = Some(token.trim().to_string());
                }
            }
        }

        Ok(warden_config)
    }

    /// Load .env file if it exists
    pub fn load_env_file() -> Result<()> {
        if Path::new(".env").exists() {
            dotenvy::dotenv()?;
            tracing::debug!("Loaded environment variables from .env file");
        }
        Ok(())
    }

    /// Effective configuration as TOML, with the token redacted
    pub fn to_redacted_toml(&self) -> Result<String> {
        let mut shown = self.clone();
        if shown.github.token.is_some() {
            shown.github.token = Some("********".to_string());
        }
        Ok(toml::to_string_pretty(&shown)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_purge_successful_runs_sooner() {
        let settings = GovernanceSettings::default();
        assert!(settings.success_retention_days < settings.failure_retention_days);
        assert!(settings.failure_retention_days < settings.stale_run_retention_days);
        assert_eq!(settings.retention_scan_pages, 20);
    }

    #[test]
    fn test_load_from_file_overrides_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[github]
owner = "apereo"
repo = "cas"

[governance]
mainline_branch = "main"
trusted_committers = ["alice", "bob"]
success_retention_days = 2
"#
        )
        .unwrap();

        let config = WardenConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.github.full_name(), "apereo/cas");
        assert_eq!(config.governance.mainline_branch, "main");
        assert!(config.governance.is_trusted_committer("alice"));
        assert!(!config.governance.is_trusted_committer("mallory"));
        assert_eq!(config.governance.success_retention_days, 2);
        assert_eq!(config.governance.failure_retention_days, 14);
        assert_eq!(config.github.retry.max_attempts, 3);
    }

    #[test]
    fn test_redacted_toml_hides_token() {
        let mut config = WardenConfig::default();
        config.github.token = Some("ghp_secret".to_string());
        let rendered = config.to_redacted_toml().unwrap();
        assert!(!rendered.contains("ghp_secret"));
        assert!(rendered.contains("********"));
    }
}
