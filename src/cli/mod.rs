use clap::{Parser, Subcommand};
use std::path::PathBuf;

pub mod commands;

#[derive(Parser)]
#[command(name = "repo-warden")]
#[command(about = "Repository and CI governance for a GitHub repository")]
#[command(long_about = "repo-warden reconciles workflow runs, pull requests and milestones of one \
                       GitHub repository against retention and deduplication policies. Run \
                       'repo-warden govern' from a scheduler to apply every policy.")]
pub struct Cli {
    /// Configuration file (defaults to ./repo-warden.toml when present)
    #[arg(long, global = true, help = "Path to a TOML configuration file")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Apply every workflow run policy: dedupe, orphans, untrusted runs, retention, cancelled sweep
    Govern,
    /// Purge expired workflow runs and sweep cancelled ones
    Purge,
    /// Check whether a trusted committer asked to resume CI on a pull request
    ResumeCi {
        #[arg(long, help = "Pull request number")]
        pr: u64,
    },
    /// Merge the base branch into a pull request
    MergeWithBase {
        #[arg(long, help = "Pull request number")]
        pr: u64,
    },
    /// Squash merge a pull request into its base branch
    Merge {
        #[arg(long, help = "Pull request number")]
        pr: u64,
    },
    /// Add or remove a label on a pull request
    Label {
        #[arg(long, help = "Pull request number")]
        pr: u64,
        #[arg(long, help = "Label to add")]
        add: Option<String>,
        #[arg(long, help = "Label to remove")]
        remove: Option<String>,
    },
    /// Comment on a pull request
    Comment {
        #[arg(long, help = "Pull request number")]
        pr: u64,
        #[arg(long, help = "Comment text")]
        body: String,
    },
    /// Close a pull request without merging
    Close {
        #[arg(long, help = "Pull request number")]
        pr: u64,
    },
    /// Show the mainline version, its milestone and the governed branches
    Status,
    /// Print the effective configuration (token redacted)
    Config,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_pull_request_commands() {
        let cli = Cli::parse_from(["repo-warden", "label", "--pr", "12", "--add", "Pending"]);
        match cli.command {
            Commands::Label { pr, add, remove } => {
                assert_eq!(pr, 12);
                assert_eq!(add.as_deref(), Some("Pending"));
                assert!(remove.is_none());
            }
            _ => panic!("expected label command"),
        }
    }

    #[test]
    fn test_global_config_flag() {
        let cli = Cli::parse_from(["repo-warden", "govern", "--config", "ci/warden.toml"]);
        assert!(matches!(cli.command, Commands::Govern));
        assert_eq!(cli.config, Some(PathBuf::from("ci/warden.toml")));
    }
}
