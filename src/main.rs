use anyhow::Result;
use clap::Parser;

use repo_warden::config::WardenConfig;
use repo_warden::observability::host_metrics;
use repo_warden::telemetry::{init_telemetry, shutdown_telemetry};

mod cli;

use cli::commands::config::ConfigCommand;
use cli::commands::govern::{GovernCommand, PassKind};
use cli::commands::pull_request::{PullRequestAction, PullRequestCommand};
use cli::commands::status::StatusCommand;
use cli::commands::{connect, Command};
use cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    WardenConfig::load_env_file()?;
    let cli = Cli::parse();
    let config = WardenConfig::load(cli.config.as_deref())?;
    init_telemetry(&config.observability)?;

    let result = run(cli.command, config).await;

    host_metrics().log_stats();
    shutdown_telemetry();
    result
}

async fn run(command: Commands, config: WardenConfig) -> Result<()> {
    let pull_request = |number: u64, action: PullRequestAction| -> Result<PullRequestCommand> {
        Ok(PullRequestCommand::new(connect(&config)?, number, action))
    };

    match command {
        Commands::Config => ConfigCommand::new(config.clone()).execute().await,
        Commands::Govern => {
            GovernCommand::new(connect(&config)?, PassKind::Full)
                .execute()
                .await
        }
        Commands::Purge => {
            GovernCommand::new(connect(&config)?, PassKind::PurgeOnly)
                .execute()
                .await
        }
        Commands::Status => StatusCommand::new(connect(&config)?).execute().await,
        Commands::ResumeCi { pr } => pull_request(pr, PullRequestAction::ResumeCi)?.execute().await,
        Commands::MergeWithBase { pr } => {
            pull_request(pr, PullRequestAction::MergeWithBase)?
                .execute()
                .await
        }
        Commands::Merge { pr } => pull_request(pr, PullRequestAction::Merge)?.execute().await,
        Commands::Label { pr, add, remove } => {
            pull_request(pr, PullRequestAction::Label { add, remove })?
                .execute()
                .await
        }
        Commands::Comment { pr, body } => {
            pull_request(pr, PullRequestAction::Comment { body })?
                .execute()
                .await
        }
        Commands::Close { pr } => pull_request(pr, PullRequestAction::Close)?.execute().await,
    }
}
