use anyhow::Result;

use super::Command;
use repo_warden::config::WardenConfig;

pub struct ConfigCommand {
    config: WardenConfig,
}

impl ConfigCommand {
    pub fn new(config: WardenConfig) -> Self {
        Self { config }
    }
}

impl Command for ConfigCommand {
    async fn execute(&self) -> Result<()> {
        println!("⚙️  Effective configuration for {}", self.config.github.full_name());
        println!();
        print!("{}", self.config.to_redacted_toml()?);
        Ok(())
    }
}
