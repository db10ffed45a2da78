use anyhow::Result;

use super::Command;
use repo_warden::governance::MonitoredRepository;

pub struct StatusCommand {
    repository: MonitoredRepository,
}

impl StatusCommand {
    pub fn new(repository: MonitoredRepository) -> Self {
        Self { repository }
    }
}

impl Command for StatusCommand {
    async fn execute(&self) -> Result<()> {
        println!("📦 {}", self.repository.full_name());
        println!();

        match self.repository.current_mainline_version().await {
            Ok(version) => println!("🔖 Mainline version: {version}"),
            Err(e) => println!("🔖 Mainline version: unknown ({e})"),
        }
        match self.repository.milestone_for_mainline().await {
            Some(milestone) => println!("🎯 Mainline milestone: {} (#{})", milestone.title, milestone.number),
            None => println!("🎯 Mainline milestone: none"),
        }
        println!();

        let branches = self.repository.active_branches().await?;
        let classifier = self.repository.classifier();
        println!("🌿 Governed branches ({}):", branches.len());
        for branch in &branches {
            println!("   {} [{}]", branch.name, classifier.classify(&branch.name));
        }
        Ok(())
    }
}
