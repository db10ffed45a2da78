use anyhow::{bail, Result};

use super::{load_pull_request, Command};
use repo_warden::governance::{BaseMergeOutcome, MonitoredRepository};

/// A manual action on one pull request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PullRequestAction {
    ResumeCi,
    MergeWithBase,
    Merge,
    Label {
        add: Option<String>,
        remove: Option<String>,
    },
    Comment {
        body: String,
    },
    Close,
}

pub struct PullRequestCommand {
    repository: MonitoredRepository,
    number: u64,
    action: PullRequestAction,
}

impl PullRequestCommand {
    pub fn new(repository: MonitoredRepository, number: u64, action: PullRequestAction) -> Self {
        Self {
            repository,
            number,
            action,
        }
    }

    async fn merge_with_base(&self) -> Result<()> {
        let coordinator = self.repository.merge_coordinator();
        match coordinator.merge_with_base_by_number(self.number).await {
            BaseMergeOutcome::Merged(pr) => {
                println!("✅ Merged {} into #{} (head {})", pr.base_ref(), pr.number, pr.head_sha());
                Ok(())
            }
            BaseMergeOutcome::NotFound => bail!("Pull request #{} not found", self.number),
            BaseMergeOutcome::Locked => bail!("Pull request #{} is locked", self.number),
            BaseMergeOutcome::Failed => bail!("Could not merge base into #{}", self.number),
        }
    }
}

impl Command for PullRequestCommand {
    async fn execute(&self) -> Result<()> {
        if self.action == PullRequestAction::MergeWithBase {
            return self.merge_with_base().await;
        }

        let pr = load_pull_request(&self.repository, self.number).await?;
        let coordinator = self.repository.merge_coordinator();

        match &self.action {
            PullRequestAction::ResumeCi => {
                let resume = self.repository.resume_authorizer().should_resume_ci(&pr).await;
                if resume {
                    println!("▶️  CI resume authorized for #{}", pr.number);
                } else {
                    println!("⏸️  No CI resume command for #{}", pr.number);
                }
            }
            PullRequestAction::MergeWithBase => {}
            PullRequestAction::Merge => {
                if !coordinator.merge_into_base(&pr).await {
                    bail!("Could not merge #{} into {}", pr.number, pr.base_ref());
                }
                println!("✅ Merged #{} into {}", pr.number, pr.base_ref());
            }
            PullRequestAction::Label { add, remove } => {
                if add.is_none() && remove.is_none() {
                    bail!("Nothing to do: pass --add and/or --remove");
                }
                if let Some(label) = add {
                    if !coordinator.label_as(&pr, label).await {
                        bail!("Could not add label '{label}' to #{}", pr.number);
                    }
                    println!("🏷️  Added '{label}' to #{}", pr.number);
                }
                if let Some(label) = remove {
                    if !coordinator.remove_label_from(&pr, label).await {
                        bail!("Could not remove label '{label}' from #{}", pr.number);
                    }
                    println!("🏷️  Removed '{label}' from #{}", pr.number);
                }
            }
            PullRequestAction::Comment { body } => {
                if !coordinator.add_comment(&pr, body).await {
                    bail!("Could not comment on #{}", pr.number);
                }
                println!("💬 Commented on #{}", pr.number);
            }
            PullRequestAction::Close => {
                if !coordinator.close(&pr).await {
                    bail!("Could not close #{}", pr.number);
                }
                println!("🔒 Closed #{}", pr.number);
            }
        }
        Ok(())
    }
}
