//! Pull request merges and the bot's writes on pull requests.
//!
//! Everything here is best effort: failures are logged and reported as `false` or
//! [`BaseMergeOutcome::Failed`], never raised.

use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::config::GovernanceSettings;
use crate::github::types::{
    CheckRunOutput, CommitState, MergeRequest, NewCheckRun, NewCommitStatus, PullRequest,
};
use crate::github::VersionControlHost;

pub const SQUASH_MERGE: &str = "squash";

/// Result of merging the base branch into a pull request on demand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BaseMergeOutcome {
    Merged(PullRequest),
    NotFound,
    Locked,
    Failed,
}

pub struct MergeCoordinator {
    host: Arc<dyn VersionControlHost>,
    settings: Arc<GovernanceSettings>,
}

impl MergeCoordinator {
    pub fn new(host: Arc<dyn VersionControlHost>, settings: Arc<GovernanceSettings>) -> Self {
        Self { host, settings }
    }

    /// Bring the base branch into the pull request. `None` when the pull request is
    /// locked or the host refused.
    pub async fn merge_with_base(&self, pr: &PullRequest) -> Option<PullRequest> {
        if pr.locked {
            warn!(pr_number = pr.number, "Pull request is locked; not merging base");
            return None;
        }
        match self.host.merge_with_base(pr).await {
            Ok(refreshed) => {
                info!(
                    pr_number = pr.number,
                    base = %pr.base_ref(),
                    head_sha = %refreshed.head_sha(),
                    "Merged base into pull request"
                );
                Some(refreshed)
            }
            Err(e) => {
                error!(pr_number = pr.number, error = %e, "Failed to merge base into pull request");
                None
            }
        }
    }

    pub async fn merge_with_base_by_number(&self, number: u64) -> BaseMergeOutcome {
        let pr = match self.host.get_pull_request(number).await {
            Ok(Some(pr)) => pr,
            Ok(None) => return BaseMergeOutcome::NotFound,
            Err(e) => {
                error!(pr_number = number, error = %e, "Could not load pull request");
                return BaseMergeOutcome::Failed;
            }
        };
        if pr.locked {
            return BaseMergeOutcome::Locked;
        }
        match self.merge_with_base(&pr).await {
            Some(refreshed) => BaseMergeOutcome::Merged(refreshed),
            None => BaseMergeOutcome::Failed,
        }
    }

    /// Squash merge using the pull request's title and body, guarded by its head sha.
    pub async fn merge_into_base(&self, pr: &PullRequest) -> bool {
        let request = MergeRequest {
            commit_title: pr.title.clone(),
            commit_message: pr.body.clone().unwrap_or_default(),
            sha: pr.head_sha().to_string(),
            merge_method: SQUASH_MERGE.to_string(),
        };
        match self.host.merge_into_base(pr, &request).await {
            Ok(true) => {
                info!(pr_number = pr.number, base = %pr.base_ref(), "Merged pull request");
                true
            }
            Ok(false) => {
                warn!(pr_number = pr.number, "Host declined the merge");
                false
            }
            Err(e) => {
                error!(pr_number = pr.number, error = %e, "Failed to merge pull request");
                false
            }
        }
    }

    pub async fn label_as(&self, pr: &PullRequest, label: &str) -> bool {
        match self.host.add_label(pr.number, label).await {
            Ok(()) => {
                info!(pr_number = pr.number, label, "Labelled pull request");
                true
            }
            Err(e) => {
                error!(pr_number = pr.number, label, error = %e, "Failed to add label");
                false
            }
        }
    }

    pub async fn remove_label_from(&self, pr: &PullRequest, label: &str) -> bool {
        match self.host.remove_label(pr.number, label).await {
            Ok(()) => {
                info!(pr_number = pr.number, label, "Removed label from pull request");
                true
            }
            Err(e) if e.is_not_found() => {
                debug!(pr_number = pr.number, label, "Label not present");
                true
            }
            Err(e) => {
                error!(pr_number = pr.number, label, error = %e, "Failed to remove label");
                false
            }
        }
    }

    pub async fn add_comment(&self, pr: &PullRequest, body: &str) -> bool {
        match self.host.add_comment(pr.number, body).await {
            Ok(comment) => {
                info!(pr_number = pr.number, comment_id = comment.id, "Commented on pull request");
                true
            }
            Err(e) => {
                error!(pr_number = pr.number, error = %e, "Failed to comment on pull request");
                false
            }
        }
    }

    pub async fn close(&self, pr: &PullRequest) -> bool {
        match self.host.close_pull_request(pr.number).await {
            Ok(()) => {
                info!(pr_number = pr.number, "Closed pull request");
                true
            }
            Err(e) if e.is_not_found() => {
                debug!(pr_number = pr.number, error = %e, "Pull request already gone");
                true
            }
            Err(e) => {
                error!(pr_number = pr.number, error = %e, "Failed to close pull request");
                false
            }
        }
    }

    pub async fn create_status_for_success(
        &self,
        pr: &PullRequest,
        context: &str,
        description: &str,
    ) -> bool {
        self.create_status(pr, CommitState::Success, context, description)
            .await
    }

    pub async fn create_status_for_failure(
        &self,
        pr: &PullRequest,
        context: &str,
        description: &str,
    ) -> bool {
        self.create_status(pr, CommitState::Failure, context, description)
            .await
    }

    async fn create_status(
        &self,
        pr: &PullRequest,
        state: CommitState,
        context: &str,
        description: &str,
    ) -> bool {
        let status = NewCommitStatus {
            state,
            target_url: self.settings.status_target_url.clone(),
            description: description.to_string(),
            context: context.to_string(),
        };
        match self.host.create_status(pr.head_sha(), &status).await {
            Ok(()) => {
                info!(
                    pr_number = pr.number,
                    context,
                    state = state.as_str(),
                    "Reported commit status"
                );
                true
            }
            Err(e) => {
                error!(pr_number = pr.number, context, error = %e, "Failed to report commit status");
                false
            }
        }
    }

    /// Completed check run with an `action_required` conclusion on the head commit.
    pub async fn create_check_run_for_action_required(
        &self,
        pr: &PullRequest,
        check_name: &str,
        title: &str,
        summary: &str,
    ) -> bool {
        let check_run = NewCheckRun {
            name: check_name.to_string(),
            head_sha: pr.head_sha().to_string(),
            status: "completed".to_string(),
            conclusion: "action_required".to_string(),
            output: CheckRunOutput {
                title: title.to_string(),
                summary: summary.to_string(),
            },
        };
        match self.host.create_check_run(&check_run).await {
            Ok(()) => {
                info!(pr_number = pr.number, check_name, "Requested action through check run");
                true
            }
            Err(e) => {
                error!(pr_number = pr.number, check_name, error = %e, "Failed to create check run");
                false
            }
        }
    }
}
