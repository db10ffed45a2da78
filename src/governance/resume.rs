use std::sync::Arc;
use tracing::{error, info, warn};

use crate::config::GovernanceSettings;
use crate::github::types::{Comment, PullRequest};
use crate::github::{collect_all, VersionControlHost};

/// Decides whether a trusted committer asked for CI to resume on a pull request.
pub struct CiResumeAuthorizer {
    host: Arc<dyn VersionControlHost>,
    settings: Arc<GovernanceSettings>,
}

impl CiResumeAuthorizer {
    pub fn new(host: Arc<dyn VersionControlHost>, settings: Arc<GovernanceSettings>) -> Self {
        Self { host, settings }
    }

    /// Whether a comment is an exact resume command from a trusted committer.
    pub fn is_resume_command(&self, comment: &Comment) -> bool {
        comment.body().trim() == self.settings.ci_resume_trigger
            && self.settings.is_trusted_committer(comment.author())
    }

    /// Only the most recently updated comment counts. An accepted command is deleted so
    /// it is honoured once; if the deletion fails the command stays and `false` is returned.
    pub async fn should_resume_ci(&self, pr: &PullRequest) -> bool {
        let host = self.host.as_ref();
        let mut comments = match collect_all(|page| host.get_comments(pr.number, page)).await {
            Ok(comments) => comments,
            Err(e) => {
                warn!(pr_number = pr.number, error = %e, "Could not list comments; treating as none");
                Vec::new()
            }
        };

        comments.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        let Some(latest) = comments.first() else {
            return false;
        };

        if !self.is_resume_command(latest) {
            return false;
        }

        match self.host.remove_comment(latest.id).await {
            Ok(()) => {
                info!(
                    pr_number = pr.number,
                    comment_id = latest.id,
                    author = %latest.author(),
                    "Resuming CI on request of trusted committer"
                );
                true
            }
            Err(e) => {
                error!(
                    pr_number = pr.number,
                    comment_id = latest.id,
                    error = %e,
                    "Could not consume resume command"
                );
                false
            }
        }
    }
}
