//! Capability interface to the version control host.
//!
//! The governance components depend only on this trait, so they run unchanged against
//! GitHub ([`crate::github::GitHubClient`]) or the in-process `InMemoryHost` fake
//! (`testing` feature).

use async_trait::async_trait;

#[cfg(any(test, feature = "testing"))]
use mockall::automock;

use super::errors::GitHubError;
use super::page::Page;
use super::types::{
    Branch, CheckRun, CheckRunQuery, CombinedCommitStatus, Comment, Commit, CommitStatus, Label,
    MergeRequest, Milestone, NewCheckRun, NewCommitStatus, PullRequest, PullRequestFile,
    WorkflowRun, WorkflowRunQuery,
};

/// Read/write access to one repository on the host. Listing operations take a 1-based
/// page number and return a [`Page`] whose `next` names the following page.
#[cfg_attr(any(test, feature = "testing"), automock)]
#[async_trait]
pub trait VersionControlHost: Send + Sync {
    /// `owner/name` of the repository, for logging.
    fn full_name(&self) -> String;

    async fn get_branches(&self, page: u32) -> Result<Page<Branch>, GitHubError>;

    /// Open milestones only.
    async fn get_milestones(&self, page: u32) -> Result<Page<Milestone>, GitHubError>;

    async fn get_labels(&self, page: u32) -> Result<Page<Label>, GitHubError>;

    /// Open pull requests only.
    async fn get_pull_requests(&self, page: u32) -> Result<Page<PullRequest>, GitHubError>;

    /// `Ok(None)` when no pull request carries that number.
    async fn get_pull_request(&self, number: u64) -> Result<Option<PullRequest>, GitHubError>;

    async fn get_pull_request_files(
        &self,
        number: u64,
        page: u32,
    ) -> Result<Page<PullRequestFile>, GitHubError>;

    async fn get_pull_request_commits(
        &self,
        number: u64,
        page: u32,
    ) -> Result<Page<Commit>, GitHubError>;

    /// Conversation comments on a pull request.
    async fn get_comments(&self, number: u64, page: u32) -> Result<Page<Comment>, GitHubError>;

    async fn remove_comment(&self, comment_id: u64) -> Result<(), GitHubError>;

    async fn get_commit(&self, git_ref: &str) -> Result<Commit, GitHubError>;

    async fn get_check_runs_for(
        &self,
        sha: &str,
        query: &CheckRunQuery,
    ) -> Result<Vec<CheckRun>, GitHubError>;

    async fn create_check_run(&self, check_run: &NewCheckRun) -> Result<(), GitHubError>;

    async fn create_status(&self, sha: &str, status: &NewCommitStatus) -> Result<(), GitHubError>;

    async fn get_commit_statuses(
        &self,
        sha: &str,
        page: u32,
    ) -> Result<Page<CommitStatus>, GitHubError>;

    async fn get_combined_commit_status(
        &self,
        sha: &str,
    ) -> Result<CombinedCommitStatus, GitHubError>;

    async fn get_workflow_runs(
        &self,
        query: &WorkflowRunQuery,
    ) -> Result<Page<WorkflowRun>, GitHubError>;

    async fn cancel_workflow_run(&self, run: &WorkflowRun) -> Result<(), GitHubError>;

    async fn remove_workflow_run(&self, run: &WorkflowRun) -> Result<(), GitHubError>;

    /// Merge the pull request's base branch into its head branch and return the
    /// refreshed pull request.
    async fn merge_with_base(&self, pr: &PullRequest) -> Result<PullRequest, GitHubError>;

    /// Merge the pull request into its base branch. `Ok(false)` when the host declined.
    async fn merge_into_base(
        &self,
        pr: &PullRequest,
        request: &MergeRequest,
    ) -> Result<bool, GitHubError>;

    async fn add_label(&self, number: u64, label: &str) -> Result<(), GitHubError>;

    async fn remove_label(&self, number: u64, label: &str) -> Result<(), GitHubError>;

    async fn add_comment(&self, number: u64, body: &str) -> Result<Comment, GitHubError>;

    async fn close_pull_request(&self, number: u64) -> Result<(), GitHubError>;

    /// Raw contents of a file at the given ref.
    async fn get_file_contents(&self, path: &str, git_ref: &str) -> Result<String, GitHubError>;
}
