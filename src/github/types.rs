//! Views of the host entities the governance controller reads and writes.
//!
//! Field names follow the GitHub REST payloads so the same types deserialize straight
//! from API responses and can be built by hand in tests.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// GitHub sends `null` for some string fields (e.g. runs of deleted fork branches).
fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub login: String,
}

impl User {
    pub fn new(login: &str) -> Self {
        Self {
            login: login.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchCommit {
    pub sha: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Branch {
    pub name: String,
    pub commit: BranchCommit,
}

impl Branch {
    pub fn new(name: &str, sha: &str) -> Self {
        Self {
            name: name.to_string(),
            commit: BranchCommit {
                sha: sha.to_string(),
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MilestoneState {
    Open,
    Closed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Milestone {
    pub number: u64,
    pub title: String,
    pub state: MilestoneState,
}

impl Milestone {
    pub fn open(number: u64, title: &str) -> Self {
        Self {
            number,
            title: title.to_string(),
            state: MilestoneState::Open,
        }
    }

    pub fn is_open(&self) -> bool {
        self.state == MilestoneState::Open
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Label {
    pub name: String,
    #[serde(default)]
    pub color: Option<String>,
}

impl Label {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            color: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequestRef {
    #[serde(rename = "ref")]
    pub ref_field: String,
    pub sha: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequest {
    pub number: u64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub locked: bool,
    pub head: PullRequestRef,
    pub base: PullRequestRef,
    pub user: User,
    #[serde(default)]
    pub labels: Vec<Label>,
}

impl PullRequest {
    /// An open pull request from `head_ref` into `master`.
    pub fn new(number: u64, head_ref: &str, author: &str) -> Self {
        Self {
            number,
            title: format!("Pull request #{number}"),
            body: None,
            state: "open".to_string(),
            locked: false,
            head: PullRequestRef {
                ref_field: head_ref.to_string(),
                sha: format!("{head_ref}-head"),
            },
            base: PullRequestRef {
                ref_field: "master".to_string(),
                sha: "master-head".to_string(),
            },
            user: User::new(author),
            labels: Vec::new(),
        }
    }

    pub fn with_labels(mut self, labels: &[&str]) -> Self {
        self.labels = labels.iter().map(|l| Label::new(l)).collect();
        self
    }

    pub fn with_base(mut self, base_ref: &str) -> Self {
        self.base = PullRequestRef {
            ref_field: base_ref.to_string(),
            sha: format!("{base_ref}-head"),
        };
        self
    }

    pub fn is_open(&self) -> bool {
        self.state.eq_ignore_ascii_case("open")
    }

    pub fn head_ref(&self) -> &str {
        &self.head.ref_field
    }

    pub fn head_sha(&self) -> &str {
        &self.head.sha
    }

    pub fn base_ref(&self) -> &str {
        &self.base.ref_field
    }

    pub fn author(&self) -> &str {
        &self.user.login
    }

    /// Label names on GitHub are case-insensitive.
    pub fn has_label(&self, name: &str) -> bool {
        self.labels.iter().any(|l| l.name.eq_ignore_ascii_case(name))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub id: u64,
    pub user: User,
    #[serde(default)]
    pub body: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl Comment {
    pub fn new(id: u64, author: &str, body: &str, updated_at: DateTime<Utc>) -> Self {
        Self {
            id,
            user: User::new(author),
            body: Some(body.to_string()),
            updated_at,
        }
    }

    pub fn author(&self) -> &str {
        &self.user.login
    }

    pub fn body(&self) -> &str {
        self.body.as_deref().unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitDetail {
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commit {
    pub sha: String,
    pub commit: CommitDetail,
}

impl Commit {
    pub fn message(&self) -> &str {
        &self.commit.message
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequestFile {
    pub filename: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub additions: u64,
    #[serde(default)]
    pub deletions: u64,
    #[serde(default)]
    pub changes: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommitState {
    Success,
    Pending,
    Failure,
    Error,
}

impl CommitState {
    pub fn as_str(&self) -> &'static str {
        match self {
            CommitState::Success => "success",
            CommitState::Pending => "pending",
            CommitState::Failure => "failure",
            CommitState::Error => "error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitStatus {
    pub context: String,
    pub state: CommitState,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub target_url: Option<String>,
}

/// Aggregate of every status reported against one commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombinedCommitStatus {
    pub state: String,
    #[serde(default)]
    pub statuses: Vec<CommitStatus>,
    pub sha: String,
}

impl CombinedCommitStatus {
    pub fn is_check_status_success(&self, context: &str) -> bool {
        self.has_status(context, CommitState::Success)
    }

    pub fn is_check_status_pending(&self, context: &str) -> bool {
        self.has_status(context, CommitState::Pending)
    }

    pub fn is_check_status_failure(&self, context: &str) -> bool {
        self.has_status(context, CommitState::Failure)
    }

    fn has_status(&self, context: &str, state: CommitState) -> bool {
        self.statuses
            .iter()
            .any(|s| s.context.eq_ignore_ascii_case(context) && s.state == state)
    }
}

/// Payload for a new commit status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewCommitStatus {
    pub state: CommitState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_url: Option<String>,
    pub description: String,
    pub context: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckRun {
    pub id: u64,
    pub name: String,
    pub head_sha: String,
    pub status: String,
    #[serde(default)]
    pub conclusion: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckRunOutput {
    pub title: String,
    pub summary: String,
}

/// Payload for a new check run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewCheckRun {
    pub name: String,
    pub head_sha: String,
    pub status: String,
    pub conclusion: String,
    pub output: CheckRunOutput,
}

/// Filters for listing check runs of a commit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CheckRunQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub check_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowRunEvent {
    Push,
    PullRequest,
    #[serde(other)]
    Other,
}

impl WorkflowRunEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkflowRunEvent::Push => "push",
            WorkflowRunEvent::PullRequest => "pull_request",
            WorkflowRunEvent::Other => "other",
        }
    }
}

/// Lifecycle status of a run. `Cancelled` only appears as a query filter: GitHub
/// reports cancelled runs as `completed` with a `cancelled` conclusion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowRunStatus {
    Queued,
    InProgress,
    Completed,
    Cancelled,
    Waiting,
    Requested,
    Pending,
    #[serde(other)]
    Unknown,
}

impl WorkflowRunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkflowRunStatus::Queued => "queued",
            WorkflowRunStatus::InProgress => "in_progress",
            WorkflowRunStatus::Completed => "completed",
            WorkflowRunStatus::Cancelled => "cancelled",
            WorkflowRunStatus::Waiting => "waiting",
            WorkflowRunStatus::Requested => "requested",
            WorkflowRunStatus::Pending => "pending",
            WorkflowRunStatus::Unknown => "unknown",
        }
    }

    /// Non-terminal statuses, i.e. runs that still hold (or wait for) a runner.
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            WorkflowRunStatus::Queued
                | WorkflowRunStatus::InProgress
                | WorkflowRunStatus::Waiting
                | WorkflowRunStatus::Requested
                | WorkflowRunStatus::Pending
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowRunConclusion {
    Success,
    Failure,
    Cancelled,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowRun {
    pub id: u64,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub head_branch: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub head_sha: String,
    pub run_number: u64,
    pub event: WorkflowRunEvent,
    pub status: WorkflowRunStatus,
    #[serde(default)]
    pub conclusion: Option<WorkflowRunConclusion>,
    pub updated_at: DateTime<Utc>,
}

impl WorkflowRun {
    pub fn new(
        id: u64,
        name: &str,
        head_branch: &str,
        run_number: u64,
        event: WorkflowRunEvent,
        status: WorkflowRunStatus,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            name: name.to_string(),
            head_branch: head_branch.to_string(),
            head_sha: format!("{head_branch}-{run_number}"),
            run_number,
            event,
            status,
            conclusion: None,
            updated_at,
        }
    }

    /// Mark the run completed with the given conclusion.
    pub fn concluded(mut self, conclusion: WorkflowRunConclusion) -> Self {
        self.status = WorkflowRunStatus::Completed;
        self.conclusion = Some(conclusion);
        self
    }

    pub fn is_active(&self) -> bool {
        self.status.is_active()
    }

    pub fn is_concluded_successfully(&self) -> bool {
        self.conclusion == Some(WorkflowRunConclusion::Success)
    }

    pub fn is_cancelled(&self) -> bool {
        self.status == WorkflowRunStatus::Cancelled
            || self.conclusion == Some(WorkflowRunConclusion::Cancelled)
    }

    /// Duplicate detection key: one surviving run per branch and workflow.
    pub fn group_key(&self) -> String {
        format!("{}@{}", self.head_branch, self.name)
    }
}

impl std::fmt::Display for WorkflowRun {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} #{} [{}] on {} ({})",
            self.name,
            self.run_number,
            self.id,
            self.head_branch,
            self.status.as_str()
        )
    }
}

/// Filters for listing workflow runs. `page` is 1-based.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowRunQuery {
    pub branch: Option<String>,
    pub event: Option<WorkflowRunEvent>,
    pub status: Option<WorkflowRunStatus>,
    pub page: u32,
    pub per_page: u32,
}

impl WorkflowRunQuery {
    pub fn all(per_page: u32) -> Self {
        Self {
            branch: None,
            event: None,
            status: None,
            page: 1,
            per_page,
        }
    }

    pub fn branch(mut self, branch: &str) -> Self {
        self.branch = Some(branch.to_string());
        self
    }

    pub fn event(mut self, event: WorkflowRunEvent) -> Self {
        self.event = Some(event);
        self
    }

    pub fn status(mut self, status: WorkflowRunStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn page(mut self, page: u32) -> Self {
        self.page = page;
        self
    }

    /// Whether a run satisfies the branch/event/status filters.
    pub fn matches(&self, run: &WorkflowRun) -> bool {
        let branch_ok = self
            .branch
            .as_ref()
            .map_or(true, |b| &run.head_branch == b);
        let event_ok = self.event.map_or(true, |e| run.event == e);
        let status_ok = self.status.map_or(true, |s| match s {
            WorkflowRunStatus::Cancelled => run.is_cancelled(),
            other => run.status == other,
        });
        branch_ok && event_ok && status_ok
    }
}

/// Request for merging a pull request into its base branch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MergeRequest {
    pub commit_title: String,
    pub commit_message: String,
    pub sha: String,
    pub merge_method: String,
}
