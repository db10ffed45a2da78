//! In-process repository host.
//!
//! `InMemoryHost` keeps a whole repository in memory, pages it like GitHub does and
//! records every mutation it receives. Failure injection lets callers exercise the
//! error paths of the governance components without a network.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

use super::errors::GitHubError;
use super::host::VersionControlHost;
use super::page::{Page, DEFAULT_PER_PAGE};
use super::types::{
    Branch, CheckRun, CheckRunQuery, CombinedCommitStatus, Comment, Commit, CommitDetail,
    CommitState, CommitStatus, Label, MergeRequest, Milestone, NewCheckRun, NewCommitStatus,
    PullRequest, PullRequestFile, User, WorkflowRun, WorkflowRunConclusion, WorkflowRunQuery,
    WorkflowRunStatus,
};

/// A mutation the host accepted, in the order received.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostAction {
    Cancelled(u64),
    Removed(u64),
    CommentRemoved(u64),
    CommentAdded { number: u64, body: String },
    LabelAdded { number: u64, label: String },
    LabelRemoved { number: u64, label: String },
    Closed(u64),
    StatusCreated { sha: String, state: CommitState, context: String },
    CheckRunCreated { sha: String, name: String },
    MergedWithBase(u64),
    MergedIntoBase(u64),
}

#[derive(Debug, Default)]
struct HostState {
    branches: Vec<Branch>,
    milestones: Vec<Milestone>,
    labels: Vec<Label>,
    pull_requests: Vec<PullRequest>,
    comments: HashMap<u64, Vec<Comment>>,
    runs: Vec<WorkflowRun>,
    statuses: HashMap<String, Vec<CommitStatus>>,
    check_runs: Vec<CheckRun>,
    files: HashMap<u64, Vec<PullRequestFile>>,
    pr_commits: HashMap<u64, Vec<Commit>>,
    commits: HashMap<String, Commit>,
    contents: HashMap<(String, String), String>,
    actions: Vec<HostAction>,
    failing_cancels: HashSet<u64>,
    failing_removals: HashSet<u64>,
    fail_comment_listing: bool,
    fail_comment_removal: bool,
    next_id: u64,
}

impl HostState {
    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn pull_request_mut(&mut self, number: u64) -> Result<&mut PullRequest, GitHubError> {
        self.pull_requests
            .iter_mut()
            .find(|pr| pr.number == number)
            .ok_or_else(|| GitHubError::NotFound(format!("pull request #{number}")))
    }
}

#[derive(Debug)]
pub struct InMemoryHost {
    full_name: String,
    per_page: u32,
    state: Mutex<HostState>,
}

impl Default for InMemoryHost {
    fn default() -> Self {
        Self::new("octo/repo")
    }
}

impl InMemoryHost {
    pub fn new(full_name: &str) -> Self {
        Self {
            full_name: full_name.to_string(),
            per_page: DEFAULT_PER_PAGE,
            state: Mutex::new(HostState {
                next_id: 10_000,
                ..HostState::default()
            }),
        }
    }

    /// Page size for every listing except workflow runs, which honour the query.
    pub fn with_page_size(mut self, per_page: u32) -> Self {
        self.per_page = per_page.max(1);
        self
    }

    fn state(&self) -> MutexGuard<'_, HostState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn add_branch(&self, name: &str, sha: &str) {
        self.state().branches.push(Branch::new(name, sha));
    }

    pub fn add_milestone(&self, milestone: Milestone) {
        self.state().milestones.push(milestone);
    }

    pub fn insert_label(&self, name: &str) {
        self.state().labels.push(Label::new(name));
    }

    pub fn add_pull_request(&self, pr: PullRequest) {
        self.state().pull_requests.push(pr);
    }

    pub fn insert_comment(&self, number: u64, comment: Comment) {
        self.state().comments.entry(number).or_default().push(comment);
    }

    pub fn add_run(&self, run: WorkflowRun) {
        self.state().runs.push(run);
    }

    pub fn add_runs(&self, runs: impl IntoIterator<Item = WorkflowRun>) {
        self.state().runs.extend(runs);
    }

    pub fn add_file(&self, number: u64, file: PullRequestFile) {
        self.state().files.entry(number).or_default().push(file);
    }

    pub fn add_pull_request_commit(&self, number: u64, commit: Commit) {
        self.state().pr_commits.entry(number).or_default().push(commit);
    }

    pub fn add_commit(&self, git_ref: &str, commit: Commit) {
        self.state().commits.insert(git_ref.to_string(), commit);
    }

    pub fn add_check_run(&self, check_run: CheckRun) {
        self.state().check_runs.push(check_run);
    }

    pub fn add_status(&self, sha: &str, status: CommitStatus) {
        self.state()
            .statuses
            .entry(sha.to_string())
            .or_default()
            .push(status);
    }

    pub fn set_file_contents(&self, path: &str, git_ref: &str, contents: &str) {
        self.state()
            .contents
            .insert((path.to_string(), git_ref.to_string()), contents.to_string());
    }

    /// Make every cancellation of this run fail with a server error.
    pub fn fail_cancel_of(&self, run_id: u64) {
        self.state().failing_cancels.insert(run_id);
    }

    /// Make every removal of this run fail with a server error.
    pub fn fail_removal_of(&self, run_id: u64) {
        self.state().failing_removals.insert(run_id);
    }

    pub fn fail_comment_listing(&self) {
        self.state().fail_comment_listing = true;
    }

    pub fn fail_comment_removal(&self) {
        self.state().fail_comment_removal = true;
    }

    pub fn actions(&self) -> Vec<HostAction> {
        self.state().actions.clone()
    }

    pub fn clear_actions(&self) {
        self.state().actions.clear();
    }

    pub fn runs(&self) -> Vec<WorkflowRun> {
        self.state().runs.clone()
    }

    pub fn run(&self, id: u64) -> Option<WorkflowRun> {
        self.state().runs.iter().find(|r| r.id == id).cloned()
    }

    pub fn comments_on(&self, number: u64) -> Vec<Comment> {
        self.state()
            .comments
            .get(&number)
            .cloned()
            .unwrap_or_default()
    }

    pub fn pull_request(&self, number: u64) -> Option<PullRequest> {
        self.state()
            .pull_requests
            .iter()
            .find(|pr| pr.number == number)
            .cloned()
    }

    pub fn statuses_for(&self, sha: &str) -> Vec<CommitStatus> {
        self.state().statuses.get(sha).cloned().unwrap_or_default()
    }

    pub fn check_runs(&self) -> Vec<CheckRun> {
        self.state().check_runs.clone()
    }

    fn page<T: Clone>(&self, items: &[T], page: u32) -> Page<T> {
        Page::slice(items, page, self.per_page)
    }
}

fn combined_state(statuses: &[CommitStatus]) -> &'static str {
    if statuses
        .iter()
        .any(|s| matches!(s.state, CommitState::Failure | CommitState::Error))
    {
        "failure"
    } else if statuses.is_empty() || statuses.iter().any(|s| s.state == CommitState::Pending) {
        "pending"
    } else {
        "success"
    }
}

#[async_trait]
impl VersionControlHost for InMemoryHost {
    fn full_name(&self) -> String {
        self.full_name.clone()
    }

    async fn get_branches(&self, page: u32) -> Result<Page<Branch>, GitHubError> {
        let branches = self.state().branches.clone();
        Ok(self.page(&branches, page))
    }

    async fn get_milestones(&self, page: u32) -> Result<Page<Milestone>, GitHubError> {
        let open: Vec<Milestone> = self
            .state()
            .milestones
            .iter()
            .filter(|m| m.is_open())
            .cloned()
            .collect();
        Ok(self.page(&open, page))
    }

    async fn get_labels(&self, page: u32) -> Result<Page<Label>, GitHubError> {
        let labels = self.state().labels.clone();
        Ok(self.page(&labels, page))
    }

    async fn get_pull_requests(&self, page: u32) -> Result<Page<PullRequest>, GitHubError> {
        let open: Vec<PullRequest> = self
            .state()
            .pull_requests
            .iter()
            .filter(|pr| pr.is_open())
            .cloned()
            .collect();
        Ok(self.page(&open, page))
    }

    async fn get_pull_request(&self, number: u64) -> Result<Option<PullRequest>, GitHubError> {
        Ok(self.pull_request(number))
    }

    async fn get_pull_request_files(
        &self,
        number: u64,
        page: u32,
    ) -> Result<Page<PullRequestFile>, GitHubError> {
        let files = self.state().files.get(&number).cloned().unwrap_or_default();
        Ok(self.page(&files, page))
    }

    async fn get_pull_request_commits(
        &self,
        number: u64,
        page: u32,
    ) -> Result<Page<Commit>, GitHubError> {
        let commits = self
            .state()
            .pr_commits
            .get(&number)
            .cloned()
            .unwrap_or_default();
        Ok(self.page(&commits, page))
    }

    async fn get_comments(&self, number: u64, page: u32) -> Result<Page<Comment>, GitHubError> {
        let comments = {
            let state = self.state();
            if state.fail_comment_listing {
                return Err(GitHubError::Server {
                    status: 502,
                    message: "comment listing unavailable".to_string(),
                });
            }
            state.comments.get(&number).cloned().unwrap_or_default()
        };
        Ok(self.page(&comments, page))
    }

    async fn remove_comment(&self, comment_id: u64) -> Result<(), GitHubError> {
        let mut state = self.state();
        if state.fail_comment_removal {
            return Err(GitHubError::Server {
                status: 500,
                message: format!("could not delete comment {comment_id}"),
            });
        }
        let mut found = false;
        for comments in state.comments.values_mut() {
            let before = comments.len();
            comments.retain(|c| c.id != comment_id);
            found |= comments.len() != before;
        }
        if !found {
            return Err(GitHubError::NotFound(format!("comment {comment_id}")));
        }
        state.actions.push(HostAction::CommentRemoved(comment_id));
        Ok(())
    }

    async fn get_commit(&self, git_ref: &str) -> Result<Commit, GitHubError> {
        let state = self.state();
        if let Some(commit) = state.commits.get(git_ref) {
            return Ok(commit.clone());
        }
        state
            .branches
            .iter()
            .find(|b| b.name == git_ref)
            .map(|b| Commit {
                sha: b.commit.sha.clone(),
                commit: CommitDetail {
                    message: String::new(),
                },
            })
            .ok_or_else(|| GitHubError::NotFound(format!("commit {git_ref}")))
    }

    async fn get_check_runs_for(
        &self,
        sha: &str,
        query: &CheckRunQuery,
    ) -> Result<Vec<CheckRun>, GitHubError> {
        let mut runs: Vec<CheckRun> = self
            .state()
            .check_runs
            .iter()
            .filter(|c| c.head_sha == sha)
            .filter(|c| query.check_name.as_ref().map_or(true, |n| &c.name == n))
            .filter(|c| query.status.as_ref().map_or(true, |s| &c.status == s))
            .cloned()
            .collect();
        runs.sort_by(|a, b| b.id.cmp(&a.id));
        if query.filter.as_deref() == Some("latest") {
            let mut seen = HashSet::new();
            runs.retain(|c| seen.insert(c.name.clone()));
        }
        Ok(runs)
    }

    async fn create_check_run(&self, check_run: &NewCheckRun) -> Result<(), GitHubError> {
        let mut state = self.state();
        let id = state.next_id();
        state.check_runs.push(CheckRun {
            id,
            name: check_run.name.clone(),
            head_sha: check_run.head_sha.clone(),
            status: check_run.status.clone(),
            conclusion: Some(check_run.conclusion.clone()),
        });
        state.actions.push(HostAction::CheckRunCreated {
            sha: check_run.head_sha.clone(),
            name: check_run.name.clone(),
        });
        Ok(())
    }

    async fn create_status(&self, sha: &str, status: &NewCommitStatus) -> Result<(), GitHubError> {
        let mut state = self.state();
        state
            .statuses
            .entry(sha.to_string())
            .or_default()
            .push(CommitStatus {
                context: status.context.clone(),
                state: status.state,
                description: Some(status.description.clone()),
                target_url: status.target_url.clone(),
            });
        state.actions.push(HostAction::StatusCreated {
            sha: sha.to_string(),
            state: status.state,
            context: status.context.clone(),
        });
        Ok(())
    }

    async fn get_commit_statuses(
        &self,
        sha: &str,
        page: u32,
    ) -> Result<Page<CommitStatus>, GitHubError> {
        let statuses = self.statuses_for(sha);
        Ok(self.page(&statuses, page))
    }

    async fn get_combined_commit_status(
        &self,
        sha: &str,
    ) -> Result<CombinedCommitStatus, GitHubError> {
        // Latest status per context wins.
        let mut latest: Vec<CommitStatus> = Vec::new();
        for status in self.statuses_for(sha).into_iter().rev() {
            if !latest.iter().any(|s| s.context == status.context) {
                latest.push(status);
            }
        }
        Ok(CombinedCommitStatus {
            state: combined_state(&latest).to_string(),
            statuses: latest,
            sha: sha.to_string(),
        })
    }

    async fn get_workflow_runs(
        &self,
        query: &WorkflowRunQuery,
    ) -> Result<Page<WorkflowRun>, GitHubError> {
        let mut matching: Vec<WorkflowRun> = self
            .state()
            .runs
            .iter()
            .filter(|run| query.matches(run))
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.id.cmp(&a.id));
        Ok(Page::slice(&matching, query.page, query.per_page))
    }

    async fn cancel_workflow_run(&self, run: &WorkflowRun) -> Result<(), GitHubError> {
        let mut state = self.state();
        if state.failing_cancels.contains(&run.id) {
            return Err(GitHubError::Server {
                status: 500,
                message: format!("cancel of run {} failed", run.id),
            });
        }
        let stored = state
            .runs
            .iter_mut()
            .find(|r| r.id == run.id)
            .ok_or_else(|| GitHubError::NotFound(format!("workflow run {}", run.id)))?;
        if !stored.is_active() {
            return Err(GitHubError::Conflict(format!(
                "workflow run {} is already {}",
                run.id,
                stored.status.as_str()
            )));
        }
        stored.status = WorkflowRunStatus::Completed;
        stored.conclusion = Some(WorkflowRunConclusion::Cancelled);
        state.actions.push(HostAction::Cancelled(run.id));
        Ok(())
    }

    async fn remove_workflow_run(&self, run: &WorkflowRun) -> Result<(), GitHubError> {
        let mut state = self.state();
        if state.failing_removals.contains(&run.id) {
            return Err(GitHubError::Server {
                status: 500,
                message: format!("removal of run {} failed", run.id),
            });
        }
        let before = state.runs.len();
        state.runs.retain(|r| r.id != run.id);
        if state.runs.len() == before {
            return Err(GitHubError::NotFound(format!("workflow run {}", run.id)));
        }
        state.actions.push(HostAction::Removed(run.id));
        Ok(())
    }

    async fn merge_with_base(&self, pr: &PullRequest) -> Result<PullRequest, GitHubError> {
        let mut state = self.state();
        let id = state.next_id();
        let stored = state.pull_request_mut(pr.number)?;
        if stored.locked {
            return Err(GitHubError::Conflict(format!(
                "pull request #{} is locked",
                pr.number
            )));
        }
        stored.head.sha = format!("{}-merge-{id}", stored.head.ref_field);
        let refreshed = stored.clone();
        state.actions.push(HostAction::MergedWithBase(pr.number));
        Ok(refreshed)
    }

    async fn merge_into_base(
        &self,
        pr: &PullRequest,
        request: &MergeRequest,
    ) -> Result<bool, GitHubError> {
        let mut state = self.state();
        let stored = state.pull_request_mut(pr.number)?;
        if stored.head.sha != request.sha {
            return Err(GitHubError::Conflict(format!(
                "head of #{} moved to {}",
                pr.number, stored.head.sha
            )));
        }
        if !stored.is_open() {
            return Ok(false);
        }
        stored.state = "closed".to_string();
        state.actions.push(HostAction::MergedIntoBase(pr.number));
        Ok(true)
    }

    async fn add_label(&self, number: u64, label: &str) -> Result<(), GitHubError> {
        let mut state = self.state();
        let stored = state.pull_request_mut(number)?;
        if !stored.has_label(label) {
            stored.labels.push(Label::new(label));
        }
        state.actions.push(HostAction::LabelAdded {
            number,
            label: label.to_string(),
        });
        Ok(())
    }

    async fn remove_label(&self, number: u64, label: &str) -> Result<(), GitHubError> {
        let mut state = self.state();
        let stored = state.pull_request_mut(number)?;
        if !stored.has_label(label) {
            return Err(GitHubError::NotFound(format!("label {label} on #{number}")));
        }
        stored.labels.retain(|l| !l.name.eq_ignore_ascii_case(label));
        state.actions.push(HostAction::LabelRemoved {
            number,
            label: label.to_string(),
        });
        Ok(())
    }

    async fn add_comment(&self, number: u64, body: &str) -> Result<Comment, GitHubError> {
        let mut state = self.state();
        state.pull_request_mut(number)?;
        let comment = Comment {
            id: state.next_id(),
            user: User::new("repo-warden"),
            body: Some(body.to_string()),
            updated_at: Utc::now(),
        };
        state
            .comments
            .entry(number)
            .or_default()
            .push(comment.clone());
        state.actions.push(HostAction::CommentAdded {
            number,
            body: body.to_string(),
        });
        Ok(comment)
    }

    async fn close_pull_request(&self, number: u64) -> Result<(), GitHubError> {
        let mut state = self.state();
        state.pull_request_mut(number)?.state = "closed".to_string();
        state.actions.push(HostAction::Closed(number));
        Ok(())
    }

    async fn get_file_contents(&self, path: &str, git_ref: &str) -> Result<String, GitHubError> {
        self.state()
            .contents
            .get(&(path.to_string(), git_ref.to_string()))
            .cloned()
            .ok_or_else(|| GitHubError::NotFound(format!("{path}@{git_ref}")))
    }
}
