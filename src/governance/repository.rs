use std::sync::Arc;
use tracing::{error, info, warn};

use crate::config::GovernanceSettings;
use crate::github::types::{
    Branch, CheckRun, CheckRunQuery, CombinedCommitStatus, Commit, CommitStatus, Label, Milestone,
    PullRequest, PullRequestFile,
};
use crate::github::{collect_all, GitHubError, VersionControlHost};

use super::branches::BranchClassifier;
use super::merge::MergeCoordinator;
use super::resume::CiResumeAuthorizer;
use super::runs::WorkflowRunGovernor;
use super::versions::{
    parse_manifest_version, resolve_branch_name_for_milestone, resolve_milestone_for_mainline,
    Version,
};

/// One governed repository: the host handle, its settings and the components built on them.
pub struct MonitoredRepository {
    host: Arc<dyn VersionControlHost>,
    settings: Arc<GovernanceSettings>,
    classifier: BranchClassifier,
}

impl MonitoredRepository {
    pub fn new(host: Arc<dyn VersionControlHost>, settings: Arc<GovernanceSettings>) -> Self {
        let classifier = BranchClassifier::new(settings.clone());
        Self {
            host,
            settings,
            classifier,
        }
    }

    pub fn full_name(&self) -> String {
        self.host.full_name()
    }

    pub fn settings(&self) -> &GovernanceSettings {
        &self.settings
    }

    pub fn classifier(&self) -> &BranchClassifier {
        &self.classifier
    }

    pub fn governor(&self) -> WorkflowRunGovernor {
        WorkflowRunGovernor::new(self.host.clone(), self.settings.clone())
    }

    pub fn resume_authorizer(&self) -> CiResumeAuthorizer {
        CiResumeAuthorizer::new(self.host.clone(), self.settings.clone())
    }

    pub fn merge_coordinator(&self) -> MergeCoordinator {
        MergeCoordinator::new(self.host.clone(), self.settings.clone())
    }

    /// Open milestones. A listing failure is logged and yields none.
    pub async fn active_milestones(&self) -> Vec<Milestone> {
        let host = self.host.as_ref();
        match collect_all(|page| host.get_milestones(page)).await {
            Ok(milestones) => {
                info!(count = milestones.len(), "Loaded open milestones");
                milestones
            }
            Err(e) => {
                error!(error = %e, "Could not list milestones");
                Vec::new()
            }
        }
    }

    /// Repository labels. A listing failure is logged and yields none.
    pub async fn active_labels(&self) -> Vec<Label> {
        let host = self.host.as_ref();
        match collect_all(|page| host.get_labels(page)).await {
            Ok(labels) => labels,
            Err(e) => {
                error!(error = %e, "Could not list labels");
                Vec::new()
            }
        }
    }

    pub async fn active_branches(&self) -> Result<Vec<Branch>, GitHubError> {
        self.classifier.list_active_branches(self.host.as_ref()).await
    }

    pub async fn open_pull_requests(&self) -> Result<Vec<PullRequest>, GitHubError> {
        let host = self.host.as_ref();
        collect_all(|page| host.get_pull_requests(page)).await
    }

    pub async fn pull_request(&self, number: u64) -> Result<Option<PullRequest>, GitHubError> {
        self.host.get_pull_request(number).await
    }

    /// Version declared in the build manifest on the mainline branch.
    pub async fn current_mainline_version(&self) -> Result<Version, GitHubError> {
        let path = &self.settings.version_manifest_path;
        let key = &self.settings.version_manifest_key;
        let manifest = self
            .host
            .get_file_contents(path, &self.settings.mainline_branch)
            .await?;
        let version = parse_manifest_version(&manifest, key).ok_or_else(|| {
            GitHubError::InvalidResponse(format!("{path} has no parseable '{key}' property"))
        })?;
        info!(version = %version, manifest = %path, "Found mainline version");
        Ok(version)
    }

    /// Open milestone tracking the mainline version, if any.
    pub async fn milestone_for_mainline(&self) -> Option<Milestone> {
        let version = match self.current_mainline_version().await {
            Ok(version) => version,
            Err(e) => {
                warn!(error = %e, "Could not determine mainline version");
                return None;
            }
        };
        let milestones = self.active_milestones().await;
        resolve_milestone_for_mainline(&version, &milestones).cloned()
    }

    /// Branch carrying the work of a milestone.
    pub async fn branch_for_milestone(&self, milestone: &Milestone) -> Option<String> {
        let mainline = self.milestone_for_mainline().await;
        resolve_branch_name_for_milestone(
            milestone,
            mainline.as_ref(),
            &self.settings.mainline_branch,
        )
    }

    pub async fn pull_request_files(
        &self,
        pr: &PullRequest,
    ) -> Result<Vec<PullRequestFile>, GitHubError> {
        let host = self.host.as_ref();
        collect_all(|page| host.get_pull_request_files(pr.number, page)).await
    }

    pub async fn pull_request_commits(&self, pr: &PullRequest) -> Result<Vec<Commit>, GitHubError> {
        let host = self.host.as_ref();
        collect_all(|page| host.get_pull_request_commits(pr.number, page)).await
    }

    pub async fn pull_request_commit_statuses(
        &self,
        pr: &PullRequest,
    ) -> Result<Vec<CommitStatus>, GitHubError> {
        let host = self.host.as_ref();
        collect_all(|page| host.get_commit_statuses(pr.head_sha(), page)).await
    }

    pub async fn combined_commit_status(
        &self,
        pr: &PullRequest,
    ) -> Result<CombinedCommitStatus, GitHubError> {
        self.host.get_combined_commit_status(pr.head_sha()).await
    }

    /// Most recent completed check run on the head commit, optionally for one check.
    pub async fn latest_completed_check_run(
        &self,
        pr: &PullRequest,
        check_name: Option<&str>,
    ) -> Result<Option<CheckRun>, GitHubError> {
        let query = CheckRunQuery {
            check_name: check_name.map(str::to_string),
            status: Some("completed".to_string()),
            filter: Some("latest".to_string()),
        };
        let runs = self.host.get_check_runs_for(pr.head_sha(), &query).await?;
        Ok(runs.into_iter().max_by_key(|run| run.id))
    }

    pub async fn head_commit(&self, branch: &Branch) -> Result<Commit, GitHubError> {
        self.host.get_commit(&branch.name).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::github::types::{CommitDetail, CommitState};
    use crate::github::InMemoryHost;

    fn repository() -> (Arc<InMemoryHost>, MonitoredRepository) {
        let host = Arc::new(InMemoryHost::new("apereo/cas"));
        let repository =
            MonitoredRepository::new(host.clone(), Arc::new(GovernanceSettings::default()));
        (host, repository)
    }

    #[tokio::test]
    async fn test_mainline_milestone_from_manifest() {
        let (host, repository) = repository();
        host.set_file_contents("gradle.properties", "master", "version=7.1.0-SNAPSHOT\n");
        host.add_milestone(Milestone::open(3, "7.0.2"));
        host.add_milestone(Milestone::open(4, "7.1.0-RC1"));
        host.add_milestone(Milestone::open(5, "7.1.0"));

        let version = repository.current_mainline_version().await.unwrap();
        assert_eq!(version.release(), Version::new(7, 1, 0));

        let milestone = repository.milestone_for_mainline().await.unwrap();
        assert_eq!(milestone.number, 4);

        let maintenance = Milestone::open(3, "7.0.2");
        assert_eq!(
            repository.branch_for_milestone(&maintenance).await.as_deref(),
            Some("7.0.x")
        );
        assert_eq!(
            repository.branch_for_milestone(&milestone).await.as_deref(),
            Some("master")
        );
    }

    #[tokio::test]
    async fn test_missing_manifest_yields_no_mainline_milestone() {
        let (host, repository) = repository();
        host.add_milestone(Milestone::open(1, "7.0.0"));
        assert!(repository.current_mainline_version().await.is_err());
        assert!(repository.milestone_for_mainline().await.is_none());
    }

    #[tokio::test]
    async fn test_pull_request_reads() {
        let (host, repository) = repository();
        let pr = PullRequest::new(12, "feature", "bob");
        host.add_pull_request(pr.clone());
        host.add_pull_request_commit(
            12,
            Commit {
                sha: "c1".to_string(),
                commit: CommitDetail {
                    message: "Fix login".to_string(),
                },
            },
        );
        host.add_file(
            12,
            PullRequestFile {
                filename: "src/login.rs".to_string(),
                status: "modified".to_string(),
                additions: 3,
                deletions: 1,
                changes: 4,
            },
        );
        host.add_check_run(CheckRun {
            id: 1,
            name: "build".to_string(),
            head_sha: pr.head_sha().to_string(),
            status: "completed".to_string(),
            conclusion: Some("failure".to_string()),
        });
        host.add_check_run(CheckRun {
            id: 2,
            name: "build".to_string(),
            head_sha: pr.head_sha().to_string(),
            status: "completed".to_string(),
            conclusion: Some("success".to_string()),
        });
        host.add_status(
            pr.head_sha(),
            CommitStatus {
                context: "review".to_string(),
                state: CommitState::Pending,
                description: None,
                target_url: None,
            },
        );

        assert_eq!(repository.pull_request_commits(&pr).await.unwrap()[0].message(), "Fix login");
        assert_eq!(repository.pull_request_files(&pr).await.unwrap().len(), 1);
        let latest = repository
            .latest_completed_check_run(&pr, Some("build"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(latest.id, 2);
        assert_eq!(repository.pull_request_commit_statuses(&pr).await.unwrap().len(), 1);
        assert!(repository
            .combined_commit_status(&pr)
            .await
            .unwrap()
            .is_check_status_pending("review"));
    }

    #[tokio::test]
    async fn test_head_commit_of_branch() {
        let (host, repository) = repository();
        host.add_branch("master", "abc123");
        let commit = repository
            .head_commit(&Branch::new("master", "abc123"))
            .await
            .unwrap();
        assert_eq!(commit.sha, "abc123");
    }
}
