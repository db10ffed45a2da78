//! Workflow run governance.
//!
//! A pass applies five policies, strictly one after another:
//!
//! 1. duplicate queued runs are cancelled, keeping the newest run of each
//!    branch/workflow pair;
//! 2. runs of pull requests that are no longer open are cancelled and removed;
//! 3. runs of untrusted pull requests without the CI label are removed;
//! 4. runs past their retention window are purged;
//! 5. cancelled runs are swept.
//!
//! Reads may run concurrently; every mutation is issued sequentially. A failed
//! mutation is logged and counted, never retried here and never rolled back.

use chrono::{DateTime, Duration, Utc};
use futures::stream::{self, StreamExt};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::config::GovernanceSettings;
use crate::github::types::{
    PullRequest, WorkflowRun, WorkflowRunEvent, WorkflowRunQuery, WorkflowRunStatus,
};
use crate::github::{collect_all, GitHubError, VersionControlHost};

use super::branches::BranchClassifier;

/// Outcome of one or more policies.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PassReport {
    pub cancelled: Vec<u64>,
    pub removed: Vec<u64>,
    pub failures: usize,
}

impl PassReport {
    pub fn merge(&mut self, other: PassReport) {
        self.cancelled.extend(other.cancelled);
        self.removed.extend(other.removed);
        self.failures += other.failures;
    }

    /// True when the pass changed nothing on the host.
    pub fn is_noop(&self) -> bool {
        self.cancelled.is_empty() && self.removed.is_empty()
    }
}

/// What the retention policy does with a single run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetentionDecision {
    Keep,
    /// Untouched past the stale window: cancel if still active, then remove.
    RemoveStale,
    RemoveExpiredSuccess,
    RemoveExpiredFailure,
}

/// Apply the tiered retention rules to a run as of `now`.
pub fn retention_decision(
    run: &WorkflowRun,
    now: DateTime<Utc>,
    settings: &GovernanceSettings,
) -> RetentionDecision {
    // A window too large to represent never expires.
    let expired = |days: i64| {
        Duration::try_days(days)
            .and_then(|window| run.updated_at.checked_add_signed(window))
            .is_some_and(|deadline| deadline < now)
    };

    if expired(settings.stale_run_retention_days) {
        RetentionDecision::RemoveStale
    } else if run.event != WorkflowRunEvent::Push {
        RetentionDecision::Keep
    } else if run.is_concluded_successfully() {
        if expired(settings.success_retention_days) {
            RetentionDecision::RemoveExpiredSuccess
        } else {
            RetentionDecision::Keep
        }
    } else if expired(settings.failure_retention_days) {
        RetentionDecision::RemoveExpiredFailure
    } else {
        RetentionDecision::Keep
    }
}

/// Runs that lose the tie-break within their `(head branch, workflow)` group: every
/// run except the one with the highest run number. Sorted by id. Runs without a head
/// branch are never grouped.
pub fn duplicate_runs(runs: &[WorkflowRun]) -> Vec<&WorkflowRun> {
    let runs: Vec<&WorkflowRun> = runs.iter().filter(|r| !r.head_branch.is_empty()).collect();
    let mut best: HashMap<String, &WorkflowRun> = HashMap::with_capacity(runs.len());
    for &run in &runs {
        best.entry(run.group_key())
            .and_modify(|current| {
                if run.run_number > current.run_number {
                    *current = run;
                }
            })
            .or_insert(run);
    }

    let mut losers: Vec<&WorkflowRun> = runs
        .into_iter()
        .filter(|run| {
            best.get(&run.group_key())
                .is_some_and(|winner| winner.id != run.id)
        })
        .collect();
    losers.sort_by_key(|run| run.id);
    losers
}

enum Mutation {
    Applied,
    AlreadyDone,
    Failed,
}

pub struct WorkflowRunGovernor {
    host: Arc<dyn VersionControlHost>,
    settings: Arc<GovernanceSettings>,
    classifier: BranchClassifier,
}

impl WorkflowRunGovernor {
    pub fn new(host: Arc<dyn VersionControlHost>, settings: Arc<GovernanceSettings>) -> Self {
        let classifier = BranchClassifier::new(settings.clone());
        Self {
            host,
            settings,
            classifier,
        }
    }

    fn runs_query(&self) -> WorkflowRunQuery {
        WorkflowRunQuery::all(self.settings.runs_per_page.max(1))
    }

    async fn collect_runs(&self, query: &WorkflowRunQuery) -> Result<Vec<WorkflowRun>, GitHubError> {
        collect_all(|page| {
            let paged = query.clone().page(page);
            let host = self.host.clone();
            async move { host.get_workflow_runs(&paged).await }
        })
        .await
    }

    async fn open_pull_requests(&self) -> Result<Vec<PullRequest>, GitHubError> {
        let host = self.host.as_ref();
        collect_all(|page| host.get_pull_requests(page)).await
    }

    async fn cancel(&self, run: &WorkflowRun) -> Mutation {
        info!(run = %run, "Cancelling workflow run");
        match self.host.cancel_workflow_run(run).await {
            Ok(()) => Mutation::Applied,
            Err(e) if e.is_not_found() || e.is_conflict() => {
                debug!(run_id = run.id, error = %e, "Workflow run already gone or finished");
                Mutation::AlreadyDone
            }
            Err(e) => {
                error!(run_id = run.id, error = %e, "Failed to cancel workflow run");
                Mutation::Failed
            }
        }
    }

    /// A conflict here means the run has not stopped yet, so it counts as a failure.
    async fn remove(&self, run: &WorkflowRun) -> Mutation {
        match self.host.remove_workflow_run(run).await {
            Ok(()) => Mutation::Applied,
            Err(e) if e.is_not_found() => {
                debug!(run_id = run.id, error = %e, "Workflow run already removed");
                Mutation::AlreadyDone
            }
            Err(e) => {
                error!(run_id = run.id, error = %e, "Failed to remove workflow run");
                Mutation::Failed
            }
        }
    }

    fn record_cancel(report: &mut PassReport, run: &WorkflowRun, outcome: Mutation) {
        match outcome {
            Mutation::Applied => report.cancelled.push(run.id),
            Mutation::AlreadyDone => {}
            Mutation::Failed => report.failures += 1,
        }
    }

    fn record_removal(report: &mut PassReport, run: &WorkflowRun, outcome: Mutation) {
        match outcome {
            Mutation::Applied => report.removed.push(run.id),
            Mutation::AlreadyDone => {}
            Mutation::Failed => report.failures += 1,
        }
    }

    /// Cancel the run if it has not finished, then remove it. A failed cancellation
    /// does not prevent the removal.
    async fn cancel_then_remove(&self, run: &WorkflowRun, report: &mut PassReport) {
        if run.is_active() {
            let outcome = self.cancel(run).await;
            Self::record_cancel(report, run, outcome);
        }
        let outcome = self.remove(run).await;
        Self::record_removal(report, run, outcome);
    }

    /// Cancel superseded queued runs on every active branch and among all queued
    /// pull request runs. A run listed by both enumerations is cancelled once.
    pub async fn cancel_duplicate_queued_runs(&self) -> PassReport {
        let mut report = PassReport::default();

        let branches = match self.classifier.list_active_branches(self.host.as_ref()).await {
            Ok(branches) => branches,
            Err(e) => {
                warn!(error = %e, "Could not list branches; only pull request runs are deduplicated");
                report.failures += 1;
                Vec::new()
            }
        };

        let queued = self.runs_query().status(WorkflowRunStatus::Queued);
        let mut queries: Vec<(String, WorkflowRunQuery)> = branches
            .iter()
            .map(|b| (b.name.clone(), queued.clone().branch(&b.name)))
            .collect();
        queries.push((
            "pull requests".to_string(),
            queued.clone().event(WorkflowRunEvent::PullRequest),
        ));

        let listings: Vec<(String, Result<Vec<WorkflowRun>, GitHubError>)> = stream::iter(queries)
            .map(|(scope, query)| async move {
                let runs = self.collect_runs(&query).await;
                (scope, runs)
            })
            .buffered(self.settings.max_concurrent_reads.max(1))
            .collect()
            .await;

        let mut handled: HashSet<u64> = HashSet::new();
        for (scope, listing) in listings {
            let runs = match listing {
                Ok(runs) => runs,
                Err(e) => {
                    warn!(scope = %scope, error = %e, "Could not list queued workflow runs");
                    report.failures += 1;
                    continue;
                }
            };
            debug!(scope = %scope, queued = runs.len(), "Checking queued runs for duplicates");

            for run in duplicate_runs(&runs) {
                if !handled.insert(run.id) {
                    continue;
                }
                let outcome = self.cancel(run).await;
                Self::record_cancel(&mut report, run, outcome);
            }
        }
        report
    }

    async fn pull_request_runs(&self) -> Result<Vec<WorkflowRun>, GitHubError> {
        self.collect_runs(&self.runs_query().event(WorkflowRunEvent::PullRequest))
            .await
    }

    /// Cancel and remove pull request runs whose head branch has no open pull request.
    pub async fn cancel_orphaned_pull_request_runs(&self) -> PassReport {
        let mut report = PassReport::default();
        let (pull_requests, runs) = match self.pull_requests_and_runs().await {
            Some(found) => found,
            None => {
                report.failures += 1;
                return report;
            }
        };

        let open_heads: HashSet<&str> = pull_requests
            .iter()
            .map(|pr| pr.head_ref())
            .filter(|head| !head.is_empty())
            .collect();
        for run in runs.iter().filter(|r| !open_heads.contains(r.head_branch.as_str())) {
            info!(run = %run, "Removing workflow run without an open pull request");
            self.cancel_then_remove(run, &mut report).await;
        }
        report
    }

    /// Remove runs of pull requests opened by untrusted authors that lack the CI label.
    /// Runs with no open pull request are treated as orphans.
    pub async fn prune_untrusted_pull_request_runs(&self) -> PassReport {
        let mut report = PassReport::default();
        let (pull_requests, runs) = match self.pull_requests_and_runs().await {
            Some(found) => found,
            None => {
                report.failures += 1;
                return report;
            }
        };

        // Forks often share head refs (`patch-1`); the first listed pull request wins.
        let mut by_head: HashMap<&str, &PullRequest> = HashMap::with_capacity(pull_requests.len());
        for pr in pull_requests.iter().filter(|pr| !pr.head_ref().is_empty()) {
            by_head.entry(pr.head_ref()).or_insert(pr);
        }

        for run in &runs {
            match by_head.get(run.head_branch.as_str()) {
                None => {
                    info!(run = %run, "Removing workflow run without an open pull request");
                    self.cancel_then_remove(run, &mut report).await;
                }
                Some(pr)
                    if !self.settings.is_trusted_committer(pr.author())
                        && !pr.has_label(&self.settings.ci_label) =>
                {
                    info!(
                        run = %run,
                        pr_number = pr.number,
                        author = %pr.author(),
                        label = %self.settings.ci_label,
                        "Removing workflow run of untrusted pull request without the CI label"
                    );
                    self.cancel_then_remove(run, &mut report).await;
                }
                Some(_) => {}
            }
        }
        report
    }

    async fn pull_requests_and_runs(&self) -> Option<(Vec<PullRequest>, Vec<WorkflowRun>)> {
        let pull_requests = match self.open_pull_requests().await {
            Ok(prs) => prs,
            Err(e) => {
                warn!(error = %e, "Could not list open pull requests; skipping pull request runs");
                return None;
            }
        };
        match self.pull_request_runs().await {
            Ok(runs) => {
                debug!(
                    runs = runs.len(),
                    pull_requests = pull_requests.len(),
                    "Loaded pull request workflow runs"
                );
                Some((pull_requests, runs))
            }
            Err(e) => {
                warn!(error = %e, "Could not list pull request workflow runs");
                None
            }
        }
    }

    /// Purge runs past their retention window, scanning the configured number of pages
    /// from the last one back to the first.
    pub async fn purge_expired_runs_at(&self, now: DateTime<Utc>) -> PassReport {
        let mut report = PassReport::default();
        for page in (1..=self.settings.retention_scan_pages).rev() {
            let query = self.runs_query().page(page);
            let runs = match self.host.get_workflow_runs(&query).await {
                Ok(found) => found.content,
                Err(e) => {
                    warn!(page, error = %e, "Could not list workflow runs for retention");
                    report.failures += 1;
                    continue;
                }
            };
            debug!(page, runs = runs.len(), "Checking workflow runs for retention");

            for run in &runs {
                match retention_decision(run, now, &self.settings) {
                    RetentionDecision::Keep => {}
                    RetentionDecision::RemoveStale => {
                        info!(run = %run, updated_at = %run.updated_at, "Removing stale workflow run");
                        self.cancel_then_remove(run, &mut report).await;
                    }
                    RetentionDecision::RemoveExpiredSuccess => {
                        info!(run = %run, updated_at = %run.updated_at, "Removing expired successful workflow run");
                        let outcome = self.remove(run).await;
                        Self::record_removal(&mut report, run, outcome);
                    }
                    RetentionDecision::RemoveExpiredFailure => {
                        info!(run = %run, updated_at = %run.updated_at, "Removing expired unsuccessful workflow run");
                        let outcome = self.remove(run).await;
                        Self::record_removal(&mut report, run, outcome);
                    }
                }
            }
        }
        report
    }

    pub async fn purge_expired_runs(&self) -> PassReport {
        self.purge_expired_runs_at(Utc::now()).await
    }

    /// Remove every run that ended cancelled.
    pub async fn remove_cancelled_runs(&self) -> PassReport {
        let mut report = PassReport::default();
        let runs = match self
            .collect_runs(&self.runs_query().status(WorkflowRunStatus::Cancelled))
            .await
        {
            Ok(runs) => runs,
            Err(e) => {
                warn!(error = %e, "Could not list cancelled workflow runs");
                report.failures += 1;
                return report;
            }
        };

        info!(count = runs.len(), "Found cancelled workflow runs");
        for run in &runs {
            info!(run = %run, "Removing cancelled workflow run");
            let outcome = self.remove(run).await;
            Self::record_removal(&mut report, run, outcome);
        }
        report
    }

    /// Retention purge followed by the cancelled-run sweep.
    pub async fn purge_at(&self, now: DateTime<Utc>) -> PassReport {
        let mut report = self.purge_expired_runs_at(now).await;
        report.merge(self.remove_cancelled_runs().await);
        report
    }

    pub async fn purge(&self) -> PassReport {
        self.purge_at(Utc::now()).await
    }

    /// Every policy in order, as of `now`.
    pub async fn run_pass_at(&self, now: DateTime<Utc>) -> PassReport {
        let mut report = self.cancel_duplicate_queued_runs().await;
        report.merge(self.cancel_orphaned_pull_request_runs().await);
        report.merge(self.prune_untrusted_pull_request_runs().await);
        report.merge(self.purge_at(now).await);

        info!(
            repository = %self.host.full_name(),
            cancelled = report.cancelled.len(),
            removed = report.removed.len(),
            failures = report.failures,
            "Governance pass complete"
        );
        report
    }

    pub async fn run_pass(&self) -> PassReport {
        self.run_pass_at(Utc::now()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::github::types::WorkflowRunConclusion;
    use crate::github::{HostAction, InMemoryHost, MockVersionControlHost, Page};
    use std::collections::BTreeSet;

    fn now() -> DateTime<Utc> {
        "2024-06-01T12:00:00Z".parse().unwrap()
    }

    fn run(
        id: u64,
        name: &str,
        branch: &str,
        number: u64,
        event: WorkflowRunEvent,
        status: WorkflowRunStatus,
        age_days: i64,
    ) -> WorkflowRun {
        WorkflowRun::new(
            id,
            name,
            branch,
            number,
            event,
            status,
            now() - Duration::days(age_days),
        )
    }

    fn settings() -> Arc<GovernanceSettings> {
        Arc::new(GovernanceSettings {
            trusted_committers: BTreeSet::from(["alice".to_string()]),
            retention_scan_pages: 3,
            runs_per_page: 5,
            ..GovernanceSettings::default()
        })
    }

    fn governor(host: &Arc<InMemoryHost>) -> WorkflowRunGovernor {
        WorkflowRunGovernor::new(host.clone(), settings())
    }

    #[test]
    fn test_duplicates_keep_highest_run_number() {
        let runs = vec![
            run(1, "build", "master", 5, WorkflowRunEvent::Push, WorkflowRunStatus::Queued, 0),
            run(2, "build", "master", 7, WorkflowRunEvent::Push, WorkflowRunStatus::Queued, 0),
            run(3, "docs", "master", 6, WorkflowRunEvent::Push, WorkflowRunStatus::Queued, 0),
        ];
        let ids: Vec<u64> = duplicate_runs(&runs).iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![1]);
    }

    #[test]
    fn test_retention_tiers() {
        let settings = GovernanceSettings::default();
        let push = |age, conclusion| {
            run(1, "build", "master", 1, WorkflowRunEvent::Push, WorkflowRunStatus::Completed, age)
                .concluded(conclusion)
        };

        assert_eq!(
            retention_decision(&push(31, WorkflowRunConclusion::Failure), now(), &settings),
            RetentionDecision::RemoveStale
        );
        assert_eq!(
            retention_decision(&push(8, WorkflowRunConclusion::Success), now(), &settings),
            RetentionDecision::RemoveExpiredSuccess
        );
        assert_eq!(
            retention_decision(&push(8, WorkflowRunConclusion::Failure), now(), &settings),
            RetentionDecision::Keep
        );
        assert_eq!(
            retention_decision(&push(15, WorkflowRunConclusion::Failure), now(), &settings),
            RetentionDecision::RemoveExpiredFailure
        );

        let pr = run(2, "build", "fix", 1, WorkflowRunEvent::PullRequest, WorkflowRunStatus::Completed, 29)
            .concluded(WorkflowRunConclusion::Success);
        assert_eq!(retention_decision(&pr, now(), &settings), RetentionDecision::Keep);
    }

    #[tokio::test]
    async fn test_dedup_cancels_older_queued_run_once() {
        let host = Arc::new(InMemoryHost::default());
        host.add_branch("feature", "sha");
        host.add_pull_request(PullRequest::new(1, "feature", "alice"));
        host.add_runs([
            run(10, "build", "feature", 5, WorkflowRunEvent::PullRequest, WorkflowRunStatus::Queued, 0),
            run(11, "build", "feature", 7, WorkflowRunEvent::PullRequest, WorkflowRunStatus::Queued, 0),
        ]);

        let report = governor(&host).cancel_duplicate_queued_runs().await;
        assert_eq!(report.cancelled, vec![10]);
        assert_eq!(report.failures, 0);
        assert_eq!(host.actions(), vec![HostAction::Cancelled(10)]);
        assert!(host.run(11).unwrap().is_active());
    }

    #[tokio::test]
    async fn test_orphaned_run_is_cancelled_then_removed() {
        let host = Arc::new(InMemoryHost::default());
        host.add_pull_request(PullRequest::new(1, "open-branch", "bob"));
        host.add_runs([
            run(20, "build", "gone-branch", 1, WorkflowRunEvent::PullRequest, WorkflowRunStatus::InProgress, 0),
            run(21, "build", "open-branch", 1, WorkflowRunEvent::PullRequest, WorkflowRunStatus::InProgress, 0),
        ]);

        let report = governor(&host).cancel_orphaned_pull_request_runs().await;
        assert_eq!(report.cancelled, vec![20]);
        assert_eq!(report.removed, vec![20]);
        assert_eq!(
            host.actions(),
            vec![HostAction::Cancelled(20), HostAction::Removed(20)]
        );
    }

    #[tokio::test]
    async fn test_failed_cancel_does_not_block_removal() {
        let host = Arc::new(InMemoryHost::default());
        host.add_run(run(30, "build", "gone", 1, WorkflowRunEvent::PullRequest, WorkflowRunStatus::Queued, 0));
        host.fail_cancel_of(30);

        let report = governor(&host).cancel_orphaned_pull_request_runs().await;
        assert_eq!(report.failures, 1);
        assert_eq!(report.removed, vec![30]);
    }

    #[tokio::test]
    async fn test_untrusted_runs_without_label_are_removed() {
        let host = Arc::new(InMemoryHost::default());
        host.add_pull_request(PullRequest::new(1, "trusted", "alice"));
        host.add_pull_request(
            PullRequest::new(2, "labelled", "mallory").with_labels(&["ci"]),
        );
        host.add_pull_request(PullRequest::new(3, "untrusted", "mallory"));
        host.add_runs([
            run(40, "build", "trusted", 1, WorkflowRunEvent::PullRequest, WorkflowRunStatus::Completed, 0),
            run(41, "build", "labelled", 1, WorkflowRunEvent::PullRequest, WorkflowRunStatus::Completed, 0),
            run(42, "build", "untrusted", 1, WorkflowRunEvent::PullRequest, WorkflowRunStatus::Completed, 0),
        ]);

        let report = governor(&host).prune_untrusted_pull_request_runs().await;
        assert_eq!(report.removed, vec![42]);
        assert!(report.cancelled.is_empty());
    }

    #[tokio::test]
    async fn test_retention_scan_reads_last_page_first() {
        let mut mock = MockVersionControlHost::new();
        let mut sequence = mockall::Sequence::new();
        for page in [3u32, 2, 1] {
            mock.expect_get_workflow_runs()
                .withf(move |q| q.page == page)
                .times(1)
                .in_sequence(&mut sequence)
                .returning(|_| Ok(Page::last(Vec::new())));
        }

        let governor = WorkflowRunGovernor::new(Arc::new(mock), settings());
        let report = governor.purge_expired_runs_at(now()).await;
        assert!(report.is_noop());
        assert_eq!(report.failures, 0);
    }

    #[tokio::test]
    async fn test_pull_request_listing_failure_removes_nothing() {
        let mut mock = MockVersionControlHost::new();
        mock.expect_full_name().return_const("octo/repo".to_string());
        mock.expect_get_pull_requests().returning(|_| {
            Err(GitHubError::Server {
                status: 502,
                message: "bad gateway".to_string(),
            })
        });
        mock.expect_remove_workflow_run().never();
        mock.expect_cancel_workflow_run().never();

        let governor = WorkflowRunGovernor::new(Arc::new(mock), settings());
        let report = governor.cancel_orphaned_pull_request_runs().await;
        assert_eq!(report.failures, 1);
        assert!(report.is_noop());
    }

    #[tokio::test]
    async fn test_already_finished_cancel_is_not_a_failure() {
        let host = Arc::new(InMemoryHost::default());
        let stale = run(50, "build", "gone", 1, WorkflowRunEvent::PullRequest, WorkflowRunStatus::Queued, 0);
        host.add_run(stale.clone());
        host.cancel_workflow_run(&stale).await.unwrap();
        host.clear_actions();

        // The listing copy still says queued; the host reports a conflict.
        let governor = governor(&host);
        let mut report = PassReport::default();
        governor.cancel_then_remove(&stale, &mut report).await;
        assert_eq!(report.failures, 0);
        assert!(report.cancelled.is_empty());
        assert_eq!(report.removed, vec![50]);
    }

    #[tokio::test]
    async fn test_shared_head_ref_uses_first_listed_pull_request() {
        let host = Arc::new(InMemoryHost::default());
        host.add_pull_request(PullRequest::new(1, "patch-1", "alice"));
        host.add_pull_request(PullRequest::new(2, "patch-1", "mallory"));
        host.add_run(run(60, "build", "patch-1", 1, WorkflowRunEvent::PullRequest, WorkflowRunStatus::Completed, 0));

        let report = governor(&host).prune_untrusted_pull_request_runs().await;
        assert!(report.is_noop(), "unexpected report: {report:?}");
        assert!(host.run(60).is_some());
    }

    #[tokio::test]
    async fn test_removal_conflict_counts_as_failure() {
        let mut mock = MockVersionControlHost::new();
        mock.expect_full_name().return_const("octo/repo".to_string());
        mock.expect_get_pull_requests()
            .returning(|_| Ok(Page::last(Vec::new())));
        mock.expect_get_workflow_runs().returning(|_| {
            Ok(Page::last(vec![WorkflowRun::new(
                70,
                "build",
                "gone",
                1,
                WorkflowRunEvent::PullRequest,
                WorkflowRunStatus::InProgress,
                now(),
            )]))
        });
        mock.expect_cancel_workflow_run().times(1).returning(|_| Ok(()));
        mock.expect_remove_workflow_run().times(1).returning(|_| {
            Err(GitHubError::Conflict(
                "Cannot delete a workflow run that is not completed".to_string(),
            ))
        });

        let governor = WorkflowRunGovernor::new(Arc::new(mock), settings());
        let report = governor.cancel_orphaned_pull_request_runs().await;
        assert_eq!(report.cancelled, vec![70]);
        assert!(report.removed.is_empty());
        assert_eq!(report.failures, 1);
    }

    #[test]
    fn test_huge_retention_window_never_expires() {
        let settings = GovernanceSettings {
            stale_run_retention_days: 1_000_000_000_000_000,
            success_retention_days: i64::MAX,
            failure_retention_days: i64::MAX,
            ..GovernanceSettings::default()
        };
        let old = run(1, "build", "master", 1, WorkflowRunEvent::Push, WorkflowRunStatus::Completed, 400)
            .concluded(WorkflowRunConclusion::Success);
        assert_eq!(retention_decision(&old, now(), &settings), RetentionDecision::Keep);
    }

    #[test]
    fn test_runs_without_head_branch_are_not_grouped() {
        let runs = vec![
            run(1, "build", "", 1, WorkflowRunEvent::PullRequest, WorkflowRunStatus::Queued, 0),
            run(2, "build", "", 2, WorkflowRunEvent::PullRequest, WorkflowRunStatus::Queued, 0),
        ];
        assert!(duplicate_runs(&runs).is_empty());
    }
}
