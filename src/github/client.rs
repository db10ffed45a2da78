use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use governor::{DefaultDirectRateLimiter, Jitter, Quota, RateLimiter};
use octocrab::Octocrab;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::future::Future;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use super::errors::GitHubError;
use super::host::VersionControlHost;
use super::page::{Page, DEFAULT_PER_PAGE};
use super::retry::GitHubRetryHandler;
use super::types::{
    Branch, CheckRun, CheckRunQuery, CombinedCommitStatus, Comment, Commit, CommitStatus, Label,
    MergeRequest, Milestone, NewCheckRun, NewCommitStatus, PullRequest, PullRequestFile,
    WorkflowRun, WorkflowRunQuery,
};
use crate::config::GitHubConfig;

/// GitHub REST client for one repository: rate limited, time boxed and retried.
#[derive(Debug)]
pub struct GitHubClient {
    octocrab: Octocrab,
    owner: String,
    repo: String,
    rate_limiter: Arc<DefaultDirectRateLimiter>,
    retry_handler: GitHubRetryHandler,
}

#[derive(Debug, Serialize)]
struct PageQuery<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    state: Option<&'a str>,
    per_page: u32,
    page: u32,
}

impl<'a> PageQuery<'a> {
    fn new(page: u32) -> Self {
        Self {
            state: None,
            per_page: DEFAULT_PER_PAGE,
            page,
        }
    }

    fn open(page: u32) -> Self {
        Self {
            state: Some("open"),
            ..Self::new(page)
        }
    }
}

#[derive(Debug, Serialize)]
struct RunsQuery<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    branch: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    event: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    status: Option<&'static str>,
    per_page: u32,
    page: u32,
}

#[derive(Debug, Deserialize)]
struct WorkflowRunsResponse {
    total_count: u64,
    #[serde(default)]
    workflow_runs: Vec<WorkflowRun>,
}

#[derive(Debug, Deserialize)]
struct CheckRunsResponse {
    #[serde(default)]
    check_runs: Vec<CheckRun>,
}

#[derive(Debug, Deserialize)]
struct MergeResponse {
    #[serde(default)]
    merged: bool,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ContentsResponse {
    content: String,
    #[serde(default)]
    encoding: String,
}

impl GitHubClient {
    pub fn new(config: &GitHubConfig) -> Result<Self, GitHubError> {
        let token = config
            .token
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| {
                GitHubError::TokenNotFound(
                    "Set github.token, REPO_WARDEN__GITHUB__TOKEN or GITHUB_TOKEN".to_string(),
                )
            })?;

        if config.owner.trim().is_empty() || config.repo.trim().is_empty() {
            return Err(GitHubError::ConfigNotFound(
                "github.owner and github.repo must both be set".to_string(),
            ));
        }

        let mut builder = Octocrab::builder().personal_token(token.to_string());
        if let Some(base_uri) = config.api_base_url.as_deref() {
            builder = builder.base_uri(base_uri)?;
        }
        let octocrab = builder.build()?;

        let quota = Quota::per_hour(
            NonZeroU32::new(config.rate_limit.requests_per_hour).unwrap_or(NonZeroU32::MIN),
        )
        .allow_burst(NonZeroU32::new(config.rate_limit.burst_capacity).unwrap_or(NonZeroU32::MIN));

        Ok(Self {
            octocrab,
            owner: config.owner.clone(),
            repo: config.repo.clone(),
            rate_limiter: Arc::new(RateLimiter::direct(quota)),
            retry_handler: GitHubRetryHandler::new(config.retry.clone(), config.request_timeout()),
        })
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn repo(&self) -> &str {
        &self.repo
    }

    fn route(&self, suffix: &str) -> String {
        format!("/repos/{}/{}/{}", self.owner, self.repo, suffix)
    }

    /// Wait for the rate limiter, then run one API call with timeout and retry.
    async fn call<T, F, Fut>(&self, operation: &str, request: F) -> Result<T, GitHubError>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, octocrab::Error>>,
    {
        let limiter = &self.rate_limiter;
        let request = &request;
        self.retry_handler
            .execute_with_retry(operation, move || async move {
                limiter
                    .until_ready_with_jitter(Jitter::up_to(Duration::from_millis(100)))
                    .await;
                request().await.map_err(GitHubError::from)
            })
            .await
    }

    async fn get_json<T, P>(
        &self,
        operation: &str,
        route: &str,
        params: Option<&P>,
    ) -> Result<T, GitHubError>
    where
        T: DeserializeOwned,
        P: Serialize + ?Sized + Sync,
    {
        debug!(operation, route, "GET");
        self.call(operation, move || self.octocrab.get(route, params))
            .await
    }

    async fn post_json<T, B>(&self, operation: &str, route: &str, body: &B) -> Result<T, GitHubError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized + Sync,
    {
        debug!(operation, route, "POST");
        self.call(operation, move || self.octocrab.post(route, Some(body)))
            .await
    }

    /// POST for endpoints that may answer without a JSON body. Returns the HTTP status.
    async fn post_for_status<B>(&self, operation: &str, route: &str, body: &B) -> Result<u16, GitHubError>
    where
        B: Serialize + ?Sized + Sync,
    {
        debug!(operation, route, "POST");
        self.call(operation, move || async move {
            let response = self.octocrab._post(route.to_string(), Some(body)).await?;
            let response = octocrab::map_github_error(response).await?;
            Ok(response.status().as_u16())
        })
        .await
    }

    async fn delete_for_status(&self, operation: &str, route: &str) -> Result<u16, GitHubError> {
        debug!(operation, route, "DELETE");
        self.call(operation, move || async move {
            let response = self
                .octocrab
                ._delete(route.to_string(), None::<&()>)
                .await?;
            let response = octocrab::map_github_error(response).await?;
            Ok(response.status().as_u16())
        })
        .await
    }

    async fn list<T>(&self, operation: &str, route: &str, query: &PageQuery<'_>) -> Result<Page<T>, GitHubError>
    where
        T: DeserializeOwned,
    {
        let items: Vec<T> = self.get_json(operation, route, Some(query)).await?;
        Ok(Page::from_items(items, query.page, query.per_page))
    }
}

#[async_trait]
impl VersionControlHost for GitHubClient {
    fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.repo)
    }

    async fn get_branches(&self, page: u32) -> Result<Page<Branch>, GitHubError> {
        self.list("get_branches", &self.route("branches"), &PageQuery::new(page))
            .await
    }

    async fn get_milestones(&self, page: u32) -> Result<Page<Milestone>, GitHubError> {
        self.list("get_milestones", &self.route("milestones"), &PageQuery::open(page))
            .await
    }

    async fn get_labels(&self, page: u32) -> Result<Page<Label>, GitHubError> {
        self.list("get_labels", &self.route("labels"), &PageQuery::new(page))
            .await
    }

    async fn get_pull_requests(&self, page: u32) -> Result<Page<PullRequest>, GitHubError> {
        self.list("get_pull_requests", &self.route("pulls"), &PageQuery::open(page))
            .await
    }

    async fn get_pull_request(&self, number: u64) -> Result<Option<PullRequest>, GitHubError> {
        let route = self.route(&format!("pulls/{number}"));
        match self.get_json("get_pull_request", &route, None::<&()>).await {
            Ok(pr) => Ok(Some(pr)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn get_pull_request_files(
        &self,
        number: u64,
        page: u32,
    ) -> Result<Page<PullRequestFile>, GitHubError> {
        let route = self.route(&format!("pulls/{number}/files"));
        self.list("get_pull_request_files", &route, &PageQuery::new(page))
            .await
    }

    async fn get_pull_request_commits(
        &self,
        number: u64,
        page: u32,
    ) -> Result<Page<Commit>, GitHubError> {
        let route = self.route(&format!("pulls/{number}/commits"));
        self.list("get_pull_request_commits", &route, &PageQuery::new(page))
            .await
    }

    async fn get_comments(&self, number: u64, page: u32) -> Result<Page<Comment>, GitHubError> {
        let route = self.route(&format!("issues/{number}/comments"));
        self.list("get_comments", &route, &PageQuery::new(page))
            .await
    }

    async fn remove_comment(&self, comment_id: u64) -> Result<(), GitHubError> {
        let route = self.route(&format!("issues/comments/{comment_id}"));
        self.delete_for_status("remove_comment", &route).await?;
        info!(comment_id, "Deleted comment");
        Ok(())
    }

    async fn get_commit(&self, git_ref: &str) -> Result<Commit, GitHubError> {
        let route = self.route(&format!("commits/{git_ref}"));
        self.get_json("get_commit", &route, None::<&()>).await
    }

    async fn get_check_runs_for(
        &self,
        sha: &str,
        query: &CheckRunQuery,
    ) -> Result<Vec<CheckRun>, GitHubError> {
        let route = self.route(&format!("commits/{sha}/check-runs"));
        let response: CheckRunsResponse = self.get_json("get_check_runs_for", &route, Some(query)).await?;
        Ok(response.check_runs)
    }

    async fn create_check_run(&self, check_run: &NewCheckRun) -> Result<(), GitHubError> {
        let route = self.route("check-runs");
        let _: serde_json::Value = self.post_json("create_check_run", &route, check_run).await?;
        Ok(())
    }

    async fn create_status(&self, sha: &str, status: &NewCommitStatus) -> Result<(), GitHubError> {
        let route = self.route(&format!("statuses/{sha}"));
        let _: serde_json::Value = self.post_json("create_status", &route, status).await?;
        Ok(())
    }

    async fn get_commit_statuses(
        &self,
        sha: &str,
        page: u32,
    ) -> Result<Page<CommitStatus>, GitHubError> {
        let route = self.route(&format!("commits/{sha}/statuses"));
        self.list("get_commit_statuses", &route, &PageQuery::new(page))
            .await
    }

    async fn get_combined_commit_status(
        &self,
        sha: &str,
    ) -> Result<CombinedCommitStatus, GitHubError> {
        let route = self.route(&format!("commits/{sha}/status"));
        self.get_json("get_combined_commit_status", &route, None::<&()>).await
    }

    async fn get_workflow_runs(
        &self,
        query: &WorkflowRunQuery,
    ) -> Result<Page<WorkflowRun>, GitHubError> {
        let params = RunsQuery {
            branch: query.branch.as_deref(),
            event: query.event.map(|e| e.as_str()),
            status: query.status.map(|s| s.as_str()),
            per_page: query.per_page,
            page: query.page,
        };
        let response: WorkflowRunsResponse = self
            .get_json("get_workflow_runs", &self.route("actions/runs"), Some(&params))
            .await?;
        debug!(
            page = query.page,
            total_count = response.total_count,
            returned = response.workflow_runs.len(),
            "Fetched workflow runs"
        );
        Ok(Page::from_total(
            response.workflow_runs,
            query.page,
            query.per_page,
            response.total_count,
        ))
    }

    async fn cancel_workflow_run(&self, run: &WorkflowRun) -> Result<(), GitHubError> {
        let route = self.route(&format!("actions/runs/{}/cancel", run.id));
        self.post_for_status("cancel_workflow_run", &route, &json!({}))
            .await?;
        Ok(())
    }

    async fn remove_workflow_run(&self, run: &WorkflowRun) -> Result<(), GitHubError> {
        let route = self.route(&format!("actions/runs/{}", run.id));
        self.delete_for_status("remove_workflow_run", &route).await?;
        Ok(())
    }

    async fn merge_with_base(&self, pr: &PullRequest) -> Result<PullRequest, GitHubError> {
        let route = self.route(&format!("pulls/{}/update-branch", pr.number));
        let body = json!({ "expected_head_sha": pr.head_sha() });
        let _: serde_json::Value = self
            .call("merge_with_base", || {
                self.octocrab.put(route.as_str(), Some(&body))
            })
            .await?;
        info!(pr_number = pr.number, base = pr.base_ref(), "Merged base branch into pull request");

        self.get_pull_request(pr.number)
            .await?
            .ok_or_else(|| GitHubError::NotFound(format!("pull request #{}", pr.number)))
    }

    async fn merge_into_base(
        &self,
        pr: &PullRequest,
        request: &MergeRequest,
    ) -> Result<bool, GitHubError> {
        let route = self.route(&format!("pulls/{}/merge", pr.number));
        let response: MergeResponse = self
            .call("merge_into_base", || {
                self.octocrab.put(route.as_str(), Some(request))
            })
            .await?;
        if !response.merged {
            debug!(
                pr_number = pr.number,
                message = response.message.as_deref().unwrap_or_default(),
                "Merge declined"
            );
        }
        Ok(response.merged)
    }

    async fn add_label(&self, number: u64, label: &str) -> Result<(), GitHubError> {
        let route = self.route(&format!("issues/{number}/labels"));
        let _: serde_json::Value = self
            .post_json("add_label", &route, &json!({ "labels": [label] }))
            .await?;
        Ok(())
    }

    async fn remove_label(&self, number: u64, label: &str) -> Result<(), GitHubError> {
        let route = self.route(&format!(
            "issues/{number}/labels/{}",
            urlencoding::encode(label)
        ));
        self.delete_for_status("remove_label", &route).await?;
        Ok(())
    }

    async fn add_comment(&self, number: u64, body: &str) -> Result<Comment, GitHubError> {
        let route = self.route(&format!("issues/{number}/comments"));
        self.post_json("add_comment", &route, &json!({ "body": body }))
            .await
    }

    async fn close_pull_request(&self, number: u64) -> Result<(), GitHubError> {
        let route = self.route(&format!("pulls/{number}"));
        let body = json!({ "state": "closed" });
        let _: serde_json::Value = self
            .call("close_pull_request", || {
                self.octocrab.patch(route.as_str(), Some(&body))
            })
            .await?;
        Ok(())
    }

    async fn get_file_contents(&self, path: &str, git_ref: &str) -> Result<String, GitHubError> {
        #[derive(Serialize)]
        struct RefQuery<'a> {
            #[serde(rename = "ref")]
            git_ref: &'a str,
        }

        let route = self.route(&format!("contents/{}", path.trim_start_matches('/')));
        let response: ContentsResponse = self
            .get_json("get_file_contents", &route, Some(&RefQuery { git_ref }))
            .await?;
        if response.encoding != "base64" {
            return Err(GitHubError::InvalidResponse(format!(
                "unsupported content encoding '{}' for {path}",
                response.encoding
            )));
        }
        let cleaned: String = response
            .content
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect();
        let bytes = STANDARD
            .decode(cleaned)
            .map_err(|e| GitHubError::InvalidResponse(format!("{path}: {e}")))?;
        String::from_utf8(bytes).map_err(|e| GitHubError::InvalidResponse(format!("{path}: {e}")))
    }
}
