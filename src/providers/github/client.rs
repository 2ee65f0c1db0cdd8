use log::debug;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use url::Url;

use crate::auth::Token;
use crate::error::{ActionLensError, Result};

use super::types::{
    GitHubContent, GitHubJob, GitHubWorkflow, GitHubWorkflowRun, WorkflowJobsResponse,
    WorkflowRunsResponse, WorkflowsResponse,
};

pub(super) const PAGE_SIZE: usize = 100;

/// GitHub REST client scoped to a single repository.
///
/// Requests are never retried. A non-2xx answer becomes
/// [`ActionLensError::ApiError`] carrying the upstream body.
pub struct GitHubClient {
    client: Client,
    api_url: Url,
    owner: String,
    repo: String,
    token: Option<Token>,
    semaphore: Arc<Semaphore>,
}

impl GitHubClient {
    /// Create a new GitHub API client.
    ///
    /// # Arguments
    ///
    /// * `base_url` - GitHub API base URL (e.g., "https://api.github.com")
    /// * `owner` - Repository owner/organization
    /// * `repo` - Repository name
    /// * `token` - Optional GitHub personal access token
    /// * `max_concurrent_requests` - Upper bound on in-flight requests
    /// * `timeout` - Optional per-request timeout
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built or the base URL is invalid.
    pub fn new(
        base_url: &str,
        owner: String,
        repo: String,
        token: Option<Token>,
        max_concurrent_requests: usize,
        timeout: Option<Duration>,
    ) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/vnd.github+json"));
        headers.insert(
            "x-github-api-version",
            HeaderValue::from_static("2022-11-28"),
        );

        let mut builder = Client::builder()
            .user_agent(concat!("actionlens/", env!("CARGO_PKG_VERSION")))
            .default_headers(headers);
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        let client = builder
            .build()
            .map_err(|e| ActionLensError::Config(format!("Failed to create HTTP client: {e}")))?;

        // Keep any path prefix (GitHub Enterprise serves the API under /api/v3)
        let normalized = format!("{}/", base_url.trim_end_matches('/'));
        let api_url = Url::parse(&normalized)
            .map_err(|e| ActionLensError::Config(format!("Invalid base URL: {e}")))?;

        Ok(Self {
            client,
            api_url,
            owner,
            repo,
            token,
            semaphore: Arc::new(Semaphore::new(max_concurrent_requests.max(1))),
        })
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn repo(&self) -> &str {
        &self.repo
    }

    /// Helper to build authenticated requests
    fn auth_request(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        if let Some(token) = &self.token {
            request.bearer_auth(token.as_str())
        } else {
            request
        }
    }

    /// Construct a URL below `repos/{owner}/{repo}/`
    fn repo_url(&self, path: &str) -> Result<Url> {
        self.api_url
            .join(&format!("repos/{}/{}/{}", self.owner, self.repo, path))
            .map_err(|e| ActionLensError::Config(format!("Invalid repository URL: {e}")))
    }

    async fn get_json<T>(&self, url: Url, query: &[(&str, String)]) -> Result<T>
    where
        T: DeserializeOwned,
    {
        let _permit = self
            .semaphore
            .acquire()
            .await
            .map_err(|e| ActionLensError::Config(format!("Request limiter closed: {e}")))?;

        debug!("GET {url}");

        let response = self
            .auth_request(self.client.get(url).query(query))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error response".to_string());
            return Err(ActionLensError::ApiError {
                status: status.as_u16(),
                message: error_text,
            });
        }

        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }

    /// Fetch every workflow defined in the repository.
    pub async fn list_workflows(&self) -> Result<Vec<GitHubWorkflow>> {
        let url = self.repo_url("actions/workflows")?;
        let mut all_workflows = Vec::new();
        let mut page = 1;

        loop {
            let response: WorkflowsResponse = self
                .get_json(
                    url.clone(),
                    &[
                        ("per_page", PAGE_SIZE.to_string()),
                        ("page", page.to_string()),
                    ],
                )
                .await?;

            let page_len = response.workflows.len();
            all_workflows.extend(response.workflows);

            if page_len < PAGE_SIZE || all_workflows.len() >= response.total_count {
                break;
            }

            page += 1;
        }

        Ok(all_workflows)
    }

    /// Fetch a file from the default branch through the contents API.
    pub async fn fetch_file_content(&self, path: &str) -> Result<GitHubContent> {
        let url = self.repo_url(&format!("contents/{}", path.trim_start_matches('/')))?;
        self.get_json(url, &[]).await
    }

    /// Fetch the most recent runs of one workflow, newest first.
    pub async fn list_workflow_runs(
        &self,
        workflow_id: u64,
        per_page: usize,
    ) -> Result<Vec<GitHubWorkflowRun>> {
        let url = self.repo_url(&format!("actions/workflows/{workflow_id}/runs"))?;
        let response: WorkflowRunsResponse = self
            .get_json(url, &[("per_page", per_page.min(PAGE_SIZE).to_string())])
            .await?;

        Ok(response.workflow_runs)
    }

    /// Fetch the jobs of a workflow run.
    pub async fn list_run_jobs(&self, run_id: u64) -> Result<Vec<GitHubJob>> {
        let url = self.repo_url(&format!("actions/runs/{run_id}/jobs"))?;
        let response: WorkflowJobsResponse = self
            .get_json(url, &[("per_page", PAGE_SIZE.to_string())])
            .await?;

        Ok(response.jobs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base_url: &str) -> GitHubClient {
        GitHubClient::new(
            base_url,
            "octo".to_string(),
            "demo".to_string(),
            None,
            1,
            None,
        )
        .unwrap()
    }

    #[test]
    fn test_repo_url_on_public_api() {
        let url = client("https://api.github.com")
            .repo_url("actions/workflows")
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://api.github.com/repos/octo/demo/actions/workflows"
        );
    }

    #[test]
    fn test_repo_url_keeps_enterprise_prefix() {
        let url = client("https://github.example.com/api/v3/")
            .repo_url("actions/runs/42/jobs")
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://github.example.com/api/v3/repos/octo/demo/actions/runs/42/jobs"
        );
    }

    #[test]
    fn test_invalid_base_url() {
        let result = GitHubClient::new(
            "not a url",
            "octo".to_string(),
            "demo".to_string(),
            None,
            1,
            None,
        );
        assert!(matches!(result, Err(ActionLensError::Config(_))));
    }
}
