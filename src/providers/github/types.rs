use serde::Deserialize;

// Timestamps stay as raw strings: a missing or malformed value must turn into a
// zero duration later on, not into a deserialization failure for the whole page.

/// GitHub Actions workflow definition.
#[derive(Debug, Clone, Deserialize)]
pub struct GitHubWorkflow {
    /// Unique identifier for the workflow
    pub id: u64,
    /// Display name of the workflow
    pub name: String,
    /// Path to the workflow file (e.g. `.github/workflows/ci.yml`)
    pub path: String,
    /// `active`, `disabled_manually`, ...
    pub state: String,
}

/// GitHub Actions workflow run.
#[derive(Debug, Clone, Deserialize)]
pub struct GitHubWorkflowRun {
    /// Unique identifier for the workflow run
    pub id: u64,
    /// Status of the run (`queued`, `in_progress`, `completed`, ...)
    #[serde(default)]
    pub status: Option<String>,
    /// Conclusion of the run (success, failure, etc.)
    #[serde(default)]
    pub conclusion: Option<String>,
    /// When the run was created
    #[serde(default)]
    pub created_at: Option<String>,
    /// When the run actually started on a runner
    #[serde(default)]
    pub run_started_at: Option<String>,
    /// Link to the run in the GitHub web UI
    #[serde(default)]
    pub html_url: String,
}

/// Job within a GitHub Actions workflow run.
#[derive(Debug, Clone, Deserialize)]
pub struct GitHubJob {
    pub id: u64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub conclusion: Option<String>,
    #[serde(default)]
    pub started_at: Option<String>,
    #[serde(default)]
    pub completed_at: Option<String>,
}

/// File returned by the repository contents endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct GitHubContent {
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub encoding: String,
}

#[derive(Deserialize)]
pub(super) struct WorkflowsResponse {
    pub total_count: usize,
    pub workflows: Vec<GitHubWorkflow>,
}

#[derive(Deserialize)]
pub(super) struct WorkflowRunsResponse {
    pub workflow_runs: Vec<GitHubWorkflowRun>,
}

#[derive(Deserialize)]
pub(super) struct WorkflowJobsResponse {
    pub jobs: Vec<GitHubJob>,
}
