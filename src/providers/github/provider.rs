use chrono::{FixedOffset, Utc};
use futures::stream::{self, StreamExt, TryStreamExt};
use log::{debug, info};
use std::time::Duration;

use crate::auth::Token;
use crate::config::{Config, MAX_RECENT_RUNS};
use crate::error::Result;
use crate::metrics::{
    format_provider_time, seconds_between, MetricsAccumulator, RunSummary, ScheduleSpec,
    WorkflowMetricsReport, WorkflowSummary,
};

use super::client::GitHubClient;
use super::schedule::schedule_from_content;
use super::types::{GitHubJob, GitHubWorkflow, GitHubWorkflowRun};

/// Collects GitHub Actions workflow metrics for one repository.
///
/// Every call to [`GitHubProvider::collect_metrics`] re-fetches everything;
/// nothing is cached between calls.
pub struct GitHubProvider {
    client: GitHubClient,
    runs_per_workflow: usize,
    recent_runs: usize,
    max_concurrent_requests: usize,
    display_offset: FixedOffset,
}

impl GitHubProvider {
    /// Create a new GitHub Actions provider.
    ///
    /// # Arguments
    ///
    /// * `client` - Repository-scoped API client
    /// * `runs_per_workflow` - Runs fetched per workflow for aggregation (max 100)
    /// * `recent_runs` - Runs kept per workflow in the report (capped at 5)
    /// * `max_concurrent_requests` - Job fetches allowed in flight per workflow
    /// * `display_offset` - Timezone used for formatted timestamps
    pub fn new(
        client: GitHubClient,
        runs_per_workflow: usize,
        recent_runs: usize,
        max_concurrent_requests: usize,
        display_offset: FixedOffset,
    ) -> Self {
        Self {
            client,
            runs_per_workflow,
            recent_runs: recent_runs.min(MAX_RECENT_RUNS),
            max_concurrent_requests: max_concurrent_requests.max(1),
            display_offset,
        }
    }

    /// Builds a provider from the resolved configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if owner/repo are missing, the display offset is
    /// invalid or the HTTP client cannot be created.
    pub fn from_config(config: &Config) -> Result<Self> {
        let github = &config.github;
        let (owner, repo) = github.repository()?;
        let token = Token::from_optional(github.token.as_deref());

        if token.is_none() {
            info!("No GitHub token configured, using unauthenticated requests");
        }

        let client = GitHubClient::new(
            &github.base_url,
            owner,
            repo,
            token,
            github.max_concurrent_requests,
            github.request_timeout_secs.map(Duration::from_secs),
        )?;

        Ok(Self::new(
            client,
            github.effective_runs_per_workflow(),
            github.effective_recent_runs(),
            github.max_concurrent_requests,
            config.display.offset()?,
        ))
    }

    pub fn repository(&self) -> String {
        format!("{}/{}", self.client.owner(), self.client.repo())
    }

    /// Fetches workflows, their schedules, runs and jobs, and aggregates them.
    ///
    /// Workflows are processed one after another. The first failing request
    /// aborts the whole collection and nothing gathered so far is returned.
    ///
    /// # Errors
    ///
    /// Returns an error if any GitHub API request fails or returns an
    /// unexpected payload.
    pub async fn collect_metrics(&self) -> Result<WorkflowMetricsReport> {
        info!(
            "Starting workflow metrics collection for GitHub repository: {}",
            self.repository()
        );

        let workflows = self.client.list_workflows().await?;
        info!("Fetched {} workflows", workflows.len());

        let mut accumulator = MetricsAccumulator::default();
        let mut summaries = Vec::with_capacity(workflows.len());

        for workflow in workflows {
            let summary = self.collect_workflow(workflow, &mut accumulator).await?;
            summaries.push(summary);
        }

        info!(
            "Aggregated {} runs and {} jobs across {} workflows",
            accumulator.total_runs(),
            accumulator.total_jobs(),
            summaries.len()
        );

        let metrics = accumulator.finish(Utc::now().with_timezone(&self.display_offset));

        Ok(WorkflowMetricsReport {
            metrics,
            workflows: summaries,
        })
    }

    async fn collect_workflow(
        &self,
        workflow: GitHubWorkflow,
        accumulator: &mut MetricsAccumulator,
    ) -> Result<WorkflowSummary> {
        debug!("Processing workflow {} ({})", workflow.name, workflow.path);

        let schedule = self.fetch_schedule(&workflow.path).await?;

        let runs = self
            .client
            .list_workflow_runs(workflow.id, self.runs_per_workflow)
            .await?;
        debug!("Workflow {} has {} recent runs", workflow.name, runs.len());

        let jobs_per_run = self.fetch_jobs(&runs).await?;

        for (run, jobs) in runs.iter().zip(jobs_per_run) {
            accumulator.record_run();
            let queue =
                seconds_between(run.created_at.as_deref(), run.run_started_at.as_deref());

            for job in jobs {
                let duration =
                    seconds_between(job.started_at.as_deref(), job.completed_at.as_deref());
                debug!(
                    "Run {} job {} ({}): {duration:.1}s, conclusion {:?}",
                    run.id, job.name, job.id, job.conclusion
                );
                accumulator.record_job(duration, queue, job.conclusion.as_deref());
            }
        }

        let prev_runs = runs
            .iter()
            .take(self.recent_runs)
            .map(|run| self.summarize_run(run))
            .collect();

        Ok(WorkflowSummary {
            id: workflow.id,
            name: workflow.name,
            path: workflow.path,
            state: workflow.state,
            next_runs: Vec::new(),
            prev_runs,
            schedule,
        })
    }

    async fn fetch_schedule(&self, path: &str) -> Result<ScheduleSpec> {
        let content = self.client.fetch_file_content(path).await?;
        let schedule = schedule_from_content(path, &content);
        if !schedule.is_empty() {
            debug!("Workflow {path} is scheduled: {:?}", schedule.crons);
        }
        Ok(schedule)
    }

    /// Fetches jobs for each run, keeping run order.
    ///
    /// With `max_concurrent_requests == 1` the runs are fetched strictly one
    /// after another.
    async fn fetch_jobs(&self, runs: &[GitHubWorkflowRun]) -> Result<Vec<Vec<GitHubJob>>> {
        let run_ids: Vec<u64> = runs.iter().map(|run| run.id).collect();

        stream::iter(run_ids)
            .map(|run_id| self.client.list_run_jobs(run_id))
            .buffered(self.max_concurrent_requests)
            .try_collect()
            .await
    }

    fn summarize_run(&self, run: &GitHubWorkflowRun) -> RunSummary {
        RunSummary {
            id: run.id,
            status: run.status.clone().unwrap_or_default(),
            conclusion: run.conclusion.clone(),
            created_at: format_provider_time(run.created_at.as_deref(), &self.display_offset),
            url: run.html_url.clone(),
        }
    }
}
