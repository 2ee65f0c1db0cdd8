use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};

/// Rendering used for every human-facing timestamp, e.g. `05 Mar 2024, 02:07 PM`.
pub const DISPLAY_TIME_FORMAT: &str = "%d %b %Y, %I:%M %p";

/// Body returned by the metrics endpoint and by `actionlens collect`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowMetricsReport {
    pub metrics: AggregateMetrics,
    pub workflows: Vec<WorkflowSummary>,
}

/// Aggregate figures over every job and run fetched in one collection.
///
/// Numbers are serialized as display strings with units (`"12.5s"`, `"40.0%"`);
/// the raw values stay available in `totals` for terminal rendering.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateMetrics {
    pub avg_run_time: String,
    pub avg_queue_time: String,
    pub failure_rate: String,
    pub failed_job_minutes: String,
    pub total_minutes: String,
    pub total_runs: usize,
    pub last_updated: String,
    #[serde(skip)]
    pub totals: MetricTotals,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetricTotals {
    /// `None` when no job was observed
    pub avg_run_seconds: Option<f64>,
    /// `None` when no job was observed
    pub avg_queue_seconds: Option<f64>,
    /// `None` when no run was observed
    pub failure_rate: Option<f64>,
    pub failed_minutes: f64,
    pub total_minutes: f64,
    pub failed_jobs: usize,
    pub total_jobs: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowSummary {
    pub id: u64,
    pub name: String,
    pub path: String,
    pub state: String,
    /// Always empty: next-run prediction from cron expressions is not computed.
    pub next_runs: Vec<String>,
    pub prev_runs: Vec<RunSummary>,
    #[serde(skip)]
    pub schedule: ScheduleSpec,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub id: u64,
    pub status: String,
    pub conclusion: Option<String>,
    pub created_at: String,
    pub url: String,
}

/// Cron triggers declared under `on.schedule` in a workflow file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScheduleSpec {
    pub crons: Vec<String>,
}

impl ScheduleSpec {
    pub fn is_empty(&self) -> bool {
        self.crons.is_empty()
    }
}

/// Running totals for a single collection.
///
/// One accumulator lives for exactly one request; it is consumed by
/// [`MetricsAccumulator::finish`].
#[derive(Debug, Default)]
pub struct MetricsAccumulator {
    job_durations: Vec<f64>,
    queue_times: Vec<f64>,
    total_seconds: f64,
    failed_seconds: f64,
    failed_jobs: usize,
    total_runs: usize,
}

impl MetricsAccumulator {
    pub fn record_run(&mut self) {
        self.total_runs += 1;
    }

    /// Records one job together with the queue time of the run it belongs to.
    ///
    /// Queue time is sampled per job, so a run with three jobs weighs three
    /// times as much as a run with one. Anything but an explicit `"success"`
    /// counts as failed, including jobs that have no conclusion yet.
    pub fn record_job(
        &mut self,
        duration_seconds: f64,
        queue_seconds: f64,
        conclusion: Option<&str>,
    ) {
        self.job_durations.push(duration_seconds);
        self.queue_times.push(queue_seconds);
        self.total_seconds += duration_seconds;

        if conclusion != Some("success") {
            self.failed_jobs += 1;
            self.failed_seconds += duration_seconds;
        }
    }

    pub fn total_runs(&self) -> usize {
        self.total_runs
    }

    pub fn total_jobs(&self) -> usize {
        self.job_durations.len()
    }

    pub fn finish(self, now: DateTime<FixedOffset>) -> AggregateMetrics {
        #[allow(clippy::cast_precision_loss)]
        let failure_rate = (self.total_runs > 0)
            .then(|| self.failed_jobs as f64 / self.total_runs as f64 * 100.0);

        let totals = MetricTotals {
            avg_run_seconds: mean(&self.job_durations),
            avg_queue_seconds: mean(&self.queue_times),
            failure_rate,
            failed_minutes: self.failed_seconds / 60.0,
            total_minutes: self.total_seconds / 60.0,
            failed_jobs: self.failed_jobs,
            total_jobs: self.job_durations.len(),
        };

        AggregateMetrics {
            avg_run_time: format_seconds(totals.avg_run_seconds),
            avg_queue_time: format_seconds(totals.avg_queue_seconds),
            failure_rate: format_percentage(totals.failure_rate),
            failed_job_minutes: format!("{:.1}", totals.failed_minutes),
            total_minutes: format!("{:.1}", totals.total_minutes),
            total_runs: self.total_runs,
            last_updated: now.format(DISPLAY_TIME_FORMAT).to_string(),
            totals,
        }
    }
}

#[allow(clippy::cast_precision_loss)]
fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }

    Some(values.iter().sum::<f64>() / values.len() as f64)
}

fn format_seconds(value: Option<f64>) -> String {
    value.map_or_else(|| "0s".to_string(), |secs| format!("{secs:.1}s"))
}

fn format_percentage(value: Option<f64>) -> String {
    value.map_or_else(|| "0%".to_string(), |rate| format!("{rate:.1}%"))
}

fn parse_timestamp(raw: Option<&str>) -> Option<DateTime<Utc>> {
    raw.and_then(|value| DateTime::parse_from_rfc3339(value).ok())
        .map(|ts| ts.with_timezone(&Utc))
}

/// Seconds elapsed from `start` to `end` (RFC 3339 strings).
///
/// Returns `0.0` when either side is missing or unparseable.
#[allow(clippy::cast_precision_loss)]
pub fn seconds_between(start: Option<&str>, end: Option<&str>) -> f64 {
    match (parse_timestamp(start), parse_timestamp(end)) {
        (Some(start), Some(end)) => (end - start).num_milliseconds() as f64 / 1000.0,
        _ => 0.0,
    }
}

pub fn format_display_time(ts: DateTime<Utc>, offset: &FixedOffset) -> String {
    ts.with_timezone(offset).format(DISPLAY_TIME_FORMAT).to_string()
}

/// Formats a provider timestamp for display, passing unparseable input through.
pub fn format_provider_time(raw: Option<&str>, offset: &FixedOffset) -> String {
    match parse_timestamp(raw) {
        Some(ts) => format_display_time(ts, offset),
        None => raw.unwrap_or_default().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn utc() -> FixedOffset {
        FixedOffset::east_opt(0).unwrap()
    }

    fn fixed_now() -> DateTime<FixedOffset> {
        utc().with_ymd_and_hms(2024, 3, 5, 14, 7, 0).unwrap()
    }

    #[test]
    fn test_seconds_between_valid() {
        let secs = seconds_between(Some("2024-03-05T10:00:00Z"), Some("2024-03-05T10:02:00Z"));
        assert!((secs - 120.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_seconds_between_missing_or_invalid_is_zero() {
        assert_eq!(seconds_between(None, Some("2024-03-05T10:00:00Z")), 0.0);
        assert_eq!(seconds_between(Some("2024-03-05T10:00:00Z"), None), 0.0);
        assert_eq!(seconds_between(None, None), 0.0);
        assert_eq!(seconds_between(Some("not a date"), Some("2024-03-05T10:00:00Z")), 0.0);
        assert_eq!(seconds_between(Some(""), Some("")), 0.0);
    }

    #[test]
    fn test_empty_accumulator() {
        let metrics = MetricsAccumulator::default().finish(fixed_now());

        assert_eq!(metrics.avg_run_time, "0s");
        assert_eq!(metrics.avg_queue_time, "0s");
        assert_eq!(metrics.failure_rate, "0%");
        assert_eq!(metrics.failed_job_minutes, "0.0");
        assert_eq!(metrics.total_minutes, "0.0");
        assert_eq!(metrics.total_runs, 0);
        assert_eq!(metrics.last_updated, "05 Mar 2024, 02:07 PM");
        assert_eq!(metrics.totals, MetricTotals::default());
    }

    #[test]
    fn test_single_successful_job() {
        let mut acc = MetricsAccumulator::default();
        acc.record_run();
        acc.record_job(120.0, 10.0, Some("success"));
        let metrics = acc.finish(fixed_now());

        assert_eq!(metrics.total_runs, 1);
        assert_eq!(metrics.avg_run_time, "120.0s");
        assert_eq!(metrics.avg_queue_time, "10.0s");
        assert_eq!(metrics.failure_rate, "0.0%");
        assert_eq!(metrics.total_minutes, "2.0");
        assert_eq!(metrics.failed_job_minutes, "0.0");
    }

    #[test]
    fn test_single_failed_job() {
        let mut acc = MetricsAccumulator::default();
        acc.record_run();
        acc.record_job(120.0, 10.0, Some("failure"));
        let metrics = acc.finish(fixed_now());

        assert_eq!(metrics.failure_rate, "100.0%");
        assert_eq!(metrics.failed_job_minutes, "2.0");
        assert_eq!(metrics.total_minutes, "2.0");
    }

    #[test]
    fn test_non_success_conclusions_count_as_failed() {
        let mut acc = MetricsAccumulator::default();
        for _ in 0..5 {
            acc.record_run();
        }
        acc.record_job(60.0, 0.0, None);
        acc.record_job(60.0, 0.0, Some("cancelled"));
        acc.record_job(60.0, 0.0, Some("skipped"));
        acc.record_job(60.0, 0.0, Some("Success"));
        acc.record_job(60.0, 0.0, Some("success"));

        let metrics = acc.finish(fixed_now());
        assert_eq!(metrics.totals.failed_jobs, 4);
        assert_eq!(metrics.failure_rate, "80.0%");
        assert_eq!(metrics.failed_job_minutes, "4.0");
        assert_eq!(metrics.total_minutes, "5.0");
    }

    #[test]
    fn test_failure_rate_rounds_to_one_decimal() {
        let mut acc = MetricsAccumulator::default();
        for _ in 0..3 {
            acc.record_run();
        }
        acc.record_job(1.0, 0.0, Some("failure"));
        let metrics = acc.finish(fixed_now());

        assert_eq!(metrics.failure_rate, "33.3%");
    }

    #[test]
    fn test_runs_without_jobs_keep_averages_zero() {
        let mut acc = MetricsAccumulator::default();
        acc.record_run();
        acc.record_run();
        let metrics = acc.finish(fixed_now());

        assert_eq!(metrics.avg_run_time, "0s");
        assert_eq!(metrics.avg_queue_time, "0s");
        assert_eq!(metrics.failure_rate, "0.0%");
        assert_eq!(metrics.total_runs, 2);
    }

    #[test]
    fn test_queue_time_weighted_by_job_count() {
        let mut acc = MetricsAccumulator::default();
        acc.record_run();
        for _ in 0..3 {
            acc.record_job(30.0, 10.0, Some("success"));
        }
        acc.record_run();
        acc.record_job(30.0, 100.0, Some("success"));
        let metrics = acc.finish(fixed_now());

        assert_eq!(metrics.avg_queue_time, "32.5s");
        assert_eq!(metrics.avg_run_time, "30.0s");
        assert_eq!(metrics.total_runs, 2);
    }

    #[test]
    fn test_format_display_time_uses_offset() {
        let ts = Utc.with_ymd_and_hms(2024, 3, 5, 20, 0, 0).unwrap();
        let ist = FixedOffset::east_opt(19_800).unwrap();
        assert_eq!(format_display_time(ts, &ist), "06 Mar 2024, 01:30 AM");
        assert_eq!(format_display_time(ts, &utc()), "05 Mar 2024, 08:00 PM");
    }

    #[test]
    fn test_format_provider_time_passthrough() {
        assert_eq!(
            format_provider_time(Some("2024-01-02T03:04:05Z"), &utc()),
            "02 Jan 2024, 03:04 AM"
        );
        assert_eq!(format_provider_time(Some("garbage"), &utc()), "garbage");
        assert_eq!(format_provider_time(None, &utc()), "");
    }

    #[test]
    fn test_serialized_shape() {
        let report = WorkflowMetricsReport {
            metrics: MetricsAccumulator::default().finish(fixed_now()),
            workflows: vec![WorkflowSummary {
                id: 7,
                name: "CI".to_string(),
                path: ".github/workflows/ci.yml".to_string(),
                state: "active".to_string(),
                next_runs: vec![],
                prev_runs: vec![RunSummary {
                    id: 11,
                    status: "completed".to_string(),
                    conclusion: None,
                    created_at: "05 Mar 2024, 02:07 PM".to_string(),
                    url: "https://github.com/octo/demo/actions/runs/11".to_string(),
                }],
                schedule: ScheduleSpec {
                    crons: vec!["0 0 * * *".to_string()],
                },
            }],
        };

        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["metrics"]["avgRunTime"], "0s");
        assert_eq!(value["metrics"]["failedJobMinutes"], "0.0");
        assert_eq!(value["metrics"]["totalRuns"], 0);
        assert!(value["metrics"].get("totals").is_none());

        let workflow = &value["workflows"][0];
        assert_eq!(workflow["nextRuns"], serde_json::json!([]));
        assert!(workflow.get("schedule").is_none());
        assert_eq!(workflow["prevRuns"][0]["created_at"], "05 Mar 2024, 02:07 PM");
        assert!(workflow["prevRuns"][0]["conclusion"].is_null());
    }
}
