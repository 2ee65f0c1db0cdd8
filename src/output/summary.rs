use std::fmt::Write;

use crate::metrics::{RunSummary, WorkflowMetricsReport, WorkflowSummary};
use comfy_table::{Cell, Color as TableColor};

use super::styling::{heading, label, repository as repo_style, run_result, value, Health};
use super::tables::{color_coded_duration_cell, color_coded_failure_cell, create_table};

const MAX_WORKFLOW_ROWS: usize = 20;

/// Prints a human-readable summary of workflow metrics to stdout.
///
/// Displays:
/// - Overview: repository, run/job counts, failure rate, compute minutes
/// - Workflows: state, schedule and latest run of each workflow
/// - Recent Runs: the retained runs of every workflow with links
///
/// Failure rate is green below 25%, yellow up to 50% and red above.
pub fn print_summary(repository: &str, report: &WorkflowMetricsReport) {
    println!("{}", render_summary(repository, report));
}

fn create_cyan_header(labels: &[&str]) -> Vec<Cell> {
    labels
        .iter()
        .map(|label| Cell::new(*label).fg(TableColor::Cyan))
        .collect()
}

fn add_section_header(output: &mut String, emoji: &str, title: &str) {
    let _ = writeln!(output, "{} {}", heading(emoji), heading(title).underlined());
}

fn format_schedule(workflow: &WorkflowSummary) -> String {
    if workflow.schedule.is_empty() {
        "None".to_string()
    } else {
        workflow.schedule.crons.join("\n")
    }
}

fn conclusion_cell(run: &RunSummary) -> Cell {
    Cell::new(run_result(run)).fg(Health::of_run(run).table_color())
}

fn render_summary(repository: &str, report: &WorkflowMetricsReport) -> String {
    let mut output = String::new();
    let metrics = &report.metrics;
    let totals = &metrics.totals;

    add_section_header(&mut output, "📊", "Overview");

    let failure_display = Health::of_failure_rate(totals.failure_rate).paint(&metrics.failure_rate);

    let _ = writeln!(
        output,
        "  {} {}\n  {} {}\n  {} {}\n  {} {}\n  {} {}\n  {} {}\n  {} {} {}\n  {} {}\n",
        label("Repository:"),
        repo_style(repository),
        label("Workflows:"),
        value(report.workflows.len()),
        label("Runs analyzed:"),
        value(metrics.total_runs),
        label("Jobs analyzed:"),
        value(totals.total_jobs),
        label("Failure rate:"),
        failure_display,
        label("Average queue time:"),
        value(&metrics.avg_queue_time),
        label("Job minutes:"),
        value(&metrics.total_minutes),
        label(format!("({} failed)", metrics.failed_job_minutes)),
        label("Last updated:"),
        label(&metrics.last_updated),
    );

    if report.workflows.is_empty() {
        let _ = writeln!(output, "{}", value("No workflows found."));
        return output;
    }

    add_section_header(&mut output, "🗂️", "Workflows");

    let mut workflows_table = create_table();
    workflows_table.set_header(create_cyan_header(&[
        "Workflow",
        "State",
        "Schedule",
        "Latest Run",
        "Result",
    ]));

    for workflow in report.workflows.iter().take(MAX_WORKFLOW_ROWS) {
        let state_cell = Cell::new(&workflow.state)
            .fg(Health::of_workflow_state(&workflow.state).table_color());

        let (latest_cell, result_cell) = workflow.prev_runs.first().map_or_else(
            || (Cell::new("N/A"), Cell::new("N/A")),
            |run| (Cell::new(&run.created_at), conclusion_cell(run)),
        );

        workflows_table.add_row(vec![
            Cell::new(format!("{}\n{}", workflow.name, workflow.path)),
            state_cell,
            Cell::new(format_schedule(workflow)),
            latest_cell,
            result_cell,
        ]);
    }

    if report.workflows.len() > MAX_WORKFLOW_ROWS {
        let mut row = vec![Cell::new(format!(
            "... and {} more",
            report.workflows.len() - MAX_WORKFLOW_ROWS
        ))
        .fg(TableColor::DarkGrey)];
        row.extend(vec![Cell::new(""); 4]);
        workflows_table.add_row(row);
    }

    let _ = writeln!(output, "{workflows_table}\n");

    add_section_header(&mut output, "⏱️", "Job Time");

    let mut timing_table = create_table();
    timing_table.set_header(create_cyan_header(&[
        "Average Job Duration",
        "Average Queue Time",
        "Failure Rate",
    ]));
    timing_table.add_row(vec![
        totals
            .avg_run_seconds
            .map_or_else(|| Cell::new(&metrics.avg_run_time), color_coded_duration_cell),
        Cell::new(&metrics.avg_queue_time),
        totals
            .failure_rate
            .map_or_else(|| Cell::new(&metrics.failure_rate), color_coded_failure_cell),
    ]);
    let _ = writeln!(output, "{timing_table}\n");

    add_section_header(&mut output, "🔗", "Recent Runs");

    let mut runs_table = create_table();
    runs_table.set_header(create_cyan_header(&["Workflow", "Created", "Result", "Link"]));

    for workflow in report.workflows.iter().take(MAX_WORKFLOW_ROWS) {
        for run in &workflow.prev_runs {
            runs_table.add_row(vec![
                Cell::new(&workflow.name),
                Cell::new(&run.created_at),
                conclusion_cell(run),
                Cell::new(&run.url),
            ]);
        }
    }

    let _ = writeln!(output, "{runs_table}");

    output
}
