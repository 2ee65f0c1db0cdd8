use comfy_table::Color as TableColor;
use console::{style, StyledObject};
use std::fmt::Display;

use crate::metrics::RunSummary;

/// How healthy a metric, run or workflow looks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Health {
    Good,
    Warning,
    Bad,
    Unknown,
}

impl Health {
    /// Below 25% is good, below 50% a warning, anything above bad.
    /// No rate at all (no runs observed) is unknown.
    pub fn of_failure_rate(rate: Option<f64>) -> Self {
        match rate {
            None => Self::Unknown,
            Some(rate) if rate >= 50.0 => Self::Bad,
            Some(rate) if rate >= 25.0 => Self::Warning,
            Some(_) => Self::Good,
        }
    }

    /// A run without a conclusion is still queued or in progress.
    pub fn of_run(run: &RunSummary) -> Self {
        match run.conclusion.as_deref() {
            Some("success") => Self::Good,
            Some(_) => Self::Bad,
            None => Self::Warning,
        }
    }

    pub fn of_workflow_state(state: &str) -> Self {
        if state == "active" {
            Self::Good
        } else {
            Self::Unknown
        }
    }

    pub fn table_color(self) -> TableColor {
        match self {
            Self::Good => TableColor::Green,
            Self::Warning => TableColor::Yellow,
            Self::Bad => TableColor::Red,
            Self::Unknown => TableColor::DarkGrey,
        }
    }

    pub fn paint(self, text: impl Display) -> StyledObject<String> {
        let styled = style(text.to_string());
        match self {
            Self::Good => styled.bright().green(),
            Self::Warning => styled.bright().yellow(),
            Self::Bad => styled.bright().red(),
            Self::Unknown => styled.dim(),
        }
    }
}

/// Text shown for a run's result: its conclusion, or its status while it has none.
pub fn run_result(run: &RunSummary) -> &str {
    run.conclusion.as_deref().unwrap_or(&run.status)
}

pub fn label(text: impl Display) -> StyledObject<String> {
    style(text.to_string()).dim()
}

pub fn value(text: impl Display) -> StyledObject<String> {
    style(text.to_string()).bright().yellow()
}

pub fn repository(text: impl Display) -> StyledObject<String> {
    style(text.to_string()).cyan()
}

pub fn heading(text: impl Display) -> StyledObject<String> {
    style(text.to_string()).bright()
}

pub fn brand(text: impl Display) -> StyledObject<String> {
    style(text.to_string()).magenta().bold()
}
