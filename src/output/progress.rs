use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

use super::styling::{heading, value, Health};

/// Spinner shown on stderr while a collection is running
pub struct CollectProgress {
    pb: ProgressBar,
}

impl CollectProgress {
    pub fn start(repository: &str) -> Self {
        eprintln!("{}  {}", heading("⚙️"), heading("Collection").underlined());
        let pb = create_spinner(
            value(format!("Fetching workflows, runs and jobs for {repository}"))
                .to_string(),
        );
        Self { pb }
    }

    pub fn finish(self, workflow_count: usize, run_count: usize) {
        self.pb.finish_with_message(
            Health::Good.paint(format!(
                "Collected {workflow_count} workflows and {run_count} runs ✓"
            ))
            .to_string(),
        );
        eprintln!();
    }

    pub fn fail(self) {
        self.pb
            .abandon_with_message(Health::Bad.paint("Collection failed ✗").to_string());
        eprintln!();
    }
}

fn create_spinner(message: String) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_draw_target(ProgressDrawTarget::stderr());
    if let Ok(style) = ProgressStyle::default_spinner().template("  {msg} {spinner}") {
        pb.set_style(style);
    }
    pb.set_message(message);
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}
