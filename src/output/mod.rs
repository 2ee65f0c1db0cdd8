mod progress;
mod styling;
mod summary;
mod tables;

pub use progress::CollectProgress;
pub use summary::print_summary;

use styling::{brand, label};

/// Prints the actionlens banner to stderr.
pub fn print_banner() {
    eprintln!(
        r"
{} {}
  {}
",
        brand("🔍 actionlens"),
        label(env!("CARGO_PKG_VERSION")),
        label("GitHub Actions Workflow Metrics")
    );
}
