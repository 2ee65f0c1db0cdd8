use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use log::info;
use std::path::{Path, PathBuf};

use crate::config::{Config, Overrides};
use crate::output::{print_summary, CollectProgress};
use crate::providers::GitHubProvider;
use crate::server::{self, AppState};

#[derive(Parser)]
#[command(name = "actionlens")]
#[command(author, version, about = "GitHub Actions workflow metrics", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (defaults to ./actionlens.{toml,json,yaml,yml})
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
struct RepoArgs {
    #[arg(long, env = "GITHUB_OWNER")]
    owner: Option<String>,

    #[arg(long, env = "GITHUB_REPO")]
    repo: Option<String>,

    #[arg(short, long, env = "GITHUB_TOKEN", hide_env_values = true)]
    token: Option<String>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum Format {
    Json,
    Summary,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve workflow metrics over HTTP
    Serve {
        #[command(flatten)]
        repo: RepoArgs,

        #[arg(short, long, env = "ACTIONLENS_ADDRESS")]
        address: Option<String>,
    },
    /// Collect workflow metrics once and print them
    Collect {
        #[command(flatten)]
        repo: RepoArgs,

        #[arg(short, long, value_enum, default_value_t = Format::Json)]
        format: Format,

        /// Write the JSON report to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Pretty-print the JSON report
        #[arg(short, long, default_value_t = false)]
        pretty: bool,
    },
}

impl Cli {
    fn load_config(&self, repo: &RepoArgs, address: Option<&String>) -> Result<Config> {
        let mut config = Config::load(self.config.as_deref())?;
        config.apply_overrides(Overrides {
            owner: repo.owner.clone(),
            repo: repo.repo.clone(),
            token: repo.token.clone(),
            address: address.cloned(),
        });
        Ok(config)
    }

    async fn execute_serve(&self, repo: &RepoArgs, address: Option<&String>) -> Result<()> {
        let config = self.load_config(repo, address)?;
        let provider = GitHubProvider::from_config(&config)?;

        info!("Serving workflow metrics for {}", provider.repository());

        server::serve(
            &config.server.address,
            &config.server.route,
            AppState::new(provider),
        )
        .await
    }

    async fn execute_collect(
        &self,
        repo: &RepoArgs,
        format: Format,
        output: Option<&Path>,
        pretty: bool,
    ) -> Result<()> {
        let config = self.load_config(repo, None)?;
        let provider = GitHubProvider::from_config(&config)?;
        let repository = provider.repository();

        info!("Collecting workflow metrics for repository: {repository}");

        let progress = CollectProgress::start(&repository);
        let report = match provider.collect_metrics().await {
            Ok(report) => {
                progress.finish(report.workflows.len(), report.metrics.total_runs);
                report
            }
            Err(e) => {
                progress.fail();
                return Err(e).context("Failed to fetch GitHub Actions data");
            }
        };

        if format == Format::Summary {
            print_summary(&repository, &report);
            return Ok(());
        }

        let json_output = if pretty {
            serde_json::to_string_pretty(&report)?
        } else {
            serde_json::to_string(&report)?
        };

        if let Some(output_path) = output {
            std::fs::write(output_path, json_output)?;
            info!("Metrics written to: {}", output_path.display());
        } else {
            println!("{json_output}");
        }

        Ok(())
    }

    pub async fn execute(&self) -> Result<()> {
        match &self.command {
            Commands::Serve { repo, address } => self.execute_serve(repo, address.as_ref()).await,
            Commands::Collect {
                repo,
                format,
                output,
                pretty,
            } => {
                self.execute_collect(repo, *format, output.as_deref(), *pretty)
                    .await
            }
        }
    }
}
