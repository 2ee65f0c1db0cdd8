use anyhow::{Context, Result};
use chrono::FixedOffset;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::ActionLensError;

/// GitHub caps `per_page` for workflow runs at 100.
pub const MAX_RUNS_PER_WORKFLOW: usize = 100;

/// Upper bound on `prevRuns` entries per workflow.
pub const MAX_RECENT_RUNS: usize = 5;

/// Configuration file structure for actionlens.
///
/// Holds the repository coordinates, server settings and the display timezone.
/// Anything given on the command line or through the environment overrides the
/// file (see [`Config::apply_overrides`]).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    #[serde(default)]
    pub github: GitHubConfig,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub display: DisplayConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct GitHubConfig {
    /// GitHub personal access token
    pub token: Option<String>,

    /// GitHub API base URL
    #[serde(default = "default_github_base_url")]
    pub base_url: String,

    /// Repository owner or organization
    pub owner: Option<String>,

    /// Repository name
    pub repo: Option<String>,

    /// Number of recent runs fetched per workflow for aggregation
    #[serde(default = "default_runs_per_workflow")]
    pub runs_per_workflow: usize,

    /// Number of runs kept per workflow in the response (at most 5)
    #[serde(default = "default_recent_runs")]
    pub recent_runs: usize,

    /// Upper bound on in-flight job requests (1 keeps everything sequential)
    #[serde(default = "default_max_concurrent_requests")]
    pub max_concurrent_requests: usize,

    /// Per-request timeout in seconds; unset means no timeout
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ServerConfig {
    /// Socket address the HTTP server binds to
    #[serde(default = "default_address")]
    pub address: String,

    /// Path of the metrics endpoint
    #[serde(default = "default_route")]
    pub route: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct DisplayConfig {
    /// Fixed UTC offset used for every formatted timestamp (e.g. "+05:30")
    #[serde(default = "default_utc_offset")]
    pub utc_offset: String,
}

/// Values coming from command-line flags or environment variables.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub owner: Option<String>,
    pub repo: Option<String>,
    pub token: Option<String>,
    pub address: Option<String>,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            token: None,
            base_url: default_github_base_url(),
            owner: None,
            repo: None,
            runs_per_workflow: default_runs_per_workflow(),
            recent_runs: default_recent_runs(),
            max_concurrent_requests: default_max_concurrent_requests(),
            request_timeout_secs: None,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: default_address(),
            route: default_route(),
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            utc_offset: default_utc_offset(),
        }
    }
}

fn default_github_base_url() -> String {
    "https://api.github.com".to_string()
}

fn default_runs_per_workflow() -> usize {
    MAX_RUNS_PER_WORKFLOW
}

fn default_recent_runs() -> usize {
    MAX_RECENT_RUNS
}

fn default_max_concurrent_requests() -> usize {
    1
}

fn default_address() -> String {
    "127.0.0.1:8080".to_string()
}

fn default_route() -> String {
    "/api/github-actions/workflows".to_string()
}

fn default_utc_offset() -> String {
    "+00:00".to_string()
}

impl Config {
    /// Load configuration from a file.
    ///
    /// Searches for configuration files in this order:
    /// 1. Specified path
    /// 2. ./actionlens.toml
    /// 3. ./actionlens.json
    /// 4. ./actionlens.yaml
    /// 5. ./actionlens.yml
    /// 6. `<config dir>/actionlens/actionlens.toml`
    ///
    /// Returns default configuration if no file is found.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            if path.exists() {
                return Self::load_from_path(path);
            }
            log::warn!("Config file {} not found, using defaults", path.display());
            return Ok(Self::default());
        }

        let candidates = [
            "actionlens.toml",
            "actionlens.json",
            "actionlens.yaml",
            "actionlens.yml",
        ];

        for candidate in &candidates {
            let path = Path::new(candidate);
            if path.exists() {
                return Self::load_from_path(path);
            }
        }

        if let Some(path) = user_config_path() {
            if path.exists() {
                return Self::load_from_path(&path);
            }
        }

        Ok(Self::default())
    }

    /// Load configuration from a specific file path.
    fn load_from_path(path: &Path) -> Result<Self> {
        log::info!("Reading config from: {}", path.display());

        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let extension = path.extension().and_then(|ext| ext.to_str()).unwrap_or("");

        match extension {
            "toml" => toml::from_str(&contents)
                .with_context(|| format!("Failed to parse TOML config: {}", path.display())),
            "json" => serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse JSON config: {}", path.display())),
            "yaml" | "yml" => serde_yaml::from_str(&contents)
                .with_context(|| format!("Failed to parse YAML config: {}", path.display())),
            _ => toml::from_str(&contents)
                .or_else(|_| serde_json::from_str(&contents))
                .or_else(|_| serde_yaml::from_str(&contents))
                .with_context(|| format!("Failed to parse config file: {}", path.display())),
        }
    }

    /// Applies flag/environment values on top of the file configuration.
    pub fn apply_overrides(&mut self, overrides: Overrides) {
        if let Some(owner) = overrides.owner {
            self.github.owner = Some(owner);
        }
        if let Some(repo) = overrides.repo {
            self.github.repo = Some(repo);
        }
        if let Some(token) = overrides.token {
            self.github.token = Some(token);
        }
        if let Some(address) = overrides.address {
            self.server.address = address;
        }
    }
}

impl GitHubConfig {
    /// Returns `(owner, repo)`, failing when either is missing or blank.
    pub fn repository(&self) -> crate::error::Result<(String, String)> {
        let owner = non_blank(self.owner.as_deref())
            .ok_or_else(|| ActionLensError::Config("repository owner is required".into()))?;
        let repo = non_blank(self.repo.as_deref())
            .ok_or_else(|| ActionLensError::Config("repository name is required".into()))?;
        Ok((owner, repo))
    }

    pub fn effective_runs_per_workflow(&self) -> usize {
        self.runs_per_workflow.clamp(1, MAX_RUNS_PER_WORKFLOW)
    }

    pub fn effective_recent_runs(&self) -> usize {
        self.recent_runs.clamp(1, MAX_RECENT_RUNS)
    }
}

impl DisplayConfig {
    pub fn offset(&self) -> crate::error::Result<FixedOffset> {
        parse_utc_offset(&self.utc_offset)
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(ToString::to_string)
}

fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("actionlens").join("actionlens.toml"))
}

/// Parses offsets written as `Z`, `+HH:MM`, `-HH:MM` or `+HHMM`.
pub fn parse_utc_offset(raw: &str) -> crate::error::Result<FixedOffset> {
    let invalid = || ActionLensError::Config(format!("Invalid UTC offset: {raw:?}"));

    let value = raw.trim();
    if value.eq_ignore_ascii_case("z") || value.eq_ignore_ascii_case("utc") {
        return FixedOffset::east_opt(0).ok_or_else(invalid);
    }

    let (sign, rest) = if let Some(rest) = value.strip_prefix('+') {
        (1, rest)
    } else if let Some(rest) = value.strip_prefix('-') {
        (-1, rest)
    } else {
        return Err(invalid());
    };

    let digits: String = rest.chars().filter(|c| *c != ':').collect();
    if digits.len() != 4 || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(invalid());
    }

    let hours: i32 = digits[..2].parse().map_err(|_| invalid())?;
    let minutes: i32 = digits[2..].parse().map_err(|_| invalid())?;
    if minutes >= 60 {
        return Err(invalid());
    }

    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60)).ok_or_else(invalid)
}
