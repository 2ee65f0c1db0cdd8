use thiserror::Error;

#[derive(Error, Debug)]
pub enum ActionLensError {
    #[error("GitHub API request failed with status {status}: {message}")]
    ApiError { status: u16, message: String },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Unexpected response payload: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ActionLensError>;
