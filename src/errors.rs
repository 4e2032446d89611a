use reqwest::StatusCode;
use thiserror::Error;

/// Failure of a call to the quiz backend.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("backend request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("backend returned status {0}")]
    Status(StatusCode),
    #[error("malformed backend response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("invalid backend url: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{0} should be set")]
    Missing(&'static str),
    #[error("{name} has an invalid value '{value}'")]
    Invalid { name: &'static str, value: String },
    #[error("WEBHOOK_URL and WEBHOOK_ADDR must be set together")]
    IncompleteWebhook,
}

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("worker for chat {0} is gone")]
    WorkerClosed(i64),
}
