//! Unified error type for the secbench core library.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SecbenchError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error(transparent)]
    Config(#[from] crate::config::ConfigError),
    #[error("dataset error: {0}")]
    Dataset(String),
    #[error("completion failed: {0}")]
    Completion(String),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, SecbenchError>;
