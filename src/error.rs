//! Error types for the assistant core

use thiserror::Error;

/// Crate-wide result alias
pub type Result<T> = std::result::Result<T, AssistantError>;

/// Errors surfaced by the assistant core components
#[derive(Error, Debug)]
pub enum AssistantError {
    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Generation error: {0}")]
    Generation(String),

    #[error("Sandbox error: {0}")]
    Sandbox(String),

    #[error("Workspace error: {0}")]
    Workspace(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
