//! Error types for the reveal core

use thiserror::Error;

/// Core error type
#[derive(Error, Debug)]
pub enum RevealError {
    #[error("No payout options to sample from")]
    EmptyOptions,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias
pub type RevealResult<T> = Result<T, RevealError>;
