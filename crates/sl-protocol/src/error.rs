//! Error types for the wire protocol

use thiserror::Error;

/// Errors raised while decoding frames and messages
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("Failed to parse JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unknown event: {0}")]
    UnknownEvent(String),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid payload for {event}: {reason}")]
    InvalidPayload { event: String, reason: String },
}

/// Result type alias
pub type ProtocolResult<T> = Result<T, ProtocolError>;
