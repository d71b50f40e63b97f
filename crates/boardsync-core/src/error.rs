//! Centralized error types for Boardsync.

use thiserror::Error;

/// Main error type for Boardsync operations.
#[derive(Error, Debug)]
pub enum BoardError {
    #[error("Not connected to the board server")]
    NotConnected,

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Channel closed: {0}")]
    ChannelClosed(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for Boardsync operations.
pub type BoardResult<T> = Result<T, BoardError>;

impl BoardError {
    /// Create a validation error.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::ValidationError(msg.into())
    }
}
