//! Error types for flashcard-core.

use thiserror::Error;

/// Result type alias using CoreError.
pub type Result<T> = std::result::Result<T, CoreError>;

/// Errors raised by the shared primitives.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid settings: {0}")]
    Settings(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid character reference: {0}")]
    InvalidEntity(String),
}
