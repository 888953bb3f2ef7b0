//! Error types for package conversion.

use thiserror::Error;

/// Result type alias using InterchangeError.
pub type Result<T> = std::result::Result<T, InterchangeError>;

/// Errors that abort a whole import or export.
///
/// Problems confined to one note or one model entry are not errors; they are
/// reported as skipped units (see [`crate::reader::SkipReason`]).
#[derive(Debug, Error)]
pub enum InterchangeError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error(transparent)]
    Core(#[from] flashcard_core::CoreError),

    #[error("required file missing from archive: {0}")]
    MissingFile(String),

    #[error("invalid data: {0}")]
    InvalidData(String),
}
