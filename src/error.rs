//! Error types for the alternative generation engine

use thiserror::Error;

/// Result type for altgen operations
pub type AltgenResult<T> = Result<T, AltgenError>;

/// Error types surfaced outside the retry loop.
///
/// Per-attempt provider failures live in [`crate::types::ProviderFailure`];
/// they only become an `AltgenError` indirectly, through a batch stop reason.
#[derive(Error, Debug)]
pub enum AltgenError {
    #[error("batch cancelled by run-control flag")]
    Cancelled,

    #[error("configuration error: {message}")]
    ConfigError { message: String },

    #[error("asset table operation failed: {operation} on {path}")]
    TableError { operation: String, path: String },

    #[error("property store error: {message}")]
    StoreError { message: String },

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    JsonError(#[from] serde_json::Error),
}
