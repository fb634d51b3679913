//! Storage error type for the core crate.

use thiserror::Error;
use tradrack_types::RackError;

/// Failure of a variable store or calibration log.
#[derive(Error, Debug)]
pub enum StoreError {
    /// File system I/O operation failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<StoreError> for RackError {
    fn from(err: StoreError) -> Self {
        Self::Persistence { message: err.to_string() }
    }
}

/// Result type alias for storage operations.
pub type StoreResult<T> = Result<T, StoreError>;
