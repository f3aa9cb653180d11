//! Error types for the rosterkeep-store crate.
//!
//! Only the durable write path and configuration can fail; cache and
//! read-side problems are reported as outcomes, not errors.

use thiserror::Error;

/// Alias for `Result<T, StoreError>`.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur in the history store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A filesystem operation on the durable store failed.
    #[error("io error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// JSON serialization or deserialization failed.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// The cache connection target could not be turned into a valid URL.
    #[error("invalid cache configuration: {0}")]
    InvalidConfig(String),
}

impl StoreError {
    pub(crate) fn io(path: &std::path::Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.display().to_string(),
            source,
        }
    }
}
