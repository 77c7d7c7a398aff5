//! Error types for storage operations

use crate::TrustlinkError;

/// Error type for storage operations
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Connection error
    #[error("Connection error: {0}")]
    Connection(String),

    /// Data not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Item already exists
    #[error("Already exists: {0}")]
    AlreadyExists(String),

    /// Conditional write rejected because the document changed
    #[error("Version conflict on {key}: expected {expected}, found {actual}")]
    VersionConflict {
        key: String,
        expected: u64,
        actual: u64,
    },

    /// Query error
    #[error("Query error: {0}")]
    Query(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Storage timeout error
    #[error("Timeout: {0}")]
    Timeout(String),

    /// Backend-specific error
    #[error("Backend error: {0}")]
    Backend(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Convert a JSON error to a storage error
impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::Serialization(err.to_string())
    }
}

impl From<StorageError> for TrustlinkError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(msg) => TrustlinkError::NotFound(msg),
            StorageError::AlreadyExists(_) | StorageError::VersionConflict { .. } => {
                TrustlinkError::Conflict(err.to_string())
            }
            StorageError::Connection(_) | StorageError::Timeout(_) => {
                TrustlinkError::Unavailable(err.to_string())
            }
            StorageError::Query(_) | StorageError::Serialization(_) | StorageError::Backend(_) => {
                TrustlinkError::Internal(err.to_string())
            }
        }
    }
}
