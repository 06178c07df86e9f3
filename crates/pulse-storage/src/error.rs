/// Errors that can occur within the storage layer.
///
/// # Examples
///
/// ```rust
/// use pulse_storage::error::StorageError;
///
/// let err = StorageError::Unsupported { backend: "noop", operation: "ping" };
/// assert!(err.to_string().contains("noop"));
/// ```
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// The selected backend cannot perform the operation.
    #[error("Storage: {operation} is not supported by the {backend} backend")]
    Unsupported {
        backend: &'static str,
        operation: &'static str,
    },

    /// Reading or writing the snapshot file failed.
    #[error("Storage: I/O error on '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    /// Snapshot serialization or deserialization failure.
    #[error("Storage: JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// An underlying database error.
    #[error("Storage: database error: {0}")]
    Database(#[from] sea_orm::DbErr),
}

/// Convenience `Result` alias for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;
