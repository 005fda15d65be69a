use thiserror::Error;

/// Result alias for archive operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Error raised by archive backends regardless of the underlying storage.
#[derive(Debug, Error)]
pub enum StorageError {
    /// A result for this join code was saved before.
    #[error("results for session `{0}` are already archived")]
    AlreadyArchived(String),
}
