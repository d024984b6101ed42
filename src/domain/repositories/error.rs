//! Error taxonomy shared by every repository backend.

use crate::domain::context::ContextError;

/// Errors returned by [`super::UrlRepository`] and [`super::UserRepository`].
///
/// A duplicate insert is not an error; see [`crate::domain::entities::Insertion`].
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    /// No record with this id was ever stored.
    #[error("no record with id {0}")]
    NotFound(String),

    /// The record exists but has been soft-deleted.
    #[error("record {0} has been deleted")]
    Deleted(String),

    /// A stored value could not be decoded into its expected shape.
    #[error("stored value for {id} has unexpected shape: {reason}")]
    TypeMismatch { id: String, reason: String },

    #[error("operation canceled")]
    Canceled,

    #[error("operation deadline exceeded")]
    DeadlineExceeded,

    /// The background task serving the call ended without a result.
    #[error("storage task ended without a result")]
    WorkerLost,

    /// The backend does not implement this operation.
    #[error("{0} is not supported by this storage backend")]
    Unsupported(&'static str),

    #[error("backup log I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl RepositoryError {
    /// Returns true for the two context-expiry variants.
    pub fn is_context_error(&self) -> bool {
        matches!(self, Self::Canceled | Self::DeadlineExceeded)
    }
}

impl From<ContextError> for RepositoryError {
    fn from(err: ContextError) -> Self {
        match err {
            ContextError::Canceled => Self::Canceled,
            ContextError::DeadlineExceeded => Self::DeadlineExceeded,
            ContextError::Abandoned => Self::WorkerLost,
        }
    }
}

/// Result alias for repository operations.
pub type RepositoryResult<T> = Result<T, RepositoryError>;
