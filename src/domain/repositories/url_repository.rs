//! Repository trait for shortened URL records.

use async_trait::async_trait;
use url::Url;

use super::error::RepositoryResult;
use crate::domain::context::CallContext;
use crate::domain::entities::{BatchInsertion, Insertion};

/// Storage contract for URL records keyed by their content-derived id.
///
/// # Implementations
///
/// - [`crate::infrastructure::persistence::MemoryUrlRepository`] - concurrent map with optional backup log
/// - [`crate::infrastructure::persistence::PgUrlRepository`] - PostgreSQL table with soft-delete
/// - Test mocks available with `cfg(test)`
///
/// Every call waits at most until `ctx` is done.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UrlRepository: Send + Sync {
    /// Stores a URL under its hashed id.
    ///
    /// Returns [`Insertion::Duplicate`] when the id was already present; the
    /// stored value is left untouched in that case.
    ///
    /// # Errors
    ///
    /// Returns [`super::RepositoryError::Io`] when the backup append fails
    /// (the record stays in memory), [`super::RepositoryError::Database`] on
    /// query failure, or a context error.
    async fn create(&self, ctx: &CallContext, url: &Url) -> RepositoryResult<Insertion>;

    /// Stores several URLs, returning their ids in input order.
    async fn create_many(&self, ctx: &CallContext, urls: &[Url])
    -> RepositoryResult<BatchInsertion>;

    /// Looks up the URL stored under `id`.
    ///
    /// # Errors
    ///
    /// - [`super::RepositoryError::NotFound`] if the id was never stored
    /// - [`super::RepositoryError::Deleted`] if it was soft-deleted
    async fn read(&self, ctx: &CallContext, id: &str) -> RepositoryResult<Url>;

    /// Overwrites the URL stored under `id`.
    async fn update(&self, ctx: &CallContext, id: &str, url: &Url) -> RepositoryResult<()>;

    /// Soft-deletes every listed id.
    ///
    /// # Errors
    ///
    /// Returns [`super::RepositoryError::Unsupported`] on backends without
    /// soft-delete.
    async fn delete(&self, ctx: &CallContext, ids: &[String]) -> RepositoryResult<()>;

    /// Checks that the backing store is reachable.
    async fn ping(&self, ctx: &CallContext) -> RepositoryResult<()>;
}
