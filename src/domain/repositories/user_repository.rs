//! Repository trait for user URL-id lists.

use async_trait::async_trait;

use super::error::RepositoryResult;
use crate::domain::context::CallContext;

/// Storage contract for users and the ordered ids of the URLs they created.
///
/// User ids are assigned by the backend and returned as strings.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Creates a user owning `url_ids` and returns the new user id.
    async fn create(&self, ctx: &CallContext, url_ids: Vec<String>) -> RepositoryResult<String>;

    /// Creates one user per list, returning ids in input order.
    async fn create_many(
        &self,
        ctx: &CallContext,
        lists: Vec<Vec<String>>,
    ) -> RepositoryResult<Vec<String>>;

    /// Returns the user's URL ids in insertion order.
    ///
    /// # Errors
    ///
    /// Returns [`super::RepositoryError::NotFound`] for unknown users.
    async fn read(&self, ctx: &CallContext, id: &str) -> RepositoryResult<Vec<String>>;

    /// Replaces the user's URL-id list.
    async fn update(
        &self,
        ctx: &CallContext,
        id: &str,
        url_ids: Vec<String>,
    ) -> RepositoryResult<()>;
}
