//! In-memory user repository.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;

use crate::domain::context::CallContext;
use crate::domain::repositories::{RepositoryError, RepositoryResult, UserRepository};

/// User store keyed by sequentially assigned ids.
///
/// Ids start at 1 and are reserved with an atomic increment, independent of
/// the map's own locking.
#[derive(Debug, Clone)]
pub struct MemoryUserRepository {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    users: DashMap<String, Vec<String>>,
    next_id: AtomicU64,
}

impl MemoryUserRepository {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                users: DashMap::new(),
                next_id: AtomicU64::new(1),
            }),
        }
    }

    pub fn len(&self) -> usize {
        self.inner.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.users.is_empty()
    }
}

impl Default for MemoryUserRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl Inner {
    fn insert(&self, url_ids: Vec<String>) -> String {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst).to_string();
        self.users.insert(id.clone(), url_ids);
        id
    }

    fn get(&self, id: String) -> RepositoryResult<Vec<String>> {
        match self.users.get(&id) {
            Some(url_ids) => Ok(url_ids.clone()),
            None => Err(RepositoryError::NotFound(id)),
        }
    }
}

#[async_trait]
impl UserRepository for MemoryUserRepository {
    async fn create(&self, ctx: &CallContext, url_ids: Vec<String>) -> RepositoryResult<String> {
        let inner = self.inner.clone();
        ctx.run(async move { Ok(inner.insert(url_ids)) }).await
    }

    async fn create_many(
        &self,
        ctx: &CallContext,
        lists: Vec<Vec<String>>,
    ) -> RepositoryResult<Vec<String>> {
        let inner = self.inner.clone();
        ctx.run(async move { Ok(lists.into_iter().map(|list| inner.insert(list)).collect()) })
            .await
    }

    async fn read(&self, ctx: &CallContext, id: &str) -> RepositoryResult<Vec<String>> {
        let inner = self.inner.clone();
        let id = id.to_owned();
        ctx.run(async move { inner.get(id) }).await
    }

    async fn update(
        &self,
        ctx: &CallContext,
        id: &str,
        url_ids: Vec<String>,
    ) -> RepositoryResult<()> {
        let inner = self.inner.clone();
        let id = id.to_owned();
        ctx.run(async move {
            inner.users.insert(id, url_ids);
            Ok(())
        })
        .await
    }
}
