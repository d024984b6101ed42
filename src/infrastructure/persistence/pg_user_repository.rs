//! PostgreSQL implementation of the user repository.

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::{PgExecutor, PgPool};

use crate::domain::context::CallContext;
use crate::domain::repositories::{RepositoryError, RepositoryResult, UserRepository};

const INSERT_USER: &str = "INSERT INTO users (urls) VALUES ($1) RETURNING id";

/// PostgreSQL repository for users and their URL-id arrays.
///
/// User ids are the table's serial key rendered as decimal strings. Ids that
/// do not parse as integers cannot exist and are reported as not found.
pub struct PgUserRepository {
    pool: Arc<PgPool>,
}

impl PgUserRepository {
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }
}

fn parse_user_id(id: &str) -> RepositoryResult<i32> {
    id.parse()
        .map_err(|_| RepositoryError::NotFound(id.to_owned()))
}

async fn insert_user<'e, E: PgExecutor<'e>>(
    executor: E,
    url_ids: &[String],
) -> RepositoryResult<String> {
    let id: i32 = sqlx::query_scalar(INSERT_USER)
        .bind(url_ids)
        .fetch_one(executor)
        .await?;

    Ok(id.to_string())
}

async fn insert_users(pool: &PgPool, lists: Vec<Vec<String>>) -> RepositoryResult<Vec<String>> {
    let mut tx = pool.begin().await?;
    let mut ids = Vec::with_capacity(lists.len());

    for url_ids in &lists {
        ids.push(insert_user(&mut *tx, url_ids).await?);
    }

    tx.commit().await?;

    Ok(ids)
}

async fn fetch_user(pool: &PgPool, id: String) -> RepositoryResult<Vec<String>> {
    let key = parse_user_id(&id)?;

    let urls: Option<Vec<String>> = sqlx::query_scalar("SELECT urls FROM users WHERE id = $1")
        .bind(key)
        .fetch_optional(pool)
        .await?;

    urls.ok_or(RepositoryError::NotFound(id))
}

async fn replace_user(pool: &PgPool, id: String, url_ids: Vec<String>) -> RepositoryResult<()> {
    let key = parse_user_id(&id)?;

    let result = sqlx::query("UPDATE users SET urls = $1 WHERE id = $2")
        .bind(&url_ids)
        .bind(key)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(RepositoryError::NotFound(id));
    }

    Ok(())
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn create(&self, ctx: &CallContext, url_ids: Vec<String>) -> RepositoryResult<String> {
        let pool = self.pool.clone();
        ctx.run(async move { insert_user(pool.as_ref(), &url_ids).await })
            .await
    }

    async fn create_many(
        &self,
        ctx: &CallContext,
        lists: Vec<Vec<String>>,
    ) -> RepositoryResult<Vec<String>> {
        let pool = self.pool.clone();
        ctx.run(async move { insert_users(&pool, lists).await }).await
    }

    async fn read(&self, ctx: &CallContext, id: &str) -> RepositoryResult<Vec<String>> {
        let pool = self.pool.clone();
        let id = id.to_owned();
        ctx.run(async move { fetch_user(&pool, id).await }).await
    }

    async fn update(
        &self,
        ctx: &CallContext,
        id: &str,
        url_ids: Vec<String>,
    ) -> RepositoryResult<()> {
        let pool = self.pool.clone();
        let id = id.to_owned();
        ctx.run(async move { replace_user(&pool, id, url_ids).await })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_user_id() {
        assert_eq!(parse_user_id("17").unwrap(), 17);
        assert!(matches!(
            parse_user_id("abc"),
            Err(RepositoryError::NotFound(id)) if id == "abc"
        ));
    }
}
