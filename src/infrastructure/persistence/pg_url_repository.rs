//! PostgreSQL implementation of the URL repository.

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::{PgExecutor, PgPool};
use url::Url;

use super::delete_pipeline::{DeletePipeline, DeleteSettings, PgSoftDeleteSink};
use crate::domain::context::CallContext;
use crate::domain::entities::{BatchInsertion, Insertion};
use crate::domain::hasher;
use crate::domain::repositories::{RepositoryError, RepositoryResult, UrlRepository};

const INSERT_URL: &str = r#"
    INSERT INTO url (short_id, original_url)
    VALUES ($1, $2)
    ON CONFLICT DO NOTHING
    RETURNING short_id
"#;

/// PostgreSQL repository for URL records.
///
/// Conflicting inserts are detected with `ON CONFLICT DO NOTHING RETURNING`:
/// no returned row means the id was already present. Deletes are soft and go
/// through a [`DeletePipeline`].
pub struct PgUrlRepository {
    pool: Arc<PgPool>,
    deleter: DeletePipeline<PgSoftDeleteSink>,
}

impl PgUrlRepository {
    /// Creates a repository with default delete pipeline settings.
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self::with_delete_settings(pool, DeleteSettings::default())
    }

    pub fn with_delete_settings(pool: Arc<PgPool>, settings: DeleteSettings) -> Self {
        let sink = Arc::new(PgSoftDeleteSink::new(pool.clone()));
        Self {
            pool,
            deleter: DeletePipeline::new(sink, settings),
        }
    }
}

async fn insert_url<'e, E: PgExecutor<'e>>(executor: E, url: &Url) -> RepositoryResult<Insertion> {
    let id = hasher::hash(url);

    let returned: Option<String> = sqlx::query_scalar(INSERT_URL)
        .bind(id.as_str())
        .bind(url.as_str())
        .fetch_optional(executor)
        .await?;

    Ok(match returned {
        Some(_) => Insertion::Inserted(id),
        None => Insertion::Duplicate(id),
    })
}

async fn insert_urls(pool: &PgPool, urls: Vec<Url>) -> RepositoryResult<BatchInsertion> {
    let mut tx = pool.begin().await?;
    let mut insertions = Vec::with_capacity(urls.len());

    for url in &urls {
        insertions.push(insert_url(&mut *tx, url).await?);
    }

    tx.commit().await?;

    Ok(BatchInsertion::from_insertions(insertions))
}

async fn fetch_url(pool: &PgPool, id: String) -> RepositoryResult<Url> {
    let row: Option<(String, bool)> =
        sqlx::query_as("SELECT original_url, is_deleted FROM url WHERE short_id = $1")
            .bind(&id)
            .fetch_optional(pool)
            .await?;

    let Some((stored, is_deleted)) = row else {
        return Err(RepositoryError::NotFound(id));
    };

    if is_deleted {
        return Err(RepositoryError::Deleted(id));
    }

    Url::parse(&stored).map_err(|e| RepositoryError::TypeMismatch {
        id,
        reason: e.to_string(),
    })
}

async fn replace_url(pool: &PgPool, id: String, url: Url) -> RepositoryResult<()> {
    let result = sqlx::query("UPDATE url SET original_url = $1 WHERE short_id = $2")
        .bind(url.as_str())
        .bind(&id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(RepositoryError::NotFound(id));
    }

    Ok(())
}

#[async_trait]
impl UrlRepository for PgUrlRepository {
    async fn create(&self, ctx: &CallContext, url: &Url) -> RepositoryResult<Insertion> {
        let pool = self.pool.clone();
        let url = url.clone();
        ctx.run(async move { insert_url(pool.as_ref(), &url).await })
            .await
    }

    async fn create_many(
        &self,
        ctx: &CallContext,
        urls: &[Url],
    ) -> RepositoryResult<BatchInsertion> {
        let pool = self.pool.clone();
        let urls = urls.to_vec();
        ctx.run(async move { insert_urls(&pool, urls).await }).await
    }

    async fn read(&self, ctx: &CallContext, id: &str) -> RepositoryResult<Url> {
        let pool = self.pool.clone();
        let id = id.to_owned();
        ctx.run(async move { fetch_url(&pool, id).await }).await
    }

    async fn update(&self, ctx: &CallContext, id: &str, url: &Url) -> RepositoryResult<()> {
        let pool = self.pool.clone();
        let id = id.to_owned();
        let url = url.clone();
        ctx.run(async move { replace_url(&pool, id, url).await })
            .await
    }

    async fn delete(&self, ctx: &CallContext, ids: &[String]) -> RepositoryResult<()> {
        let deleter = self.deleter.clone();
        let ids = ids.to_vec();
        ctx.run(async move { deleter.run(ids).await.map(|_| ()) })
            .await
    }

    async fn ping(&self, ctx: &CallContext) -> RepositoryResult<()> {
        let pool = self.pool.clone();
        ctx.run(async move {
            sqlx::query("SELECT 1").execute(pool.as_ref()).await?;
            Ok::<(), RepositoryError>(())
        })
        .await
    }
}
