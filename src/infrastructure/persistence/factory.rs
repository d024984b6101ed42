//! Backend selection at startup.

use std::path::Path;
use std::sync::Arc;

use sqlx::PgPool;
use tracing::info;

use super::backup_log::BackupLog;
use super::delete_pipeline::DeleteSettings;
use super::memory_url_repository::MemoryUrlRepository;
use super::memory_user_repository::MemoryUserRepository;
use super::pg_schema::ensure_schema;
use super::pg_url_repository::PgUrlRepository;
use super::pg_user_repository::PgUserRepository;
use crate::domain::context::CallContext;
use crate::domain::repositories::{
    RepositoryError, RepositoryResult, UrlRepository, UserRepository,
};

/// The pair of repositories the service runs on.
#[derive(Clone)]
pub struct Repositories {
    pub urls: Arc<dyn UrlRepository>,
    pub users: Arc<dyn UserRepository>,
}

/// Which backend [`init_repositories`] picked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    Memory,
    MemoryWithBackup,
    Postgres,
}

/// Builds the repositories for the configured backend.
///
/// A connection pool selects PostgreSQL and creates missing tables. Without
/// one, the in-memory backend is used; a backup path additionally replays the
/// log into the URL store and appends every new record to it.
///
/// # Errors
///
/// Returns [`crate::domain::repositories::RepositoryError::Database`] when the
/// schema cannot be created, `Io` when the backup log cannot be opened, or a
/// context error.
pub async fn init_repositories(
    ctx: &CallContext,
    backup_path: Option<&Path>,
    pool: Option<PgPool>,
    delete_settings: DeleteSettings,
) -> RepositoryResult<(Repositories, Backend)> {
    if let Some(pool) = pool {
        let pool = Arc::new(pool);
        let schema_pool = pool.clone();
        ctx.run(async move {
            ensure_schema(&schema_pool)
                .await
                .map_err(RepositoryError::from)
        })
        .await?;

        info!(
            max_lanes = delete_settings.max_lanes,
            flush_threshold = delete_settings.flush_threshold,
            "Using PostgreSQL storage"
        );

        let repositories = Repositories {
            urls: Arc::new(PgUrlRepository::with_delete_settings(
                pool.clone(),
                delete_settings,
            )),
            users: Arc::new(PgUserRepository::new(pool)),
        };
        return Ok((repositories, Backend::Postgres));
    }

    let users: Arc<dyn UserRepository> = Arc::new(MemoryUserRepository::new());

    let Some(path) = backup_path else {
        info!("Using in-memory storage without backup");
        let repositories = Repositories {
            urls: Arc::new(MemoryUrlRepository::new()),
            users,
        };
        return Ok((repositories, Backend::Memory));
    };

    let path = path.to_path_buf();
    let shown = path.display().to_string();
    let (log, records) = ctx
        .run(async move { BackupLog::open(&path).await.map_err(RepositoryError::from) })
        .await?;

    let urls = MemoryUrlRepository::with_backup(log, records);
    info!(
        path = %shown,
        restored = urls.len(),
        "Using in-memory storage with backup log"
    );

    let repositories = Repositories {
        urls: Arc::new(urls),
        users,
    };
    Ok((repositories, Backend::MemoryWithBackup))
}
