//! Idempotent table bootstrap for the PostgreSQL backend.

use sqlx::PgPool;
use tracing::info;

const CREATE_URL_TABLE: &str = r#"
    CREATE TABLE url (
        short_id     TEXT PRIMARY KEY,
        original_url TEXT NOT NULL,
        is_deleted   BOOLEAN NOT NULL DEFAULT FALSE
    )
"#;

const CREATE_USERS_TABLE: &str = r#"
    CREATE TABLE users (
        id   SERIAL PRIMARY KEY,
        urls TEXT[] NOT NULL DEFAULT '{}'
    )
"#;

/// Creates the `url` and `users` tables when they do not exist yet.
///
/// # Errors
///
/// Returns the underlying database error.
pub async fn ensure_schema(pool: &PgPool) -> Result<(), sqlx::Error> {
    ensure_table(pool, "url", CREATE_URL_TABLE).await?;
    ensure_table(pool, "users", CREATE_USERS_TABLE).await?;
    Ok(())
}

async fn ensure_table(pool: &PgPool, name: &str, ddl: &str) -> Result<(), sqlx::Error> {
    let exists: bool = sqlx::query_scalar(
        r#"
        SELECT EXISTS (
            SELECT FROM pg_tables
            WHERE schemaname = current_schema() AND tablename = $1
        )
        "#,
    )
    .bind(name)
    .fetch_one(pool)
    .await?;

    if !exists {
        sqlx::query(ddl).execute(pool).await?;
        info!(table = name, "Created table");
    }

    Ok(())
}
