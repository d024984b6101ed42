//! HTTP server initialization and runtime setup.
//!
//! Opens storage, wires the service and runs Axum until a shutdown signal.

use crate::application::services::{ShortenerService, UserTokenSigner};
use crate::config::Config;
use crate::domain::context::CallContext;
use crate::infrastructure::persistence::init_repositories;
use crate::routes::app_router;
use crate::state::AppState;

use anyhow::{Context, Result};
use axum::ServiceExt;
use axum::extract::Request;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use std::time::Duration;
use tower::Layer;
use tower_http::normalize_path::NormalizePathLayer;

/// Runs the HTTP server with the given configuration.
///
/// Initializes:
/// - PostgreSQL connection pool, when a DSN is configured
/// - Repositories for the selected backend
/// - Axum HTTP server with graceful shutdown
///
/// # Errors
///
/// Returns an error if:
/// - Database connection or schema creation fails
/// - The backup log cannot be opened
/// - Server bind fails
/// - Server runtime error occurs
pub async fn run(config: Config) -> Result<()> {
    let pool = match &config.database_dsn {
        Some(dsn) => {
            let pool = PgPoolOptions::new()
                .max_connections(config.db_max_connections)
                .acquire_timeout(Duration::from_secs(config.db_connect_timeout))
                .connect(dsn)
                .await
                .context("Failed to connect to database")?;
            tracing::info!("Connected to database");
            Some(pool)
        }
        None => None,
    };

    let startup =
        CallContext::background().with_timeout(Duration::from_secs(config.db_connect_timeout));
    let (repositories, backend) = init_repositories(
        &startup,
        config.file_storage_path.as_deref(),
        pool,
        config.delete_settings(),
    )
    .await
    .context("Failed to initialize storage")?;
    tracing::info!(?backend, "Storage ready");

    let signer = UserTokenSigner::new(&config.secret_key).context("Invalid SECRET_KEY")?;

    let shortener = Arc::new(ShortenerService::new(
        repositories.urls,
        repositories.users,
        signer,
        config.base_url.clone(),
        config.request_timeout(),
    ));

    let app = NormalizePathLayer::trim_trailing_slash().layer(app_router(AppState::new(shortener)));

    let listener = tokio::net::TcpListener::bind(&config.server_address)
        .await
        .with_context(|| format!("Failed to bind {}", config.server_address))?;
    tracing::info!("Listening on http://{}", config.server_address);

    axum::serve(listener, ServiceExt::<Request>::into_make_service(app))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

/// Resolves on Ctrl+C or, on Unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
