//! Top-level router configuration.
//!
//! # Route Structure
//!
//! - `POST   /`                   - Shorten a raw-text URL
//! - `POST   /api/shorten`        - Shorten a JSON URL
//! - `POST   /api/shorten/batch`  - Shorten several URLs
//! - `GET    /api/user/urls`      - List the caller's URLs
//! - `DELETE /api/user/urls`      - Soft-delete the caller's URLs
//! - `GET    /ping`               - Storage liveness
//! - `GET    /{id}`               - Redirect to the original URL
//!
//! # Middleware
//!
//! - **User cookie** - Identifies or creates the caller on user-facing routes
//! - **Tracing** - Structured request/response logging
//! - **gzip** - Decodes gzip request bodies and compresses responses

use axum::routing::{get, post};
use axum::{Router, middleware};
use tower_http::compression::CompressionLayer;
use tower_http::decompression::RequestDecompressionLayer;

use crate::api::handlers::{
    delete_user_urls_handler, ping_handler, redirect_handler, shorten_batch_handler,
    shorten_handler, shorten_text_handler, user_urls_handler,
};
use crate::api::middleware::{auth, tracing};
use crate::state::AppState;

/// Routes that act on behalf of a user, identified by the `auth` cookie.
fn user_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/", post(shorten_text_handler))
        .route("/api/shorten", post(shorten_handler))
        .route("/api/shorten/batch", post(shorten_batch_handler))
        .route(
            "/api/user/urls",
            get(user_urls_handler).delete(delete_user_urls_handler),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), auth::layer))
}

/// Constructs the application router with all routes and middleware.
pub fn app_router(state: AppState) -> Router {
    Router::new()
        .merge(user_routes(&state))
        .route("/ping", get(ping_handler))
        .route("/{id}", get(redirect_handler))
        .with_state(state)
        .layer(CompressionLayer::new().gzip(true))
        .layer(RequestDecompressionLayer::new().gzip(true))
        .layer(tracing::layer())
}
