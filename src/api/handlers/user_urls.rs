//! Handlers for the caller's own URLs.

use axum::{
    Extension, Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tracing::info;

use crate::api::dto::user_urls::UserUrlItem;
use crate::api::middleware::CurrentUser;
use crate::domain::context::CallContext;
use crate::error::AppError;
use crate::state::AppState;

/// Lists the URLs shortened by the caller.
///
/// # Endpoint
///
/// `GET /api/user/urls`
///
/// # Response
///
/// ```json
/// [{ "short_url": "http://localhost:8080/c4ed1", "original_url": "https://example.com/a" }]
/// ```
///
/// `204 No Content` when the caller has no URLs.
pub async fn user_urls_handler(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> Result<Response, AppError> {
    if user.is_new {
        return Ok(StatusCode::NO_CONTENT.into_response());
    }

    let ctx = CallContext::background();
    let _guard = ctx.cancel_on_drop();

    let urls = state.shortener.user_urls(&ctx, &user.id).await?;
    if urls.is_empty() {
        return Ok(StatusCode::NO_CONTENT.into_response());
    }

    let items: Vec<UserUrlItem> = urls.into_iter().map(UserUrlItem::from).collect();
    Ok(Json(items).into_response())
}

/// Soft-deletes URLs owned by the caller.
///
/// # Endpoint
///
/// `DELETE /api/user/urls`
///
/// # Request Body
///
/// ```json
/// ["c4ed1", "69a42"]
/// ```
///
/// Ids the caller does not own are ignored.
///
/// # Errors
///
/// Returns 501 Not Implemented when the storage backend has no soft-delete.
pub async fn delete_user_urls_handler(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(ids): Json<Vec<String>>,
) -> Result<StatusCode, AppError> {
    let ctx = CallContext::background();
    let _guard = ctx.cancel_on_drop();

    let deleted = state
        .shortener
        .delete_user_urls(&ctx, &user.id, &ids)
        .await?;

    info!(user_id = %user.id, requested = ids.len(), deleted, "Deleted user URLs");
    Ok(StatusCode::ACCEPTED)
}
