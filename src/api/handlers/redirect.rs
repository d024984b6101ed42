//! Handler for short URL redirect.

use axum::{
    extract::{Path, State},
    response::Redirect,
};

use crate::domain::context::CallContext;
use crate::error::AppError;
use crate::state::AppState;

/// Redirects a short id to its original URL.
///
/// # Endpoint
///
/// `GET /{id}`
///
/// # Errors
///
/// Returns 404 Not Found for unknown ids and 410 Gone for deleted ones.
pub async fn redirect_handler(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> Result<Redirect, AppError> {
    let ctx = CallContext::background();
    let _guard = ctx.cancel_on_drop();

    let url = state.shortener.resolve(&ctx, &id).await?;

    Ok(Redirect::temporary(url.as_str()))
}
