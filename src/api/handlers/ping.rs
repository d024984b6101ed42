//! Storage liveness check.

use axum::{extract::State, http::StatusCode};
use serde_json::json;

use crate::domain::context::CallContext;
use crate::error::AppError;
use crate::state::AppState;

/// `GET /ping`: 200 when storage answers, 500 otherwise.
///
/// The in-memory backend has no database to reach, so it always fails here.
pub async fn ping_handler(State(state): State<AppState>) -> Result<StatusCode, AppError> {
    let ctx = CallContext::background();
    let _guard = ctx.cancel_on_drop();

    if let Err(e) = state.shortener.ping(&ctx).await {
        return Err(AppError::internal(
            "Storage is unavailable",
            json!({ "reason": e.into_error_info().message }),
        ));
    }

    Ok(StatusCode::OK)
}
