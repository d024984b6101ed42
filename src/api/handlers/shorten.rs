//! Handlers for the shortening endpoints.

use axum::{
    Extension, Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use validator::Validate;

use crate::api::dto::shorten::{BatchItem, BatchResultItem, ShortenRequest, ShortenResponse};
use crate::api::middleware::CurrentUser;
use crate::domain::context::CallContext;
use crate::error::AppError;
use crate::state::AppState;

fn status_for(duplicate: bool) -> StatusCode {
    if duplicate {
        StatusCode::CONFLICT
    } else {
        StatusCode::CREATED
    }
}

/// Shortens a URL sent as the raw request body.
///
/// # Endpoint
///
/// `POST /`
///
/// # Response
///
/// The short URL as plain text, with `201 Created`, or `409 Conflict` when the
/// URL had already been shortened.
///
/// # Errors
///
/// Returns 400 Bad Request if the body is empty or not a URL.
pub async fn shorten_text_handler(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    body: String,
) -> Result<Response, AppError> {
    if body.trim().is_empty() {
        return Err(AppError::bad_request(
            "Request body is empty",
            serde_json::json!({}),
        ));
    }

    let ctx = CallContext::background();
    let _guard = ctx.cancel_on_drop();

    let shortened = state
        .shortener
        .shorten(&ctx, &body, Some(&user.id))
        .await?;

    Ok((status_for(shortened.duplicate), shortened.short_url).into_response())
}

/// Shortens a URL sent as JSON.
///
/// # Endpoint
///
/// `POST /api/shorten`
///
/// # Request Body
///
/// ```json
/// { "url": "https://example.com/a" }
/// ```
///
/// # Response
///
/// ```json
/// { "result": "http://localhost:8080/c4ed1" }
/// ```
///
/// `201 Created`, or `409 Conflict` with the same body for a duplicate.
pub async fn shorten_handler(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(payload): Json<ShortenRequest>,
) -> Result<(StatusCode, Json<ShortenResponse>), AppError> {
    payload.validate()?;

    let ctx = CallContext::background();
    let _guard = ctx.cancel_on_drop();

    let shortened = state
        .shortener
        .shorten(&ctx, &payload.url, Some(&user.id))
        .await?;

    Ok((
        status_for(shortened.duplicate),
        Json(ShortenResponse {
            result: shortened.short_url,
        }),
    ))
}

/// Shortens several URLs at once.
///
/// # Endpoint
///
/// `POST /api/shorten/batch`
///
/// # Request Body
///
/// ```json
/// [{ "correlation_id": "1", "original_url": "https://example.com/a" }]
/// ```
///
/// # Response
///
/// ```json
/// [{ "correlation_id": "1", "short_url": "http://localhost:8080/c4ed1" }]
/// ```
///
/// Results follow request order. `409 Conflict` is returned with the full
/// body when at least one URL had already been shortened.
///
/// # Errors
///
/// Returns 400 Bad Request if any entry fails validation; nothing is stored
/// in that case.
pub async fn shorten_batch_handler(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(items): Json<Vec<BatchItem>>,
) -> Result<(StatusCode, Json<Vec<BatchResultItem>>), AppError> {
    for item in &items {
        item.validate()?;
    }

    let ctx = CallContext::background();
    let _guard = ctx.cancel_on_drop();

    let urls: Vec<String> = items.iter().map(|item| item.original_url.clone()).collect();
    let batch = state
        .shortener
        .shorten_batch(&ctx, &urls, Some(&user.id))
        .await?;

    let results = items
        .into_iter()
        .zip(batch.short_urls)
        .map(|(item, short_url)| BatchResultItem {
            correlation_id: item.correlation_id,
            short_url,
        })
        .collect();

    Ok((status_for(batch.duplicate), Json(results)))
}
