//! Cookie-based user identification.

use axum::{
    extract::{Request, State},
    http::{HeaderValue, header::COOKIE, header::SET_COOKIE},
    middleware::Next,
    response::Response,
};
use serde_json::json;

use crate::domain::context::CallContext;
use crate::{error::AppError, state::AppState};

/// Name of the cookie carrying the signed user token.
pub const AUTH_COOKIE: &str = "auth";

/// Lifetime of a freshly issued cookie, in seconds.
pub const AUTH_COOKIE_MAX_AGE: u64 = 24 * 60 * 60;

/// The user a request acts for, inserted into request extensions by [`layer`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentUser {
    pub id: String,
    /// True when the user was created for this request.
    pub is_new: bool,
}

/// Identifies the caller by the `auth` cookie.
///
/// # Flow
///
/// 1. Extract the `auth` cookie from the `Cookie` header
/// 2. Verify its signature and recover the user id
/// 3. When the cookie is missing or invalid, create a new user and attach a
///    `Set-Cookie` header with its token to the response
/// 4. Insert [`CurrentUser`] into request extensions
///
/// # Errors
///
/// Returns the mapped storage error when a new user cannot be created.
pub async fn layer(
    State(st): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let known = cookie_value(&req, AUTH_COOKIE).and_then(|token| st.shortener.authenticate(&token));

    if let Some(id) = known {
        req.extensions_mut().insert(CurrentUser { id, is_new: false });
        return Ok(next.run(req).await);
    }

    let ctx = CallContext::background();
    let _guard = ctx.cancel_on_drop();
    let registered = st.shortener.register_user(&ctx).await?;

    let cookie = format!(
        "{AUTH_COOKIE}={}; Path=/; Max-Age={AUTH_COOKIE_MAX_AGE}; HttpOnly",
        registered.token
    );
    let cookie = HeaderValue::from_str(&cookie).map_err(|e| {
        AppError::internal("Failed to build auth cookie", json!({ "reason": e.to_string() }))
    })?;

    req.extensions_mut().insert(CurrentUser {
        id: registered.id,
        is_new: true,
    });

    let mut response = next.run(req).await;
    response.headers_mut().append(SET_COOKIE, cookie);
    Ok(response)
}

/// Returns the value of the named cookie, if present.
fn cookie_value(req: &Request, name: &str) -> Option<String> {
    req.headers()
        .get_all(COOKIE)
        .iter()
        .filter_map(|header| header.to_str().ok())
        .flat_map(|header| header.split(';'))
        .find_map(|cookie| {
            let mut parts = cookie.trim().splitn(2, '=');
            match (parts.next(), parts.next()) {
                (Some(key), Some(value)) if key == name => Some(value.to_string()),
                _ => None,
            }
        })
}
