//! DTOs for the shortening endpoints.

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Request to shorten a single URL.
#[derive(Debug, Deserialize, Validate)]
pub struct ShortenRequest {
    #[validate(url(message = "Invalid URL format"))]
    pub url: String,
}

/// Response carrying the short URL.
#[derive(Debug, Serialize, Deserialize)]
pub struct ShortenResponse {
    pub result: String,
}

/// One entry of a batch request.
///
/// `correlation_id` is opaque to the service and echoed back unchanged.
#[derive(Debug, Deserialize, Validate)]
pub struct BatchItem {
    pub correlation_id: String,

    #[validate(url(message = "Invalid URL format"))]
    pub original_url: String,
}

/// One entry of a batch response, in request order.
#[derive(Debug, Serialize, Deserialize)]
pub struct BatchResultItem {
    pub correlation_id: String,
    pub short_url: String,
}
