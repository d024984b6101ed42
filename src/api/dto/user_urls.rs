//! DTOs for the per-user URL endpoints.

use serde::{Deserialize, Serialize};

use crate::application::services::shortener_service::UserUrl;

/// A URL the caller has shortened.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserUrlItem {
    pub short_url: String,
    pub original_url: String,
}

impl From<UserUrl> for UserUrlItem {
    fn from(url: UserUrl) -> Self {
        Self {
            short_url: url.short_url,
            original_url: url.original_url,
        }
    }
}
