//! User-owned URL listing entry.

use url::Url;

/// A stored URL as listed for the user who shortened it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnedUrl {
    pub id: String,
    pub original_url: Url,
}

impl OwnedUrl {
    pub fn new(id: impl Into<String>, original_url: Url) -> Self {
        Self {
            id: id.into(),
            original_url,
        }
    }
}
