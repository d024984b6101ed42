//! Content-addressed short id derivation.

use sha1::{Digest, Sha1};
use url::Url;

use crate::domain::entities::ShortId;

/// Number of hex characters kept from the digest (20 bits of id space).
pub const SHORT_ID_LEN: usize = 5;

/// Derives the short id for a URL from its serialized form.
///
/// The id is the first [`SHORT_ID_LEN`] lowercase hex characters of the SHA-1
/// digest of `url.as_str()`. Distinct URLs may share an id; collisions are
/// resolved by the storage layer, not here.
pub fn hash(url: &Url) -> ShortId {
    hash_str(url.as_str())
}

/// Same as [`hash`] for an already serialized URL.
pub fn hash_str(input: &str) -> ShortId {
    let digest = Sha1::digest(input.as_bytes());
    let mut encoded = hex::encode(digest);
    encoded.truncate(SHORT_ID_LEN);
    ShortId::new_unchecked(encoded)
}
