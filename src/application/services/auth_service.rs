//! Signed user tokens carried in the `auth` cookie.

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

const ID_LEN: usize = 8;
const TAG_LEN: usize = 32;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("signing key rejected")]
    InvalidKey,
    #[error("user id {0} is not numeric")]
    InvalidUserId(String),
    #[error("token is malformed")]
    Malformed,
    #[error("token signature does not match")]
    BadSignature,
}

/// Issues and verifies user tokens.
///
/// A token is the hex encoding of the big-endian user id followed by its
/// HMAC-SHA256 tag. Verification compares tags in constant time.
#[derive(Clone)]
pub struct UserTokenSigner {
    mac: HmacSha256,
}

impl UserTokenSigner {
    /// Creates a signer keyed by `secret`.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::InvalidKey`] if the key is rejected by the MAC.
    pub fn new(secret: &str) -> Result<Self, TokenError> {
        let mac =
            HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| TokenError::InvalidKey)?;
        Ok(Self { mac })
    }

    /// Signs a numeric user id.
    pub fn sign(&self, user_id: &str) -> Result<String, TokenError> {
        let id: u64 = user_id
            .parse()
            .map_err(|_| TokenError::InvalidUserId(user_id.to_owned()))?;
        let id_bytes = id.to_be_bytes();

        let mut mac = self.mac.clone();
        mac.update(&id_bytes);

        let mut raw = Vec::with_capacity(ID_LEN + TAG_LEN);
        raw.extend_from_slice(&id_bytes);
        raw.extend_from_slice(&mac.finalize().into_bytes());

        Ok(hex::encode(raw))
    }

    /// Returns the user id carried by a valid token.
    pub fn verify(&self, token: &str) -> Result<String, TokenError> {
        let raw = hex::decode(token).map_err(|_| TokenError::Malformed)?;
        if raw.len() != ID_LEN + TAG_LEN {
            return Err(TokenError::Malformed);
        }

        let (id_bytes, tag) = raw.split_at(ID_LEN);

        let mut mac = self.mac.clone();
        mac.update(id_bytes);
        mac.verify_slice(tag)
            .map_err(|_| TokenError::BadSignature)?;

        let mut id = [0u8; ID_LEN];
        id.copy_from_slice(id_bytes);
        Ok(u64::from_be_bytes(id).to_string())
    }
}

impl std::fmt::Debug for UserTokenSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserTokenSigner").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signer() -> UserTokenSigner {
        UserTokenSigner::new("test-signing-secret").unwrap()
    }

    #[test]
    fn test_sign_then_verify() {
        let signer = signer();

        let token = signer.sign("42").unwrap();

        assert_eq!(token.len(), (ID_LEN + TAG_LEN) * 2);
        assert!(token.starts_with("000000000000002a"));
        assert_eq!(signer.verify(&token).unwrap(), "42");
    }

    #[test]
    fn test_sign_is_deterministic() {
        let signer = signer();

        assert_eq!(signer.sign("7").unwrap(), signer.sign("7").unwrap());
        assert_ne!(signer.sign("7").unwrap(), signer.sign("8").unwrap());
    }

    #[test]
    fn test_tampered_id_is_rejected() {
        let signer = signer();
        let token = signer.sign("1").unwrap();
        let forged = format!("0000000000000002{}", &token[ID_LEN * 2..]);

        assert_eq!(signer.verify(&forged), Err(TokenError::BadSignature));
    }

    #[test]
    fn test_other_secret_is_rejected() {
        let token = signer().sign("1").unwrap();
        let other = UserTokenSigner::new("another-secret").unwrap();

        assert_eq!(other.verify(&token), Err(TokenError::BadSignature));
    }

    #[test]
    fn test_malformed_tokens() {
        let signer = signer();

        assert_eq!(signer.verify("not-hex"), Err(TokenError::Malformed));
        assert_eq!(signer.verify("abcd"), Err(TokenError::Malformed));
        assert_eq!(signer.verify(""), Err(TokenError::Malformed));
    }

    #[test]
    fn test_non_numeric_user_id() {
        assert_eq!(
            signer().sign("abc"),
            Err(TokenError::InvalidUserId("abc".into()))
        );
    }
}
