//! Application layer services.
//!
//! Services consume the repository traits and give HTTP handlers an API in
//! terms of URLs, short URLs and users.
//!
//! # Available Services
//!
//! - [`services::shortener_service::ShortenerService`] - Shortening, redirects
//!   and per-user listings
//! - [`services::auth_service::UserTokenSigner`] - Signed user tokens
pub mod services;
