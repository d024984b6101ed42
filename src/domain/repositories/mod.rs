//! Repository trait definitions for the domain layer.
//!
//! Two typed contracts replace a single value-agnostic store: one for URL
//! records, one for user URL-id lists. Both are implemented twice in
//! `crate::infrastructure::persistence` (in-memory and PostgreSQL), and the
//! backend is chosen once at startup.
//!
//! # Available Repositories
//!
//! - [`UrlRepository`] - Shortened URL records
//! - [`UserRepository`] - Per-user ordered URL-id lists
//!
//! # Testing
//!
//! Mock implementations are generated via `mockall` under `cfg(test)`.

pub mod error;
pub mod url_repository;
pub mod user_repository;

pub use error::{RepositoryError, RepositoryResult};
pub use url_repository::UrlRepository;
pub use user_repository::UserRepository;

#[cfg(test)]
pub use url_repository::MockUrlRepository;
#[cfg(test)]
pub use user_repository::MockUserRepository;
