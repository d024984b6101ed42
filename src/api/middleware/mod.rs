//! HTTP middleware for request processing.
//!
//! Provides user identification and observability middleware.

pub mod auth;
pub mod tracing;

pub use auth::CurrentUser;
