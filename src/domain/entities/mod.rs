//! Core domain entities.
//!
//! - [`ShortId`] - Content-derived identifier of a stored URL
//! - [`Insertion`] / [`BatchInsertion`] - Outcome of storing URLs, including
//!   the non-fatal duplicate signal
//! - [`OwnedUrl`] - A URL listed for the user who shortened it

pub mod short_url;
pub mod user;

pub use short_url::{BatchInsertion, Insertion, ShortId};
pub use user::OwnedUrl;
