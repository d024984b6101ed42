//! Domain layer containing business entities and storage contracts.
//!
//! # Architecture
//!
//! - [`context`] - Cancellation/deadline scope passed to every storage call
//! - [`entities`] - Core data structures
//! - [`hasher`] - Content-addressed short id derivation
//! - [`repositories`] - Storage trait definitions and error taxonomy
//!
//! The domain layer has no knowledge of HTTP. Repository traits are
//! implemented by the infrastructure layer and consumed by
//! [`crate::application::services`].

pub mod context;
pub mod entities;
pub mod hasher;
pub mod repositories;
