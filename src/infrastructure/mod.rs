//! Infrastructure layer.
//!
//! Implements the domain repository traits against concrete storage.
//!
//! # Modules
//!
//! - [`persistence`] - In-memory and PostgreSQL repositories, backup log,
//!   batched soft-delete and backend selection

pub mod persistence;
