//! Repository implementations.
//!
//! # Backends
//!
//! - [`MemoryUrlRepository`] / [`MemoryUserRepository`] - concurrent maps; the
//!   URL store can be mirrored to a JSON-lines [`BackupLog`]
//! - [`PgUrlRepository`] / [`PgUserRepository`] - PostgreSQL tables with
//!   soft-delete through the batched [`DeletePipeline`]
//!
//! [`init_repositories`] picks one of them at startup.

pub mod backup_log;
pub mod delete_pipeline;
pub mod factory;
pub mod memory_url_repository;
pub mod memory_user_repository;
pub mod pg_schema;
pub mod pg_url_repository;
pub mod pg_user_repository;

pub use backup_log::{BackupLog, BackupRecord};
pub use delete_pipeline::{DeletePipeline, DeleteSettings};
pub use factory::{Backend, Repositories, init_repositories};
pub use memory_url_repository::MemoryUrlRepository;
pub use memory_user_repository::MemoryUserRepository;
pub use pg_schema::ensure_schema;
pub use pg_url_repository::PgUrlRepository;
pub use pg_user_repository::PgUserRepository;
