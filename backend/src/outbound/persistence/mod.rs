//! PostgreSQL persistence using Diesel ORM.
//!
//! Every collection lives in the single `documents` table, so one adapter
//! serves the whole [`DocumentStore`](crate::domain::ports::DocumentStore)
//! port. Row structs and the schema stay private to this module.
//!
//! ```ignore
//! use workload_backend::outbound::persistence::{DbPool, DieselDocumentStore, PoolConfig};
//!
//! let pool = DbPool::new(PoolConfig::new("postgres://localhost/workload")).await?;
//! let store = DieselDocumentStore::new(pool);
//! ```

mod diesel_document_store;
mod diesel_error_mapping;
mod models;
mod pool;
mod schema;
mod schema_migrations;

pub use diesel_document_store::DieselDocumentStore;
pub use pool::{DbPool, PoolConfig, PoolError};
pub use schema_migrations::{MIGRATIONS, SchemaMigrationError, run_schema_migrations};
