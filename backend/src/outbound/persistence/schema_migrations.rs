//! Embedded Diesel schema migrations.
//!
//! These create the `documents` table. They are distinct from the data
//! migrations in [`crate::domain::migrations`], which rewrite stored bodies.

use diesel::Connection;
use diesel::pg::PgConnection;
use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};
use tracing::info;

/// Migrations compiled in from `backend/migrations`.
pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// Errors raised while applying schema migrations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchemaMigrationError {
    /// The database could not be reached.
    #[error("failed to connect for schema migrations: {message}")]
    Connect { message: String },
    /// A migration failed to apply.
    #[error("schema migration failed: {message}")]
    Apply { message: String },
    /// The blocking migration task did not finish.
    #[error("schema migration task aborted: {message}")]
    Aborted { message: String },
}

fn apply_blocking(database_url: &str) -> Result<usize, SchemaMigrationError> {
    let mut conn = PgConnection::establish(database_url).map_err(|err| {
        SchemaMigrationError::Connect {
            message: err.to_string(),
        }
    })?;
    let applied = conn
        .run_pending_migrations(MIGRATIONS)
        .map_err(|err| SchemaMigrationError::Apply {
            message: err.to_string(),
        })?;
    Ok(applied.len())
}

/// Apply pending schema migrations, returning how many ran.
///
/// The migration harness is synchronous, so it runs on the blocking pool.
pub async fn run_schema_migrations(database_url: &str) -> Result<usize, SchemaMigrationError> {
    let url = database_url.to_owned();
    let applied = tokio::task::spawn_blocking(move || apply_blocking(&url))
        .await
        .map_err(|err| SchemaMigrationError::Aborted {
            message: err.to_string(),
        })??;
    info!(applied, "schema migrations up to date");
    Ok(applied)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[tokio::test]
    async fn unreachable_databases_report_connection_errors() {
        let err = run_schema_migrations("postgres://invalid@127.0.0.1:1/none")
            .await
            .expect_err("no server listens on port 1");
        assert!(matches!(err, SchemaMigrationError::Connect { .. }));
    }
}
