//! Embedded schema migrations.
//!
//! Migrations run on a short-lived blocking `PgConnection` before the async
//! pool is built, so the pool never observes a half-migrated schema.

use diesel::{Connection, PgConnection};
use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};
use tracing::info;

const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// Errors raised while applying migrations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MigrationError {
    /// The migration connection could not be established.
    #[error("failed to connect for migrations: {message}")]
    Connect {
        /// Underlying connection message.
        message: String,
    },
    /// A migration failed to apply.
    #[error("database migration failed: {message}")]
    Apply {
        /// Underlying harness message.
        message: String,
    },
    /// The blocking migration task panicked or was cancelled.
    #[error("migration task did not complete: {message}")]
    Join {
        /// Join failure description.
        message: String,
    },
}

/// Apply all pending migrations to `database_url`, blocking the caller.
///
/// Returns the number of migrations applied.
pub fn apply_migrations(database_url: &str) -> Result<usize, MigrationError> {
    let mut connection =
        PgConnection::establish(database_url).map_err(|error| MigrationError::Connect {
            message: error.to_string(),
        })?;
    let applied = connection
        .run_pending_migrations(MIGRATIONS)
        .map_err(|error| MigrationError::Apply {
            message: error.to_string(),
        })?;
    for version in &applied {
        info!(%version, "applied migration");
    }
    Ok(applied.len())
}

/// Apply migrations on the blocking thread pool.
pub async fn apply_migrations_async(database_url: String) -> Result<usize, MigrationError> {
    tokio::task::spawn_blocking(move || apply_migrations(&database_url))
        .await
        .map_err(|error| MigrationError::Join {
            message: error.to_string(),
        })?
}
