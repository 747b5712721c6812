//! SQLite database adapters for the splitlab experiment engine.

pub mod connection;
pub mod event_repository;
pub mod migrations;
pub mod test_repository;

pub use connection::{create_pool, create_test_pool, verify_connection, ConnectionError, PoolConfig};
pub use event_repository::SqliteEventRepository;
pub use migrations::{embedded_migrations, Migration, MigrationError, Migrator};
pub use test_repository::SqliteTestRepository;

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::domain::errors::{EngineError, EngineResult};
use crate::domain::models::DatabaseConfig;

/// Parse a UUID string from a SQLite row field.
pub fn parse_uuid(s: &str) -> EngineResult<Uuid> {
    Uuid::parse_str(s).map_err(|e| EngineError::Serialization(e.to_string()))
}

/// Parse an RFC3339 datetime string from a SQLite row field.
pub fn parse_datetime(s: &str) -> EngineResult<DateTime<Utc>> {
    chrono::DateTime::parse_from_rfc3339(s)
        .map_err(|e| EngineError::Serialization(e.to_string()))
        .map(|dt| dt.with_timezone(&Utc))
}

#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("Connection error: {0}")]
    Connection(#[from] ConnectionError),
    #[error("Migration error: {0}")]
    Migration(#[from] MigrationError),
    #[error("Query error: {0}")]
    Query(#[from] sqlx::Error),
}

pub async fn initialize_database(database_url: &str) -> Result<SqlitePool, DatabaseError> {
    let pool = create_pool(database_url, PoolConfig::default()).await?;
    Migrator::new(pool.clone()).run().await?;
    Ok(pool)
}

/// Open the configured database file with its pool settings and bring the
/// schema up to date.
pub async fn initialize_configured_database(
    config: &DatabaseConfig,
) -> Result<SqlitePool, DatabaseError> {
    let url = format!("sqlite:{}", config.path);
    let pool = create_pool(&url, PoolConfig::from(config)).await?;
    verify_connection(&pool).await?;
    Migrator::new(pool.clone()).run().await?;
    Ok(pool)
}

/// Create an in-memory test pool with all migrations applied.
pub async fn create_migrated_test_pool() -> Result<SqlitePool, DatabaseError> {
    let pool = create_test_pool().await?;
    Migrator::new(pool.clone()).run().await?;
    Ok(pool)
}
