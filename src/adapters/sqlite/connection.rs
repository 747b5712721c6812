//! SQLite connection pooling.
//!
//! Pools open in WAL mode with foreign keys enforced; a generous busy
//! timeout absorbs writer contention from concurrent event recorders.

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use thiserror::Error;

use crate::domain::models::DatabaseConfig;

const BUSY_TIMEOUT: Duration = Duration::from_secs(30);
const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(3);

#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("Invalid database URL '{0}'")]
    InvalidUrl(String),
    #[error("Could not create the database directory: {0}")]
    CreateDirectory(#[source] std::io::Error),
    #[error("Could not open the connection pool: {0}")]
    OpenPool(#[source] sqlx::Error),
    #[error("Database connection check failed: {0}")]
    Check(#[source] sqlx::Error),
}

/// Pool sizing, normally taken from the database section of the config.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    pub max_connections: u32,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self { max_connections: 10 }
    }
}

impl From<&DatabaseConfig> for PoolConfig {
    fn from(config: &DatabaseConfig) -> Self {
        Self { max_connections: config.max_connections }
    }
}

pub async fn create_pool(
    database_url: &str,
    config: PoolConfig,
) -> Result<SqlitePool, ConnectionError> {
    prepare_parent_directory(database_url)?;

    let options = SqliteConnectOptions::from_str(database_url)
        .map_err(|_| ConnectionError::InvalidUrl(database_url.to_string()))?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal)
        .foreign_keys(true)
        .busy_timeout(BUSY_TIMEOUT);

    SqlitePoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(ACQUIRE_TIMEOUT)
        .connect_with(options)
        .await
        .map_err(ConnectionError::OpenPool)
}

/// An in-memory pool for tests. Capped at one connection, since each new
/// connection to `:memory:` would otherwise see its own empty database.
pub async fn create_test_pool() -> Result<SqlitePool, ConnectionError> {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")
        .map_err(|_| ConnectionError::InvalidUrl("sqlite::memory:".to_string()))?
        .foreign_keys(true)
        .shared_cache(true);

    SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await
        .map_err(ConnectionError::OpenPool)
}

/// Liveness check, run right after opening a pool.
pub async fn verify_connection(pool: &SqlitePool) -> Result<(), ConnectionError> {
    sqlx::query("SELECT 1")
        .execute(pool)
        .await
        .map_err(ConnectionError::Check)?;
    Ok(())
}

fn prepare_parent_directory(database_url: &str) -> Result<(), ConnectionError> {
    let path = database_url
        .strip_prefix("sqlite://")
        .or_else(|| database_url.strip_prefix("sqlite:"))
        .unwrap_or(database_url);
    if path.is_empty() || path.starts_with(':') {
        return Ok(());
    }

    match Path::new(path).parent() {
        Some(parent) if !parent.as_os_str().is_empty() && !parent.exists() => {
            std::fs::create_dir_all(parent).map_err(ConnectionError::CreateDirectory)
        }
        _ => Ok(()),
    }
}
