//! Embedded schema migrations.
//!
//! Applied versions are tracked in a `schema_migrations` table so reruns are
//! no-ops. Each migration applies its SQL and records its version inside one
//! transaction.

use sqlx::SqlitePool;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("Migration {version} failed: {source}")]
    Apply {
        version: i64,
        #[source]
        source: sqlx::Error,
    },
    #[error("Could not read schema version: {0}")]
    Version(#[source] sqlx::Error),
}

#[derive(Debug, Clone, Copy)]
pub struct Migration {
    pub version: i64,
    pub description: &'static str,
    pub sql: &'static str,
}

/// The full embedded migration set, in version order.
pub fn embedded_migrations() -> Vec<Migration> {
    vec![Migration {
        version: 1,
        description: "tests, variants, and the event log",
        sql: include_str!("../../../migrations/001_initial_schema.sql"),
    }]
}

pub struct Migrator {
    pool: SqlitePool,
}

impl Migrator {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Apply every embedded migration newer than the recorded version and
    /// return how many ran.
    pub async fn run(&self) -> Result<usize, MigrationError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS schema_migrations (
                version INTEGER PRIMARY KEY,
                description TEXT,
                applied_at TEXT NOT NULL DEFAULT (datetime('now'))
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(MigrationError::Version)?;

        let current = self.current_version().await?;
        let mut applied = 0;
        for migration in embedded_migrations() {
            if migration.version > current {
                self.apply(migration).await?;
                applied += 1;
            }
        }
        Ok(applied)
    }

    pub async fn current_version(&self) -> Result<i64, MigrationError> {
        let (version,): (i64,) =
            sqlx::query_as("SELECT COALESCE(MAX(version), 0) FROM schema_migrations")
                .fetch_one(&self.pool)
                .await
                .map_err(MigrationError::Version)?;
        Ok(version)
    }

    async fn apply(&self, migration: Migration) -> Result<(), MigrationError> {
        let version = migration.version;
        let fail = move |source| MigrationError::Apply { version, source };

        let mut tx = self.pool.begin().await.map_err(fail)?;
        sqlx::raw_sql(migration.sql)
            .execute(&mut *tx)
            .await
            .map_err(fail)?;
        sqlx::query("INSERT INTO schema_migrations (version, description) VALUES (?, ?)")
            .bind(migration.version)
            .bind(migration.description)
            .execute(&mut *tx)
            .await
            .map_err(fail)?;
        tx.commit().await.map_err(fail)
    }
}
