//! Database validation service backing the `db-test` endpoint

use serde::Serialize;
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::{info, warn};
use ts_rs::TS;

/// Tables the application reads and writes.
pub const REQUIRED_TABLES: [&str; 5] = ["chart_analyses", "pairs", "projects", "models", "videos"];

#[derive(Debug, Error)]
pub enum DatabaseValidationError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Database validator for ensuring schema is correct
pub struct DatabaseValidator<'a> {
    pool: &'a SqlitePool,
}

/// Outcome of a full check, as reported to the client.
#[derive(Debug, Clone, Serialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseReport {
    /// Server clock as seen by the database.
    pub now: String,
    #[ts(type = "number")]
    pub migrations_applied: i64,
    pub latest_migration: Option<String>,
    pub missing_tables: Vec<String>,
}

impl DatabaseReport {
    pub fn is_ok(&self) -> bool {
        self.migrations_applied > 0 && self.missing_tables.is_empty()
    }
}

impl<'a> DatabaseValidator<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Round trip to the database; returns its current timestamp.
    pub async fn probe(&self) -> Result<String, DatabaseValidationError> {
        let now = sqlx::query_scalar::<_, String>("SELECT strftime('%Y-%m-%dT%H:%M:%fZ', 'now')")
            .fetch_one(self.pool)
            .await?;
        Ok(now)
    }

    /// Number of successfully applied migrations; zero if the table is missing.
    pub async fn migrations_applied(&self) -> Result<i64, DatabaseValidationError> {
        let migrations_table_exists = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name='_sqlx_migrations'",
        )
        .fetch_one(self.pool)
        .await?
            > 0;

        if !migrations_table_exists {
            warn!("Database not initialized - _sqlx_migrations table does not exist");
            return Ok(0);
        }

        let applied =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM _sqlx_migrations WHERE success = 1")
                .fetch_one(self.pool)
                .await?;
        Ok(applied)
    }

    /// Validate that specific tables exist
    pub async fn validate_tables(
        &self,
        required_tables: &[&str],
    ) -> Result<Vec<String>, DatabaseValidationError> {
        let mut missing_tables = Vec::new();

        for table in required_tables {
            let exists = sqlx::query_scalar::<_, i64>(
                "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name=?",
            )
            .bind(*table)
            .fetch_one(self.pool)
            .await?
                > 0;

            if !exists {
                missing_tables.push(table.to_string());
            }
        }

        Ok(missing_tables)
    }

    /// Get the latest applied migration
    pub async fn latest_migration(&self) -> Result<Option<String>, DatabaseValidationError> {
        if self.migrations_applied().await? == 0 {
            return Ok(None);
        }
        let migration = sqlx::query_scalar::<_, String>(
            "SELECT description FROM _sqlx_migrations WHERE success = 1 ORDER BY version DESC LIMIT 1",
        )
        .fetch_optional(self.pool)
        .await?;

        Ok(migration)
    }

    pub async fn report(&self) -> Result<DatabaseReport, DatabaseValidationError> {
        let report = DatabaseReport {
            now: self.probe().await?,
            migrations_applied: self.migrations_applied().await?,
            latest_migration: self.latest_migration().await?,
            missing_tables: self.validate_tables(&REQUIRED_TABLES).await?,
        };

        if report.is_ok() {
            info!(
                migrations_applied = report.migrations_applied,
                "Database validation complete"
            );
        } else {
            warn!(
                migrations_applied = report.migrations_applied,
                missing_tables = ?report.missing_tables,
                "Database validation found problems"
            );
        }
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use db::DBService;
    use sqlx::sqlite::SqlitePoolOptions;

    use super::*;

    #[tokio::test]
    async fn migrated_database_passes() {
        let db = DBService::new_in_memory().await.unwrap();
        let report = DatabaseValidator::new(db.pool().unwrap())
            .report()
            .await
            .unwrap();
        assert!(report.is_ok());
        assert_eq!(report.migrations_applied, 1);
        assert_eq!(report.latest_migration.as_deref(), Some("init"));
        assert!(report.now.ends_with('Z'));
    }

    #[tokio::test]
    async fn empty_database_reports_missing_tables() {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        let report = DatabaseValidator::new(&pool).report().await.unwrap();
        assert!(!report.is_ok());
        assert_eq!(report.migrations_applied, 0);
        assert_eq!(report.latest_migration, None);
        assert_eq!(report.missing_tables.len(), REQUIRED_TABLES.len());
    }
}
