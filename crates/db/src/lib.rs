use std::{str::FromStr, time::Duration};

use sqlx::{
    Error, SqlitePool,
    migrate::Migrator,
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions},
};
use tracing::{info, warn};
use utils::config::AppConfig;

pub mod models;

static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Database handle shared by every request.
///
/// When persistence is disabled there is no pool at all; callers check
/// [`DBService::pool`] and fall back to their static defaults.
#[derive(Clone, Debug)]
pub struct DBService {
    pool: Option<SqlitePool>,
}

impl DBService {
    /// Connect according to the configuration, or return a disabled service.
    pub async fn from_config(config: &AppConfig) -> Result<Self, Error> {
        match (config.persistence_enabled, config.database_url.as_deref()) {
            (true, Some(url)) => Self::new(url).await,
            (true, None) => {
                warn!("Persistence requested but no connection string is configured; running in fallback mode");
                Ok(Self::disabled())
            }
            (false, _) => {
                info!("Persistence disabled; running in fallback mode");
                Ok(Self::disabled())
            }
        }
    }

    /// Open a pool for `database_url` and bring the schema up to date.
    pub async fn new(database_url: &str) -> Result<Self, Error> {
        let options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .foreign_keys(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(8)
            .connect_with(options)
            .await?;

        Self::with_pool(pool).await
    }

    /// A private in-memory database. One connection, kept alive for the pool's lifetime.
    pub async fn new_in_memory() -> Result<Self, Error> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        Self::with_pool(pool).await
    }

    async fn with_pool(pool: SqlitePool) -> Result<Self, Error> {
        MIGRATOR.run(&pool).await?;
        info!("Database schema initialised");
        Ok(Self { pool: Some(pool) })
    }

    pub fn disabled() -> Self {
        Self { pool: None }
    }

    pub fn pool(&self) -> Option<&SqlitePool> {
        self.pool.as_ref()
    }

    pub fn persistence_enabled(&self) -> bool {
        self.pool.is_some()
    }

    pub async fn close(&self) {
        if let Some(pool) = &self.pool {
            pool.close().await;
        }
    }
}
