//! SQLite persistence: connection bootstrap, embedded migrations,
//! models and repositories.

pub mod models;
pub mod repositories;

use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use tracing::info;

/// Type alias for the database connection pool.
pub type DatabasePool = SqlitePool;

/// Database connection wrapper.
#[derive(Clone, Debug)]
pub struct Database {
    pool: DatabasePool,
}

impl Database {
    /// Connect to the database named by a `sqlite:` DSN, creating the
    /// file when missing.
    pub async fn connect(database_url: &str) -> Result<Self, sqlx::Error> {
        let options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .foreign_keys(true)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        info!(url = %database_url, "database connection established");
        Ok(Self { pool })
    }

    /// Run embedded migrations.
    pub async fn run_migrations(&self) -> Result<(), sqlx::Error> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| sqlx::Error::Migrate(Box::new(e)))?;
        info!("database migrations completed");
        Ok(())
    }

    /// Connect and migrate in one step.
    pub async fn initialize(database_url: &str) -> Result<Self, sqlx::Error> {
        let db = Self::connect(database_url).await?;
        db.run_migrations().await?;
        Ok(db)
    }

    /// In-memory database with migrations applied.
    ///
    /// Single connection: every new in-memory SQLite connection is a
    /// fresh database, so the pool must not grow.
    pub async fn test_in_memory() -> Result<Self, sqlx::Error> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;
        let db = Self { pool };
        db.run_migrations().await?;
        Ok(db)
    }

    pub fn pool(&self) -> &DatabasePool {
        &self.pool
    }

    pub async fn health_check(&self) -> Result<(), sqlx::Error> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

/// Current timestamp in the storage format (RFC3339).
pub fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn in_memory_database_migrates_and_answers() {
        let db = Database::test_in_memory().await.unwrap();
        db.health_check().await.unwrap();
    }

    #[tokio::test]
    async fn file_database_is_created_on_demand() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("weave.db");
        let url = format!("sqlite:{}", path.display());
        let db = Database::initialize(&url).await.unwrap();
        db.health_check().await.unwrap();
        assert!(path.exists());
    }
}
