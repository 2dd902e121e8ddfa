//! Database connection management
//!
//! Provides database connection pooling, migrations and health checks.

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use std::sync::Arc;

/// Type alias for the database connection pool
pub type DatabasePool = SqlitePool;

/// Database connection wrapper
#[derive(Clone)]
pub struct DatabaseConnection {
    pool: Arc<DatabasePool>,
}

impl DatabaseConnection {
    /// Create a new database connection from a connection string
    ///
    /// # Arguments
    /// * `database_url` - SQLite connection string (e.g., "sqlite://breakdowns.db" or "sqlite::memory:")
    ///
    /// The database file is created if it does not exist.
    pub async fn new(database_url: &str) -> Result<Self, sqlx::Error> {
        Self::with_max_connections(database_url, 5).await
    }

    /// Create a new database connection with custom pool size
    ///
    /// In-memory databases are private to each connection, so they need
    /// `max_connections = 1` to see their own schema.
    pub async fn with_max_connections(
        database_url: &str,
        max_connections: u32,
    ) -> Result<Self, sqlx::Error> {
        let options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await?;

        Ok(Self {
            pool: Arc::new(pool),
        })
    }

    /// Get a reference to the connection pool
    pub fn pool(&self) -> &DatabasePool {
        &self.pool
    }

    /// Run migrations on the database
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations")
            .run(self.pool.as_ref())
            .await
    }

    /// Perform a health check by running a simple query
    pub async fn health_check(&self) -> Result<(), sqlx::Error> {
        sqlx::query("SELECT 1")
            .fetch_one(self.pool.as_ref())
            .await?;

        Ok(())
    }

    /// Close the connection pool gracefully
    pub async fn close(self) {
        self.pool.close().await;
    }
}
