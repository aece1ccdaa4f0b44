//! Database layer for Lendrate
//!
//! Provides:
//! - SeaORM entity models
//! - The `RateStore` abstraction with Postgres and in-memory backends
//! - Connection pool management and schema setup

mod memory;
pub mod models;
mod repository;
mod store;

pub use memory::MemoryRateStore;
pub use repository::PgRateStore;
pub use store::RateStore;

use crate::config::DatabaseConfig;
use crate::errors::{AppError, Result};
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Bundled schema, applied by [`DbPool::migrate`]
const SCHEMA_SQL: &str = include_str!("../../migrations/0001_rate_ranges.sql");

/// Database connection pool wrapper
#[derive(Clone)]
pub struct DbPool {
    /// Primary connection (for writes)
    pub primary: DatabaseConnection,

    /// Read replica connection (optional)
    pub replica: Option<DatabaseConnection>,
}

fn connect_options(url: &str, config: &DatabaseConfig) -> ConnectOptions {
    let mut opts = ConnectOptions::new(url);
    opts.max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
        .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
        .sqlx_logging(true);
    opts
}

impl DbPool {
    /// Create a new database pool from configuration
    pub async fn new(config: &DatabaseConfig) -> Result<Self> {
        info!("Connecting to primary database...");

        let primary = Database::connect(connect_options(&config.url, config))
            .await
            .map_err(|e| AppError::DatabaseConnection {
                message: format!("Failed to connect to primary: {}", e)
            })?;

        // Connect to replica if configured
        let replica = if let Some(ref read_url) = config.read_url {
            info!("Connecting to read replica...");

            let replica_conn = Database::connect(connect_options(read_url, config))
                .await
                .map_err(|e| AppError::DatabaseConnection {
                    message: format!("Failed to connect to replica: {}", e)
                })?;

            Some(replica_conn)
        } else {
            None
        };

        info!("Database connections established");

        Ok(Self { primary, replica })
    }

    /// Get the connection for reads (replica if available, otherwise primary)
    pub fn read(&self) -> &DatabaseConnection {
        self.replica.as_ref().unwrap_or(&self.primary)
    }

    /// Get the connection for writes (always primary)
    pub fn write(&self) -> &DatabaseConnection {
        &self.primary
    }

    /// Create the rate tables and their constraints if missing
    pub async fn migrate(&self) -> Result<()> {
        info!("Applying database schema...");

        self.primary
            .execute_unprepared(SCHEMA_SQL)
            .await
            .map_err(|e| AppError::DatabaseConnection {
                message: format!("Schema setup failed: {}", e),
            })?;

        Ok(())
    }

    /// Ping the database to check connectivity
    pub async fn ping(&self) -> Result<()> {
        self.primary
            .execute_unprepared("SELECT 1")
            .await
            .map_err(|e| AppError::DatabaseConnection {
                message: format!("Primary ping failed: {}", e),
            })?;

        if let Some(ref replica) = self.replica {
            replica
                .execute_unprepared("SELECT 1")
                .await
                .map_err(|e| AppError::DatabaseConnection {
                    message: format!("Replica ping failed: {}", e),
                })?;
        }

        Ok(())
    }
}

/// Open the store selected by configuration
pub async fn open_store(config: &DatabaseConfig) -> Result<Arc<dyn RateStore>> {
    if config.is_memory() {
        info!("Using in-memory rate store");
        return Ok(Arc::new(MemoryRateStore::new()));
    }

    let pool = DbPool::new(config).await?;
    if config.run_migrations {
        pool.migrate().await?;
    }

    Ok(Arc::new(PgRateStore::new(pool)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_carries_exclusion_constraint() {
        assert!(SCHEMA_SQL.contains("EXCLUDE USING gist"));
        assert!(SCHEMA_SQL.contains("WHERE (is_active)"));
    }

    #[tokio::test]
    async fn test_memory_url_opens_memory_store() {
        let config = DatabaseConfig {
            url: crate::config::MEMORY_DATABASE_URL.to_string(),
            read_url: None,
            max_connections: 1,
            min_connections: 1,
            connect_timeout_secs: 1,
            idle_timeout_secs: 1,
            run_migrations: true,
        };
        let store = open_store(&config).await.unwrap();
        assert_eq!(store.backend(), "memory");
        assert!(store.ping().await.is_ok());
    }
}
