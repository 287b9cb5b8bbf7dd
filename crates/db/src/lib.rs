//! SQLite access for bookshelf: pool construction, explicit shutdown and the
//! module migration runner.

use std::str::FromStr;

use anyhow::Context;
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;

use bookshelf_kernel::settings::DatabaseSettings;
use bookshelf_kernel::{InitCtx, Module, ModuleRegistry};

mod migrate;

pub use migrate::{applied_migrations, migrate, MIGRATIONS_TABLE};

/// Handle to the relational store shared by every module.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Open a pool against `settings.url`, creating the database file when it
    /// does not exist yet.
    pub async fn connect(settings: &DatabaseSettings) -> anyhow::Result<Self> {
        let options = SqliteConnectOptions::from_str(&settings.url)
            .with_context(|| format!("invalid database url '{}'", settings.url))?
            .create_if_missing(true)
            .foreign_keys(true);

        // An in-memory database lives and dies with its connection, so it
        // gets exactly one that is never recycled.
        let pool_options = if settings.is_in_memory() {
            SqlitePoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(settings.max_connections.max(1))
        };

        let pool = pool_options
            .connect_with(options)
            .await
            .with_context(|| format!("failed to connect to '{}'", settings.url))?;

        tracing::info!(target: "bookshelf-db", url = %settings.url, "database connected");
        Ok(Self { pool })
    }

    /// Borrow the underlying pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Apply every pending module migration.
    pub async fn migrate(&self, registry: &ModuleRegistry) -> anyhow::Result<usize> {
        migrate(&self.pool, registry).await
    }

    /// Verify the store answers queries.
    pub async fn ping(&self) -> anyhow::Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .context("database ping failed")?;
        Ok(())
    }

    /// Close every pooled connection. Pending queries finish first.
    pub async fn close(&self) {
        if !self.pool.is_closed() {
            self.pool.close().await;
            tracing::info!(target: "bookshelf-db", "database closed");
        }
    }
}

/// Core module owning the database lifecycle: checks connectivity on init and
/// closes the pool on stop.
pub struct DatabaseModule {
    database: Database,
}

impl DatabaseModule {
    pub fn new(database: Database) -> Self {
        Self { database }
    }
}

#[async_trait]
impl Module for DatabaseModule {
    fn name(&self) -> &'static str {
        "db"
    }

    async fn init(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        self.database.ping().await
    }

    async fn stop(&self) -> anyhow::Result<()> {
        self.database.close().await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn in_memory_database_answers_ping() {
        let db = Database::connect(&DatabaseSettings::in_memory())
            .await
            .unwrap();
        db.ping().await.unwrap();
    }

    #[tokio::test]
    async fn in_memory_database_keeps_state_across_queries() {
        let db = Database::connect(&DatabaseSettings::in_memory())
            .await
            .unwrap();
        sqlx::query("CREATE TABLE t (v INTEGER)")
            .execute(db.pool())
            .await
            .unwrap();
        sqlx::query("INSERT INTO t (v) VALUES (1)")
            .execute(db.pool())
            .await
            .unwrap();
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM t")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn database_module_stop_closes_pool() {
        let db = Database::connect(&DatabaseSettings::in_memory())
            .await
            .unwrap();
        let module = DatabaseModule::new(db.clone());
        module.stop().await.unwrap();
        assert!(db.pool().is_closed());
        assert!(db.ping().await.is_err());
    }
}
