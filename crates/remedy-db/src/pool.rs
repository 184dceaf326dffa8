//! # Database Handle & Pool
//!
//! Owns the SQLite connection pool and hands out repositories.
//!
//! ## Startup Sequence
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  DbConfig::new("./remedy.db")    pick the file, tune the pool          │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Database::new(config).await     open pool, apply pending migrations   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  db.batches() / db.sales() / db.shifts()                               │
//! │       typed repositories, each borrowing a pooled connection           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The pool runs SQLite in WAL mode so history reads (sales listing, return
//! log) never block the checkout path. A handful of connections is plenty
//! for one terminal; the default of 5 leaves headroom for background reads.

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::migrations;
use crate::repository::batch::BatchRepository;
use crate::repository::sale::SaleRepository;
use crate::repository::shift::ShiftRepository;

// =============================================================================
// Configuration
// =============================================================================

/// Pool and file settings for one terminal's database.
///
/// Built with a small builder so call sites only name what they change:
///
/// ```rust,ignore
/// let config = DbConfig::new("./data/remedy.db").max_connections(8);
/// ```
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// Where the SQLite file lives. Created on first open.
    pub database_path: PathBuf,

    /// Upper bound on pooled connections (default 5).
    pub max_connections: u32,

    /// Connections kept warm even when idle (default 1).
    pub min_connections: u32,

    /// How long to wait for a free connection before giving up (default 30s).
    pub connect_timeout: Duration,

    /// Idle connections above the minimum are dropped after this (default 10m).
    pub idle_timeout: Duration,

    /// Apply pending migrations during `Database::new` (default true).
    pub run_migrations: bool,
}

impl DbConfig {
    /// Configuration for a database at `path`, with terminal-sized defaults.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        DbConfig {
            database_path: path.into(),
            max_connections: 5,
            min_connections: 1,
            connect_timeout: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(600),
            run_migrations: true,
        }
    }

    /// Overrides the pooled-connection ceiling.
    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    /// Overrides the warm-connection floor.
    pub fn min_connections(mut self, min: u32) -> Self {
        self.min_connections = min;
        self
    }

    /// Overrides the acquire timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Enables or disables automatic migrations on open.
    pub fn run_migrations(mut self, run: bool) -> Self {
        self.run_migrations = run;
        self
    }

    /// An isolated in-memory database for tests.
    ///
    /// Pinned to a single connection: every pooled connection of an
    /// in-memory SQLite database would otherwise see its own empty store.
    pub fn in_memory() -> Self {
        DbConfig {
            database_path: PathBuf::from(":memory:"),
            max_connections: 1,
            min_connections: 1,
            connect_timeout: Duration::from_secs(5),
            idle_timeout: Duration::from_secs(60),
            run_migrations: true,
        }
    }

    /// SQLite options derived from this configuration.
    fn connect_options(&self) -> SqliteConnectOptions {
        SqliteConnectOptions::new()
            .filename(&self.database_path)
            .create_if_missing(true)
            // WAL keeps history reads off the checkout path's back.
            .journal_mode(SqliteJournalMode::Wal)
            // NORMAL is corruption-safe under WAL; at worst the last
            // transaction is lost on power failure.
            .synchronous(SqliteSynchronous::Normal)
    }
}

// =============================================================================
// Database
// =============================================================================

/// Handle over the pool; the root object the terminal service is built on.
///
/// Cloning is cheap (the pool is internally shared), so the handle can be
/// passed to every flow that needs storage.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Opens (creating if necessary) the database and prepares it for use.
    ///
    /// Applies pending migrations unless the config disables them, so a
    /// freshly created file is immediately usable.
    pub async fn new(config: DbConfig) -> DbResult<Self> {
        info!(path = %config.database_path.display(), "Opening database");

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(config.connect_timeout)
            .idle_timeout(Some(config.idle_timeout))
            .connect_with(config.connect_options())
            .await
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?;

        debug!(max_connections = config.max_connections, "Pool ready");

        let db = Database { pool };

        if config.run_migrations {
            db.run_migrations().await?;
        }

        Ok(db)
    }

    /// Applies any migrations not yet recorded in `_sqlx_migrations`.
    ///
    /// Idempotent; `new()` calls this automatically unless disabled.
    pub async fn run_migrations(&self) -> DbResult<()> {
        migrations::run_migrations(&self.pool).await
    }

    /// The raw pool, for queries the repositories don't cover.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Catalog batch records (the read side of FEFO selection).
    pub fn batches(&self) -> BatchRepository {
        BatchRepository::new(self.pool.clone())
    }

    /// Sales, returns, and the atomic commit points.
    pub fn sales(&self) -> SaleRepository {
        SaleRepository::new(self.pool.clone())
    }

    /// Shift ledgers and the open-shift pointer.
    pub fn shifts(&self) -> ShiftRepository {
        ShiftRepository::new(self.pool.clone())
    }

    /// Drains and closes the pool. Repository calls fail afterwards.
    pub async fn close(&self) {
        info!("Closing database pool");
        self.pool.close().await;
    }

    /// True when the database still answers queries.
    pub async fn health_check(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.pool).await.is_ok()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_in_memory_open_and_health() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        assert!(db.health_check().await);
    }

    #[tokio::test]
    async fn test_builder_overrides() {
        let config = DbConfig::new("/tmp/remedy-test.db")
            .max_connections(10)
            .min_connections(2)
            .run_migrations(false);

        assert_eq!(config.max_connections, 10);
        assert_eq!(config.min_connections, 2);
        assert!(!config.run_migrations);
    }

    #[tokio::test]
    async fn test_migrations_applied_on_open() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        // The records table from the initial migration must exist
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM records")
                .fetch_one(db.pool())
                .await
                .unwrap();
        assert_eq!(count, 0);
    }
}
