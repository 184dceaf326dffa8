//! # Embedded Migrations
//!
//! Schema files from `migrations/sqlite/` are compiled into the binary via
//! `sqlx::migrate!`, so a deployed terminal needs no SQL files on disk.
//! On startup the migrator compares the embedded set against the
//! `_sqlx_migrations` bookkeeping table and applies whatever is pending,
//! each file inside its own transaction.
//!
//! Adding schema changes: drop a new `NNN_description.sql` next to the
//! existing ones (next sequence number) and never edit an applied file;
//! the migrator checksums them.

use sqlx::SqlitePool;
use tracing::info;

use crate::error::DbResult;

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations/sqlite");

/// Applies every pending migration, in filename order.
pub async fn run_migrations(pool: &SqlitePool) -> DbResult<()> {
    MIGRATOR.run(pool).await?;
    info!(
        embedded = MIGRATOR.migrations.len(),
        "Schema migrations up to date"
    );
    Ok(())
}

/// (embedded, applied) migration counts, for diagnostics.
pub async fn migration_status(pool: &SqlitePool) -> DbResult<(usize, usize)> {
    let applied: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM _sqlx_migrations")
        .fetch_one(pool)
        .await
        .unwrap_or(0);

    Ok((MIGRATOR.migrations.len(), applied as usize))
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};

    #[tokio::test]
    async fn test_status_after_open() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        let (embedded, applied) = migration_status(db.pool()).await.unwrap();
        assert!(embedded >= 1);
        assert_eq!(embedded, applied);
    }
}
