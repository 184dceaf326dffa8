//! # Repository Module
//!
//! Repository implementations over the key-value record store.
//!
//! ## Record Store Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Record Store Explained                               │
//! │                                                                         │
//! │  The persistence contract is get/set of serialized records by string   │
//! │  key. Repositories give each record type a typed API on top of that:   │
//! │                                                                         │
//! │  Terminal Service                                                      │
//! │       │                                                                 │
//! │       │  db.sales().get(&sale_id)                                      │
//! │       ▼                                                                 │
//! │  SaleRepository                                                        │
//! │  ├── serde_json ⇄ Sale                                                 │
//! │  └── key layout: "sale:{id}"                                           │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  records table (key, kind, value, updated_at)                          │
//! │                                                                         │
//! │  Single-key writes have no transactional guarantees; the multi-record  │
//! │  commit points (checkout, return) go through explicit transactions in  │
//! │  SaleRepository so sale + return + shift change together or not at all.│
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`batch::BatchRepository`] - catalog batch lookup (read side of FEFO)
//! - [`sale::SaleRepository`] - sales, returns, and the atomic commits
//! - [`shift::ShiftRepository`] - shift lifecycle and the open-shift pointer

pub mod batch;
pub mod sale;
pub mod shift;

use chrono::Utc;
use sqlx::Sqlite;

use crate::error::DbResult;

// =============================================================================
// Record Store Primitives
// =============================================================================
// Shared by all repositories. Generic over the executor so the same helpers
// work on the pool (single-key operations) and inside a transaction
// (multi-record commits).

/// Inserts or overwrites one record.
pub(crate) async fn put_record<'e, E>(executor: E, key: &str, kind: &str, value: &str) -> DbResult<()>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    sqlx::query(
        r#"
        INSERT INTO records (key, kind, value, updated_at)
        VALUES (?1, ?2, ?3, ?4)
        ON CONFLICT(key) DO UPDATE SET
            value = excluded.value,
            updated_at = excluded.updated_at
        "#,
    )
    .bind(key)
    .bind(kind)
    .bind(value)
    .bind(Utc::now().to_rfc3339())
    .execute(executor)
    .await?;

    Ok(())
}

/// Reads one record's payload by key.
pub(crate) async fn get_record<'e, E>(executor: E, key: &str) -> DbResult<Option<String>>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    let row: Option<(String,)> = sqlx::query_as("SELECT value FROM records WHERE key = ?1")
        .bind(key)
        .fetch_optional(executor)
        .await?;

    Ok(row.map(|(value,)| value))
}

/// Lists every payload of one record kind, in key order.
pub(crate) async fn list_kind<'e, E>(executor: E, kind: &str) -> DbResult<Vec<String>>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    let rows: Vec<(String,)> =
        sqlx::query_as("SELECT value FROM records WHERE kind = ?1 ORDER BY key")
            .bind(kind)
            .fetch_all(executor)
            .await?;

    Ok(rows.into_iter().map(|(value,)| value).collect())
}

/// Deletes one record by key.
pub(crate) async fn delete_record<'e, E>(executor: E, key: &str) -> DbResult<()>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    sqlx::query("DELETE FROM records WHERE key = ?1")
        .bind(key)
        .execute(executor)
        .await?;

    Ok(())
}
