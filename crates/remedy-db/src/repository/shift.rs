//! # Shift Repository
//!
//! Shift lifecycle and the open-shift pointer.
//!
//! ## One Open Shift
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  shift:{id}   one record per shift, open or closed                     │
//! │  shift:open   pointer holding the id of the currently open shift       │
//! │                                                                         │
//! │  open_shift()  → fails if the pointer exists, else writes both keys    │
//! │  close_shift() → updates the shift record and deletes the pointer      │
//! │                                                                         │
//! │  Both go through a transaction so the pointer can never dangle.        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::repository::{delete_record, get_record, put_record};
use remedy_core::types::Shift;

const KIND: &str = "shift";
const OPEN_POINTER_KEY: &str = "shift:open";

fn key(id: &str) -> String {
    format!("shift:{}", id)
}

/// Repository for shift ledgers.
#[derive(Debug, Clone)]
pub struct ShiftRepository {
    pool: SqlitePool,
}

impl ShiftRepository {
    /// Creates a new ShiftRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ShiftRepository { pool }
    }

    /// Opens a new shift with a zeroed ledger.
    ///
    /// Fails with a duplicate error if a shift is already open: exactly one
    /// open shift per terminal context.
    pub async fn open_shift(&self, opened_by: &str) -> DbResult<Shift> {
        if let Some(open_id) = get_record(&self.pool, OPEN_POINTER_KEY).await? {
            return Err(DbError::duplicate("open shift", open_id));
        }

        let shift = Shift::open(Uuid::new_v4().to_string(), opened_by, Utc::now());
        let payload = serde_json::to_string(&shift)?;

        let mut tx = self.pool.begin().await?;
        put_record(&mut *tx, &key(&shift.id), KIND, &payload).await?;
        put_record(&mut *tx, OPEN_POINTER_KEY, "pointer", &shift.id).await?;
        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        info!(shift_id = %shift.id, opened_by = %opened_by, "Shift opened");
        Ok(shift)
    }

    /// Gets a shift by ID.
    pub async fn get(&self, id: &str) -> DbResult<Option<Shift>> {
        match get_record(&self.pool, &key(id)).await? {
            Some(payload) => Ok(Some(serde_json::from_str(&payload)?)),
            None => Ok(None),
        }
    }

    /// Returns the currently open shift, if any.
    pub async fn get_open(&self) -> DbResult<Option<Shift>> {
        let Some(open_id) = get_record(&self.pool, OPEN_POINTER_KEY).await? else {
            return Ok(None);
        };

        match self.get(&open_id).await? {
            Some(shift) => Ok(Some(shift)),
            None => Err(DbError::Corrupted(format!(
                "open-shift pointer references missing shift {}",
                open_id
            ))),
        }
    }

    /// Persists ledger changes to a shift record.
    ///
    /// For single-record updates (deposits). The checkout/return commit
    /// points write the shift inside their own transaction instead; see
    /// `SaleRepository::commit_sale` / `commit_return`.
    pub async fn save(&self, shift: &Shift) -> DbResult<()> {
        debug!(shift_id = %shift.id, "Saving shift ledger");

        let payload = serde_json::to_string(shift)?;
        put_record(&self.pool, &key(&shift.id), KIND, &payload).await
    }

    /// Closes the open shift.
    pub async fn close_shift(&self, id: &str) -> DbResult<Shift> {
        let mut shift = self
            .get(id)
            .await?
            .ok_or_else(|| DbError::not_found("Shift", id))?;

        shift.close(Utc::now());
        let payload = serde_json::to_string(&shift)?;

        let mut tx = self.pool.begin().await?;
        put_record(&mut *tx, &key(&shift.id), KIND, &payload).await?;
        delete_record(&mut *tx, OPEN_POINTER_KEY).await?;
        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        info!(shift_id = %shift.id, "Shift closed");
        Ok(shift)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
