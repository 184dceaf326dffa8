//! # Batch Repository
//!
//! The Catalog Lookup surface: read access to batch/lot records.
//!
//! Catalog CRUD and search belong to an external collaborator; this engine
//! only reads batches (and the seed binary writes them for development).

use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;
use crate::repository::{get_record, list_kind, put_record};
use remedy_core::types::Batch;

const KIND: &str = "batch";

fn key(id: &str) -> String {
    format!("batch:{}", id)
}

/// Repository for catalog batch records.
#[derive(Debug, Clone)]
pub struct BatchRepository {
    pool: SqlitePool,
}

impl BatchRepository {
    /// Creates a new BatchRepository.
    pub fn new(pool: SqlitePool) -> Self {
        BatchRepository { pool }
    }

    /// Stores a batch record.
    pub async fn put(&self, batch: &Batch) -> DbResult<()> {
        debug!(id = %batch.id, product = %batch.product_name, "Storing batch");

        let payload = serde_json::to_string(batch)?;
        put_record(&self.pool, &key(&batch.id), KIND, &payload).await
    }

    /// Gets a batch by ID.
    pub async fn get(&self, id: &str) -> DbResult<Option<Batch>> {
        match get_record(&self.pool, &key(id)).await? {
            Some(payload) => Ok(Some(serde_json::from_str(&payload)?)),
            None => Ok(None),
        }
    }

    /// Lists every batch of a product, ordered by expiry date ascending.
    ///
    /// This is the input the FEFO selector walks: soonest-to-expire first.
    pub async fn list_for_product(&self, product_name: &str) -> DbResult<Vec<Batch>> {
        let mut batches: Vec<Batch> = list_kind(&self.pool, KIND)
            .await?
            .iter()
            .map(|payload| serde_json::from_str(payload))
            .collect::<Result<Vec<Batch>, _>>()?
            .into_iter()
            .filter(|b| b.product_name == product_name)
            .collect();

        batches.sort_by_key(|b| b.expiry_date);
        Ok(batches)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
