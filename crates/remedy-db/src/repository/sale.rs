//! # Sale Repository
//!
//! Persistence for sales, returns, and the atomic commit points.
//!
//! ## Why Explicit Transactions Here
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  A committed return touches three records:                              │
//! │                                                                         │
//! │    sale:{id}     returned_by_line ledger, return log, net total        │
//! │    return:{id}   the immutable return record                           │
//! │    shift:{id}    returns_total on the cash ledger                      │
//! │                                                                         │
//! │  Written separately, a crash between writes leaves a refund recorded   │
//! │  on the sale but missing from the shift ledger (or vice versa). The    │
//! │  commit points below wrap all writes in one SQLite transaction:        │
//! │  a return is either fully recorded or not recorded at all.             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::NaiveDate;
use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::repository::{get_record, list_kind, put_record};
use remedy_core::money::Money;
use remedy_core::returns::Return;
use remedy_core::sale::Sale;
use remedy_core::types::Shift;

const SALE_KIND: &str = "sale";
const RETURN_KIND: &str = "return";
const SHIFT_KIND: &str = "shift";

fn sale_key(id: &str) -> String {
    format!("sale:{}", id)
}

fn return_key(id: &str) -> String {
    format!("return:{}", id)
}

fn shift_key(id: &str) -> String {
    format!("shift:{}", id)
}

/// Repository for sale and return records.
#[derive(Debug, Clone)]
pub struct SaleRepository {
    pool: SqlitePool,
}

impl SaleRepository {
    /// Creates a new SaleRepository.
    pub fn new(pool: SqlitePool) -> Self {
        SaleRepository { pool }
    }

    /// Gets a sale by ID.
    pub async fn get(&self, id: &str) -> DbResult<Option<Sale>> {
        match get_record(&self.pool, &sale_key(id)).await? {
            Some(payload) => Ok(Some(serde_json::from_str(&payload)?)),
            None => Ok(None),
        }
    }

    /// Lists all sales, most recent first (sales-history read model).
    pub async fn list(&self) -> DbResult<Vec<Sale>> {
        let mut sales: Vec<Sale> = list_kind(&self.pool, SALE_KIND)
            .await?
            .iter()
            .map(|payload| serde_json::from_str(payload))
            .collect::<Result<Vec<Sale>, _>>()?;

        sales.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(sales)
    }

    /// Lists the returns committed against one sale, oldest first.
    pub async fn returns_for_sale(&self, sale_id: &str) -> DbResult<Vec<Return>> {
        let mut returns: Vec<Return> = list_kind(&self.pool, RETURN_KIND)
            .await?
            .iter()
            .map(|payload| serde_json::from_str(payload))
            .collect::<Result<Vec<Return>, _>>()?
            .into_iter()
            .filter(|r| r.sale_id == sale_id)
            .collect();

        returns.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(returns)
    }

    /// Sums the refunds an operator has issued on a given day.
    ///
    /// Feeds the pharmacist daily ceiling in the refund authorizer.
    pub async fn sum_refunds_for_operator(
        &self,
        operator_id: &str,
        day: NaiveDate,
    ) -> DbResult<Money> {
        let cents: i64 = list_kind(&self.pool, RETURN_KIND)
            .await?
            .iter()
            .map(|payload| serde_json::from_str::<Return>(payload))
            .collect::<Result<Vec<Return>, _>>()?
            .iter()
            .filter(|r| r.operator_id == operator_id && r.created_at.date_naive() == day)
            .map(|r| r.total_refund_cents)
            .sum();

        Ok(Money::from_cents(cents))
    }

    /// Commits a finalized sale together with the credited shift ledger.
    ///
    /// One transaction: the sale never exists without its ledger credit.
    pub async fn commit_sale(&self, sale: &Sale, shift: &Shift) -> DbResult<()> {
        debug!(sale_id = %sale.id, shift_id = %shift.id, "Committing sale");

        let sale_payload = serde_json::to_string(sale)?;
        let shift_payload = serde_json::to_string(shift)?;

        let mut tx = self.pool.begin().await?;
        put_record(&mut *tx, &sale_key(&sale.id), SALE_KIND, &sale_payload).await?;
        put_record(&mut *tx, &shift_key(&shift.id), SHIFT_KIND, &shift_payload).await?;
        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        info!(
            sale_id = %sale.id,
            receipt = %sale.receipt_number,
            total = sale.total_cents,
            "Sale committed"
        );
        Ok(())
    }

    /// Commits a return: updated sale + return record + debited shift ledger.
    ///
    /// One transaction: the append-return / update-sale / update-shift
    /// sequence is atomic. Either all three records change or none do.
    pub async fn commit_return(&self, sale: &Sale, ret: &Return, shift: &Shift) -> DbResult<()> {
        debug!(sale_id = %sale.id, return_id = %ret.id, shift_id = %shift.id, "Committing return");

        let sale_payload = serde_json::to_string(sale)?;
        let return_payload = serde_json::to_string(ret)?;
        let shift_payload = serde_json::to_string(shift)?;

        let mut tx = self.pool.begin().await?;
        put_record(&mut *tx, &sale_key(&sale.id), SALE_KIND, &sale_payload).await?;
        put_record(&mut *tx, &return_key(&ret.id), RETURN_KIND, &return_payload).await?;
        put_record(&mut *tx, &shift_key(&shift.id), SHIFT_KIND, &shift_payload).await?;
        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        info!(
            sale_id = %sale.id,
            return_id = %ret.id,
            refund = ret.total_refund_cents,
            kind = ?ret.kind,
            "Return committed"
        );
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
