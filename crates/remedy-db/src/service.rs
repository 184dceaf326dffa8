//! # Terminal Service
//!
//! Orchestrates checkout and return flows over the repositories.
//!
//! ## Authorize-Then-Commit, Atomically
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    process_return sequence                              │
//! │                                                                         │
//! │  acquire shift lock ──────────────────────────────┐                    │
//! │       │                                            │                    │
//! │       ▼                                            │ held throughout    │
//! │  load sale, open shift, operator's daily refunds   │                    │
//! │       ▼                                            │                    │
//! │  plan_return()          (pure, remedy-core)        │                    │
//! │       ▼                                            │                    │
//! │  authorize_refund()     (role + ledger rules)      │                    │
//! │       ▼                                            │                    │
//! │  apply_return() + shift.record_return()            │                    │
//! │       ▼                                            │                    │
//! │  commit_return()        (one SQLite transaction)   │                    │
//! │       │                                            │                    │
//! │  release lock ◄────────────────────────────────────┘                    │
//! │                                                                         │
//! │  Without the lock, two concurrent returns could both pass the balance  │
//! │  check and together refund more than the shift has taken in. The lock  │
//! │  makes check-then-commit a single critical section per terminal.       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A denial or validation failure anywhere in the sequence leaves every
//! record untouched; abandoning before commit has no side effects.

use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::error::DbError;
use crate::pool::Database;
use remedy_core::authorize::{authorize_refund, Denial};
use remedy_core::cart::Cart;
use remedy_core::error::CoreError;
use remedy_core::money::Money;
use remedy_core::returns::{apply_return, plan_return, Return, ReturnSelection};
use remedy_core::sale::{finalize, Sale};
use remedy_core::types::{Operator, PaymentMethod};

// =============================================================================
// Service Error
// =============================================================================

/// Errors surfaced to the terminal frontend.
///
/// Authorization denials keep their human-readable rule message; everything
/// else wraps the originating layer's error.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Sale not found.
    #[error("Sale not found: {0}")]
    SaleNotFound(String),

    /// Checkout requires an open shift to credit.
    #[error("No open shift")]
    NoOpenShift,

    /// Refund authorization denied; the message names the violated rule.
    #[error(transparent)]
    Denied(#[from] Denial),

    /// Business rule violation from the core.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Persistence failure.
    #[error(transparent)]
    Db(#[from] DbError),
}

/// Result type for service operations.
pub type ServiceResult<T> = Result<T, ServiceError>;

// =============================================================================
// Terminal Service
// =============================================================================

/// Checkout and return orchestration for one terminal.
///
/// ## Shift Lock
/// All ledger-touching flows serialize on one async mutex, scoped to the
/// terminal's (single) open shift. The balance check in the authorizer and
/// the transaction that debits the ledger happen inside the same critical
/// section, so the ledger can never be raced past `available_balance`.
#[derive(Debug, Clone)]
pub struct TerminalService {
    db: Database,
    shift_lock: Arc<Mutex<()>>,
}

impl TerminalService {
    /// Creates a new service over a database handle.
    pub fn new(db: Database) -> Self {
        TerminalService {
            db,
            shift_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Access to the underlying database handle.
    pub fn db(&self) -> &Database {
        &self.db
    }

    /// Finalizes the cart into a sale and credits the shift ledger.
    ///
    /// ## What This Does
    /// 1. Requires an open shift
    /// 2. Freezes the cart into a [`Sale`] (cart is cleared)
    /// 3. Credits the shift's cash/card total
    /// 4. Commits sale + shift in one transaction
    ///
    /// On a storage failure the cart is restored, so the order is not lost.
    pub async fn checkout(
        &self,
        cart: &mut Cart,
        operator: &Operator,
        payment_method: PaymentMethod,
    ) -> ServiceResult<Sale> {
        let _guard = self.shift_lock.lock().await;

        let mut shift = self
            .db
            .shifts()
            .get_open()
            .await?
            .ok_or(ServiceError::NoOpenShift)?;

        let snapshot = cart.clone();
        let sale = finalize(cart, operator, payment_method)?;
        shift.record_sale(Money::from_cents(sale.total_cents), payment_method);

        if let Err(e) = self.db.sales().commit_sale(&sale, &shift).await {
            warn!(sale_id = %sale.id, error = %e, "Checkout commit failed; restoring cart");
            *cart = snapshot;
            return Err(e.into());
        }

        info!(
            sale_id = %sale.id,
            receipt = %sale.receipt_number,
            total = sale.total_cents,
            operator = %operator.id,
            "Checkout complete"
        );
        Ok(sale)
    }

    /// Processes a return request end to end.
    ///
    /// ## Sequence
    /// load → plan (pure) → authorize (role + ledger) → apply → commit
    /// (sale + return + shift in one transaction), all under the shift lock.
    ///
    /// A denial is terminal for this attempt: nothing changes, nothing is
    /// retried, and the caller re-presents the request unchanged.
    pub async fn process_return(
        &self,
        sale_id: &str,
        selections: &[ReturnSelection],
        reason: &str,
        notes: Option<String>,
        operator: &Operator,
    ) -> ServiceResult<Return> {
        let _guard = self.shift_lock.lock().await;

        let mut sale = self
            .db
            .sales()
            .get(sale_id)
            .await?
            .ok_or_else(|| ServiceError::SaleNotFound(sale_id.to_string()))?;

        let shift = self.db.shifts().get_open().await?;
        let daily_refunds = self
            .db
            .sales()
            .sum_refunds_for_operator(&operator.id, Utc::now().date_naive())
            .await?;

        debug!(
            sale_id = %sale_id,
            operator = %operator.id,
            daily_refunds = daily_refunds.cents(),
            "Planning return"
        );

        let ret = plan_return(&sale, selections, reason, notes, operator)?;

        if let Err(denial) = authorize_refund(
            operator.role,
            ret.total_refund(),
            &sale,
            shift.as_ref(),
            daily_refunds,
        ) {
            warn!(
                sale_id = %sale_id,
                operator = %operator.id,
                refund = ret.total_refund_cents,
                denial = %denial,
                "Refund denied"
            );
            return Err(denial.into());
        }

        // authorize_refund only passes with an open shift present
        let mut shift = shift.ok_or(ServiceError::NoOpenShift)?;

        apply_return(&mut sale, &ret)?;
        shift.record_return(ret.total_refund());

        self.db.sales().commit_return(&sale, &ret, &shift).await?;

        info!(
            sale_id = %sale_id,
            return_id = %ret.id,
            refund = ret.total_refund_cents,
            kind = ?ret.kind,
            operator = %operator.id,
            "Return processed"
        );
        Ok(ret)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::DbConfig;
    use chrono::NaiveDate;
    use remedy_core::types::{Batch, Role, SaleStatus};

    fn test_batch(id: &str, pack_price_cents: i64) -> Batch {
        Batch {
            id: id.to_string(),
            product_name: format!("Product {}", id),
            stock_units: 100,
            pack_price_cents,
            cost_cents: None,
            units_per_pack: 1,
            expiry_date: NaiveDate::from_ymd_opt(2026, 12, 31).unwrap(),
            max_discount_bps: 1000,
            barcode: None,
            internal_code: None,
            category: None,
        }
    }

    async fn service() -> TerminalService {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        TerminalService::new(db)
    }

    async fn checked_out_sale(svc: &TerminalService, operator: &Operator, quantity: i64) -> Sale {
        let mut cart = Cart::new();
        let batch = test_batch("b1", 1000);
        cart.add_line(&batch, false).unwrap();
        cart.set_quantity(&batch, false, quantity).unwrap();
        svc.checkout(&mut cart, operator, PaymentMethod::Cash)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_checkout_requires_open_shift() {
        let svc = service().await;
        let operator = Operator::new("op-1", Role::Cashier);

        let mut cart = Cart::new();
        cart.add_line(&test_batch("b1", 1000), false).unwrap();

        let err = svc
            .checkout(&mut cart, &operator, PaymentMethod::Cash)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NoOpenShift));
        // Cart untouched on failure
        assert!(!cart.is_empty());
    }

    #[tokio::test]
    async fn test_checkout_credits_ledger_and_clears_cart() {
        let svc = service().await;
        let operator = Operator::new("op-1", Role::Cashier);
        svc.db().shifts().open_shift("op-1").await.unwrap();

        let mut cart = Cart::new();
        let batch = test_batch("b1", 1000);
        cart.add_line(&batch, false).unwrap();
        cart.set_quantity(&batch, false, 3).unwrap();

        let sale = svc
            .checkout(&mut cart, &operator, PaymentMethod::Cash)
            .await
            .unwrap();

        assert!(cart.is_empty());
        assert_eq!(sale.total_cents, 3000);

        let shift = svc.db().shifts().get_open().await.unwrap().unwrap();
        assert_eq!(shift.cash_total_cents, 3000);
        assert_eq!(shift.available_balance().cents(), 3000);
    }

    #[tokio::test]
    async fn test_return_flow_end_to_end() {
        let svc = service().await;
        let operator = Operator::new("op-1", Role::Pharmacist);
        svc.db().shifts().open_shift("op-1").await.unwrap();

        let sale = checked_out_sale(&svc, &operator, 10).await;

        let selections = vec![ReturnSelection::new(sale.lines[0].line_key(), 4)];
        let ret = svc
            .process_return(&sale.id, &selections, "damaged packaging", None, &operator)
            .await
            .unwrap();

        assert_eq!(ret.total_refund_cents, 4000);

        let stored = svc.db().sales().get(&sale.id).await.unwrap().unwrap();
        assert_eq!(stored.net_total_cents, 6000);
        assert_eq!(stored.status, SaleStatus::PartiallyReturned);
        assert_eq!(stored.return_log.len(), 1);

        let shift = svc.db().shifts().get_open().await.unwrap().unwrap();
        assert_eq!(shift.returns_total_cents, 4000);
        assert_eq!(shift.available_balance().cents(), 6000);
    }

    #[tokio::test]
    async fn test_second_return_bounded_by_remaining() {
        let svc = service().await;
        let operator = Operator::new("op-1", Role::Pharmacist);
        svc.db().shifts().open_shift("op-1").await.unwrap();

        let sale = checked_out_sale(&svc, &operator, 10).await;
        let k = sale.lines[0].line_key();

        svc.process_return(
            &sale.id,
            &[ReturnSelection::new(k.clone(), 4)],
            "damaged packaging",
            None,
            &operator,
        )
        .await
        .unwrap();

        // 7 > 6 remaining
        let err = svc
            .process_return(
                &sale.id,
                &[ReturnSelection::new(k.clone(), 7)],
                "changed mind",
                None,
                &operator,
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Core(CoreError::ReturnExceedsAvailable { .. })
        ));

        svc.process_return(
            &sale.id,
            &[ReturnSelection::new(k, 6)],
            "changed mind",
            None,
            &operator,
        )
        .await
        .unwrap();

        let stored = svc.db().sales().get(&sale.id).await.unwrap().unwrap();
        assert_eq!(stored.status, SaleStatus::Returned);
        assert_eq!(stored.net_total_cents, 0);
    }

    #[tokio::test]
    async fn test_denied_return_changes_nothing() {
        let svc = service().await;
        let operator = Operator::new("op-1", Role::Manager);
        svc.db().shifts().open_shift("op-1").await.unwrap();

        let sale = checked_out_sale(&svc, &operator, 10).await;

        // Drain the drawer so the ledger cannot cover the refund
        let mut shift = svc.db().shifts().get_open().await.unwrap().unwrap();
        shift.record_return(Money::from_cents(9_500));
        svc.db().shifts().save(&shift).await.unwrap();

        let selections = vec![ReturnSelection::new(sale.lines[0].line_key(), 10)];
        let err = svc
            .process_return(&sale.id, &selections, "changed mind", None, &operator)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Denied(Denial::InsufficientBalance { .. })
        ));

        // No partial state change anywhere
        let stored = svc.db().sales().get(&sale.id).await.unwrap().unwrap();
        assert_eq!(stored.net_total_cents, stored.total_cents);
        assert!(stored.return_log.is_empty());
        assert_eq!(stored.status, SaleStatus::Completed);
        assert!(svc
            .db()
            .sales()
            .returns_for_sale(&sale.id)
            .await
            .unwrap()
            .is_empty());
        let after = svc.db().shifts().get_open().await.unwrap().unwrap();
        assert_eq!(after.returns_total_cents, 9_500);
    }

    #[tokio::test]
    async fn test_cashier_cannot_refund_previous_shift_sale() {
        let svc = service().await;
        let cashier = Operator::new("op-1", Role::Cashier);
        let manager = Operator::new("op-2", Role::Manager);

        let first = svc.db().shifts().open_shift("op-1").await.unwrap();
        let sale = checked_out_sale(&svc, &cashier, 2).await;
        svc.db().shifts().close_shift(&first.id).await.unwrap();

        // New shift, funded so the ledger check is not the limiting rule
        let mut second = svc.db().shifts().open_shift("op-1").await.unwrap();
        second.record_deposit(Money::from_cents(10_000));
        svc.db().shifts().save(&second).await.unwrap();

        let selections = vec![ReturnSelection::new(sale.lines[0].line_key(), 1)];

        let err = svc
            .process_return(&sale.id, &selections, "changed mind", None, &cashier)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Denied(Denial::DifferentShift)));

        // A manager can still take the same return
        svc.process_return(&sale.id, &selections, "changed mind", None, &manager)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_pharmacist_daily_ceiling_accumulates_across_sales() {
        let svc = service().await;
        let pharmacist = Operator::new("op-1", Role::Pharmacist);
        svc.db().shifts().open_shift("op-1").await.unwrap();

        // Two sales of 15 packs at 100.00 = 1500.00 each
        let mut cart = Cart::new();
        let batch = test_batch("b-big", 100_00);
        cart.add_line(&batch, false).unwrap();
        cart.set_quantity(&batch, false, 15).unwrap();
        let sale_a = svc
            .checkout(&mut cart, &pharmacist, PaymentMethod::Cash)
            .await
            .unwrap();

        cart.add_line(&batch, false).unwrap();
        cart.set_quantity(&batch, false, 15).unwrap();
        let sale_b = svc
            .checkout(&mut cart, &pharmacist, PaymentMethod::Cash)
            .await
            .unwrap();

        // First refund: 10 × 100.00 = 1000.00, at the per-invoice ceiling
        svc.process_return(
            &sale_a.id,
            &[ReturnSelection::new(sale_a.lines[0].line_key(), 10)],
            "recalled batch",
            None,
            &pharmacist,
        )
        .await
        .unwrap();

        // Second refund of 1000.00 would hit 2000.00 daily... allowed exactly
        svc.process_return(
            &sale_b.id,
            &[ReturnSelection::new(sale_b.lines[0].line_key(), 10)],
            "recalled batch",
            None,
            &pharmacist,
        )
        .await
        .unwrap();

        // Third refund of even 200.00 exceeds the daily ceiling
        let err = svc
            .process_return(
                &sale_a.id,
                &[ReturnSelection::new(sale_a.lines[0].line_key(), 2)],
                "recalled batch",
                None,
                &pharmacist,
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Denied(Denial::ExceedsDailyLimit { .. })
        ));
    }
}
