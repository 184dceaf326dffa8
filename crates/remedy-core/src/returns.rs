//! # Return Processing
//!
//! Plans and applies partial/full returns against a finalized sale.
//!
//! ## Return Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Return Flow                                      │
//! │                                                                         │
//! │  returnable_lines(sale)                                                │
//! │       │   what can still come back, per line key                       │
//! │       ▼                                                                 │
//! │  plan_return(sale, selections, ...)  ← pure, no state change           │
//! │       │   validates quantities, computes the refund, decides kind      │
//! │       ▼                                                                 │
//! │  authorize_refund(...)               ← authorize module                │
//! │       │   role ceilings + shift ledger check                           │
//! │       ▼                                                                 │
//! │  apply_return(sale, return)          ← all-or-nothing mutation         │
//! │       │   ledger += qty, log append, net_total -= refund               │
//! │       ▼                                                                 │
//! │  persistence commits sale + return + shift in one transaction          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Refund Math
//! Per line: frozen effective unit price × quantity, line discount applied.
//! The sale's global discount is then applied ONCE to the aggregate, the
//! same way the original total was derived from the subtotal. A sale of
//! 100.00 with a 10% global discount refunds 90.00 on full return, never
//! 100.00.
//!
//! ## Multiple Returns
//! Each return operates only against the availability remaining after prior
//! returns; the same unit can never be refunded twice.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use uuid::Uuid;

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::sale::{LineKey, ReturnEntry, Sale};
use crate::types::{DiscountRate, Operator, SaleStatus};
use crate::validation::{validate_quantity, validate_reason};

// =============================================================================
// Return Kind
// =============================================================================

/// Whether a return covered everything that was still returnable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReturnKind {
    /// Every eligible line selected at its full available quantity.
    Full,
    /// Anything less.
    Partial,
}

// =============================================================================
// Inputs & Records
// =============================================================================

/// What can still be returned on one sale line.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReturnableLine {
    pub line_key: LineKey,
    pub batch_id: String,
    pub product_name: String,
    pub unit_mode: bool,
    pub unit_price_cents: i64,
    pub discount_bps: u32,
    pub original_quantity: i64,
    pub available_quantity: i64,
}

/// One line of a return request: which line, how many, and optionally why.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReturnSelection {
    pub line_key: LineKey,
    pub quantity: i64,
    pub reason: Option<String>,
}

impl ReturnSelection {
    pub fn new(line_key: LineKey, quantity: i64) -> Self {
        ReturnSelection {
            line_key,
            quantity,
            reason: None,
        }
    }
}

/// One line of a committed return.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReturnItem {
    pub line_key: LineKey,
    pub quantity_returned: i64,
    /// Frozen unit price the refund was computed from.
    pub unit_price_cents: i64,
    /// Refund for this line (line discount applied, global discount not;
    /// that lands once on the aggregate).
    pub refund_cents: i64,
    pub reason: Option<String>,
}

/// A committed return operation. Immutable once created.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Return {
    pub id: String,
    pub sale_id: String,
    pub operator_id: String,
    pub created_at: chrono::DateTime<Utc>,
    pub kind: ReturnKind,
    pub items: Vec<ReturnItem>,
    pub total_refund_cents: i64,
    pub reason: String,
    pub notes: Option<String>,
}

impl Return {
    /// Total refund as Money.
    #[inline]
    pub fn total_refund(&self) -> Money {
        Money::from_cents(self.total_refund_cents)
    }
}

// =============================================================================
// Eligibility
// =============================================================================

/// Lists the lines of a sale that still have returnable quantity.
///
/// `available = original − already returned`; exhausted lines are excluded.
pub fn returnable_lines(sale: &Sale) -> Vec<ReturnableLine> {
    sale.lines
        .iter()
        .filter_map(|line| {
            let key = line.line_key();
            let available = line.quantity - sale.returned_quantity(&key);
            if available <= 0 {
                return None;
            }
            Some(ReturnableLine {
                line_key: key,
                batch_id: line.batch_id.clone(),
                product_name: line.product_name.clone(),
                unit_mode: line.unit_mode,
                unit_price_cents: line.unit_price_cents,
                discount_bps: line.discount_bps,
                original_quantity: line.quantity,
                available_quantity: available,
            })
        })
        .collect()
}

// =============================================================================
// Planning
// =============================================================================

/// Builds a [`Return`] from a set of line selections. Pure: the sale is not
/// touched; committing happens in [`apply_return`] after authorization.
///
/// ## Validation
/// - At least one selection, each line selected at most once
/// - Every selection must reference an existing line
/// - Each quantity must satisfy `1 ≤ qty ≤ available`; out-of-range
///   requests are rejected outright, never clamped
/// - The reason text is required
///
/// ## Refund
/// Σ (unit price × qty, line discount applied), then the sale's global
/// discount applied once to the sum.
pub fn plan_return(
    sale: &Sale,
    selections: &[ReturnSelection],
    reason: &str,
    notes: Option<String>,
    operator: &Operator,
) -> CoreResult<Return> {
    let reason = validate_reason(reason)?;

    if selections.is_empty() {
        return Err(CoreError::EmptyReturn);
    }

    let mut seen: BTreeSet<&LineKey> = BTreeSet::new();
    let mut items = Vec::with_capacity(selections.len());
    let mut items_sum = Money::zero();

    for selection in selections {
        if !seen.insert(&selection.line_key) {
            return Err(CoreError::DuplicateReturnLine {
                line_key: selection.line_key.to_string(),
            });
        }

        let line = sale
            .line(&selection.line_key)
            .ok_or_else(|| CoreError::UnknownReturnLine {
                line_key: selection.line_key.to_string(),
            })?;

        validate_quantity(selection.quantity)?;
        let available = line.quantity - sale.returned_quantity(&selection.line_key);
        if selection.quantity > available {
            return Err(CoreError::ReturnExceedsAvailable {
                line_key: selection.line_key.to_string(),
                available,
                requested: selection.quantity,
            });
        }

        let refund = line
            .unit_price()
            .multiply_quantity(selection.quantity)
            .apply_discount(DiscountRate::from_bps(line.discount_bps));
        items_sum += refund;

        items.push(ReturnItem {
            line_key: selection.line_key.clone(),
            quantity_returned: selection.quantity,
            unit_price_cents: line.unit_price_cents,
            refund_cents: refund.cents(),
            reason: selection.reason.clone(),
        });
    }

    // The global discount reduced the original total once, at the aggregate;
    // refunds mirror that exactly.
    let total_refund = items_sum.apply_discount(sale.global_discount());

    let kind = classify_kind(sale, selections);

    Ok(Return {
        id: Uuid::new_v4().to_string(),
        sale_id: sale.id.clone(),
        operator_id: operator.id.clone(),
        created_at: Utc::now(),
        kind,
        items,
        total_refund_cents: total_refund.cents(),
        reason,
        notes,
    })
}

/// Full iff every currently-eligible line is selected at its full available
/// quantity.
fn classify_kind(sale: &Sale, selections: &[ReturnSelection]) -> ReturnKind {
    for eligible in returnable_lines(sale) {
        let covered = selections
            .iter()
            .find(|s| s.line_key == eligible.line_key)
            .map(|s| s.quantity)
            .unwrap_or(0);
        if covered < eligible.available_quantity {
            return ReturnKind::Partial;
        }
    }
    ReturnKind::Full
}

// =============================================================================
// Applying
// =============================================================================

/// Records a planned return on the sale: all-or-nothing.
///
/// Every item is re-validated against the current ledger before the first
/// mutation, so a stale or double-applied return leaves the sale untouched.
///
/// ## Mutations (atomic as a set)
/// 1. `returned_by_line[key] += quantity` for each item
/// 2. A [`ReturnEntry`] appended to the return log
/// 3. `net_total -= total refund`
/// 4. Status recomputed (Returned / PartiallyReturned)
pub fn apply_return(sale: &mut Sale, ret: &Return) -> CoreResult<()> {
    // Validate everything first; only then mutate.
    for item in &ret.items {
        let line = sale
            .line(&item.line_key)
            .ok_or_else(|| CoreError::UnknownReturnLine {
                line_key: item.line_key.to_string(),
            })?;
        let available = line.quantity - sale.returned_quantity(&item.line_key);
        if item.quantity_returned > available {
            return Err(CoreError::ReturnExceedsAvailable {
                line_key: item.line_key.to_string(),
                available,
                requested: item.quantity_returned,
            });
        }
    }

    for item in &ret.items {
        *sale
            .returned_by_line
            .entry(item.line_key.clone())
            .or_insert(0) += item.quantity_returned;
    }

    sale.return_log.push(ReturnEntry {
        return_id: ret.id.clone(),
        kind: ret.kind,
        total_refund_cents: ret.total_refund_cents,
        created_at: ret.created_at,
    });

    sale.net_total_cents -= ret.total_refund_cents;

    let exhausted = sale
        .lines
        .iter()
        .all(|l| sale.returned_quantity(&l.line_key()) >= l.quantity);
    sale.status = if exhausted {
        SaleStatus::Returned
    } else {
        SaleStatus::PartiallyReturned
    };

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cart::Cart;
    use crate::sale::finalize;
    use crate::types::{Batch, DiscountRate, PaymentMethod, Role};
    use chrono::NaiveDate;

    fn test_batch(id: &str, pack_price_cents: i64, units_per_pack: i64, stock_packs: i64) -> Batch {
        Batch {
            id: id.to_string(),
            product_name: format!("Product {}", id),
            stock_units: stock_packs * units_per_pack,
            pack_price_cents,
            cost_cents: None,
            units_per_pack,
            expiry_date: NaiveDate::from_ymd_opt(2026, 12, 31).unwrap(),
            max_discount_bps: 1500,
            barcode: None,
            internal_code: None,
            category: None,
        }
    }

    fn operator() -> Operator {
        Operator::new("op-1", Role::Pharmacist)
    }

    /// Sale with one line: 10 packs at 10.00 each, no discounts.
    fn single_line_sale() -> Sale {
        let mut cart = Cart::new();
        let batch = test_batch("b1", 1000, 1, 50);
        cart.add_line(&batch, false).unwrap();
        cart.set_quantity(&batch, false, 10).unwrap();
        finalize(&mut cart, &operator(), PaymentMethod::Cash).unwrap()
    }

    /// Sale with two 50.00 lines and a 10% global discount (total 90.00).
    fn discounted_sale() -> Sale {
        let mut cart = Cart::new();
        let a = test_batch("a", 5000, 1, 10);
        let b = test_batch("b", 5000, 1, 10);
        cart.add_line(&a, false).unwrap();
        cart.add_line(&b, false).unwrap();
        cart.set_global_discount(DiscountRate::from_bps(1000));
        finalize(&mut cart, &operator(), PaymentMethod::Cash).unwrap()
    }

    fn key(sale: &Sale, line_no: usize) -> LineKey {
        sale.lines[line_no].line_key()
    }

    #[test]
    fn test_returnable_lines_track_remaining() {
        let mut sale = single_line_sale();
        let k = key(&sale, 0);

        let eligible = returnable_lines(&sale);
        assert_eq!(eligible.len(), 1);
        assert_eq!(eligible[0].available_quantity, 10);

        let ret = plan_return(
            &sale,
            &[ReturnSelection::new(k.clone(), 4)],
            "damaged packaging",
            None,
            &operator(),
        )
        .unwrap();
        apply_return(&mut sale, &ret).unwrap();

        let eligible = returnable_lines(&sale);
        assert_eq!(eligible[0].available_quantity, 6);
    }

    #[test]
    fn test_return_never_over_issues() {
        let mut sale = single_line_sale();
        let k = key(&sale, 0);

        let first = plan_return(
            &sale,
            &[ReturnSelection::new(k.clone(), 4)],
            "damaged packaging",
            None,
            &operator(),
        )
        .unwrap();
        apply_return(&mut sale, &first).unwrap();

        // 7 > 6 remaining: rejected outright
        let err = plan_return(
            &sale,
            &[ReturnSelection::new(k.clone(), 7)],
            "changed mind",
            None,
            &operator(),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            CoreError::ReturnExceedsAvailable {
                available: 6,
                requested: 7,
                ..
            }
        ));

        // 6 is fine, and the ledger never exceeds the original quantity
        let second = plan_return(
            &sale,
            &[ReturnSelection::new(k.clone(), 6)],
            "changed mind",
            None,
            &operator(),
        )
        .unwrap();
        apply_return(&mut sale, &second).unwrap();

        assert_eq!(sale.returned_quantity(&k), 10);
        assert!(returnable_lines(&sale).is_empty());
        assert_eq!(sale.status, SaleStatus::Returned);
    }

    #[test]
    fn test_net_total_identity() {
        let mut sale = single_line_sale();
        let k = key(&sale, 0);

        for qty in [2, 3, 5] {
            let ret = plan_return(
                &sale,
                &[ReturnSelection::new(k.clone(), qty)],
                "expired on shelf",
                None,
                &operator(),
            )
            .unwrap();
            apply_return(&mut sale, &ret).unwrap();

            assert_eq!(sale.net_total_cents, sale.total_cents - sale.refunded_cents());
        }

        assert_eq!(sale.net_total_cents, 0);
        assert_eq!(sale.return_log.len(), 3);
    }

    #[test]
    fn test_full_return_refunds_discounted_total() {
        // Subtotal 100.00, global 10% → total 90.00. Full return must refund
        // exactly 90.00, not 100.00.
        let mut sale = discounted_sale();
        assert_eq!(sale.total_cents, 9000);

        let selections = vec![
            ReturnSelection::new(key(&sale, 0), 1),
            ReturnSelection::new(key(&sale, 1), 1),
        ];
        let ret = plan_return(&sale, &selections, "wrong prescription", None, &operator()).unwrap();

        assert_eq!(ret.kind, ReturnKind::Full);
        assert_eq!(ret.total_refund_cents, 9000);

        apply_return(&mut sale, &ret).unwrap();
        assert_eq!(sale.net_total_cents, 0);
        assert_eq!(sale.status, SaleStatus::Returned);
    }

    #[test]
    fn test_partial_return_applies_global_discount_to_aggregate() {
        let sale = discounted_sale();

        let ret = plan_return(
            &sale,
            &[ReturnSelection::new(key(&sale, 0), 1)],
            "wrong prescription",
            None,
            &operator(),
        )
        .unwrap();

        assert_eq!(ret.kind, ReturnKind::Partial);
        // 50.00 line refund, then 10% off the aggregate → 45.00
        assert_eq!(ret.total_refund_cents, 4500);
        assert_eq!(ret.items[0].refund_cents, 5000);
    }

    #[test]
    fn test_line_discount_carried_into_refund() {
        let mut cart = Cart::new();
        let batch = test_batch("b1", 1000, 1, 50);
        cart.add_line(&batch, false).unwrap();
        cart.set_quantity(&batch, false, 2).unwrap();
        cart.set_line_discount("b1", false, DiscountRate::from_bps(1000))
            .unwrap();
        let sale = finalize(&mut cart, &operator(), PaymentMethod::Cash).unwrap();
        assert_eq!(sale.total_cents, 1800);

        let ret = plan_return(
            &sale,
            &[ReturnSelection::new(key(&sale, 0), 1)],
            "damaged packaging",
            None,
            &operator(),
        )
        .unwrap();

        // 10.00 × 1 with the 10% line discount → 9.00
        assert_eq!(ret.total_refund_cents, 900);
    }

    #[test]
    fn test_full_means_full_of_what_remains() {
        let mut sale = single_line_sale();
        let k = key(&sale, 0);

        let first = plan_return(
            &sale,
            &[ReturnSelection::new(k.clone(), 4)],
            "damaged packaging",
            None,
            &operator(),
        )
        .unwrap();
        assert_eq!(first.kind, ReturnKind::Partial);
        apply_return(&mut sale, &first).unwrap();

        // Returning the remaining 6 is a FULL return of what's left
        let second = plan_return(
            &sale,
            &[ReturnSelection::new(k, 6)],
            "changed mind",
            None,
            &operator(),
        )
        .unwrap();
        assert_eq!(second.kind, ReturnKind::Full);
    }

    #[test]
    fn test_bad_selections_rejected() {
        let sale = single_line_sale();
        let k = key(&sale, 0);
        let op = operator();

        // Empty selection set
        assert!(matches!(
            plan_return(&sale, &[], "x", None, &op),
            Err(CoreError::Validation(_)) | Err(CoreError::EmptyReturn)
        ));

        // Missing reason
        assert!(plan_return(&sale, &[ReturnSelection::new(k.clone(), 1)], "  ", None, &op).is_err());

        // Duplicate line
        let dup = vec![
            ReturnSelection::new(k.clone(), 1),
            ReturnSelection::new(k.clone(), 2),
        ];
        assert!(matches!(
            plan_return(&sale, &dup, "damaged packaging", None, &op),
            Err(CoreError::DuplicateReturnLine { .. })
        ));

        // Unknown line
        let unknown = vec![ReturnSelection::new(LineKey::new(9, "nope"), 1)];
        assert!(matches!(
            plan_return(&sale, &unknown, "damaged packaging", None, &op),
            Err(CoreError::UnknownReturnLine { .. })
        ));

        // Zero quantity
        assert!(
            plan_return(&sale, &[ReturnSelection::new(k, 0)], "damaged packaging", None, &op)
                .is_err()
        );
    }

    #[test]
    fn test_apply_is_all_or_nothing() {
        let mut sale = single_line_sale();
        let k = key(&sale, 0);
        let op = operator();

        let ret = plan_return(
            &sale,
            &[ReturnSelection::new(k.clone(), 8)],
            "damaged packaging",
            None,
            &op,
        )
        .unwrap();
        apply_return(&mut sale, &ret).unwrap();

        // A stale plan computed before the first apply must not half-apply
        let stale = plan_return(
            &Sale {
                returned_by_line: Default::default(),
                ..sale.clone()
            },
            &[ReturnSelection::new(k.clone(), 8)],
            "damaged packaging",
            None,
            &op,
        )
        .unwrap();

        let before_log = sale.return_log.len();
        let before_net = sale.net_total_cents;
        assert!(apply_return(&mut sale, &stale).is_err());
        assert_eq!(sale.return_log.len(), before_log);
        assert_eq!(sale.net_total_cents, before_net);
        assert_eq!(sale.returned_quantity(&k), 8);
    }
}
