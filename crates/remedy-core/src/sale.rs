//! # Sale Records & Finalization
//!
//! Snapshots the cart into an immutable Sale at checkout.
//!
//! ## Sale Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Sale Lifecycle                                    │
//! │                                                                         │
//! │  1. FINALIZE (this module)                                             │
//! │     └── finalize(cart, ...) → Sale { status: Completed }               │
//! │         • every cart line frozen with its resolved unit price          │
//! │         • cart cleared (lines, discounts, customer)                    │
//! │                                                                         │
//! │  2. RETURNS (returns module)                                           │
//! │     └── apply_return() → returned_by_line ledger grows,                │
//! │         return_log appended, net_total shrinks                        │
//! │                                                                         │
//! │  A sale is never deleted; its return bookkeeping is the only part      │
//! │  that ever changes (append-only history).                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Snapshot Pattern
//! The resolved effective unit price is frozen into each sale line, so later
//! catalog price changes never affect historical sales or their refunds.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::cart::Cart;
use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::returns::ReturnKind;
use crate::types::{Customer, DiscountRate, Operator, PaymentMethod, SaleStatus};

// =============================================================================
// Line Key
// =============================================================================

/// Composite identifier for a sale line: line position + batch id.
///
/// ## Why Not Just the Batch Id?
/// With (batch, mode) line identity, the same batch can appear on two lines
/// of one sale. Partial returns must be tracked independently per line, so
/// the key includes the line position.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LineKey(String);

impl LineKey {
    /// Builds the key for a line position and batch id.
    pub fn new(line_no: usize, batch_id: &str) -> Self {
        LineKey(format!("{}:{}", line_no, batch_id))
    }

    /// The key as a string slice (for map lookups and logging).
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LineKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// =============================================================================
// Sale Line
// =============================================================================

/// A frozen line of a finalized sale.
///
/// Uses the snapshot pattern: pricing is resolved and locked at checkout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaleLine {
    /// Position of this line within the sale (0-based).
    pub line_no: usize,
    /// Batch that fulfilled the line.
    pub batch_id: String,
    /// Product name at time of sale (frozen).
    pub product_name: String,
    /// Whether the quantity counts units rather than packs.
    pub unit_mode: bool,
    /// Units per pack at time of sale (frozen).
    pub units_per_pack: i64,
    /// Resolved effective unit price at time of sale (frozen).
    pub unit_price_cents: i64,
    /// Quantity sold, in the mode's unit of measure.
    pub quantity: i64,
    /// Line discount applied at time of sale.
    pub discount_bps: u32,
    /// Line total after the line discount.
    pub line_total_cents: i64,
}

impl SaleLine {
    /// The key under which this line's returns are tracked.
    pub fn line_key(&self) -> LineKey {
        LineKey::new(self.line_no, &self.batch_id)
    }

    /// Returns the frozen unit price as Money.
    #[inline]
    pub fn unit_price(&self) -> Money {
        Money::from_cents(self.unit_price_cents)
    }

    /// Returns the line total as Money.
    #[inline]
    pub fn line_total(&self) -> Money {
        Money::from_cents(self.line_total_cents)
    }
}

// =============================================================================
// Return Log Entry
// =============================================================================

/// Summary of one return operation, kept on the sale in order of commit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReturnEntry {
    pub return_id: String,
    pub kind: ReturnKind,
    pub total_refund_cents: i64,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Sale
// =============================================================================

/// A finalized sale transaction.
///
/// Immutable after creation except for the return bookkeeping fields
/// (`returned_by_line`, `return_log`, `net_total_cents`, `status`), which
/// only the return processor touches.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sale {
    pub id: String,
    pub receipt_number: String,
    pub created_at: DateTime<Utc>,
    /// Frozen copies of the cart lines with resolved unit prices.
    pub lines: Vec<SaleLine>,
    /// Order-level discount applied to the aggregate at time of sale.
    pub global_discount_bps: u32,
    /// Sum of line totals (after line discounts).
    pub subtotal_cents: i64,
    /// Subtotal after the global discount.
    pub total_cents: i64,
    pub payment_method: PaymentMethod,
    pub status: SaleStatus,
    pub customer: Option<Customer>,
    /// Cashier/pharmacist who rang up the sale.
    pub operator_id: String,
    /// Cumulative quantity already returned, per line key.
    pub returned_by_line: BTreeMap<LineKey, i64>,
    /// Ordered summaries of every return committed against this sale.
    pub return_log: Vec<ReturnEntry>,
    /// Total minus all refunds issued to date.
    pub net_total_cents: i64,
}

impl Sale {
    /// Looks up a line by its key.
    pub fn line(&self, key: &LineKey) -> Option<&SaleLine> {
        self.lines.iter().find(|l| &l.line_key() == key)
    }

    /// Quantity already returned against a line.
    pub fn returned_quantity(&self, key: &LineKey) -> i64 {
        self.returned_by_line.get(key).copied().unwrap_or(0)
    }

    /// Sum of all refunds issued against this sale.
    pub fn refunded_cents(&self) -> i64 {
        self.return_log.iter().map(|r| r.total_refund_cents).sum()
    }

    /// The sale's global discount as a rate.
    #[inline]
    pub fn global_discount(&self) -> DiscountRate {
        DiscountRate::from_bps(self.global_discount_bps)
    }

    /// Net total as Money.
    #[inline]
    pub fn net_total(&self) -> Money {
        Money::from_cents(self.net_total_cents)
    }
}

// =============================================================================
// Finalization
// =============================================================================

/// Snapshots the cart into an immutable [`Sale`].
///
/// ## What This Does
/// 1. Rejects an empty cart before any mutation
/// 2. Freezes every cart line with its resolved effective unit price
/// 3. Assigns a UUID, receipt number and UTC timestamp
/// 4. Initializes the return ledger empty and `net_total = total`
/// 5. Clears the cart (lines, discounts, customer)
///
/// ## Example
/// ```text
/// Cart: 2 lines, subtotal 100.00, global discount 10%
///      │
///      ▼
/// finalize(cart, operator, Cash) ← THIS FUNCTION
///      │
///      ▼
/// Sale { total: 90.00, net_total: 90.00, status: Completed }
/// Cart: empty
/// ```
pub fn finalize(
    cart: &mut Cart,
    operator: &Operator,
    payment_method: PaymentMethod,
) -> CoreResult<Sale> {
    if cart.is_empty() {
        return Err(CoreError::EmptyCart);
    }

    let now = Utc::now();
    let lines: Vec<SaleLine> = cart
        .lines
        .iter()
        .enumerate()
        .map(|(line_no, l)| SaleLine {
            line_no,
            batch_id: l.batch_id.clone(),
            product_name: l.product_name.clone(),
            unit_mode: l.unit_mode,
            units_per_pack: l.units_per_pack,
            unit_price_cents: l.effective_unit_price().cents(),
            quantity: l.quantity,
            discount_bps: l.discount.bps(),
            line_total_cents: l.line_total_cents(),
        })
        .collect();

    let subtotal = cart.subtotal();
    let total = cart.total();

    let sale = Sale {
        id: Uuid::new_v4().to_string(),
        receipt_number: generate_receipt_number(now),
        created_at: now,
        lines,
        global_discount_bps: cart.global_discount.bps(),
        subtotal_cents: subtotal.cents(),
        total_cents: total.cents(),
        payment_method,
        status: SaleStatus::Completed,
        customer: cart.customer.clone(),
        operator_id: operator.id.clone(),
        returned_by_line: BTreeMap::new(),
        return_log: Vec::new(),
        net_total_cents: total.cents(),
    };

    cart.clear();

    Ok(sale)
}

/// Generates a receipt number in format: YYMMDD-HHMMSS-NNNN
///
/// ## Format
/// - YYMMDD-HHMMSS: checkout timestamp
/// - NNNN: sub-second disambiguator (padded to 4 digits)
///
/// ## Example
/// `260105-143027-0421`
fn generate_receipt_number(at: DateTime<Utc>) -> String {
    let sub = (at.timestamp_subsec_micros() % 10_000) as u16;
    format!("{}-{:04}", at.format("%y%m%d-%H%M%S"), sub)
}

// =============================================================================
// Unit Tests
// =============================================================================
