//! # Domain Types
//!
//! Core domain types used throughout Remedy POS.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │     Batch       │   │     Shift       │   │    Operator     │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (UUID)      │   │  id (UUID)      │   │  id (UUID)      │       │
//! │  │  product_name   │   │  opened_at      │   │  role           │       │
//! │  │  expiry_date    │   │  cash_total     │   └─────────────────┘       │
//! │  │  stock_units    │   │  returns_total  │                             │
//! │  └─────────────────┘   └─────────────────┘                             │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │  DiscountRate   │   │   SaleStatus    │   │ PaymentMethod   │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  bps (u32)      │   │  Completed      │   │  Cash           │       │
//! │  │  1000 = 10%     │   │  PartiallyRet.  │   │  Card           │       │
//! │  └─────────────────┘   │  Returned       │   └─────────────────┘       │
//! │                        └─────────────────┘                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Batch/Lot Identity
//! A product name may map to several batches, each a distinct inventory
//! record with its own stock count and expiry date. The engine allocates
//! cart lines to batches, never to bare product names.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::money::Money;

// =============================================================================
// Discount Rate
// =============================================================================

/// Discount rate represented in basis points (bps).
///
/// ## Why Basis Points?
/// 1 basis point = 0.01% = 1/10000
/// 1000 bps = 10% (the default per-batch discount cap)
///
/// The external contract expresses percentages as integers or one-decimal
/// values in [0, 100]; basis points represent both exactly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscountRate(u32);

impl DiscountRate {
    /// Creates a discount rate from basis points, capped at 100%.
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        DiscountRate(if bps > 10000 { 10000 } else { bps })
    }

    /// Creates a discount rate from a percentage (for convenience).
    pub fn from_percentage(pct: f64) -> Self {
        DiscountRate::from_bps((pct.clamp(0.0, 100.0) * 100.0).round() as u32)
    }

    /// Returns the rate in basis points.
    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// Returns the rate as a percentage (for display only).
    #[inline]
    pub fn percentage(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// Caps the rate at a maximum (per-batch discount ceilings).
    #[inline]
    pub const fn clamp_to(&self, max_bps: u32) -> Self {
        DiscountRate(if self.0 > max_bps { max_bps } else { self.0 })
    }

    /// Zero discount.
    #[inline]
    pub const fn zero() -> Self {
        DiscountRate(0)
    }

    /// Checks if the rate is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl Default for DiscountRate {
    fn default() -> Self {
        DiscountRate::zero()
    }
}

// =============================================================================
// Batch
// =============================================================================

/// One physical batch/lot of a named product, as provided by the catalog.
///
/// Owned by the catalog; read-only to this engine. The same product name may
/// appear on several batches with distinct expiry dates and stock counts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Batch {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Product name shown to the operator and on receipts.
    pub product_name: String,

    /// Stock on hand, counted in **units** (not packs).
    ///
    /// The catalog tracks pack stock that may be fractional after loose-unit
    /// sales; `units = packs × units_per_pack` represents that exactly with
    /// integer arithmetic.
    pub stock_units: i64,

    /// Price per whole pack, in cents.
    pub pack_price_cents: i64,

    /// Cost per pack in cents (for margin reporting).
    pub cost_cents: Option<i64>,

    /// Units contained in one pack (≥ 1).
    pub units_per_pack: i64,

    /// Expiry date of this batch; drives FEFO allocation.
    pub expiry_date: NaiveDate,

    /// Maximum line discount allowed on this batch, in basis points.
    pub max_discount_bps: u32,

    /// Barcode (EAN-13, UPC-A, etc.).
    pub barcode: Option<String>,

    /// Internal short code used at the counter.
    pub internal_code: Option<String>,

    /// Category (antibiotics, analgesics, ...).
    pub category: Option<String>,
}

impl Batch {
    /// Returns the pack price as a Money type.
    #[inline]
    pub fn pack_price(&self) -> Money {
        Money::from_cents(self.pack_price_cents)
    }

    /// Returns the per-unit price (rounded to the cent).
    #[inline]
    pub fn unit_price(&self) -> Money {
        self.pack_price().per_unit(self.units_per_pack)
    }

    /// Checks whether the batch can cover the given unit consumption.
    #[inline]
    pub fn has_stock_for(&self, units: i64) -> bool {
        units <= self.stock_units
    }

    /// Whether loose-unit sales make sense for this batch.
    #[inline]
    pub fn supports_unit_sales(&self) -> bool {
        self.units_per_pack > 1
    }
}

// =============================================================================
// Roles & Operators
// =============================================================================

/// Staff role, drives refund authorization ceilings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Front-counter cashier: tightest refund limits, same-shift only.
    Cashier,
    /// Licensed pharmacist: higher per-invoice limit plus a daily cap.
    Pharmacist,
    /// Store manager: no refund ceilings.
    Manager,
    /// System administrator: no refund ceilings.
    Admin,
    /// Store owner: no refund ceilings.
    Owner,
}

impl Role {
    /// Human-readable label used in denial messages.
    pub fn label(&self) -> &'static str {
        match self {
            Role::Cashier => "cashier",
            Role::Pharmacist => "pharmacist",
            Role::Manager => "manager",
            Role::Admin => "admin",
            Role::Owner => "owner",
        }
    }
}

/// The operator performing an action.
///
/// Passed explicitly into checkout and return flows; there is no ambient
/// "current user" global anywhere in the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Operator {
    pub id: String,
    pub role: Role,
}

impl Operator {
    pub fn new(id: impl Into<String>, role: Role) -> Self {
        Operator { id: id.into(), role }
    }
}

// =============================================================================
// Payment Method
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Physical cash payment.
    Cash,
    /// Card payment on external terminal.
    Card,
}

// =============================================================================
// Sale Status
// =============================================================================

/// The status of a finalized sale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SaleStatus {
    /// Sale is finalized with no returns against it.
    Completed,
    /// At least one unit has been returned, but not everything.
    PartiallyReturned,
    /// Every line has been returned in full.
    Returned,
}

impl Default for SaleStatus {
    fn default() -> Self {
        SaleStatus::Completed
    }
}

// =============================================================================
// Customer
// =============================================================================

/// Minimal customer reference frozen into a sale.
///
/// Customer relationship management is an external collaborator; the engine
/// only snapshots enough to print on the receipt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Customer {
    pub name: String,
    pub phone: Option<String>,
}

// =============================================================================
// Shift
// =============================================================================

/// Shift lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShiftStatus {
    Open,
    Closed,
}

/// An operator's open cash-register session and its running ledger.
///
/// ## Invariants
/// - Exactly one open shift at a time per terminal context.
/// - `returns_total_cents` only ever grows; refunds are bounded by
///   [`Shift::available_balance`] at authorization time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Shift {
    pub id: String,
    pub opened_by: String,
    pub opened_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
    pub status: ShiftStatus,
    /// Cash taken in from sales during this shift.
    pub cash_total_cents: i64,
    /// Card payments taken during this shift.
    pub card_total_cents: i64,
    /// Cash added to the drawer outside of sales (float, deposits).
    pub cash_deposits_cents: i64,
    /// Cumulative refunds issued during this shift.
    pub returns_total_cents: i64,
}

impl Shift {
    /// Opens a fresh shift with a zeroed ledger.
    pub fn open(id: impl Into<String>, opened_by: impl Into<String>, opened_at: DateTime<Utc>) -> Self {
        Shift {
            id: id.into(),
            opened_by: opened_by.into(),
            opened_at,
            closed_at: None,
            status: ShiftStatus::Open,
            cash_total_cents: 0,
            card_total_cents: 0,
            cash_deposits_cents: 0,
            returns_total_cents: 0,
        }
    }

    /// Whether the shift is still open.
    #[inline]
    pub fn is_open(&self) -> bool {
        self.status == ShiftStatus::Open
    }

    /// Whether a sale timestamp falls inside this shift's window.
    pub fn covers(&self, at: DateTime<Utc>) -> bool {
        if at < self.opened_at {
            return false;
        }
        match self.closed_at {
            Some(closed) => at <= closed,
            None => true,
        }
    }

    /// Balance available for refunds:
    /// `cash + card + deposits − returns issued so far`.
    ///
    /// A refund may never exceed this figure: the drawer cannot give back
    /// more than the shift has taken in.
    pub fn available_balance(&self) -> Money {
        Money::from_cents(
            self.cash_total_cents + self.card_total_cents + self.cash_deposits_cents
                - self.returns_total_cents,
        )
    }

    /// Credits a completed sale to the ledger.
    pub fn record_sale(&mut self, amount: Money, method: PaymentMethod) {
        match method {
            PaymentMethod::Cash => self.cash_total_cents += amount.cents(),
            PaymentMethod::Card => self.card_total_cents += amount.cents(),
        }
    }

    /// Records a cash deposit (opening float, mid-shift top-up).
    pub fn record_deposit(&mut self, amount: Money) {
        self.cash_deposits_cents += amount.cents();
    }

    /// Records an issued refund against the ledger.
    pub fn record_return(&mut self, amount: Money) {
        self.returns_total_cents += amount.cents();
    }

    /// Closes the shift.
    pub fn close(&mut self, at: DateTime<Utc>) {
        self.status = ShiftStatus::Closed;
        self.closed_at = Some(at);
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_discount_rate_from_bps() {
        let rate = DiscountRate::from_bps(1000);
        assert_eq!(rate.bps(), 1000);
        assert!((rate.percentage() - 10.0).abs() < 0.001);
    }

    #[test]
    fn test_discount_rate_from_percentage() {
        let rate = DiscountRate::from_percentage(8.5);
        assert_eq!(rate.bps(), 850);
    }

    #[test]
    fn test_discount_rate_caps_at_full() {
        assert_eq!(DiscountRate::from_bps(12000).bps(), 10000);
        assert_eq!(DiscountRate::from_percentage(150.0).bps(), 10000);
    }

    #[test]
    fn test_discount_rate_clamp_to() {
        let rate = DiscountRate::from_bps(2500);
        assert_eq!(rate.clamp_to(1000).bps(), 1000);
        assert_eq!(DiscountRate::from_bps(500).clamp_to(1000).bps(), 500);
    }

    #[test]
    fn test_batch_unit_price() {
        let batch = Batch {
            id: "b1".to_string(),
            product_name: "Amoxicillin 500mg".to_string(),
            stock_units: 20,
            pack_price_cents: 2000,
            cost_cents: Some(1400),
            units_per_pack: 10,
            expiry_date: NaiveDate::from_ymd_opt(2026, 6, 30).unwrap(),
            max_discount_bps: 1000,
            barcode: None,
            internal_code: None,
            category: Some("antibiotics".to_string()),
        };
        assert_eq!(batch.unit_price().cents(), 200);
        assert!(batch.supports_unit_sales());
        assert!(batch.has_stock_for(20));
        assert!(!batch.has_stock_for(21));
    }

    #[test]
    fn test_shift_available_balance() {
        let mut shift = Shift::open("s1", "op1", Utc.with_ymd_and_hms(2026, 1, 5, 8, 0, 0).unwrap());
        shift.record_sale(Money::from_cents(100_000), PaymentMethod::Cash);
        shift.record_sale(Money::from_cents(50_000), PaymentMethod::Card);
        shift.record_deposit(Money::from_cents(10_000));
        shift.record_return(Money::from_cents(80_000));

        assert_eq!(shift.available_balance().cents(), 80_000);
    }

    #[test]
    fn test_shift_covers_window() {
        let opened = Utc.with_ymd_and_hms(2026, 1, 5, 8, 0, 0).unwrap();
        let mut shift = Shift::open("s1", "op1", opened);

        assert!(shift.covers(opened));
        assert!(shift.covers(Utc.with_ymd_and_hms(2026, 1, 5, 12, 0, 0).unwrap()));
        assert!(!shift.covers(Utc.with_ymd_and_hms(2026, 1, 5, 7, 59, 0).unwrap()));

        shift.close(Utc.with_ymd_and_hms(2026, 1, 5, 16, 0, 0).unwrap());
        assert!(!shift.covers(Utc.with_ymd_and_hms(2026, 1, 5, 17, 0, 0).unwrap()));
        assert!(shift.covers(Utc.with_ymd_and_hms(2026, 1, 5, 15, 0, 0).unwrap()));
    }

    #[test]
    fn test_sale_status_default() {
        assert_eq!(SaleStatus::default(), SaleStatus::Completed);
    }
}
