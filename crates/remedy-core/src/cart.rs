//! # Cart Builder
//!
//! The in-progress order: one line per (batch, mode) identity, dual
//! pack/unit pricing, and two mutually exclusive discount mechanisms.
//!
//! ## Cart Operations Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Cart Operations                                    │
//! │                                                                         │
//! │  Operator Action           Cart API                 State Change        │
//! │  ───────────────           ────────                 ────────────        │
//! │                                                                         │
//! │  Scan / pick product ────► add_line() ────────────► push or qty += 1   │
//! │                                                                         │
//! │  Edit quantity ──────────► set_quantity() ────────► qty = n (bounded)  │
//! │                                                                         │
//! │  Switch pack ⇄ unit ─────► toggle_unit_mode() ────► re-key, qty = 1    │
//! │                                                                         │
//! │  Line discount ──────────► set_line_discount() ───► clamp, global = 0  │
//! │                                                                         │
//! │  Order discount ─────────► set_global_discount() ─► lines' discounts=0 │
//! │                                                                         │
//! │  Remove / clear ─────────► remove_line(), clear()                      │
//! │                                                                         │
//! │  NOTE: a rejected edit leaves the cart exactly as it was. Validation   │
//! │        failures resolve here and are surfaced inline by the frontend.  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Line Identity
//! A line is identified by `(batch_id, unit_mode)`. Pack-mode and unit-mode
//! entries for the same batch are two distinct lines; stock checks still
//! bound their *combined* unit consumption by the batch's stock.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::types::{Batch, Customer, DiscountRate};
use crate::validation::validate_quantity;
use crate::MAX_CART_LINES;

// =============================================================================
// Cart Line
// =============================================================================

/// One line of the in-progress order.
///
/// ## Design Notes
/// - `batch_id`: reference to the catalog batch fulfilling this line
/// - Pricing fields are frozen at add time: the cart displays consistent
///   figures even if the catalog record changes while the order is open.
///   Stock, by contrast, is always checked against the live batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartLine {
    /// Batch fulfilling this line (UUID)
    pub batch_id: String,

    /// Product name at time of adding (frozen)
    pub product_name: String,

    /// Pack price in cents at time of adding (frozen)
    pub pack_price_cents: i64,

    /// Units per pack at time of adding (frozen)
    pub units_per_pack: i64,

    /// Per-batch discount cap at time of adding (frozen)
    pub max_discount_bps: u32,

    /// Quantity counted in individual units when true, whole packs when false
    pub unit_mode: bool,

    /// Quantity in the mode's unit of measure (> 0)
    pub quantity: i64,

    /// Line discount, capped at `max_discount_bps`
    pub discount: DiscountRate,

    /// When this line was added to the cart
    pub added_at: DateTime<Utc>,
}

impl CartLine {
    /// Creates a new line from a batch with quantity 1.
    ///
    /// ## Price Freezing
    /// The pack price and pack size are captured at this moment. If the
    /// catalog record changes afterwards, this line retains the original
    /// figures.
    pub fn from_batch(batch: &Batch, unit_mode: bool) -> Self {
        CartLine {
            batch_id: batch.id.clone(),
            product_name: batch.product_name.clone(),
            pack_price_cents: batch.pack_price_cents,
            units_per_pack: batch.units_per_pack,
            max_discount_bps: batch.max_discount_bps,
            unit_mode,
            quantity: 1,
            discount: DiscountRate::zero(),
            added_at: Utc::now(),
        }
    }

    /// The price of one quantity step in the current mode.
    ///
    /// Pack mode: the pack price. Unit mode: pack price / units per pack,
    /// rounded to the cent. This figure is what gets frozen into the sale.
    pub fn effective_unit_price(&self) -> Money {
        if self.unit_mode {
            Money::from_cents(self.pack_price_cents).per_unit(self.units_per_pack)
        } else {
            Money::from_cents(self.pack_price_cents)
        }
    }

    /// Stock consumption of this line, in units.
    ///
    /// A pack-mode quantity of `q` consumes `q × units_per_pack` units;
    /// a unit-mode quantity consumes `q` units. Fractional pack consumption
    /// (15 units from 10-unit packs = 1.5 packs) is exact in unit terms.
    pub fn units_consumed(&self) -> i64 {
        if self.unit_mode {
            self.quantity
        } else {
            self.quantity * self.units_per_pack
        }
    }

    /// Line total after the line discount.
    pub fn line_total(&self) -> Money {
        self.effective_unit_price()
            .multiply_quantity(self.quantity)
            .apply_discount(self.discount)
    }

    /// Line total in cents.
    #[inline]
    pub fn line_total_cents(&self) -> i64 {
        self.line_total().cents()
    }

    /// Whether this line matches a (batch, mode) identity.
    #[inline]
    fn matches(&self, batch_id: &str, unit_mode: bool) -> bool {
        self.batch_id == batch_id && self.unit_mode == unit_mode
    }
}

// =============================================================================
// Cart
// =============================================================================

/// The in-progress order.
///
/// ## Invariants
/// - Lines are unique by `(batch_id, unit_mode)`
/// - Quantity is always > 0 (removal is explicit, never a zero quantity)
/// - Combined unit consumption per batch never exceeds the batch's stock
/// - At most one of (any line discount, global discount) is non-zero
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cart {
    /// Lines in the cart, in insertion order
    pub lines: Vec<CartLine>,

    /// Order-level discount; mutually exclusive with line discounts
    pub global_discount: DiscountRate,

    /// Customer to freeze into the sale at checkout
    pub customer: Option<Customer>,

    /// When the cart was created/last cleared
    pub created_at: DateTime<Utc>,
}

impl Cart {
    /// Creates a new empty cart.
    pub fn new() -> Self {
        Cart {
            lines: Vec::new(),
            global_discount: DiscountRate::zero(),
            customer: None,
            created_at: Utc::now(),
        }
    }

    /// Looks up a line by its (batch, mode) identity.
    pub fn line(&self, batch_id: &str, unit_mode: bool) -> Option<&CartLine> {
        self.lines.iter().find(|l| l.matches(batch_id, unit_mode))
    }

    /// Units of a batch's stock already committed to the cart, across both
    /// of its possible lines. Used by the batch selector and stock checks.
    pub fn committed_units(&self, batch_id: &str) -> i64 {
        self.lines
            .iter()
            .filter(|l| l.batch_id == batch_id)
            .map(|l| l.units_consumed())
            .sum()
    }

    /// Units committed to the batch by lines OTHER than the given identity.
    fn committed_units_excluding(&self, batch_id: &str, unit_mode: bool) -> i64 {
        self.lines
            .iter()
            .filter(|l| l.batch_id == batch_id && l.unit_mode != unit_mode)
            .map(|l| l.units_consumed())
            .sum()
    }

    /// Adds one pack (or one unit) of a batch to the cart.
    ///
    /// ## Behavior
    /// - Line already present for this (batch, mode): quantity += 1
    /// - Otherwise: a new line with quantity 1 is snapshotted
    /// - Unit mode requires a multi-unit pack
    /// - The batch's stock must cover the cart's combined consumption
    pub fn add_line(&mut self, batch: &Batch, unit_mode: bool) -> CoreResult<()> {
        if unit_mode && !batch.supports_unit_sales() {
            return Err(CoreError::UnitModeUnavailable {
                batch_id: batch.id.clone(),
            });
        }

        let step_units = if unit_mode { 1 } else { batch.units_per_pack };
        let committed = self.committed_units(&batch.id);
        if committed + step_units > batch.stock_units {
            return Err(CoreError::InsufficientStock {
                batch_id: batch.id.clone(),
                available_units: batch.stock_units - committed,
                requested_units: step_units,
            });
        }

        if let Some(line) = self
            .lines
            .iter_mut()
            .find(|l| l.matches(&batch.id, unit_mode))
        {
            validate_quantity(line.quantity + 1)?;
            line.quantity += 1;
            return Ok(());
        }

        if self.lines.len() >= MAX_CART_LINES {
            return Err(CoreError::CartTooLarge {
                max: MAX_CART_LINES,
            });
        }

        self.lines.push(CartLine::from_batch(batch, unit_mode));
        Ok(())
    }

    /// Sets the quantity of a line.
    ///
    /// ## Behavior
    /// Rejected (cart unchanged) when the quantity is out of range or the
    /// batch cannot cover the cart's combined consumption:
    /// pack mode bounds `qty × units_per_pack`, unit mode bounds `qty`,
    /// both net of the batch's other line.
    pub fn set_quantity(
        &mut self,
        batch: &Batch,
        unit_mode: bool,
        quantity: i64,
    ) -> CoreResult<()> {
        validate_quantity(quantity)?;

        let other_units = self.committed_units_excluding(&batch.id, unit_mode);
        let line = self
            .lines
            .iter_mut()
            .find(|l| l.matches(&batch.id, unit_mode))
            .ok_or_else(|| CoreError::LineNotFound {
                batch_id: batch.id.clone(),
            })?;

        let requested_units = if unit_mode {
            quantity
        } else {
            quantity * line.units_per_pack
        };
        if other_units + requested_units > batch.stock_units {
            return Err(CoreError::InsufficientStock {
                batch_id: batch.id.clone(),
                available_units: batch.stock_units - other_units,
                requested_units,
            });
        }

        line.quantity = quantity;
        Ok(())
    }

    /// Switches a line between pack and unit pricing.
    ///
    /// ## Behavior
    /// - Requires a multi-unit pack
    /// - Quantity resets to 1 (a stale pack count must never be misread as a
    ///   unit count)
    /// - Rejected if the cart already has a line for this batch in the
    ///   target mode, or if one step in the target mode exceeds stock
    pub fn toggle_unit_mode(&mut self, batch: &Batch, unit_mode: bool) -> CoreResult<()> {
        if !batch.supports_unit_sales() {
            return Err(CoreError::UnitModeUnavailable {
                batch_id: batch.id.clone(),
            });
        }

        let target_mode = !unit_mode;
        if self.line(&batch.id, target_mode).is_some() {
            return Err(CoreError::DuplicateLine {
                batch_id: batch.id.clone(),
            });
        }

        let other_units = self.committed_units_excluding(&batch.id, unit_mode);
        let step_units = if target_mode { 1 } else { batch.units_per_pack };
        if other_units + step_units > batch.stock_units {
            return Err(CoreError::InsufficientStock {
                batch_id: batch.id.clone(),
                available_units: batch.stock_units - other_units,
                requested_units: step_units,
            });
        }

        let line = self
            .lines
            .iter_mut()
            .find(|l| l.matches(&batch.id, unit_mode))
            .ok_or_else(|| CoreError::LineNotFound {
                batch_id: batch.id.clone(),
            })?;

        line.unit_mode = target_mode;
        line.quantity = 1;
        Ok(())
    }

    /// Sets a line discount, clamped to the batch's cap.
    ///
    /// ## Mutual Exclusion
    /// Any non-zero line discount forces the global discount to 0. The two
    /// mechanisms never compound.
    pub fn set_line_discount(
        &mut self,
        batch_id: &str,
        unit_mode: bool,
        rate: DiscountRate,
    ) -> CoreResult<()> {
        let line = self
            .lines
            .iter_mut()
            .find(|l| l.matches(batch_id, unit_mode))
            .ok_or_else(|| CoreError::LineNotFound {
                batch_id: batch_id.to_string(),
            })?;

        let clamped = rate.clamp_to(line.max_discount_bps);
        line.discount = clamped;

        if !clamped.is_zero() {
            self.global_discount = DiscountRate::zero();
        }
        Ok(())
    }

    /// Sets the order-level discount.
    ///
    /// ## Mutual Exclusion
    /// Any non-zero global discount resets every line discount to 0.
    pub fn set_global_discount(&mut self, rate: DiscountRate) {
        self.global_discount = rate;

        if !rate.is_zero() {
            for line in &mut self.lines {
                line.discount = DiscountRate::zero();
            }
        }
    }

    /// Attaches customer details to be frozen into the sale.
    pub fn set_customer(&mut self, customer: Option<Customer>) {
        self.customer = customer;
    }

    /// Removes a line by its (batch, mode) identity.
    pub fn remove_line(&mut self, batch_id: &str, unit_mode: bool) -> CoreResult<()> {
        let initial_len = self.lines.len();
        self.lines.retain(|l| !l.matches(batch_id, unit_mode));

        if self.lines.len() == initial_len {
            Err(CoreError::LineNotFound {
                batch_id: batch_id.to_string(),
            })
        } else {
            Ok(())
        }
    }

    /// Clears all lines, discounts and customer fields (new empty cart).
    pub fn clear(&mut self) {
        self.lines.clear();
        self.global_discount = DiscountRate::zero();
        self.customer = None;
        self.created_at = Utc::now();
    }

    /// Returns the number of lines in the cart.
    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    /// Calculates the subtotal (line totals after line discounts).
    pub fn subtotal(&self) -> Money {
        self.lines
            .iter()
            .fold(Money::zero(), |acc, l| acc + l.line_total())
    }

    /// Calculates the order total (subtotal after the global discount).
    pub fn total(&self) -> Money {
        self.subtotal().apply_discount(self.global_discount)
    }

    /// Checks if the cart is empty.
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

impl Default for Cart {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Read Models
// =============================================================================

/// One cart line with resolved display fields, for the terminal frontend.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLineView {
    pub batch_id: String,
    pub product_name: String,
    pub unit_mode: bool,
    pub quantity: i64,
    pub effective_unit_price_cents: i64,
    pub discount_bps: u32,
    pub line_total_cents: i64,
}

impl From<&CartLine> for CartLineView {
    fn from(line: &CartLine) -> Self {
        CartLineView {
            batch_id: line.batch_id.clone(),
            product_name: line.product_name.clone(),
            unit_mode: line.unit_mode,
            quantity: line.quantity,
            effective_unit_price_cents: line.effective_unit_price().cents(),
            discount_bps: line.discount.bps(),
            line_total_cents: line.line_total_cents(),
        }
    }
}

/// Cart totals summary for API responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartTotals {
    pub line_count: usize,
    pub subtotal_cents: i64,
    pub global_discount_bps: u32,
    pub total_cents: i64,
}

impl From<&Cart> for CartTotals {
    fn from(cart: &Cart) -> Self {
        CartTotals {
            line_count: cart.line_count(),
            subtotal_cents: cart.subtotal().cents(),
            global_discount_bps: cart.global_discount.bps(),
            total_cents: cart.total().cents(),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
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
            max_discount_bps: 1000, // 10%
            barcode: None,
            internal_code: None,
            category: None,
        }
    }

    #[test]
    fn test_add_line_and_totals() {
        let mut cart = Cart::new();
        let batch = test_batch("b1", 999, 1, 50); // 9.99 per pack

        cart.add_line(&batch, false).unwrap();
        cart.set_quantity(&batch, false, 2).unwrap();

        assert_eq!(cart.line_count(), 1);
        assert_eq!(cart.subtotal().cents(), 1998); // 19.98
    }

    #[test]
    fn test_add_same_identity_increments_quantity() {
        let mut cart = Cart::new();
        let batch = test_batch("b1", 999, 1, 50);

        cart.add_line(&batch, false).unwrap();
        cart.add_line(&batch, false).unwrap();
        cart.add_line(&batch, false).unwrap();

        assert_eq!(cart.line_count(), 1); // Still one line
        assert_eq!(cart.line("b1", false).unwrap().quantity, 3);
    }

    #[test]
    fn test_mixed_modes_are_distinct_lines() {
        let mut cart = Cart::new();
        let batch = test_batch("b1", 2000, 10, 5);

        cart.add_line(&batch, false).unwrap();
        cart.add_line(&batch, true).unwrap();

        assert_eq!(cart.line_count(), 2);
        assert_eq!(cart.line("b1", false).unwrap().quantity, 1);
        assert_eq!(cart.line("b1", true).unwrap().quantity, 1);
        // 1 pack (10 units) + 1 unit
        assert_eq!(cart.committed_units("b1"), 11);
    }

    #[test]
    fn test_unit_pack_conversion() {
        // upp=10, stock=2 packs, pack price 20.00
        let mut cart = Cart::new();
        let batch = test_batch("b1", 2000, 10, 2);

        cart.add_line(&batch, true).unwrap();
        // 15 units = 1.5 packs ≤ 2 packs of stock
        cart.set_quantity(&batch, true, 15).unwrap();

        let line = cart.line("b1", true).unwrap();
        assert_eq!(line.effective_unit_price().cents(), 200); // 2.00
        assert_eq!(line.line_total_cents(), 3000); // 30.00
        assert_eq!(line.units_consumed(), 15);
    }

    #[test]
    fn test_quantity_beyond_stock_rejected_silently() {
        let mut cart = Cart::new();
        let batch = test_batch("b1", 2000, 10, 2); // 20 units

        cart.add_line(&batch, true).unwrap();
        cart.set_quantity(&batch, true, 20).unwrap();

        // 21 units > 2 packs: rejected, quantity unchanged
        assert!(cart.set_quantity(&batch, true, 21).is_err());
        assert_eq!(cart.line("b1", true).unwrap().quantity, 20);

        // Same bound in pack mode
        let batch2 = test_batch("b2", 500, 1, 3);
        cart.add_line(&batch2, false).unwrap();
        assert!(cart.set_quantity(&batch2, false, 4).is_err());
        assert_eq!(cart.line("b2", false).unwrap().quantity, 1);
    }

    #[test]
    fn test_combined_mode_consumption_bounded_by_stock() {
        let mut cart = Cart::new();
        let batch = test_batch("b1", 2000, 10, 2); // 20 units

        cart.add_line(&batch, false).unwrap(); // 10 units
        cart.add_line(&batch, true).unwrap(); // +1 unit

        // Unit line may grow to 10 (total 20 units) but not 11
        cart.set_quantity(&batch, true, 10).unwrap();
        assert!(cart.set_quantity(&batch, true, 11).is_err());

        // Pack line cannot grow either: 2 packs + 10 units = 30 > 20
        assert!(cart.set_quantity(&batch, false, 2).is_err());
    }

    #[test]
    fn test_unit_mode_requires_multi_unit_pack() {
        let mut cart = Cart::new();
        let batch = test_batch("b1", 500, 1, 10);

        assert!(matches!(
            cart.add_line(&batch, true),
            Err(CoreError::UnitModeUnavailable { .. })
        ));
    }

    #[test]
    fn test_toggle_resets_quantity() {
        let mut cart = Cart::new();
        let batch = test_batch("b1", 2000, 10, 5);

        cart.add_line(&batch, false).unwrap();
        cart.set_quantity(&batch, false, 4).unwrap();

        cart.toggle_unit_mode(&batch, false).unwrap();

        let line = cart.line("b1", true).unwrap();
        assert!(line.unit_mode);
        assert_eq!(line.quantity, 1);
    }

    #[test]
    fn test_toggle_collision_rejected() {
        let mut cart = Cart::new();
        let batch = test_batch("b1", 2000, 10, 5);

        cart.add_line(&batch, false).unwrap();
        cart.add_line(&batch, true).unwrap();

        assert!(matches!(
            cart.toggle_unit_mode(&batch, false),
            Err(CoreError::DuplicateLine { .. })
        ));
    }

    #[test]
    fn test_discount_mutual_exclusion() {
        let mut cart = Cart::new();
        let a = test_batch("a", 1000, 1, 50);
        let b = test_batch("b", 2000, 1, 50);
        cart.add_line(&a, false).unwrap();
        cart.add_line(&b, false).unwrap();

        // Line discount forces global to 0
        cart.set_global_discount(DiscountRate::from_bps(500));
        cart.set_line_discount("a", false, DiscountRate::from_bps(1000))
            .unwrap();
        assert!(cart.global_discount.is_zero());
        assert_eq!(cart.line("a", false).unwrap().discount.bps(), 1000);

        // Global discount resets every line discount
        cart.set_global_discount(DiscountRate::from_bps(500));
        assert!(cart.line("a", false).unwrap().discount.is_zero());
        assert!(cart.line("b", false).unwrap().discount.is_zero());
        assert_eq!(cart.global_discount.bps(), 500);
    }

    #[test]
    fn test_line_discount_clamped_to_batch_cap() {
        let mut cart = Cart::new();
        let batch = test_batch("b1", 1000, 1, 50); // cap 10%

        cart.add_line(&batch, false).unwrap();
        cart.set_line_discount("b1", false, DiscountRate::from_bps(2500))
            .unwrap();

        assert_eq!(cart.line("b1", false).unwrap().discount.bps(), 1000);
    }

    #[test]
    fn test_totals_with_discounts() {
        let mut cart = Cart::new();
        let a = test_batch("a", 5000, 1, 50);
        let b = test_batch("b", 5000, 1, 50);
        cart.add_line(&a, false).unwrap();
        cart.add_line(&b, false).unwrap();

        // subtotal 100.00, global 10% → total 90.00
        cart.set_global_discount(DiscountRate::from_bps(1000));
        assert_eq!(cart.subtotal().cents(), 10000);
        assert_eq!(cart.total().cents(), 9000);

        // Switch to a 10% line discount on one line:
        // subtotal = 45.00 + 50.00 = 95.00, no global discount
        cart.set_line_discount("a", false, DiscountRate::from_bps(1000))
            .unwrap();
        assert_eq!(cart.subtotal().cents(), 9500);
        assert_eq!(cart.total().cents(), 9500);
    }

    #[test]
    fn test_remove_and_clear() {
        let mut cart = Cart::new();
        let batch = test_batch("b1", 999, 1, 50);

        cart.add_line(&batch, false).unwrap();
        assert!(!cart.is_empty());

        cart.remove_line("b1", false).unwrap();
        assert!(cart.is_empty());
        assert!(cart.remove_line("b1", false).is_err());

        cart.add_line(&batch, false).unwrap();
        cart.set_global_discount(DiscountRate::from_bps(500));
        cart.set_customer(Some(Customer {
            name: "Walk-in".to_string(),
            phone: None,
        }));
        cart.clear();

        assert!(cart.is_empty());
        assert!(cart.global_discount.is_zero());
        assert!(cart.customer.is_none());
    }

    #[test]
    fn test_read_models() {
        let mut cart = Cart::new();
        let batch = test_batch("b1", 2000, 10, 2);
        cart.add_line(&batch, true).unwrap();
        cart.set_quantity(&batch, true, 15).unwrap();

        let view = CartLineView::from(cart.line("b1", true).unwrap());
        assert_eq!(view.effective_unit_price_cents, 200);
        assert_eq!(view.line_total_cents, 3000);

        let totals = CartTotals::from(&cart);
        assert_eq!(totals.line_count, 1);
        assert_eq!(totals.subtotal_cents, 3000);
        assert_eq!(totals.total_cents, 3000);
    }
}
