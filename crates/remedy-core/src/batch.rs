//! # Batch Selection
//!
//! First-Expired-First-Out (FEFO) allocation of cart lines to inventory
//! batches.
//!
//! ## Why FEFO?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Pharmacy shelves hold several batches of the same product:             │
//! │                                                                         │
//! │    Paracetamol 500mg   batch A   expires 2025-01-10   5 packs          │
//! │    Paracetamol 500mg   batch B   expires 2025-03-01   5 packs          │
//! │                                                                         │
//! │  Selling the soonest-to-expire batch first minimizes write-offs.       │
//! │  The selector therefore walks batches in expiry order and picks the    │
//! │  first one that still has stock not already committed to the cart.     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Manual Override
//! The operator can point at a specific batch (e.g., the customer is holding
//! a particular box). The override is honored only while that batch has
//! net-available stock; otherwise selection falls back to expiry order.
//!
//! Selection is pure: nothing here mutates stock or the cart.

use crate::cart::Cart;
use crate::types::Batch;

/// Net stock of a batch after subtracting units already committed to the
/// cart (across both the pack-mode and unit-mode lines of that batch).
pub fn net_available_units(batch: &Batch, cart: &Cart) -> i64 {
    batch.stock_units - cart.committed_units(&batch.id)
}

/// Picks the batch that should fulfill the next unit of a product.
///
/// ## Contract
/// - `batches` are the catalog's records for one product name; order does
///   not matter, the selector sorts by expiry date ascending itself.
/// - `manual_override` wins if that batch has net-available stock > 0.
/// - Otherwise the first batch in expiry order with net-available stock > 0
///   is returned.
/// - `None` means nothing is available; the caller must not create a line.
///
/// ## Example
/// ```rust
/// use chrono::NaiveDate;
/// use remedy_core::batch::select_batch;
/// use remedy_core::cart::Cart;
/// use remedy_core::types::Batch;
///
/// # fn batch(id: &str, expiry: NaiveDate, stock_units: i64) -> Batch {
/// #     Batch {
/// #         id: id.to_string(),
/// #         product_name: "Paracetamol 500mg".to_string(),
/// #         stock_units,
/// #         pack_price_cents: 500,
/// #         cost_cents: None,
/// #         units_per_pack: 10,
/// #         expiry_date: expiry,
/// #         max_discount_bps: 1000,
/// #         barcode: None,
/// #         internal_code: None,
/// #         category: None,
/// #     }
/// # }
/// let batches = vec![
///     batch("late", NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(), 50),
///     batch("soon", NaiveDate::from_ymd_opt(2025, 1, 10).unwrap(), 50),
/// ];
/// let cart = Cart::new();
///
/// let picked = select_batch(&batches, &cart, None).unwrap();
/// assert_eq!(picked.id, "soon");
/// ```
pub fn select_batch<'a>(
    batches: &'a [Batch],
    cart: &Cart,
    manual_override: Option<&str>,
) -> Option<&'a Batch> {
    if let Some(override_id) = manual_override {
        if let Some(batch) = batches.iter().find(|b| b.id == override_id) {
            if net_available_units(batch, cart) > 0 {
                return Some(batch);
            }
        }
        // Override exhausted or unknown: fall through to expiry order.
    }

    let mut candidates: Vec<&Batch> = batches.iter().collect();
    candidates.sort_by_key(|b| b.expiry_date);

    candidates
        .into_iter()
        .find(|b| net_available_units(b, cart) > 0)
}

// =============================================================================
// Unit Tests
// =============================================================================
