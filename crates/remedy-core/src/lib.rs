//! # remedy-core: Pure Business Logic for Remedy POS
//!
//! This crate is the **heart** of Remedy POS, a pharmacy point-of-sale
//! engine. It contains the sales transaction and return reconciliation
//! logic as pure functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Remedy POS Architecture                           │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 Terminal Frontend (external)                    │   │
//! │  │    Catalog UI ──► Cart UI ──► Checkout UI ──► Returns UI        │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ remedy-core (THIS CRATE) ★                      │   │
//! │  │                                                                 │   │
//! │  │   ┌──────────┐ ┌──────────┐ ┌──────────┐ ┌──────────────────┐  │   │
//! │  │   │  money   │ │  batch   │ │   cart   │ │ returns/authorize│  │   │
//! │  │   │  Money   │ │  FEFO    │ │   Cart   │ │ Return planning  │  │   │
//! │  │   │ Discount │ │ selector │ │ CartLine │ │ Refund rules     │  │   │
//! │  │   └──────────┘ └──────────┘ └──────────┘ └──────────────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • DETERMINISTIC MATH       │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                  remedy-db (Database Layer)                     │   │
//! │  │        SQLite record store, repositories, terminal service      │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Batch, Shift, Role, Customer, etc.)
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`batch`] - First-Expired-First-Out batch selection
//! - [`cart`] - In-progress order with dual pack/unit pricing
//! - [`sale`] - Immutable sale records frozen at checkout
//! - [`returns`] - Partial/full return planning and reconciliation
//! - [`authorize`] - Role-based refund authorization rules
//! - [`error`] - Domain error types
//! - [`validation`] - Business rule validation
//!
//! ## Design Principles
//!
//! 1. **Deterministic**: every calculation here is a pure function of its
//!    arguments: no clocks, no randomness, no hidden globals in the math
//! 2. **No I/O**: persistence and networking live in remedy-db; this crate
//!    compiles and tests without either
//! 3. **Integer money**: cents in an `i64`, floats never touch a monetary path
//! 4. **Integer stock**: batch stock is counted in units, so fractional pack
//!    consumption (15 loose tablets out of 10-tablet packs) stays exact
//! 5. **Typed rejections**: rule violations are enum variants, not strings,
//!    and never panics
//!
//! ## Example
//!
//! ```rust
//! use remedy_core::money::Money;
//! use remedy_core::types::DiscountRate;
//!
//! // A 10-unit pack priced at 20.00 sells loose at 2.00 a unit
//! let pack_price = Money::from_cents(2000);
//! assert_eq!(pack_price.per_unit(10).cents(), 200);
//!
//! // Discounts are basis points: 1000 bps = 10%
//! let discounted = pack_price.apply_discount(DiscountRate::from_bps(1000));
//! assert_eq!(discounted.cents(), 1800);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod authorize;
pub mod batch;
pub mod cart;
pub mod error;
pub mod money;
pub mod returns;
pub mod sale;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports
// =============================================================================
// The working set of the engine, importable from the crate root.

pub use authorize::{authorize_refund, Denial};
pub use batch::{net_available_units, select_batch};
pub use cart::{Cart, CartLine, CartLineView, CartTotals};
pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use returns::{
    apply_return, plan_return, returnable_lines, Return, ReturnItem, ReturnKind,
    ReturnSelection, ReturnableLine,
};
pub use sale::{LineKey, Sale, SaleLine};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum lines in one cart.
///
/// A counter order never legitimately reaches this; hitting it means a
/// stuck scanner or an unattended terminal.
pub const MAX_CART_LINES: usize = 100;

/// Maximum quantity of one cart line, in the line's own unit of measure
/// (packs or units). Catches typos like 100 scanned as 1000.
pub const MAX_LINE_QUANTITY: i64 = 999;

/// Default per-batch discount cap in basis points (10%)
///
/// Used when the catalog record carries no explicit cap.
pub const DEFAULT_MAX_DISCOUNT_BPS: u32 = 1000;

/// Per-invoice refund ceiling for cashiers, in cents (500.00)
pub const CASHIER_REFUND_LIMIT_CENTS: i64 = 50_000;

/// Per-invoice refund ceiling for pharmacists, in cents (1000.00)
pub const PHARMACIST_REFUND_LIMIT_CENTS: i64 = 100_000;

/// Daily cumulative refund ceiling for pharmacists, in cents (2000.00)
pub const PHARMACIST_DAILY_REFUND_LIMIT_CENTS: i64 = 200_000;
