//! # Money
//!
//! Integer-cents monetary type. Every price, total and refund in the engine
//! flows through [`Money`]; floats never touch a monetary path.
//!
//! ## The Two Places Rounding Happens
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  1. per_unit: pack price / units per pack                               │
//! │     20.00 / 10 = 2.00 exact; 10.00 / 3 = 3.33 rounded                   │
//! │     The rounded figure is FROZEN into the sale line, so a later refund  │
//! │     reuses exactly what was charged.                                    │
//! │                                                                         │
//! │  2. apply_discount: basis-point percentage off an amount                │
//! │     discount = (amount × bps + 5000) / 10000, then subtracted           │
//! │     (+5000 rounds the half up instead of truncating)                    │
//! │                                                                         │
//! │  Everything else is exact integer arithmetic.                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};

use crate::types::DiscountRate;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary amount in cents.
///
/// Signed so refunds and drawer corrections can go negative; a zero-cost
/// newtype over `i64` with full serde support.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Money(i64);

impl Money {
    /// Builds a value from cents, the only constructor hot paths use.
    ///
    /// There is deliberately no `from_float`: the store, the math and the
    /// wire format all speak cents, and only the frontend ever renders
    /// major units.
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Builds a value from major and minor units.
    ///
    /// For negative amounts put the sign on the major unit:
    /// `from_major_minor(-5, 50)` is −5.50.
    #[inline]
    pub const fn from_major_minor(major: i64, minor: i64) -> Self {
        if major < 0 {
            Money(major * 100 - minor)
        } else {
            Money(major * 100 + minor)
        }
    }

    /// The raw amount in cents.
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Whole currency units (truncated toward zero).
    #[inline]
    pub const fn major(&self) -> i64 {
        self.0 / 100
    }

    /// Cents past the major unit, always in 0..=99.
    #[inline]
    pub const fn cents_part(&self) -> i64 {
        (self.0 % 100).abs()
    }

    /// The zero amount.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    /// True for exactly zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// True for amounts above zero.
    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// True for amounts below zero.
    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Magnitude of the amount.
    #[inline]
    pub const fn abs(&self) -> Self {
        Money(self.0.abs())
    }

    /// Price of one loose unit, given this as the whole-pack price.
    ///
    /// Rounded half-up to the nearest cent. This is the dual-accounting
    /// seam: a 10-capsule pack at 20.00 sells loose at 2.00 a capsule, and
    /// that per-unit figure, not a fresh division, is what checkout
    /// freezes and refunds reuse.
    ///
    /// ```rust
    /// use remedy_core::money::Money;
    ///
    /// assert_eq!(Money::from_cents(2000).per_unit(10).cents(), 200);
    /// // 10.00 across 3 units rounds to 3.33
    /// assert_eq!(Money::from_cents(1000).per_unit(3).cents(), 333);
    /// ```
    pub fn per_unit(&self, units_per_pack: i64) -> Money {
        debug_assert!(units_per_pack >= 1);
        if units_per_pack <= 1 {
            return *self;
        }
        // (2a + n) / 2n == a/n rounded half away from zero, in one division
        let cents = (self.0 as i128 * 2 + units_per_pack as i128)
            / (units_per_pack as i128 * 2);
        Money::from_cents(cents as i64)
    }

    /// This amount times a quantity (line totals).
    #[inline]
    pub const fn multiply_quantity(&self, qty: i64) -> Self {
        Money(self.0 * qty)
    }

    /// The amount left after taking a percentage discount off.
    ///
    /// The discount itself is `(amount * bps + 5000) / 10000`: integer
    /// basis-point math, rounded half up, computed in i128 so large
    /// aggregates cannot overflow.
    ///
    /// ```rust
    /// use remedy_core::money::Money;
    /// use remedy_core::types::DiscountRate;
    ///
    /// let subtotal = Money::from_cents(10000);
    /// let rate = DiscountRate::from_bps(1000); // 10%
    /// assert_eq!(subtotal.apply_discount(rate).cents(), 9000);
    /// ```
    pub fn apply_discount(&self, rate: DiscountRate) -> Money {
        let discount = (self.0 as i128 * rate.bps() as i128 + 5000) / 10000;
        Money::from_cents(self.0 - discount as i64)
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Fixed two-decimal rendering, e.g. `"10.99"` / `"-5.50"`.
///
/// This is the format the external rendering contract expects; currency
/// symbols and localization belong to the frontend.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}{}.{:02}", sign, self.major().abs(), self.cents_part())
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

impl Mul<i32> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i32) -> Self {
        Money(self.0 * qty as i64)
    }
}

impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        Money(self.0 * qty)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
