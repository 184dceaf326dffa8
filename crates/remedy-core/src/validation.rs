//! # Input Validation
//!
//! Small, reusable validators shared by the cart, return planner and the
//! terminal frontend's form handling.
//!
//! These cover format and range only. The stateful rules (stock bounds,
//! per-batch discount caps, returnable quantity) live next to the state
//! they guard, in [`crate::cart`] and [`crate::returns`]. Either way a
//! rejected input changes nothing: validation failures resolve where they
//! occur and are surfaced inline, never propagated across components.
//!
//! ```rust
//! use remedy_core::validation::{validate_quantity, validate_reason};
//!
//! validate_quantity(5).unwrap();
//! assert_eq!(validate_reason("  expired on shelf ").unwrap(), "expired on shelf");
//! ```

use crate::error::ValidationError;
use crate::MAX_LINE_QUANTITY;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// Numeric Validators
// =============================================================================

/// A cart-line or return quantity: positive, at most [`MAX_LINE_QUANTITY`].
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }
    if qty > MAX_LINE_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_LINE_QUANTITY,
        });
    }
    Ok(())
}

/// A discount in basis points: anywhere in 0..=10000 (0–100%).
///
/// Per-batch caps are a separate concern; the cart clamps to those rather
/// than rejecting.
pub fn validate_discount_bps(bps: u32) -> ValidationResult<()> {
    if bps > 10000 {
        return Err(ValidationError::OutOfRange {
            field: "discount".to_string(),
            min: 0,
            max: 10000,
        });
    }
    Ok(())
}

/// A price in cents: non-negative. Zero is legal (samples, promo items).
pub fn validate_price_cents(cents: i64) -> ValidationResult<()> {
    if cents < 0 {
        return Err(ValidationError::OutOfRange {
            field: "price".to_string(),
            min: 0,
            max: i64::MAX,
        });
    }
    Ok(())
}

// =============================================================================
// String Validators
// =============================================================================

/// A product name: non-empty after trimming, at most 200 characters.
pub fn validate_product_name(name: &str) -> ValidationResult<()> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ValidationError::Required {
            field: "product name".to_string(),
        });
    }
    if name.len() > 200 {
        return Err(ValidationError::TooLong {
            field: "product name".to_string(),
            max: 200,
        });
    }
    Ok(())
}

/// The reason attached to a return, trimmed.
///
/// Mandatory (a return history without reasons is useless for audits)
/// and capped at 200 characters. Returns the trimmed text so callers store
/// a canonical form.
pub fn validate_reason(reason: &str) -> ValidationResult<String> {
    let reason = reason.trim();
    if reason.is_empty() {
        return Err(ValidationError::Required {
            field: "reason".to_string(),
        });
    }
    if reason.len() > 200 {
        return Err(ValidationError::TooLong {
            field: "reason".to_string(),
            max: 200,
        });
    }
    Ok(reason.to_string())
}

/// An entity id: must parse as a UUID.
pub fn validate_uuid(id: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "id".to_string(),
        });
    }
    uuid::Uuid::parse_str(id).map_err(|_| ValidationError::InvalidFormat {
        field: "id".to_string(),
        reason: "must be a valid UUID".to_string(),
    })?;
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
