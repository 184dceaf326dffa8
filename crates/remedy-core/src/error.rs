//! # Domain Errors
//!
//! Typed rejections for the cart, finalizer and return processor.
//!
//! ## Taxonomy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  ValidationError   format/range failures on raw input                  │
//! │       │  #[from]                                                        │
//! │       ▼                                                                 │
//! │  CoreError         business rule violations (stock, lines, returns)    │
//! │                                                                         │
//! │  authorize::Denial refund rule failures, a separate type on purpose    │
//! │                    so an authorization outcome can never be confused   │
//! │                    with a malformed request                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every rejection resolves at the boundary that produced it: the state the
//! operation would have touched is left exactly as it was, nothing is
//! retried, and nothing crosses into an unrelated component. Strings in
//! these messages are operator-facing.

use thiserror::Error;

/// Convenience alias for fallible core operations.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Core Error
// =============================================================================

/// Business rule violations raised by the engine.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Every batch of the product is exhausted or fully committed to the
    /// cart already; no line may be created.
    #[error("No stock available for {product}")]
    NoStockAvailable { product: String },

    /// The batch cannot cover the requested unit consumption. Quantities
    /// here are in units, net of what the rest of the cart already holds
    /// against this batch.
    #[error("Insufficient stock in batch {batch_id}: {available_units} units available, {requested_units} requested")]
    InsufficientStock {
        batch_id: String,
        available_units: i64,
        requested_units: i64,
    },

    /// Loose-unit sales need a multi-unit pack.
    #[error("Batch {batch_id} is sold per pack only (1 unit per pack)")]
    UnitModeUnavailable { batch_id: String },

    /// No cart line under the given (batch, mode) identity.
    #[error("No cart line for batch {batch_id}")]
    LineNotFound { batch_id: String },

    /// A mode toggle would land on an identity the cart already holds.
    #[error("Cart already has a line for batch {batch_id} in the other mode")]
    DuplicateLine { batch_id: String },

    /// Line-count ceiling reached.
    #[error("Cart cannot have more than {max} lines")]
    CartTooLarge { max: usize },

    /// Checkout on an empty cart.
    #[error("Cannot finalize an empty cart")]
    EmptyCart,

    /// A return request with nothing selected.
    #[error("No lines selected for return")]
    EmptyReturn,

    /// One line selected twice within a single return request.
    #[error("Line {line_key} selected more than once")]
    DuplicateReturnLine { line_key: String },

    /// A selection naming a line the sale never had.
    #[error("Sale has no line {line_key}")]
    UnknownReturnLine { line_key: String },

    /// More units requested back than the line still has returnable:
    /// either beyond the original quantity or into units a prior return
    /// already refunded.
    #[error("Cannot return {requested} from line {line_key}: only {available} still returnable")]
    ReturnExceedsAvailable {
        line_key: String,
        available: i64,
        requested: i64,
    },

    /// A format/range failure, promoted from the validators.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Format and range failures on raw input, raised before any business
/// logic runs.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// Missing or blank required field.
    #[error("{field} is required")]
    Required { field: String },

    /// Text over its length cap.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Number outside its allowed range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Zero or negative where only positive makes sense.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Malformed value (bad UUID and the like).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_core_messages_carry_context() {
        let err = CoreError::InsufficientStock {
            batch_id: "b-42".to_string(),
            available_units: 10,
            requested_units: 15,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient stock in batch b-42: 10 units available, 15 requested"
        );

        let err = CoreError::ReturnExceedsAvailable {
            line_key: "0:b-42".to_string(),
            available: 6,
            requested: 7,
        };
        assert_eq!(
            err.to_string(),
            "Cannot return 7 from line 0:b-42: only 6 still returnable"
        );
    }

    #[test]
    fn test_validation_messages() {
        let err = ValidationError::Required {
            field: "reason".to_string(),
        };
        assert_eq!(err.to_string(), "reason is required");

        let err = ValidationError::MustBePositive {
            field: "quantity".to_string(),
        };
        assert_eq!(err.to_string(), "quantity must be positive");
    }

    #[test]
    fn test_validation_promotes_to_core() {
        let validation_err = ValidationError::Required {
            field: "reason".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
