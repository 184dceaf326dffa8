//! # Refund Authorization
//!
//! Gatekeeps a return request against the operator's role-based limits and
//! the active shift's cash-balance ledger.
//!
//! ## Decision Sequence
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                Refund Authorization Rules (in order)                    │
//! │                                                                         │
//! │  1. Open shift?            no  → Denied "no open shift"                │
//! │         │ yes                                                           │
//! │  2. Cashier?   sale outside shift window → Denied "different shift"    │
//! │                refund > 500.00           → Denied "per-invoice limit"  │
//! │         │                                                               │
//! │  3. Pharmacist? refund > 1000.00         → Denied "per-invoice limit"  │
//! │                 daily + refund > 2000.00 → Denied "daily limit"        │
//! │         │                                                               │
//! │  4. Manager/Admin/Owner: no ceilings                                   │
//! │         │                                                               │
//! │  5. ALL: refund > shift available balance → Denied "insufficient       │
//! │          balance" (the drawer cannot give back more than it took in)   │
//! │         │                                                               │
//! │         ▼                                                               │
//! │     Approved: caller commits the return AND increments the shift's     │
//! │     returns_total by the same amount in one logical transaction        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The first failing rule denies; a denial is terminal for the attempt with
//! no partial state change and no retry scheduling.

use thiserror::Error;

use crate::money::Money;
use crate::sale::Sale;
use crate::types::{Role, Shift};
use crate::{
    CASHIER_REFUND_LIMIT_CENTS, PHARMACIST_DAILY_REFUND_LIMIT_CENTS,
    PHARMACIST_REFUND_LIMIT_CENTS,
};

// =============================================================================
// Denial
// =============================================================================

/// A refund authorization denial, naming the specific rule violated.
///
/// Messages are human-readable and surfaced to the operator as-is.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Denial {
    /// No shift is currently open on this terminal.
    #[error("No open shift")]
    NoOpenShift,

    /// Cashiers may only refund sales made during the current shift.
    #[error("Sale belongs to a different shift; cashiers may only refund current-shift sales")]
    DifferentShift,

    /// The per-invoice ceiling for the role was exceeded.
    #[error("Refund of {requested} exceeds per-invoice limit of {limit} for {role}s")]
    ExceedsInvoiceLimit {
        role: &'static str,
        requested: Money,
        limit: Money,
    },

    /// The operator's cumulative daily ceiling would be exceeded.
    #[error("Refund of {requested} would exceed the {limit} daily limit ({issued_today} already issued today)")]
    ExceedsDailyLimit {
        requested: Money,
        issued_today: Money,
        limit: Money,
    },

    /// The shift ledger cannot cover the refund.
    #[error("Insufficient shift balance: {available} available, {requested} requested")]
    InsufficientBalance {
        available: Money,
        requested: Money,
    },
}

// =============================================================================
// Authorization
// =============================================================================

/// Evaluates a refund request against role limits and the shift ledger.
///
/// ## Arguments
/// * `role` - the operator's role
/// * `requested` - the refund computed by the return planner
/// * `sale` - the sale being refunded (its timestamp drives rule 2)
/// * `shift` - the open shift, if any; `None` denies immediately
/// * `daily_refunds` - refunds this operator has already issued today
///
/// ## Rule Order
/// Rules are evaluated in sequence and the first failure denies. Roles
/// Manager, Admin and Owner skip the ceiling rules entirely; the ledger
/// check applies to everyone.
pub fn authorize_refund(
    role: Role,
    requested: Money,
    sale: &Sale,
    shift: Option<&Shift>,
    daily_refunds: Money,
) -> Result<(), Denial> {
    let shift = match shift {
        Some(s) if s.is_open() => s,
        _ => return Err(Denial::NoOpenShift),
    };

    match role {
        Role::Cashier => {
            if !shift.covers(sale.created_at) {
                return Err(Denial::DifferentShift);
            }
            let limit = Money::from_cents(CASHIER_REFUND_LIMIT_CENTS);
            if requested > limit {
                return Err(Denial::ExceedsInvoiceLimit {
                    role: Role::Cashier.label(),
                    requested,
                    limit,
                });
            }
        }
        Role::Pharmacist => {
            let limit = Money::from_cents(PHARMACIST_REFUND_LIMIT_CENTS);
            if requested > limit {
                return Err(Denial::ExceedsInvoiceLimit {
                    role: Role::Pharmacist.label(),
                    requested,
                    limit,
                });
            }
            let daily_limit = Money::from_cents(PHARMACIST_DAILY_REFUND_LIMIT_CENTS);
            if daily_refunds + requested > daily_limit {
                return Err(Denial::ExceedsDailyLimit {
                    requested,
                    issued_today: daily_refunds,
                    limit: daily_limit,
                });
            }
        }
        // No per-invoice or daily ceilings for supervisory roles.
        Role::Manager | Role::Admin | Role::Owner => {}
    }

    let available = shift.available_balance();
    if requested > available {
        return Err(Denial::InsufficientBalance {
            available,
            requested,
        });
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
