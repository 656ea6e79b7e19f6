//! # Validation Module
//!
//! Input validation for expenses and strategy parameters.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Expense shape (this module)                                  │
//! │  ├── total > 0, participants non-empty and unique                      │
//! │  ├── every id resolves to a Member                                     │
//! │  └── payers sum to total                                               │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: Strategy parameters (this module, called per strategy)       │
//! │  ├── parameters only for included participants                         │
//! │  └── required values present, signs correct                            │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Strategy invariants (split module)                           │
//! │  └── percentages sum to 100, amounts sum to total, ...                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::{BTreeMap, BTreeSet};

use rust_decimal::Decimal;

use crate::error::{CoreResult, ValidationError};
use crate::precision;
use crate::strategy::MemberValues;
use crate::types::{Expense, Member, MemberId};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Members indexed by id.
pub type MemberIndex<'a> = BTreeMap<&'a MemberId, &'a Member>;

// =============================================================================
// Member Lookup
// =============================================================================

/// Indexes members by id, rejecting duplicate ids.
pub fn index_members(members: &[Member]) -> ValidationResult<MemberIndex<'_>> {
    let mut index = MemberIndex::new();
    for member in members {
        if index.insert(&member.id, member).is_some() {
            return Err(ValidationError::Duplicate {
                field: "members".to_string(),
                member_id: member.id.clone(),
            });
        }
    }
    Ok(index)
}

/// Ensures `id` resolves to a known member.
pub fn require_member<'a>(index: &MemberIndex<'a>, id: &MemberId) -> ValidationResult<&'a Member> {
    index
        .get(id)
        .copied()
        .ok_or_else(|| ValidationError::UnknownMember(id.clone()))
}

// =============================================================================
// Expense Shape
// =============================================================================

/// Validates the expense total.
///
/// ## Rules
/// - Must be strictly positive
///
/// ## Example
/// ```rust
/// use divvy_core::validation::validate_total;
/// use rust_decimal::Decimal;
///
/// assert!(validate_total(Decimal::ONE_HUNDRED).is_ok());
/// assert!(validate_total(Decimal::ZERO).is_err());
/// ```
pub fn validate_total(total: Decimal) -> ValidationResult<()> {
    if total.is_zero() || total.is_sign_negative() {
        return Err(ValidationError::MustBePositive {
            field: "total_amount".to_string(),
        });
    }
    Ok(())
}

/// Validates the participant list.
///
/// ## Rules
/// - Must not be empty
/// - Must not repeat a member
/// - Every participant must be a known member
pub fn validate_participants(
    participants: &[MemberId],
    index: &MemberIndex<'_>,
) -> ValidationResult<()> {
    if participants.is_empty() {
        return Err(ValidationError::Required {
            field: "participants".to_string(),
        });
    }

    let mut seen = BTreeSet::new();
    for id in participants {
        if !seen.insert(id) {
            return Err(ValidationError::Duplicate {
                field: "participants".to_string(),
                member_id: id.clone(),
            });
        }
        require_member(index, id)?;
    }

    Ok(())
}

/// Validates who paid for an expense.
///
/// ## Rules
/// - At least one payer
/// - Each payer is a known member, listed once, with a positive amount
/// - Amounts sum to `total_amount` within `tolerance`
pub fn validate_payers(
    expense: &Expense,
    index: &MemberIndex<'_>,
    tolerance: Decimal,
) -> CoreResult<()> {
    if expense.payers.is_empty() {
        return Err(ValidationError::Required {
            field: "payers".to_string(),
        }
        .into());
    }

    let mut seen = BTreeSet::new();
    let mut paid = Decimal::ZERO;
    for payer in &expense.payers {
        if !seen.insert(&payer.member_id) {
            return Err(ValidationError::Duplicate {
                field: "payers".to_string(),
                member_id: payer.member_id.clone(),
            }
            .into());
        }
        require_member(index, &payer.member_id)?;
        if payer.amount_paid.is_zero() || payer.amount_paid.is_sign_negative() {
            return Err(ValidationError::MustBePositive {
                field: format!("amount paid by '{}'", payer.member_id),
            }
            .into());
        }
        paid = precision::add(paid, payer.amount_paid)?;
    }

    if !precision::within_tolerance(paid, expense.total_amount, tolerance) {
        return Err(ValidationError::PayersDoNotSum {
            expected: expense.total_amount,
            actual: paid,
        }
        .into());
    }

    Ok(())
}

// =============================================================================
// Strategy Parameters
// =============================================================================

/// Rejects parameters that name someone outside `included`.
pub fn validate_parameter_keys(
    parameter: &'static str,
    values: &MemberValues,
    included: &[MemberId],
) -> ValidationResult<()> {
    match values.keys().find(|id| !included.contains(id)) {
        Some(stray) => Err(ValidationError::NotAParticipant {
            parameter,
            member_id: stray.clone(),
        }),
        None => Ok(()),
    }
}

/// Fetches a required per-member parameter.
pub fn require_value(
    parameter: &'static str,
    values: &MemberValues,
    member_id: &MemberId,
) -> ValidationResult<Decimal> {
    values
        .get(member_id)
        .copied()
        .ok_or_else(|| ValidationError::MissingParameter {
            parameter,
            member_id: member_id.clone(),
        })
}

/// Ensures a parameter value is not negative.
pub fn require_non_negative(
    parameter: &'static str,
    member_id: &MemberId,
    value: Decimal,
) -> ValidationResult<Decimal> {
    if value.is_sign_negative() && !value.is_zero() {
        return Err(ValidationError::MustNotBeNegative {
            field: format!("{parameter} for '{member_id}'"),
        });
    }
    Ok(value)
}

/// Ensures a parameter value is strictly positive.
pub fn require_positive(
    parameter: &'static str,
    member_id: &MemberId,
    value: Decimal,
) -> ValidationResult<Decimal> {
    if value.is_zero() || value.is_sign_negative() {
        return Err(ValidationError::MustBePositive {
            field: format!("{parameter} for '{member_id}'"),
        });
    }
    Ok(value)
}

// =============================================================================
// Unit Tests
// =============================================================================
