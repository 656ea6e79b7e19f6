//! # Error Types
//!
//! Domain-specific error types for divvy-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  CoreError                                                              │
//! │  ├── Validation(ValidationError)  - malformed or inconsistent input     │
//! │  ├── Arithmetic(ArithmeticError)  - zero divisor, overflow (fatal)      │
//! │  ├── InExpense { expense_id, .. } - any of the above, tagged by expense │
//! │  └── InvalidConfig / ConfigParse  - CoreConfig problems                 │
//! │                                                                         │
//! │  Not an error: SplitNotice::FallbackApplied (see split module)          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (member id, expected vs actual)
//! 3. Errors are enum variants, never String
//! 4. Nothing is auto-corrected except the documented remainder rule

use rust_decimal::Decimal;
use thiserror::Error;

use crate::types::{ExpenseId, MemberId};

// =============================================================================
// Core Error
// =============================================================================

/// Top-level error for every divvy-core operation.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Input failed a validation rule.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Arithmetic could not be carried out.
    ///
    /// Always fatal for the computation in progress; callers must not
    /// retry with the same input.
    #[error("Arithmetic error: {0}")]
    Arithmetic(#[from] ArithmeticError),

    /// A failure raised while processing one expense of a history.
    ///
    /// ## User Workflow
    /// ```text
    /// Balance view requested
    ///      │
    ///      ▼
    /// aggregate(history) ──► expense "e-42" has percentages summing to 99.5
    ///      │
    ///      ▼
    /// InExpense { expense_id: "e-42", source: Validation(..) }
    ///      │
    ///      ▼
    /// UI points the user at the broken expense
    /// ```
    #[error("Expense {expense_id}: {source}")]
    InExpense {
        expense_id: ExpenseId,
        #[source]
        source: Box<CoreError>,
    },

    /// Configuration values are out of range.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Configuration text could not be parsed.
    #[error("Failed to parse configuration: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// Configuration could not be rendered as TOML.
    #[error("Failed to serialize configuration: {0}")]
    ConfigSerialize(#[from] toml::ser::Error),
}

impl CoreError {
    /// Wraps this error with the id of the expense that produced it.
    pub fn in_expense(self, expense_id: &ExpenseId) -> Self {
        CoreError::InExpense {
            expense_id: expense_id.clone(),
            source: Box::new(self),
        }
    }

    /// Returns the validation failure behind this error, looking through
    /// expense context.
    pub fn as_validation(&self) -> Option<&ValidationError> {
        match self {
            CoreError::Validation(err) => Some(err),
            CoreError::InExpense { source, .. } => source.as_validation(),
            _ => None,
        }
    }

    /// Returns true if this is (or wraps) an arithmetic failure.
    pub fn is_arithmetic(&self) -> bool {
        match self {
            CoreError::Arithmetic(_) => true,
            CoreError::InExpense { source, .. } => source.is_arithmetic(),
            _ => false,
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These are reported to the caller as-is. The core never coerces an
/// invalid expense into a valid one.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Value must be strictly positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Value must not be negative.
    #[error("{field} must not be negative")]
    MustNotBeNegative { field: String },

    /// The same member appears twice where ids must be unique.
    #[error("{field} lists member '{member_id}' more than once")]
    Duplicate { field: String, member_id: MemberId },

    /// A member id does not resolve to a known member.
    #[error("Unknown member: {0}")]
    UnknownMember(MemberId),

    /// A strategy parameter is missing for a participant.
    #[error("Missing {parameter} for participant '{member_id}'")]
    MissingParameter {
        parameter: &'static str,
        member_id: MemberId,
    },

    /// A strategy parameter names someone who is not an included participant.
    #[error("{parameter} given for '{member_id}', who is not an included participant")]
    NotAParticipant {
        parameter: &'static str,
        member_id: MemberId,
    },

    /// Percentages do not add up to 100 within tolerance.
    #[error("Percentages must sum to 100, got {actual}")]
    PercentagesDoNotSum { actual: Decimal },

    /// Explicit amounts do not add up to the expense total within tolerance.
    #[error("Split amounts must sum to {expected}, got {actual}")]
    AmountsDoNotSum { expected: Decimal, actual: Decimal },

    /// Adjusted amounts do not add up to the expense total within tolerance.
    #[error("Adjusted amounts must sum to {expected}, got {actual}")]
    AdjustmentsDoNotBalance { expected: Decimal, actual: Decimal },

    /// Payer contributions do not add up to the expense total.
    #[error("Payer amounts must sum to {expected}, got {actual}")]
    PayersDoNotSum { expected: Decimal, actual: Decimal },

    /// Every participant was excluded, leaving nobody to split with.
    #[error("All participants are excluded")]
    AllParticipantsExcluded,

    /// A split kind name did not match any strategy.
    #[error("Unknown split kind: '{0}'")]
    UnknownSplitKind(String),

    /// An excluded member is not one of the selected participants.
    #[error("Excluded member '{0}' is not a participant")]
    ExcludedNotParticipant(MemberId),
}

// =============================================================================
// Arithmetic Error
// =============================================================================

/// Arithmetic failures raised by the precision layer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArithmeticError {
    /// Division by a zero divisor.
    #[error("Division by zero while computing {context}")]
    DivisionByZero { context: &'static str },

    /// Result does not fit in the decimal representation.
    #[error("Decimal overflow during {operation}")]
    Overflow { operation: &'static str },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_error_messages() {
        let err = ValidationError::PercentagesDoNotSum {
            actual: dec!(99.5),
        };
        assert_eq!(err.to_string(), "Percentages must sum to 100, got 99.5");

        let err = ValidationError::MissingParameter {
            parameter: "share",
            member_id: MemberId::new("bob"),
        };
        assert_eq!(err.to_string(), "Missing share for participant 'bob'");

        let err = ArithmeticError::DivisionByZero {
            context: "equal split",
        };
        assert_eq!(err.to_string(), "Division by zero while computing equal split");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let core_err: CoreError = ValidationError::AllParticipantsExcluded.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
        assert_eq!(
            core_err.as_validation(),
            Some(&ValidationError::AllParticipantsExcluded)
        );
    }

    #[test]
    fn test_expense_context_is_transparent_to_helpers() {
        let err = CoreError::from(ArithmeticError::Overflow { operation: "add" })
            .in_expense(&ExpenseId::new("e-1"));
        assert!(err.is_arithmetic());
        assert!(err.as_validation().is_none());
        assert_eq!(
            err.to_string(),
            "Expense e-1: Arithmetic error: Decimal overflow during add"
        );
    }
}
