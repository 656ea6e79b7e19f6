//! # Domain Types
//!
//! Data contracts exchanged with the persistence/API collaborator.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  INPUTS (owned by the caller)        OUTPUTS (recomputed, ephemeral)    │
//! │  ┌─────────────────┐                 ┌─────────────────────┐            │
//! │  │    Member       │                 │    SplitShare       │            │
//! │  │  id, name       │                 │  member_id, amount  │            │
//! │  │  income?        │                 │  percentage         │            │
//! │  │  weight?        │                 └─────────────────────┘            │
//! │  └─────────────────┘                 ┌─────────────────────┐            │
//! │  ┌─────────────────┐                 │  PairwiseBalance    │            │
//! │  │    Expense      │                 │  member_a, member_b │            │
//! │  │  total_amount   │                 │  amount (+ = a owes)│            │
//! │  │  payers[]       │                 └─────────────────────┘            │
//! │  │  participants[] │                 ┌─────────────────────┐            │
//! │  │  strategy       │                 │SettlementSuggestion │            │
//! │  │  incurred_at    │                 │  from, to, amount   │            │
//! │  └─────────────────┘                 └─────────────────────┘            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The core never mutates an input record and never stores an output.

use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use crate::strategy::SplitStrategy;

// =============================================================================
// Identifiers
// =============================================================================

/// Identity of a group member.
///
/// Ordering is lexicographic on the raw id. Ledger pair keys and optimizer
/// tie-breaks rely on it.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(transparent)]
#[ts(export)]
pub struct MemberId(String);

impl MemberId {
    pub fn new(id: impl Into<String>) -> Self {
        MemberId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MemberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for MemberId {
    fn from(id: &str) -> Self {
        MemberId::new(id)
    }
}

/// Identity of an expense record.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(transparent)]
#[ts(export)]
pub struct ExpenseId(String);

impl ExpenseId {
    pub fn new(id: impl Into<String>) -> Self {
        ExpenseId(id.into())
    }

    /// Generates a fresh UUID v4 id.
    pub fn generate() -> Self {
        ExpenseId(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ExpenseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ExpenseId {
    fn from(id: &str) -> Self {
        ExpenseId::new(id)
    }
}

// =============================================================================
// Member
// =============================================================================

/// A member of an expense-sharing group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Member {
    /// Unique identifier.
    pub id: MemberId,

    /// Display name shown in balance views.
    pub name: String,

    /// Income used by the income-based strategies. Only positive values count.
    #[serde(default)]
    #[ts(as = "Option<String>")]
    pub income: Option<Decimal>,

    /// Default weight for the weighted strategy (1 when unset).
    #[serde(default)]
    #[ts(as = "Option<String>")]
    pub weight: Option<Decimal>,
}

impl Member {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Member {
            id: MemberId::new(id),
            name: name.into(),
            income: None,
            weight: None,
        }
    }

    pub fn with_income(mut self, income: Decimal) -> Self {
        self.income = Some(income);
        self
    }

    pub fn with_weight(mut self, weight: Decimal) -> Self {
        self.weight = Some(weight);
        self
    }

    /// Income if it is present and strictly positive.
    pub fn positive_income(&self) -> Option<Decimal> {
        self.income.filter(|income| income.is_sign_positive() && !income.is_zero())
    }
}

// =============================================================================
// Expense
// =============================================================================

/// One contribution towards an expense.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Payer {
    pub member_id: MemberId,

    #[ts(as = "String")]
    pub amount_paid: Decimal,
}

impl Payer {
    pub fn new(member_id: impl Into<String>, amount_paid: Decimal) -> Self {
        Payer {
            member_id: MemberId::new(member_id),
            amount_paid,
        }
    }
}

/// A shared expense as stored by the external collaborator.
///
/// ## Invariants (checked by the calculator and the ledger)
/// - `total_amount > 0`
/// - `participants` is non-empty and duplicate-free; its order is the
///   iteration order used for remainder correction
/// - payer amounts sum to `total_amount`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Expense {
    pub id: ExpenseId,

    #[serde(default)]
    pub description: String,

    #[ts(as = "String")]
    pub total_amount: Decimal,

    pub payers: Vec<Payer>,

    pub participants: Vec<MemberId>,

    pub strategy: SplitStrategy,

    #[ts(as = "String")]
    pub incurred_at: DateTime<Utc>,
}

impl Expense {
    pub fn new(
        id: impl Into<String>,
        total_amount: Decimal,
        payers: Vec<Payer>,
        participants: Vec<MemberId>,
        strategy: SplitStrategy,
        incurred_at: DateTime<Utc>,
    ) -> Self {
        Expense {
            id: ExpenseId::new(id),
            description: String::new(),
            total_amount,
            payers,
            participants,
            strategy,
            incurred_at,
        }
    }

    /// Record of a realized settlement, shaped so the ledger can consume it.
    ///
    /// `from` pays `amount` and `to` carries the whole of it, so aggregating
    /// this record reduces what `from` owes `to` by `amount`.
    pub fn settlement(
        id: impl Into<String>,
        from: MemberId,
        to: MemberId,
        amount: Decimal,
        incurred_at: DateTime<Utc>,
    ) -> Self {
        let strategy = SplitStrategy::Custom {
            amounts: [(to.clone(), amount)].into_iter().collect(),
        };
        Expense {
            id: ExpenseId::new(id),
            description: format!("Settlement {from} -> {to}"),
            total_amount: amount,
            payers: vec![Payer {
                member_id: from,
                amount_paid: amount,
            }],
            participants: vec![to],
            strategy,
            incurred_at,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Members removed from the divisor, if the strategy excludes any.
    pub fn excluded_members(&self) -> Option<&BTreeSet<MemberId>> {
        match &self.strategy {
            SplitStrategy::Exclude { excluded } => Some(excluded),
            _ => None,
        }
    }
}

// =============================================================================
// Outputs
// =============================================================================

/// One participant's portion of an expense.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SplitShare {
    pub member_id: MemberId,

    /// Amount owed, quantized to the currency's minor unit.
    #[ts(as = "String")]
    pub amount: Decimal,

    /// `amount / total × 100`, externalized.
    #[ts(as = "String")]
    pub percentage: Decimal,
}

/// Net debt between two members over the whole history.
///
/// A positive `amount` means `member_a` owes `member_b`; negative means the
/// reverse. The ledger always emits `member_a < member_b`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PairwiseBalance {
    pub member_a: MemberId,
    pub member_b: MemberId,

    #[ts(as = "String")]
    pub amount: Decimal,
}

impl PairwiseBalance {
    pub fn new(member_a: impl Into<String>, member_b: impl Into<String>, amount: Decimal) -> Self {
        PairwiseBalance {
            member_a: MemberId::new(member_a),
            member_b: MemberId::new(member_b),
            amount,
        }
    }

    /// Returns `(debtor, creditor, amount)` with a non-negative amount.
    pub fn directed(&self) -> (&MemberId, &MemberId, Decimal) {
        if self.amount.is_sign_negative() {
            (&self.member_b, &self.member_a, -self.amount)
        } else {
            (&self.member_a, &self.member_b, self.amount)
        }
    }

    /// True when the absolute amount is within `tolerance`.
    pub fn is_settled(&self, tolerance: Decimal) -> bool {
        self.amount.abs() <= tolerance
    }
}

/// A proposed transfer that reduces outstanding debt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SettlementSuggestion {
    pub from: MemberId,
    pub to: MemberId,

    #[ts(as = "String")]
    pub amount: Decimal,
}

// =============================================================================
// Unit Tests
// =============================================================================
