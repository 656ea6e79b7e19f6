//! # Balance Ledger
//!
//! Folds an expense history into one signed balance per member pair.
//!
//! ## Accumulation
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Expense: 90, paid 60 by A and 30 by B, equal among A, B, C            │
//! │                                                                         │
//! │  shares: A=30  B=30  C=30                                               │
//! │                                                                         │
//! │  debtor × payer      owed = share × paid / total                       │
//! │  ───────────────     ─────────────────────────                          │
//! │  A → B               30 × 30 / 90 = 10                                  │
//! │  B → A               30 × 60 / 90 = 20                                  │
//! │  C → A               30 × 60 / 90 = 20                                  │
//! │  C → B               30 × 30 / 90 = 10                                  │
//! │                                                                         │
//! │  pair key (lower, higher), + when lower owes higher:                    │
//! │  (A, B) = +10 − 20 = −10   → B owes A 10                                │
//! │  (A, C) = −20              → C owes A 20                                │
//! │  (B, C) = −10              → C owes B 10                                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Sums stay at full precision across the whole history. Each pair is
//! rounded half-up to the minor unit once, when the balances are handed back,
//! so every balance is a payable amount and net positions still sum to zero.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tracing::debug;

use crate::config::CoreConfig;
use crate::error::CoreResult;
use crate::precision::{self, ArithmeticResult, Precision};
use crate::split::SplitCalculator;
use crate::types::{Expense, Member, MemberId, PairwiseBalance};
use crate::validation::{self, MemberIndex};

type PairKey = (MemberId, MemberId);

/// Pure aggregation of expense history into [`PairwiseBalance`]s.
#[derive(Debug, Clone, Default)]
pub struct BalanceLedger {
    calculator: SplitCalculator,
}

impl BalanceLedger {
    pub fn new(config: &CoreConfig) -> Self {
        BalanceLedger {
            calculator: SplitCalculator::new(config),
        }
    }

    /// Uses an existing calculator so splits and balances agree.
    pub fn with_calculator(calculator: SplitCalculator) -> Self {
        BalanceLedger { calculator }
    }

    pub fn calculator(&self) -> &SplitCalculator {
        &self.calculator
    }

    /// Aggregates every expense into pairwise balances sorted by pair.
    ///
    /// The first invalid expense aborts the whole aggregation; the error
    /// names it. Calling this twice on the same input yields the same output.
    pub fn aggregate(
        &self,
        expenses: &[Expense],
        members: &[Member],
    ) -> CoreResult<Vec<PairwiseBalance>> {
        self.aggregate_filtered(expenses, members, |_| true)
    }

    /// Like [`aggregate`](Self::aggregate) but only counts expenses incurred
    /// at or before `cutoff`.
    pub fn aggregate_as_of(
        &self,
        expenses: &[Expense],
        members: &[Member],
        cutoff: DateTime<Utc>,
    ) -> CoreResult<Vec<PairwiseBalance>> {
        self.aggregate_filtered(expenses, members, |expense| expense.incurred_at <= cutoff)
    }

    fn aggregate_filtered<F>(
        &self,
        expenses: &[Expense],
        members: &[Member],
        include: F,
    ) -> CoreResult<Vec<PairwiseBalance>>
    where
        F: Fn(&Expense) -> bool,
    {
        let index = validation::index_members(members)?;
        let mut pairs: BTreeMap<PairKey, Decimal> = BTreeMap::new();
        let mut counted = 0usize;

        for expense in expenses.iter().filter(|expense| include(expense)) {
            self.apply_expense(expense, &index, &mut pairs)
                .map_err(|e| e.in_expense(&expense.id))?;
            counted += 1;
        }

        let balances = collapse(pairs, self.calculator.precision());
        debug!(
            expenses = counted,
            pairs = balances.len(),
            "Aggregated balances"
        );
        Ok(balances)
    }

    fn apply_expense(
        &self,
        expense: &Expense,
        index: &MemberIndex<'_>,
        pairs: &mut BTreeMap<PairKey, Decimal>,
    ) -> CoreResult<()> {
        let outcome = self.calculator.compute_indexed(expense, index)?;
        validation::validate_payers(expense, index, self.calculator.tolerance())?;

        for share in &outcome.shares {
            for payer in &expense.payers {
                if share.member_id == payer.member_id {
                    continue;
                }
                let owed = precision::proportion(
                    share.amount,
                    payer.amount_paid,
                    expense.total_amount,
                    "payer proportion",
                )?;
                accumulate(pairs, &share.member_id, &payer.member_id, owed)?;
            }
        }
        Ok(())
    }
}

/// Records `debtor owes creditor owed` under the ordered pair key.
fn accumulate(
    pairs: &mut BTreeMap<PairKey, Decimal>,
    debtor: &MemberId,
    creditor: &MemberId,
    owed: Decimal,
) -> ArithmeticResult<()> {
    let (key, signed) = if debtor < creditor {
        ((debtor.clone(), creditor.clone()), owed)
    } else {
        ((creditor.clone(), debtor.clone()), -owed)
    };
    let entry = pairs.entry(key).or_insert(Decimal::ZERO);
    *entry = precision::add(*entry, signed)?;
    Ok(())
}

fn collapse(pairs: BTreeMap<PairKey, Decimal>, precision: Precision) -> Vec<PairwiseBalance> {
    pairs
        .into_iter()
        .map(|((member_a, member_b), amount)| PairwiseBalance {
            member_a,
            member_b,
            amount: precision.round_to_minor(amount),
        })
        .collect()
}

// =============================================================================
// Unit Tests
// =============================================================================
