//! # Split Calculator
//!
//! Divides one expense among its participants.
//!
//! ## Pipeline
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        compute(expense, members)                        │
//! │                                                                         │
//! │  1. Validate shape      total > 0, participants known & unique          │
//! │          │                                                              │
//! │          ▼                                                              │
//! │  2. Resolve divisor     participants − excluded (exclude strategy)      │
//! │          │                                                              │
//! │          ▼                                                              │
//! │  3. Raw shares          strategy formula at full decimal precision      │
//! │          │              (validation errors, income fallback)            │
//! │          ▼                                                              │
//! │  4. Quantize            truncate each share to the minor unit           │
//! │          │                                                              │
//! │          ▼                                                              │
//! │  5. Remainder           hand total − Σ back in RemainderPolicy order:   │
//! │          │              one unit each, slack whole → Σ == total exactly │
//! │          ▼                                                              │
//! │  6. Percentages         amount / total × 100, externalized              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//! ```rust
//! use chrono::Utc;
//! use divvy_core::{Expense, Member, MemberId, Payer, SplitCalculator, SplitStrategy};
//! use rust_decimal::Decimal;
//!
//! let members = vec![Member::new("a", "Ada"), Member::new("b", "Ben"), Member::new("c", "Cy")];
//! let expense = Expense::new(
//!     "dinner",
//!     Decimal::from(500),
//!     vec![Payer::new("a", Decimal::from(500))],
//!     vec![MemberId::new("a"), MemberId::new("b"), MemberId::new("c")],
//!     SplitStrategy::Equal,
//!     Utc::now(),
//! );
//!
//! let outcome = SplitCalculator::default().compute(&expense, &members).unwrap();
//! let amounts: Vec<String> = outcome.shares.iter().map(|s| s.amount.to_string()).collect();
//! assert_eq!(amounts, ["166.67", "166.67", "166.66"]);
//! ```

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use ts_rs::TS;

use crate::config::{CoreConfig, RemainderPolicy};
use crate::error::{CoreResult, ValidationError};
use crate::precision::{self, ArithmeticResult, Precision};
use crate::strategy::{MemberValues, SplitKind, SplitStrategy};
use crate::types::{Expense, Member, MemberId, SplitShare};
use crate::validation::{self, MemberIndex, ValidationResult};

// =============================================================================
// Outcome
// =============================================================================

/// Something the caller should know about a successful split.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(tag = "type", rename_all = "snake_case")]
#[ts(export)]
pub enum SplitNotice {
    /// An income strategy fell back to an equal split.
    FallbackApplied {
        strategy: SplitKind,
        missing_income: Vec<MemberId>,
    },

    /// Remainder correction moved `amount` onto this member's share.
    RemainderApplied {
        member_id: MemberId,
        #[ts(as = "String")]
        amount: Decimal,
    },
}

/// Shares for one expense, in participant order, plus notices.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SplitOutcome {
    pub shares: Vec<SplitShare>,
    pub notices: Vec<SplitNotice>,
}

impl SplitOutcome {
    /// Sum of all share amounts.
    pub fn total(&self) -> Decimal {
        self.shares.iter().map(|share| share.amount).sum()
    }

    pub fn share_of(&self, member_id: &MemberId) -> Option<&SplitShare> {
        self.shares.iter().find(|share| &share.member_id == member_id)
    }

    pub fn fallback_applied(&self) -> bool {
        self.notices
            .iter()
            .any(|notice| matches!(notice, SplitNotice::FallbackApplied { .. }))
    }
}

// =============================================================================
// Calculator
// =============================================================================

/// Pure split computation configured from [`CoreConfig`].
#[derive(Debug, Clone)]
pub struct SplitCalculator {
    precision: Precision,
    tolerance: Decimal,
    remainder_policy: RemainderPolicy,
    progressive_step: Decimal,
}

impl Default for SplitCalculator {
    fn default() -> Self {
        SplitCalculator::new(&CoreConfig::default())
    }
}

impl SplitCalculator {
    pub fn new(config: &CoreConfig) -> Self {
        SplitCalculator {
            precision: config.precision(),
            tolerance: config.split.tolerance,
            remainder_policy: config.split.remainder_policy,
            progressive_step: config.split.progressive_step,
        }
    }

    pub fn precision(&self) -> Precision {
        self.precision
    }

    pub fn tolerance(&self) -> Decimal {
        self.tolerance
    }

    /// Computes every included participant's share of `expense`.
    ///
    /// Either a fully reconciled set of shares is returned or an error;
    /// there is no partial result.
    pub fn compute(&self, expense: &Expense, members: &[Member]) -> CoreResult<SplitOutcome> {
        let index = validation::index_members(members)?;
        self.compute_indexed(expense, &index)
    }

    pub(crate) fn compute_indexed(
        &self,
        expense: &Expense,
        index: &MemberIndex<'_>,
    ) -> CoreResult<SplitOutcome> {
        let total = expense.total_amount;
        validation::validate_total(total)?;
        validation::validate_participants(&expense.participants, index)?;

        let included = included_participants(expense)?;
        let mut notices = Vec::new();

        let raw = self.raw_shares(&expense.strategy, total, &included, index, &mut notices)?;
        let amounts = self.reconcile(total, &included, &raw, &mut notices)?;

        let shares = included
            .into_iter()
            .zip(amounts)
            .map(|(member_id, amount)| {
                let pct = precision::proportion(amount, Decimal::ONE_HUNDRED, total, "percentage")?;
                Ok(SplitShare {
                    member_id,
                    amount,
                    percentage: self.precision.externalize(pct),
                })
            })
            .collect::<ArithmeticResult<Vec<_>>>()?;

        debug!(
            expense_id = %expense.id,
            strategy = %expense.strategy.kind(),
            participants = shares.len(),
            "Computed split"
        );

        Ok(SplitOutcome { shares, notices })
    }

    // =========================================================================
    // Strategy Formulas
    // =========================================================================

    /// Full-precision shares aligned with `included`.
    fn raw_shares(
        &self,
        strategy: &SplitStrategy,
        total: Decimal,
        included: &[MemberId],
        index: &MemberIndex<'_>,
        notices: &mut Vec<SplitNotice>,
    ) -> CoreResult<Vec<Decimal>> {
        match strategy {
            SplitStrategy::Equal | SplitStrategy::Exclude { .. } => {
                Ok(equal_shares(total, included.len())?)
            }

            SplitStrategy::Percentage { percentages } => {
                validation::validate_parameter_keys("percentage", percentages, included)?;
                let pcts = included
                    .iter()
                    .map(|id| {
                        let pct = validation::require_value("percentage", percentages, id)?;
                        validation::require_non_negative("percentage", id, pct)
                    })
                    .collect::<Result<Vec<_>, _>>()?;

                let pct_sum = precision::sum(pcts.iter().copied())?;
                if !precision::within_tolerance(pct_sum, Decimal::ONE_HUNDRED, self.tolerance) {
                    return Err(ValidationError::PercentagesDoNotSum { actual: pct_sum }.into());
                }

                Ok(pcts
                    .into_iter()
                    .map(|pct| precision::proportion(total, pct, Decimal::ONE_HUNDRED, "percentage split"))
                    .collect::<ArithmeticResult<Vec<_>>>()?)
            }

            SplitStrategy::Custom { amounts } => {
                validation::validate_parameter_keys("amount", amounts, included)?;
                let values = included
                    .iter()
                    .map(|id| {
                        let amount = validation::require_value("amount", amounts, id)?;
                        validation::require_non_negative("amount", id, amount)
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                self.check_amounts(total, &values)?;
                Ok(values)
            }

            SplitStrategy::Unequal { amounts } => {
                validation::validate_parameter_keys("amount", amounts, included)?;
                let values = included
                    .iter()
                    .map(|id| {
                        let amount = amounts.get(id).copied().unwrap_or(Decimal::ZERO);
                        validation::require_non_negative("amount", id, amount)
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                self.check_amounts(total, &values)?;
                Ok(values)
            }

            SplitStrategy::Shares { shares } => {
                validation::validate_parameter_keys("share", shares, included)?;
                let parts = included
                    .iter()
                    .map(|id| {
                        let share = validation::require_value("share", shares, id)?;
                        validation::require_positive("share", id, share)
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(proportional(total, &parts, "shares split")?)
            }

            SplitStrategy::Weighted { weights } => {
                validation::validate_parameter_keys("weight", weights, included)?;
                let parts = included
                    .iter()
                    .map(|id| {
                        let weight = resolve_weight(weights, index, id)?;
                        validation::require_positive("weight", id, weight)
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(proportional(total, &parts, "weighted split")?)
            }

            SplitStrategy::IncomeProportional => {
                match incomes_or_fallback(SplitKind::IncomeProportional, included, index, notices)? {
                    Some(incomes) => Ok(proportional(total, &incomes, "income split")?),
                    None => Ok(equal_shares(total, included.len())?),
                }
            }

            SplitStrategy::IncomeProgressive => {
                match incomes_or_fallback(SplitKind::IncomeProgressive, included, index, notices)? {
                    Some(incomes) => {
                        let multipliers = self.progressive_multipliers(&incomes)?;
                        Ok(proportional(total, &multipliers, "progressive split")?)
                    }
                    None => Ok(equal_shares(total, included.len())?),
                }
            }

            SplitStrategy::Adjustment { adjustments } => {
                validation::validate_parameter_keys("adjustment", adjustments, included)?;
                let base = equal_shares(total, included.len())?;
                let adjusted = included
                    .iter()
                    .zip(base)
                    .map(|(id, base)| {
                        let delta = adjustments.get(id).copied().unwrap_or(Decimal::ZERO);
                        let amount = precision::add(base, delta)?;
                        Ok(validation::require_non_negative("adjusted amount", id, amount)?)
                    })
                    .collect::<CoreResult<Vec<_>>>()?;

                let adjusted_sum = precision::sum(adjusted.iter().copied())?;
                if !precision::within_tolerance(adjusted_sum, total, self.tolerance) {
                    return Err(ValidationError::AdjustmentsDoNotBalance {
                        expected: total,
                        actual: precision::round_half_up(adjusted_sum, self.precision.minor_units()),
                    }
                    .into());
                }
                Ok(adjusted)
            }
        }
    }

    fn check_amounts(&self, total: Decimal, values: &[Decimal]) -> CoreResult<()> {
        let actual = precision::sum(values.iter().copied())?;
        if !precision::within_tolerance(actual, total, self.tolerance) {
            return Err(ValidationError::AmountsDoNotSum {
                expected: total,
                actual,
            }
            .into());
        }
        Ok(())
    }

    /// `1 + step × rank`, rank 0 for the lowest income.
    ///
    /// Equal incomes keep participant order.
    fn progressive_multipliers(&self, incomes: &[Decimal]) -> ArithmeticResult<Vec<Decimal>> {
        let mut by_income: Vec<usize> = (0..incomes.len()).collect();
        by_income.sort_by(|&a, &b| incomes[a].cmp(&incomes[b]));

        let mut multipliers = vec![Decimal::ONE; incomes.len()];
        for (rank, &position) in by_income.iter().enumerate() {
            let bump = precision::multiply(self.progressive_step, Decimal::from(rank as u64))?;
            multipliers[position] = precision::add(Decimal::ONE, bump)?;
        }
        Ok(multipliers)
    }

    // =========================================================================
    // Remainder Correction
    // =========================================================================

    /// Quantizes raw shares and pushes the residue back so Σ == total.
    fn reconcile(
        &self,
        total: Decimal,
        included: &[MemberId],
        raw: &[Decimal],
        notices: &mut Vec<SplitNotice>,
    ) -> CoreResult<Vec<Decimal>> {
        let mut amounts: Vec<Decimal> = raw
            .iter()
            .map(|share| self.precision.truncate_to_minor(*share))
            .collect();

        let allocated = precision::sum(amounts.iter().copied())?;
        let residual = precision::subtract(total, allocated)?;
        if residual.is_zero() {
            return Ok(amounts);
        }

        let order = self.remainder_order(raw);
        let unit = self.precision.minor_unit();
        let whole_units = precision::divide(residual, unit, "remainder")?.trunc();
        let mut applied = vec![Decimal::ZERO; amounts.len()];

        // Truncation leaves fewer units than recipients: one unit each, in
        // order. Anything left after that (caller-supplied slack or sub-unit
        // dust) is absorbed whole.
        let mut rest = residual;
        if whole_units.abs() < Decimal::from(order.len() as u64) {
            let step = if residual.is_sign_negative() { -unit } else { unit };
            let mut units_left = whole_units.abs();
            for &position in &order {
                if units_left.is_zero() {
                    break;
                }
                // Only shares holding at least one unit can give one back.
                if step.is_sign_negative() && amounts[position] < unit {
                    continue;
                }
                amounts[position] = precision::add(amounts[position], step)?;
                applied[position] = precision::add(applied[position], step)?;
                rest = precision::subtract(rest, step)?;
                units_left -= Decimal::ONE;
            }
        }

        if rest.is_sign_positive() && !rest.is_zero() {
            let first = order[0];
            amounts[first] = precision::add(amounts[first], rest)?;
            applied[first] = precision::add(applied[first], rest)?;
        } else {
            // Σ amounts > total here, so the shares in order can cover it.
            for &position in &order {
                if !rest.is_sign_negative() || rest.is_zero() {
                    break;
                }
                let take = amounts[position].min(-rest);
                amounts[position] = precision::subtract(amounts[position], take)?;
                applied[position] = precision::subtract(applied[position], take)?;
                rest = precision::add(rest, take)?;
            }
        }

        for (position, amount) in applied.into_iter().enumerate() {
            if !amount.is_zero() {
                debug!(member_id = %included[position], %amount, "Remainder applied");
                notices.push(SplitNotice::RemainderApplied {
                    member_id: included[position].clone(),
                    amount,
                });
            }
        }

        Ok(amounts)
    }

    /// Positions in the order that absorbs residue.
    fn remainder_order(&self, raw: &[Decimal]) -> Vec<usize> {
        let mut order: Vec<usize> = (0..raw.len()).collect();
        if self.remainder_policy == RemainderPolicy::LargestShare {
            // Stable sort keeps participant order between equal shares.
            order.sort_by(|&a, &b| raw[b].cmp(&raw[a]));
        }
        order
    }
}

// =============================================================================
// Helpers
// =============================================================================

/// Participants that take part in the divisor.
fn included_participants(expense: &Expense) -> CoreResult<Vec<MemberId>> {
    let Some(excluded) = expense.excluded_members() else {
        return Ok(expense.participants.clone());
    };

    if let Some(stray) = excluded
        .iter()
        .find(|id| !expense.participants.contains(id))
    {
        return Err(ValidationError::ExcludedNotParticipant(stray.clone()).into());
    }

    let included: Vec<MemberId> = expense
        .participants
        .iter()
        .filter(|id| !excluded.contains(*id))
        .cloned()
        .collect();

    if included.is_empty() {
        return Err(ValidationError::AllParticipantsExcluded.into());
    }
    Ok(included)
}

fn equal_shares(total: Decimal, count: usize) -> ArithmeticResult<Vec<Decimal>> {
    let share = precision::divide(total, Decimal::from(count as u64), "equal split")?;
    Ok(vec![share; count])
}

fn proportional(
    total: Decimal,
    parts: &[Decimal],
    context: &'static str,
) -> ArithmeticResult<Vec<Decimal>> {
    let whole = precision::sum(parts.iter().copied())?;
    parts
        .iter()
        .map(|part| precision::proportion(total, *part, whole, context))
        .collect()
}

/// Explicit weight, then the member's default weight, then 1.
fn resolve_weight(
    weights: &MemberValues,
    index: &MemberIndex<'_>,
    member_id: &MemberId,
) -> ValidationResult<Decimal> {
    if let Some(weight) = weights.get(member_id) {
        return Ok(*weight);
    }
    let member = validation::require_member(index, member_id)?;
    Ok(member.weight.unwrap_or(Decimal::ONE))
}

/// Incomes for every included participant, or `None` after recording a
/// fallback when any of them lacks positive income.
fn incomes_or_fallback(
    strategy: SplitKind,
    included: &[MemberId],
    index: &MemberIndex<'_>,
    notices: &mut Vec<SplitNotice>,
) -> CoreResult<Option<Vec<Decimal>>> {
    let mut incomes = Vec::with_capacity(included.len());
    let mut missing = Vec::new();
    for id in included {
        match validation::require_member(index, id)?.positive_income() {
            Some(income) => incomes.push(income),
            None => missing.push(id.clone()),
        }
    }

    if missing.is_empty() {
        return Ok(Some(incomes));
    }

    warn!(
        %strategy,
        missing = missing.len(),
        "Income data missing, falling back to equal split"
    );
    notices.push(SplitNotice::FallbackApplied {
        strategy,
        missing_income: missing,
    });
    Ok(None)
}

// =============================================================================
// Unit Tests
// =============================================================================
