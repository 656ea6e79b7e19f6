//! # Settlement Optimizer
//!
//! Turns pairwise balances into a short list of payments that settles the
//! whole group.
//!
//! ## Greedy Netting
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  balances            net positions          suggestions                 │
//! │  ──────────          ─────────────          ───────────                 │
//! │  A owes B 100        A = −100               A pays C 100                │
//! │  B owes C 100   →    B =    0 (dropped) →                               │
//! │  A owes C   0        C = +100                                           │
//! │                                                                         │
//! │  debtors   sorted most negative first, ties by member id                │
//! │  creditors sorted most positive first, ties by member id                │
//! │                                                                         │
//! │  loop: pay min(debtor, creditor), advance whoever reached ~0            │
//! │  at most debtors + creditors − 1 payments                               │
//! │                                                                         │
//! │  still open: match against members below tolerance (dust and partly    │
//! │  paid counterparts) so every position ends within tolerance            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;
use ts_rs::TS;

use crate::config::CoreConfig;
use crate::error::CoreResult;
use crate::precision::{self, ArithmeticResult, Precision};
use crate::types::{MemberId, PairwiseBalance, SettlementSuggestion};

/// Net position per member: positive is owed to them.
pub type NetPositions = BTreeMap<MemberId, Decimal>;

// =============================================================================
// Plan
// =============================================================================

/// Suggestions plus how much they simplify the open debts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SettlementPlan {
    pub suggestions: Vec<SettlementSuggestion>,

    /// Pairwise balances that were not already settled.
    pub open_balance_count: usize,
}

impl SettlementPlan {
    /// Payments avoided compared with settling every open pair directly.
    pub fn transfers_saved(&self) -> usize {
        self.open_balance_count.saturating_sub(self.suggestions.len())
    }

    pub fn is_settled(&self) -> bool {
        self.suggestions.is_empty()
    }
}

// =============================================================================
// Optimizer
// =============================================================================

/// Deterministic greedy debt simplification.
#[derive(Debug, Clone)]
pub struct SettlementOptimizer {
    tolerance: Decimal,
    precision: Precision,
}

impl Default for SettlementOptimizer {
    fn default() -> Self {
        SettlementOptimizer::new(&CoreConfig::default())
    }
}

impl SettlementOptimizer {
    pub fn new(config: &CoreConfig) -> Self {
        SettlementOptimizer {
            tolerance: config.settlement.tolerance,
            precision: config.precision(),
        }
    }

    pub fn tolerance(&self) -> Decimal {
        self.tolerance
    }

    /// Ordered payments that drive every net position to within tolerance
    /// of zero. Each amount is rounded half-up to the minor unit.
    ///
    /// At most `debtors + creditors − 1` payments are returned when no member
    /// sits strictly between zero and the tolerance. When such dust exists the
    /// cleanup pass may add payments to those members beyond that bound.
    pub fn optimize(&self, balances: &[PairwiseBalance]) -> CoreResult<Vec<SettlementSuggestion>> {
        let net = net_positions(balances)?;

        let mut debtors = self.side(&net, |position| position < -self.tolerance);
        let mut creditors = self.side(&net, |position| position > self.tolerance);

        let mut suggestions = Vec::with_capacity((debtors.len() + creditors.len()).saturating_sub(1));
        let (d, c) = self.match_greedy(&mut debtors, &mut creditors, &mut suggestions)?;

        // Whatever the greedy pass left open is owed by or to members below
        // tolerance: dropped dust and partly paid counterparts.
        if d < debtors.len() {
            let mut absorbers = self.side(&net, |position| {
                position > Decimal::ZERO && position <= self.tolerance
            });
            absorbers.extend(unpaid(&creditors));
            sort_by_magnitude(&mut absorbers);
            self.match_greedy(&mut debtors[d..], &mut absorbers, &mut suggestions)?;
        } else if c < creditors.len() {
            let mut absorbers = self.side(&net, |position| {
                position < Decimal::ZERO && position >= -self.tolerance
            });
            absorbers.extend(unpaid(&debtors));
            sort_by_magnitude(&mut absorbers);
            self.match_greedy(&mut absorbers, &mut creditors[c..], &mut suggestions)?;
        }

        debug!(
            debtors = debtors.len(),
            creditors = creditors.len(),
            suggestions = suggestions.len(),
            "Planned settlement"
        );
        Ok(suggestions)
    }

    /// [`optimize`](Self::optimize) with a summary of the reduction.
    pub fn plan(&self, balances: &[PairwiseBalance]) -> CoreResult<SettlementPlan> {
        let suggestions = self.optimize(balances)?;
        let open_balance_count = balances
            .iter()
            .filter(|balance| !balance.is_settled(self.tolerance))
            .count();
        Ok(SettlementPlan {
            suggestions,
            open_balance_count,
        })
    }

    /// Members whose net position matches `select`, as magnitudes sorted
    /// largest first, ties by member id.
    fn side<F>(&self, net: &NetPositions, select: F) -> Vec<(MemberId, Decimal)>
    where
        F: Fn(Decimal) -> bool,
    {
        let mut side: Vec<(MemberId, Decimal)> = net
            .iter()
            .filter(|(_, position)| select(**position))
            .map(|(id, position)| (id.clone(), position.abs()))
            .collect();
        sort_by_magnitude(&mut side);
        side
    }

    /// Pays the current largest debtor to the current largest creditor until
    /// one side runs out. Returns how far each side got.
    fn match_greedy(
        &self,
        debtors: &mut [(MemberId, Decimal)],
        creditors: &mut [(MemberId, Decimal)],
        suggestions: &mut Vec<SettlementSuggestion>,
    ) -> ArithmeticResult<(usize, usize)> {
        let (mut d, mut c) = (0, 0);
        while d < debtors.len() && c < creditors.len() {
            let (owed, due) = (debtors[d].1, creditors[c].1);
            // Payments are whole minor units; what rounding leaves stays on
            // the books of whoever set the amount.
            let amount = self.precision.round_to_minor(owed.min(due));
            if !amount.is_zero() {
                suggestions.push(SettlementSuggestion {
                    from: debtors[d].0.clone(),
                    to: creditors[c].0.clone(),
                    amount,
                });
                debtors[d].1 = precision::subtract(owed, amount)?;
                creditors[c].1 = precision::subtract(due, amount)?;
            }

            if owed <= due || debtors[d].1 <= self.tolerance {
                d += 1;
            }
            if due <= owed || creditors[c].1 <= self.tolerance {
                c += 1;
            }
        }

        let leftover = debtors[d..]
            .iter()
            .chain(creditors[c..].iter())
            .map(|(_, remaining)| *remaining)
            .max()
            .unwrap_or(Decimal::ZERO);
        if leftover > self.tolerance {
            debug!(%leftover, "Greedy pass left an open balance");
        }
        Ok((d, c))
    }
}

/// Largest magnitude first, ties by member id.
fn sort_by_magnitude(side: &mut [(MemberId, Decimal)]) {
    side.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
}

/// Entries with something still left to pay or receive.
fn unpaid(side: &[(MemberId, Decimal)]) -> impl Iterator<Item = (MemberId, Decimal)> + '_ {
    side.iter()
        .filter(|(_, remaining)| *remaining > Decimal::ZERO)
        .cloned()
}

// =============================================================================
// Net Positions
// =============================================================================

/// Owed-to-them minus they-owe, per member, over every counterparty.
pub fn net_positions(balances: &[PairwiseBalance]) -> ArithmeticResult<NetPositions> {
    let mut net = NetPositions::new();
    for balance in balances {
        let a = net.entry(balance.member_a.clone()).or_insert(Decimal::ZERO);
        *a = precision::subtract(*a, balance.amount)?;
        let b = net.entry(balance.member_b.clone()).or_insert(Decimal::ZERO);
        *b = precision::add(*b, balance.amount)?;
    }
    Ok(net)
}

/// Net positions left after paying `suggestions` in order.
pub fn simulate(
    balances: &[PairwiseBalance],
    suggestions: &[SettlementSuggestion],
) -> ArithmeticResult<NetPositions> {
    let mut net = net_positions(balances)?;
    for payment in suggestions {
        let from = net.entry(payment.from.clone()).or_insert(Decimal::ZERO);
        *from = precision::add(*from, payment.amount)?;
        let to = net.entry(payment.to.clone()).or_insert(Decimal::ZERO);
        *to = precision::subtract(*to, payment.amount)?;
    }
    Ok(net)
}

// =============================================================================
// Unit Tests
// =============================================================================
