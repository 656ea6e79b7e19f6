use chrono::{TimeZone, Utc};
use divvy_core::settlement::{net_positions, simulate};
use divvy_core::{
    BalanceLedger, Expense, Member, MemberId, MemberValues, PairwiseBalance, Payer,
    SettlementOptimizer, SplitCalculator, SplitStrategy,
};
use proptest::prelude::*;
use rust_decimal::{Decimal, RoundingStrategy};

fn member_ids(count: usize) -> Vec<MemberId> {
    (0..count).map(|idx| MemberId::new(format!("m{idx}"))).collect()
}

fn cents(value: u64) -> Decimal {
    Decimal::new(value as i64, 2)
}

fn expense(total: Decimal, participants: Vec<MemberId>, strategy: SplitStrategy) -> Expense {
    let payer = participants[0].clone();
    Expense::new(
        "p1",
        total,
        vec![Payer {
            member_id: payer,
            amount_paid: total,
        }],
        participants,
        strategy,
        Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap(),
    )
}

fn strategy_for(kind: usize, ids: &[MemberId], parts: &[u32]) -> SplitStrategy {
    let values = |scale: u32| -> MemberValues {
        ids.iter()
            .zip(parts)
            .map(|(id, part)| (id.clone(), Decimal::new(*part as i64, scale)))
            .collect()
    };
    match kind {
        0 => SplitStrategy::Equal,
        1 => SplitStrategy::Weighted { weights: values(2) },
        2 => SplitStrategy::Shares { shares: values(0) },
        3 => SplitStrategy::IncomeProportional,
        4 => SplitStrategy::IncomeProgressive,
        _ => SplitStrategy::Exclude {
            excluded: ids.iter().skip(1).take(1).cloned().collect(),
        },
    }
}

proptest! {
    #[test]
    fn shares_sum_to_total_exactly(
        total_cents in 1u64..=10_000_000,
        parts in prop::collection::vec(1u32..=1_000, 1..=7),
        kind in 0usize..6,
    ) {
        let ids = member_ids(parts.len());
        let members: Vec<Member> = ids
            .iter()
            .zip(&parts)
            .map(|(id, part)| Member::new(id.as_str(), id.as_str()).with_income(Decimal::from(*part * 100)))
            .collect();
        let total = cents(total_cents);

        let outcome = SplitCalculator::default()
            .compute(&expense(total, ids.clone(), strategy_for(kind, &ids, &parts)), &members)
            .unwrap();

        let sum: Decimal = outcome.shares.iter().map(|share| share.amount).sum();
        prop_assert_eq!(sum, total);
        for share in &outcome.shares {
            prop_assert!(share.amount >= Decimal::ZERO);
            prop_assert_eq!(share.amount, share.amount.round_dp(2));
        }
    }
}

proptest! {
    #[test]
    fn percentage_split_sums_to_hundred(
        total_cents in 1u64..=10_000_000,
        parts in prop::collection::vec(1u32..=1_000, 1..=7),
    ) {
        let ids = member_ids(parts.len());
        let members: Vec<Member> = ids.iter().map(|id| Member::new(id.as_str(), id.as_str())).collect();
        let whole: u32 = parts.iter().sum();

        let mut percentages = MemberValues::new();
        let mut assigned = Decimal::ZERO;
        for (idx, (id, part)) in ids.iter().zip(&parts).enumerate() {
            let pct = if idx + 1 == parts.len() {
                Decimal::ONE_HUNDRED - assigned
            } else {
                (Decimal::ONE_HUNDRED * Decimal::from(*part) / Decimal::from(whole))
                    .round_dp_with_strategy(2, RoundingStrategy::ToZero)
            };
            assigned += pct;
            percentages.insert(id.clone(), pct);
        }

        let total = cents(total_cents);
        let outcome = SplitCalculator::default()
            .compute(&expense(total, ids, SplitStrategy::Percentage { percentages }), &members)
            .unwrap();

        let pct_sum: Decimal = outcome.shares.iter().map(|share| share.percentage).sum();
        prop_assert!((pct_sum - Decimal::ONE_HUNDRED).abs() <= Decimal::new(1, 2));
        prop_assert_eq!(outcome.total(), total);
    }
}

proptest! {
    #[test]
    fn income_strategies_without_income_match_equal(
        total_cents in 1u64..=10_000_000,
        count in 1usize..=7,
    ) {
        let ids = member_ids(count);
        let members: Vec<Member> = ids.iter().map(|id| Member::new(id.as_str(), id.as_str())).collect();
        let total = cents(total_cents);
        let calculator = SplitCalculator::default();

        let equal = calculator
            .compute(&expense(total, ids.clone(), SplitStrategy::Equal), &members)
            .unwrap();
        for strategy in [SplitStrategy::IncomeProportional, SplitStrategy::IncomeProgressive] {
            let outcome = calculator
                .compute(&expense(total, ids.clone(), strategy), &members)
                .unwrap();
            prop_assert_eq!(&outcome.shares, &equal.shares);
            prop_assert!(outcome.fallback_applied());
        }
    }
}

proptest! {
    #[test]
    fn ledger_is_idempotent_and_nets_to_zero(
        member_count in 2usize..=6,
        totals in prop::collection::vec(1u64..=500_000, 0..=12),
        payer_indexes in prop::collection::vec(0usize..=5, 12),
        masks in prop::collection::vec(1usize..=63, 12),
    ) {
        let ids = member_ids(member_count);
        let members: Vec<Member> = ids.iter().map(|id| Member::new(id.as_str(), id.as_str())).collect();

        let history: Vec<Expense> = totals
            .iter()
            .enumerate()
            .map(|(idx, total)| {
                let participants: Vec<MemberId> = ids
                    .iter()
                    .enumerate()
                    .filter(|(bit, _)| (masks[idx] & (1 << *bit)) != 0)
                    .map(|(_, id)| id.clone())
                    .collect();
                let participants = if participants.is_empty() { ids.clone() } else { participants };
                let payer = ids[payer_indexes[idx] % member_count].clone();
                Expense::new(
                    format!("e{idx}"),
                    cents(*total),
                    vec![Payer { member_id: payer, amount_paid: cents(*total) }],
                    participants,
                    SplitStrategy::Equal,
                    Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap(),
                )
            })
            .collect();

        let ledger = BalanceLedger::default();
        let first = ledger.aggregate(&history, &members).unwrap();
        let second = ledger.aggregate(&history, &members).unwrap();
        prop_assert_eq!(&first, &second);

        for balance in &first {
            prop_assert!(balance.member_a < balance.member_b);
        }
        let net_sum: Decimal = net_positions(&first).unwrap().values().copied().sum();
        prop_assert_eq!(net_sum, Decimal::ZERO);
    }
}

fn balances_from(member_count: usize, amounts: &[i64], scale: u32) -> Vec<PairwiseBalance> {
    let ids = member_ids(member_count);
    let mut balances = Vec::new();
    let mut next = amounts.iter();
    for a in 0..member_count {
        for b in (a + 1)..member_count {
            if let Some(amount) = next.next() {
                balances.push(PairwiseBalance {
                    member_a: ids[a].clone(),
                    member_b: ids[b].clone(),
                    amount: Decimal::new(*amount, scale),
                });
            }
        }
    }
    balances
}

proptest! {
    #[test]
    fn settlement_zeroes_every_position(
        member_count in 2usize..=7,
        amounts in prop::collection::vec(-1_000_000i64..=1_000_000, 0..=21),
    ) {
        let balances = balances_from(member_count, &amounts, 2);
        let optimizer = SettlementOptimizer::default();
        let suggestions = optimizer.optimize(&balances).unwrap();

        let residual = simulate(&balances, &suggestions).unwrap();
        for position in residual.values() {
            prop_assert!(position.abs() <= optimizer.tolerance());
        }
        for payment in &suggestions {
            prop_assert!(payment.amount > Decimal::ZERO);
            prop_assert_ne!(&payment.from, &payment.to);
        }
    }
}

proptest! {
    #[test]
    fn settlement_never_exceeds_open_members_minus_one(
        member_count in 2usize..=7,
        amounts in prop::collection::vec(-10_000i64..=10_000, 0..=21),
    ) {
        // Whole units leave no dust below tolerance.
        let balances = balances_from(member_count, &amounts, 0);
        let optimizer = SettlementOptimizer::default();
        let net = net_positions(&balances).unwrap();
        let debtors = net.values().filter(|p| **p < -optimizer.tolerance()).count();
        let creditors = net.values().filter(|p| **p > optimizer.tolerance()).count();

        let suggestions = optimizer.optimize(&balances).unwrap();
        prop_assert!(suggestions.len() <= (debtors + creditors).saturating_sub(1));
    }
}
