//! # Expense Draft
//!
//! The in-progress form behind "add expense", modelled as a pure reducer.
//!
//! ## Draft Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Draft Reducer                                      │
//! │                                                                         │
//! │  User Action             DraftEdit                  Draft Change        │
//! │  ───────────             ─────────                  ────────────        │
//! │                                                                         │
//! │  Type amount ──────────► SetTotal ────────────────► total (+ payer)     │
//! │                                                                         │
//! │  Tick member ──────────► AddParticipant ──────────► participants.push   │
//! │                                                                         │
//! │  Untick member ────────► RemoveParticipant ───────► drop id + params    │
//! │                                                                         │
//! │  Pick split kind ──────► ChangeStrategy ──────────► empty strategy      │
//! │                                                                         │
//! │  Type member value ────► SetStrategyValue ────────► params[id] = v      │
//! │                                                                         │
//! │  Every change ─────────► preview() ───────────────► fresh SplitOutcome  │
//! │                                                                         │
//! │  Save ─────────────────► finalize() ──────────────► Expense + shares    │
//! │                                                                         │
//! │  NOTE: reduce() consumes the old draft and returns a new one.           │
//! │        Nothing is patched incrementally; shares are always recomputed.  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;
use ts_rs::TS;

use crate::error::{CoreResult, ValidationError};
use crate::split::{SplitCalculator, SplitOutcome};
use crate::strategy::{SplitKind, SplitStrategy};
use crate::types::{Expense, ExpenseId, Member, MemberId, Payer};
use crate::validation;

/// Id used for previews; finalized expenses get a generated one.
const PREVIEW_EXPENSE_ID: &str = "draft";

// =============================================================================
// Edits
// =============================================================================

/// One user edit to an [`ExpenseDraft`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(tag = "type", rename_all = "snake_case")]
#[ts(export)]
pub enum DraftEdit {
    SetDescription {
        description: String,
    },

    SetTotal {
        #[ts(as = "String")]
        total_amount: Decimal,
    },

    SetIncurredAt {
        #[ts(as = "String")]
        incurred_at: DateTime<Utc>,
    },

    /// No-op when the member already participates.
    AddParticipant {
        member_id: MemberId,
    },

    /// Also forgets the member's strategy value and exclusion.
    RemoveParticipant {
        member_id: MemberId,
    },

    /// One member paid the whole total.
    SetSinglePayer {
        member_id: MemberId,
    },

    SetPayers {
        payers: Vec<Payer>,
    },

    /// Switches kind and starts from empty parameters.
    ChangeStrategy {
        kind: SplitKind,
    },

    /// Ignored for kinds without per-member values.
    SetStrategyValue {
        member_id: MemberId,
        #[ts(as = "String")]
        value: Decimal,
    },

    /// Ignored unless the strategy is `exclude`.
    ToggleExcluded {
        member_id: MemberId,
    },
}

// =============================================================================
// Draft
// =============================================================================

/// An expense being edited. Only [`finalize`](ExpenseDraft::finalize) makes
/// it a real [`Expense`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ExpenseDraft {
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

impl ExpenseDraft {
    /// An empty equal-split draft.
    pub fn new(incurred_at: DateTime<Utc>) -> Self {
        ExpenseDraft {
            description: String::new(),
            total_amount: Decimal::ZERO,
            payers: Vec::new(),
            participants: Vec::new(),
            strategy: SplitStrategy::Equal,
            incurred_at,
        }
    }

    /// Returns the draft with `edit` applied.
    pub fn apply(mut self, edit: DraftEdit) -> Self {
        match edit {
            DraftEdit::SetDescription { description } => {
                self.description = description;
            }

            DraftEdit::SetTotal { total_amount } => {
                self.total_amount = total_amount;
                if let [only] = self.payers.as_mut_slice() {
                    only.amount_paid = total_amount;
                }
            }

            DraftEdit::SetIncurredAt { incurred_at } => {
                self.incurred_at = incurred_at;
            }

            DraftEdit::AddParticipant { member_id } => {
                if !self.participants.contains(&member_id) {
                    self.participants.push(member_id);
                }
            }

            DraftEdit::RemoveParticipant { member_id } => {
                self.participants.retain(|id| id != &member_id);
                if let Some(values) = self.strategy.member_values_mut() {
                    values.remove(&member_id);
                }
                if let SplitStrategy::Exclude { excluded } = &mut self.strategy {
                    excluded.remove(&member_id);
                }
            }

            DraftEdit::SetSinglePayer { member_id } => {
                self.payers = vec![Payer {
                    member_id,
                    amount_paid: self.total_amount,
                }];
            }

            DraftEdit::SetPayers { payers } => {
                self.payers = payers;
            }

            DraftEdit::ChangeStrategy { kind } => {
                if self.strategy.kind() != kind {
                    self.strategy = SplitStrategy::empty(kind);
                }
            }

            DraftEdit::SetStrategyValue { member_id, value } => {
                if let Some(values) = self.strategy.member_values_mut() {
                    values.insert(member_id, value);
                }
            }

            DraftEdit::ToggleExcluded { member_id } => {
                if let SplitStrategy::Exclude { excluded } = &mut self.strategy {
                    if !excluded.remove(&member_id) {
                        excluded.insert(member_id);
                    }
                }
            }
        }
        self
    }

    /// Shares for the draft as it stands, computed from scratch.
    pub fn preview(
        &self,
        calculator: &SplitCalculator,
        members: &[Member],
    ) -> CoreResult<SplitOutcome> {
        calculator.compute(&self.to_expense(ExpenseId::new(PREVIEW_EXPENSE_ID)), members)
    }

    /// Validates the draft and turns it into an [`Expense`] with a fresh id.
    pub fn finalize(
        &self,
        calculator: &SplitCalculator,
        members: &[Member],
    ) -> CoreResult<(Expense, SplitOutcome)> {
        if self.description.trim().is_empty() {
            return Err(ValidationError::Required {
                field: "description".to_string(),
            }
            .into());
        }

        let expense = self.to_expense(ExpenseId::generate());
        let index = validation::index_members(members)?;
        let outcome = calculator.compute_indexed(&expense, &index)?;
        validation::validate_payers(&expense, &index, calculator.tolerance())?;

        debug!(
            expense_id = %expense.id,
            strategy = %expense.strategy.kind(),
            "Finalized expense draft"
        );
        Ok((expense, outcome))
    }

    fn to_expense(&self, id: ExpenseId) -> Expense {
        Expense {
            id,
            description: self.description.trim().to_string(),
            total_amount: self.total_amount,
            payers: self.payers.clone(),
            participants: self.participants.clone(),
            strategy: self.strategy.clone(),
            incurred_at: self.incurred_at,
        }
    }
}

/// `(draft, edit) → draft`.
pub fn reduce(draft: ExpenseDraft, edit: DraftEdit) -> ExpenseDraft {
    draft.apply(edit)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 6, 12, 20, 30, 0).unwrap()
    }

    fn members() -> Vec<Member> {
        vec![
            Member::new("a", "Ada"),
            Member::new("b", "Ben"),
            Member::new("c", "Cy"),
        ]
    }

    fn id(raw: &str) -> MemberId {
        MemberId::new(raw)
    }

    fn dinner() -> ExpenseDraft {
        [
            DraftEdit::SetDescription {
                description: "Dinner".into(),
            },
            DraftEdit::SetSinglePayer { member_id: id("a") },
            DraftEdit::SetTotal {
                total_amount: dec!(90),
            },
            DraftEdit::AddParticipant { member_id: id("a") },
            DraftEdit::AddParticipant { member_id: id("b") },
            DraftEdit::AddParticipant { member_id: id("c") },
        ]
        .into_iter()
        .fold(ExpenseDraft::new(at()), reduce)
    }

    #[test]
    fn test_single_payer_follows_total() {
        let draft = dinner();
        assert_eq!(draft.payers, vec![Payer::new("a", dec!(90))]);

        let draft = draft.apply(DraftEdit::SetTotal {
            total_amount: dec!(120),
        });
        assert_eq!(draft.payers[0].amount_paid, dec!(120));
    }

    #[test]
    fn test_multiple_payers_are_left_alone() {
        let draft = dinner()
            .apply(DraftEdit::SetPayers {
                payers: vec![Payer::new("a", dec!(50)), Payer::new("b", dec!(40))],
            })
            .apply(DraftEdit::SetTotal {
                total_amount: dec!(100),
            });
        assert_eq!(draft.payers[0].amount_paid, dec!(50));
        assert_eq!(draft.payers[1].amount_paid, dec!(40));
    }

    #[test]
    fn test_add_participant_is_idempotent() {
        let draft = dinner().apply(DraftEdit::AddParticipant { member_id: id("b") });
        assert_eq!(draft.participants, vec![id("a"), id("b"), id("c")]);
    }

    #[test]
    fn test_remove_participant_drops_its_values() {
        let draft = dinner()
            .apply(DraftEdit::ChangeStrategy {
                kind: SplitKind::Shares,
            })
            .apply(DraftEdit::SetStrategyValue {
                member_id: id("a"),
                value: dec!(2),
            })
            .apply(DraftEdit::SetStrategyValue {
                member_id: id("c"),
                value: dec!(1),
            })
            .apply(DraftEdit::RemoveParticipant { member_id: id("c") });

        assert_eq!(draft.participants, vec![id("a"), id("b")]);
        let values = draft.strategy.member_values().unwrap();
        assert!(!values.contains_key(&id("c")));
        assert_eq!(values[&id("a")], dec!(2));
    }

    #[test]
    fn test_strategy_change_resets_values() {
        let draft = dinner()
            .apply(DraftEdit::ChangeStrategy {
                kind: SplitKind::Percentage,
            })
            .apply(DraftEdit::SetStrategyValue {
                member_id: id("a"),
                value: dec!(100),
            });

        let same = draft.clone().apply(DraftEdit::ChangeStrategy {
            kind: SplitKind::Percentage,
        });
        assert_eq!(same.strategy, draft.strategy);

        let custom = draft.apply(DraftEdit::ChangeStrategy {
            kind: SplitKind::Custom,
        });
        assert_eq!(custom.strategy, SplitStrategy::empty(SplitKind::Custom));
    }

    #[test]
    fn test_value_edits_ignored_for_equal() {
        let draft = dinner().apply(DraftEdit::SetStrategyValue {
            member_id: id("a"),
            value: dec!(5),
        });
        assert_eq!(draft.strategy, SplitStrategy::Equal);
    }

    #[test]
    fn test_toggle_excluded() {
        let draft = dinner()
            .apply(DraftEdit::ChangeStrategy {
                kind: SplitKind::Exclude,
            })
            .apply(DraftEdit::ToggleExcluded { member_id: id("b") });
        assert_eq!(draft.strategy.kind(), SplitKind::Exclude);

        let outcome = draft.preview(&SplitCalculator::default(), &members()).unwrap();
        assert_eq!(outcome.shares.len(), 2);
        assert_eq!(outcome.shares[0].amount, dec!(45));

        let draft = draft.apply(DraftEdit::ToggleExcluded { member_id: id("b") });
        let outcome = draft.preview(&SplitCalculator::default(), &members()).unwrap();
        assert_eq!(outcome.shares.len(), 3);
    }

    #[test]
    fn test_preview_recomputes_after_each_edit() {
        let calculator = SplitCalculator::default();
        let draft = dinner();
        let before = draft.preview(&calculator, &members()).unwrap();
        assert_eq!(before.shares[0].amount, dec!(30));

        let after = draft
            .apply(DraftEdit::SetTotal {
                total_amount: dec!(500),
            })
            .preview(&calculator, &members())
            .unwrap();
        let amounts: Vec<Decimal> = after.shares.iter().map(|s| s.amount).collect();
        assert_eq!(amounts, vec![dec!(166.67), dec!(166.67), dec!(166.66)]);
    }

    #[test]
    fn test_preview_reports_incomplete_parameters() {
        let draft = dinner()
            .apply(DraftEdit::ChangeStrategy {
                kind: SplitKind::Percentage,
            })
            .apply(DraftEdit::SetStrategyValue {
                member_id: id("a"),
                value: dec!(50),
            });
        assert!(draft.preview(&SplitCalculator::default(), &members()).is_err());
    }

    #[test]
    fn test_finalize() {
        let calculator = SplitCalculator::default();
        let (expense, outcome) = dinner().finalize(&calculator, &members()).unwrap();
        assert_eq!(expense.description, "Dinner");
        assert_eq!(expense.total_amount, dec!(90));
        assert_eq!(expense.incurred_at, at());
        assert_ne!(expense.id.as_str(), PREVIEW_EXPENSE_ID);
        assert_eq!(outcome.total(), dec!(90));

        let (again, _) = dinner().finalize(&calculator, &members()).unwrap();
        assert_ne!(expense.id, again.id);
    }

    #[test]
    fn test_finalize_validates_payers_and_description() {
        let calculator = SplitCalculator::default();
        let underpaid = dinner().apply(DraftEdit::SetPayers {
            payers: vec![Payer::new("a", dec!(50))],
        });
        let err = underpaid.finalize(&calculator, &members()).unwrap_err();
        assert!(matches!(
            err.as_validation(),
            Some(ValidationError::PayersDoNotSum { .. })
        ));

        let unnamed = dinner().apply(DraftEdit::SetDescription {
            description: "   ".into(),
        });
        assert!(unnamed.finalize(&calculator, &members()).is_err());
    }

    #[test]
    fn test_edits_deserialize_from_json() {
        let edit: DraftEdit =
            serde_json::from_str(r#"{"type":"set_total","total_amount":"42.50"}"#).unwrap();
        assert_eq!(
            edit,
            DraftEdit::SetTotal {
                total_amount: dec!(42.50)
            }
        );

        let edit: DraftEdit =
            serde_json::from_str(r#"{"type":"change_strategy","kind":"income_progressive"}"#)
                .unwrap();
        assert_eq!(
            edit,
            DraftEdit::ChangeStrategy {
                kind: SplitKind::IncomeProgressive
            }
        );
    }
}
