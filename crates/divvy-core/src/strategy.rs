//! # Split Strategies
//!
//! One variant per split kind, each carrying only the parameters it needs.
//!
//! ## Strategy Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Kind                 Parameters          Per-member amount             │
//! │  ──────────────────   ─────────────────   ──────────────────────────    │
//! │  equal                -                   total / n                     │
//! │  percentage           pct per member      total × pct / 100             │
//! │  custom               amount per member   amount (all required)         │
//! │  unequal              amount per member   amount (unlisted owe 0)       │
//! │  shares               shares per member   total × s / Σs                │
//! │  weighted             weight overrides    total × w / Σw  (w ≥ default) │
//! │  income_proportional  - (member income)   total × inc / Σinc            │
//! │  income_progressive   - (member income)   total × (1+0.2·rank) / Σm     │
//! │  adjustment           delta per member    total / n + delta             │
//! │  exclude              excluded set        total / (n − excluded)        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Wire Format
//! Internally tagged, snake_case:
//! ```json
//! { "kind": "percentage", "percentages": { "alice": "60", "bob": "40" } }
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, ValidationError};
use crate::types::MemberId;

/// Per-member decimal parameters, keyed by member id.
pub type MemberValues = BTreeMap<MemberId, Decimal>;

// =============================================================================
// Split Strategy
// =============================================================================

/// How an expense total is divided among its participants.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, TS)]
#[serde(tag = "kind", rename_all = "snake_case")]
#[ts(export)]
pub enum SplitStrategy {
    /// Everyone pays the same.
    #[default]
    Equal,

    /// Caller-supplied percentages; must sum to 100 within tolerance.
    Percentage {
        #[ts(type = "Record<string, string>")]
        percentages: MemberValues,
    },

    /// Caller-supplied amounts for every included participant.
    Custom {
        #[ts(type = "Record<string, string>")]
        amounts: MemberValues,
    },

    /// Caller-supplied amounts; participants without an entry owe nothing.
    Unequal {
        #[ts(type = "Record<string, string>")]
        amounts: MemberValues,
    },

    /// Integer-like share counts; every share must be positive.
    Shares {
        #[ts(type = "Record<string, string>")]
        shares: MemberValues,
    },

    /// Weights; falls back to `Member.weight`, then 1.
    Weighted {
        #[serde(default)]
        #[ts(type = "Record<string, string>")]
        weights: MemberValues,
    },

    /// Proportional to member income.
    IncomeProportional,

    /// Rank-based multiplier over member income.
    IncomeProgressive,

    /// Equal base plus a signed per-member adjustment.
    Adjustment {
        #[ts(type = "Record<string, string>")]
        adjustments: MemberValues,
    },

    /// Equal split that leaves out the excluded members.
    Exclude {
        #[ts(type = "Array<string>")]
        excluded: BTreeSet<MemberId>,
    },
}

impl SplitStrategy {
    /// Returns the parameter-free kind of this strategy.
    pub fn kind(&self) -> SplitKind {
        match self {
            SplitStrategy::Equal => SplitKind::Equal,
            SplitStrategy::Percentage { .. } => SplitKind::Percentage,
            SplitStrategy::Custom { .. } => SplitKind::Custom,
            SplitStrategy::Unequal { .. } => SplitKind::Unequal,
            SplitStrategy::Shares { .. } => SplitKind::Shares,
            SplitStrategy::Weighted { .. } => SplitKind::Weighted,
            SplitStrategy::IncomeProportional => SplitKind::IncomeProportional,
            SplitStrategy::IncomeProgressive => SplitKind::IncomeProgressive,
            SplitStrategy::Adjustment { .. } => SplitKind::Adjustment,
            SplitStrategy::Exclude { .. } => SplitKind::Exclude,
        }
    }

    /// Per-member values carried by this strategy, if it has any.
    pub fn member_values(&self) -> Option<&MemberValues> {
        match self {
            SplitStrategy::Percentage { percentages } => Some(percentages),
            SplitStrategy::Custom { amounts } | SplitStrategy::Unequal { amounts } => Some(amounts),
            SplitStrategy::Shares { shares } => Some(shares),
            SplitStrategy::Weighted { weights } => Some(weights),
            SplitStrategy::Adjustment { adjustments } => Some(adjustments),
            _ => None,
        }
    }

    /// Mutable access to the per-member values, if this strategy has any.
    pub fn member_values_mut(&mut self) -> Option<&mut MemberValues> {
        match self {
            SplitStrategy::Percentage { percentages } => Some(percentages),
            SplitStrategy::Custom { amounts } | SplitStrategy::Unequal { amounts } => Some(amounts),
            SplitStrategy::Shares { shares } => Some(shares),
            SplitStrategy::Weighted { weights } => Some(weights),
            SplitStrategy::Adjustment { adjustments } => Some(adjustments),
            _ => None,
        }
    }

    /// An empty strategy of the given kind.
    pub fn empty(kind: SplitKind) -> Self {
        match kind {
            SplitKind::Equal => SplitStrategy::Equal,
            SplitKind::Percentage => SplitStrategy::Percentage {
                percentages: MemberValues::new(),
            },
            SplitKind::Custom => SplitStrategy::Custom {
                amounts: MemberValues::new(),
            },
            SplitKind::Unequal => SplitStrategy::Unequal {
                amounts: MemberValues::new(),
            },
            SplitKind::Shares => SplitStrategy::Shares {
                shares: MemberValues::new(),
            },
            SplitKind::Weighted => SplitStrategy::Weighted {
                weights: MemberValues::new(),
            },
            SplitKind::IncomeProportional => SplitStrategy::IncomeProportional,
            SplitKind::IncomeProgressive => SplitStrategy::IncomeProgressive,
            SplitKind::Adjustment => SplitStrategy::Adjustment {
                adjustments: MemberValues::new(),
            },
            SplitKind::Exclude => SplitStrategy::Exclude {
                excluded: BTreeSet::new(),
            },
        }
    }
}

// =============================================================================
// Split Kind
// =============================================================================

/// Parameter-free discriminant of [`SplitStrategy`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum SplitKind {
    Equal,
    Percentage,
    Custom,
    Unequal,
    Shares,
    Weighted,
    IncomeProportional,
    IncomeProgressive,
    Adjustment,
    Exclude,
}

impl SplitKind {
    pub const ALL: [SplitKind; 10] = [
        SplitKind::Equal,
        SplitKind::Percentage,
        SplitKind::Custom,
        SplitKind::Unequal,
        SplitKind::Shares,
        SplitKind::Weighted,
        SplitKind::IncomeProportional,
        SplitKind::IncomeProgressive,
        SplitKind::Adjustment,
        SplitKind::Exclude,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SplitKind::Equal => "equal",
            SplitKind::Percentage => "percentage",
            SplitKind::Custom => "custom",
            SplitKind::Unequal => "unequal",
            SplitKind::Shares => "shares",
            SplitKind::Weighted => "weighted",
            SplitKind::IncomeProportional => "income_proportional",
            SplitKind::IncomeProgressive => "income_progressive",
            SplitKind::Adjustment => "adjustment",
            SplitKind::Exclude => "exclude",
        }
    }
}

impl fmt::Display for SplitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SplitKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "equal" | "even" => Ok(SplitKind::Equal),
            "percentage" | "percent" => Ok(SplitKind::Percentage),
            "custom" => Ok(SplitKind::Custom),
            "unequal" => Ok(SplitKind::Unequal),
            "shares" => Ok(SplitKind::Shares),
            "weighted" | "weight" => Ok(SplitKind::Weighted),
            "income_proportional" | "income" => Ok(SplitKind::IncomeProportional),
            "income_progressive" | "progressive" => Ok(SplitKind::IncomeProgressive),
            "adjustment" | "adjust" => Ok(SplitKind::Adjustment),
            "exclude" => Ok(SplitKind::Exclude),
            other => Err(ValidationError::UnknownSplitKind(other.to_string()).into()),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
