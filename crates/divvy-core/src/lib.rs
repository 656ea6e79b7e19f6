//! # divvy-core: Pure Business Logic for Divvy
//!
//! This crate holds the money math of Divvy: splitting one expense, netting
//! a history of expenses into pairwise balances, and proposing the payments
//! that settle a group. Everything here is a pure function of its inputs.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Divvy Architecture                               │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 Persistence / API collaborator                  │   │
//! │  │        owns Member[] and Expense[] records, calls the core     │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ snapshots                              │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ divvy-core (THIS CRATE) ★                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌────────────┐  ┌───────────┐  │   │
//! │  │   │   split   │─►│  ledger   │─►│ settlement │  │   draft   │  │   │
//! │  │   │ SplitCalc │  │ Balances  │  │ Optimizer  │  │  reducer  │  │   │
//! │  │   └───────────┘  └───────────┘  └────────────┘  └───────────┘  │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌────────────┐  ┌───────────┐  │   │
//! │  │   │ precision │  │ strategy  │  │ validation │  │  config   │  │   │
//! │  │   └───────────┘  └───────────┘  └────────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │        UI (shares, balances)   •   payment initiation           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`precision`] - Checked decimal arithmetic and rounding points
//! - [`types`] - Data contracts (Member, Expense, SplitShare, ...)
//! - [`strategy`] - The ten split strategies
//! - [`split`] - SplitCalculator
//! - [`ledger`] - BalanceLedger
//! - [`settlement`] - SettlementOptimizer
//! - [`draft`] - Expense draft reducer
//! - [`validation`] - Input validation rules
//! - [`config`] - Tolerances, precision and remainder policy
//! - [`error`] - Domain error types
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: same input, same output; inputs are never mutated
//! 2. **No I/O**: persistence and payments belong to collaborators
//! 3. **Decimal Money**: `rust_decimal::Decimal` everywhere, rounded only on the way out
//! 4. **Exact Sums**: shares always add up to the expense total
//! 5. **Explicit Errors**: typed errors, no partial results
//!
//! ## Example Usage
//!
//! ```rust
//! use chrono::Utc;
//! use divvy_core::{
//!     BalanceLedger, Expense, Member, MemberId, Payer, SettlementOptimizer, SplitStrategy,
//! };
//! use rust_decimal::Decimal;
//!
//! let members = vec![Member::new("ana", "Ana"), Member::new("bo", "Bo")];
//! let groceries = Expense::new(
//!     "e1",
//!     Decimal::from(80),
//!     vec![Payer::new("ana", Decimal::from(80))],
//!     vec![MemberId::new("ana"), MemberId::new("bo")],
//!     SplitStrategy::Equal,
//!     Utc::now(),
//! );
//!
//! let balances = BalanceLedger::default().aggregate(&[groceries], &members).unwrap();
//! let payments = SettlementOptimizer::default().optimize(&balances).unwrap();
//!
//! // Bo owes Ana half of 80
//! assert_eq!(payments.len(), 1);
//! assert_eq!(payments[0].from, MemberId::new("bo"));
//! assert_eq!(payments[0].amount, Decimal::from(40));
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod draft;
pub mod error;
pub mod ledger;
pub mod precision;
pub mod settlement;
pub mod split;
pub mod strategy;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use config::{CoreConfig, RemainderPolicy};
pub use draft::{DraftEdit, ExpenseDraft};
pub use error::{ArithmeticError, CoreError, CoreResult, ValidationError};
pub use ledger::BalanceLedger;
pub use precision::Precision;
pub use settlement::{NetPositions, SettlementOptimizer, SettlementPlan};
pub use split::{SplitCalculator, SplitNotice, SplitOutcome};
pub use strategy::{MemberValues, SplitKind, SplitStrategy};
pub use types::*;

// =============================================================================
// Default-Configured Entry Points
// =============================================================================

/// Splits one expense with the default configuration.
pub fn compute(expense: &Expense, members: &[Member]) -> CoreResult<Vec<SplitShare>> {
    Ok(SplitCalculator::default().compute(expense, members)?.shares)
}

/// Aggregates an expense history with the default configuration.
pub fn aggregate(expenses: &[Expense], members: &[Member]) -> CoreResult<Vec<PairwiseBalance>> {
    BalanceLedger::default().aggregate(expenses, members)
}

/// Settles pairwise balances with the default configuration.
pub fn optimize(balances: &[PairwiseBalance]) -> CoreResult<Vec<SettlementSuggestion>> {
    SettlementOptimizer::default().optimize(balances)
}
