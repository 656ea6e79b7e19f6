//! # Precision Module
//!
//! Fixed-precision decimal arithmetic for every monetary value in the core.
//!
//! ## Why Decimals?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  In binary floating point:                                              │
//! │    0.1 + 0.2 = 0.30000000000000004  ❌ WRONG!                           │
//! │                                                                         │
//! │  Splitting with an early divide:                                        │
//! │    (500 / 3) rounded → 166.67, × 3 = 500.01  → one cent invented        │
//! │                                                                         │
//! │  OUR SOLUTION: rust_decimal at full precision                           │
//! │    500 × 1 / 3 = 166.66666666666666666666666667 (28 digits)             │
//! │    multiply BEFORE divide, round ONLY when externalizing                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Rounding Points
//! - [`Precision::externalize`]: significant-digit rounding, half-up, for
//!   percentages (never for money)
//! - [`Precision::truncate_to_minor`]: toward-zero quantization of shares
//!   before remainder correction
//! - [`Precision::round_to_minor`]: half-up quantization of pairwise balances
//!   and settlement payments
//!
//! Intermediate values are never rounded.

use rust_decimal::{Decimal, RoundingStrategy};

use crate::error::ArithmeticError;

/// Result type for precision operations.
pub type ArithmeticResult<T> = Result<T, ArithmeticError>;

/// Significant digits kept when a value leaves the core.
pub const DEFAULT_SIGNIFICANT_DIGITS: u32 = 10;

/// Decimal places of the smallest currency unit (cents).
pub const DEFAULT_MINOR_UNITS: u32 = 2;

// =============================================================================
// Checked Operations
// =============================================================================

/// Adds two values at full precision.
#[inline]
pub fn add(a: Decimal, b: Decimal) -> ArithmeticResult<Decimal> {
    a.checked_add(b)
        .ok_or(ArithmeticError::Overflow { operation: "add" })
}

/// Subtracts `b` from `a` at full precision.
#[inline]
pub fn subtract(a: Decimal, b: Decimal) -> ArithmeticResult<Decimal> {
    a.checked_sub(b)
        .ok_or(ArithmeticError::Overflow { operation: "subtract" })
}

/// Multiplies two values at full precision.
#[inline]
pub fn multiply(a: Decimal, b: Decimal) -> ArithmeticResult<Decimal> {
    a.checked_mul(b)
        .ok_or(ArithmeticError::Overflow { operation: "multiply" })
}

/// Divides `a` by `b`, failing fast on a zero divisor.
///
/// `context` names the computation for the error message.
///
/// ## Example
/// ```rust
/// use divvy_core::precision::divide;
/// use rust_decimal::Decimal;
///
/// assert!(divide(Decimal::ONE, Decimal::ZERO, "equal split").is_err());
/// assert_eq!(divide(Decimal::TEN, Decimal::TWO, "half").unwrap(), Decimal::from(5));
/// ```
pub fn divide(a: Decimal, b: Decimal, context: &'static str) -> ArithmeticResult<Decimal> {
    if b.is_zero() {
        return Err(ArithmeticError::DivisionByZero { context });
    }
    a.checked_div(b)
        .ok_or(ArithmeticError::Overflow { operation: "divide" })
}

/// Computes `total × part / whole`, multiplying before dividing.
///
/// This is the single formula behind every proportional strategy.
pub fn proportion(
    total: Decimal,
    part: Decimal,
    whole: Decimal,
    context: &'static str,
) -> ArithmeticResult<Decimal> {
    divide(multiply(total, part)?, whole, context)
}

/// Sums values at full precision.
pub fn sum<I>(values: I) -> ArithmeticResult<Decimal>
where
    I: IntoIterator<Item = Decimal>,
{
    values.into_iter().try_fold(Decimal::ZERO, add)
}

/// Rounds to `dp` decimal places, half away from zero.
#[inline]
pub fn round_half_up(value: Decimal, dp: u32) -> Decimal {
    value.round_dp_with_strategy(dp, RoundingStrategy::MidpointAwayFromZero)
}

/// True when `|a − b| <= tolerance`.
#[inline]
pub fn within_tolerance(a: Decimal, b: Decimal, tolerance: Decimal) -> bool {
    match a.checked_sub(b) {
        Some(diff) => diff.abs() <= tolerance,
        None => false,
    }
}

// =============================================================================
// Precision Settings
// =============================================================================

/// Externalization and quantization settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Precision {
    significant_digits: u32,
    minor_units: u32,
}

impl Precision {
    pub const fn new(significant_digits: u32, minor_units: u32) -> Self {
        Precision {
            significant_digits,
            minor_units,
        }
    }

    #[inline]
    pub const fn significant_digits(&self) -> u32 {
        self.significant_digits
    }

    #[inline]
    pub const fn minor_units(&self) -> u32 {
        self.minor_units
    }

    /// The smallest currency unit, e.g. `0.01`.
    #[inline]
    pub fn minor_unit(&self) -> Decimal {
        Decimal::new(1, self.minor_units)
    }

    /// Rounds to the configured significant digits (half-up) and strips
    /// trailing zeros.
    ///
    /// ## Example
    /// ```rust
    /// use divvy_core::precision::Precision;
    /// use rust_decimal::Decimal;
    ///
    /// let precision = Precision::default();
    /// let third = Decimal::ONE_HUNDRED / Decimal::from(3);
    /// assert_eq!(precision.externalize(third).to_string(), "33.33333333");
    /// ```
    pub fn externalize(&self, value: Decimal) -> Decimal {
        value
            .round_sf_with_strategy(
                self.significant_digits,
                RoundingStrategy::MidpointAwayFromZero,
            )
            .unwrap_or(value)
            .normalize()
    }

    /// Truncates toward zero to the minor unit.
    #[inline]
    pub fn truncate_to_minor(&self, value: Decimal) -> Decimal {
        value.round_dp_with_strategy(self.minor_units, RoundingStrategy::ToZero)
    }

    /// Rounds half-up to the minor unit.
    #[inline]
    pub fn round_to_minor(&self, value: Decimal) -> Decimal {
        round_half_up(value, self.minor_units)
    }
}

impl Default for Precision {
    fn default() -> Self {
        Precision::new(DEFAULT_SIGNIFICANT_DIGITS, DEFAULT_MINOR_UNITS)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_division_by_zero_fails_fast() {
        let err = divide(dec!(100), Decimal::ZERO, "equal split").unwrap_err();
        assert_eq!(
            err,
            ArithmeticError::DivisionByZero {
                context: "equal split"
            }
        );
    }

    #[test]
    fn test_overflow_is_reported() {
        assert_eq!(
            add(Decimal::MAX, Decimal::ONE),
            Err(ArithmeticError::Overflow { operation: "add" })
        );
        assert_eq!(
            multiply(Decimal::MAX, dec!(2)),
            Err(ArithmeticError::Overflow {
                operation: "multiply"
            })
        );
    }

    #[test]
    fn test_proportion_multiplies_before_dividing() {
        // 500 / 3 × 3 must come back to exactly 500
        let third = proportion(dec!(500), Decimal::ONE, dec!(3), "test").unwrap();
        let total = sum([third, third, third]).unwrap();
        assert_eq!(round_half_up(total, 10), dec!(500));

        let weighted = proportion(dec!(1500), dec!(2.0), dec!(4.3), "test").unwrap();
        assert_eq!(round_half_up(weighted, 4), dec!(697.6744));
    }

    #[test]
    fn test_round_half_up() {
        assert_eq!(round_half_up(dec!(0.125), 2), dec!(0.13));
        assert_eq!(round_half_up(dec!(-0.125), 2), dec!(-0.13));
        assert_eq!(round_half_up(dec!(0.124), 2), dec!(0.12));
    }

    #[test]
    fn test_externalize_significant_digits() {
        let precision = Precision::default();
        assert_eq!(precision.externalize(dec!(166.666666666666)), dec!(166.6666667));
        assert_eq!(precision.externalize(dec!(0.12345678905)), dec!(0.1234567891));
        assert_eq!(precision.externalize(dec!(166.67)), dec!(166.67));
        assert_eq!(precision.externalize(Decimal::ZERO), Decimal::ZERO);
    }

    #[test]
    fn test_minor_unit_quantization() {
        let precision = Precision::default();
        assert_eq!(precision.minor_unit(), dec!(0.01));
        assert_eq!(precision.truncate_to_minor(dec!(166.6666)), dec!(166.66));
        assert_eq!(precision.truncate_to_minor(dec!(-1.239)), dec!(-1.23));
        assert_eq!(precision.round_to_minor(dec!(166.665)), dec!(166.67));

        let yen = Precision::new(10, 0);
        assert_eq!(yen.minor_unit(), dec!(1));
        assert_eq!(yen.truncate_to_minor(dec!(333.9)), dec!(333));
    }

    #[test]
    fn test_within_tolerance() {
        assert!(within_tolerance(dec!(99.99), dec!(100), dec!(0.01)));
        assert!(!within_tolerance(dec!(99.5), dec!(100), dec!(0.01)));
    }
}
