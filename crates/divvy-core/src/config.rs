//! # Core Configuration
//!
//! Tolerances, precision and tie-break policy for the calculators.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     DIVVY_SPLIT_TOLERANCE=0.01                                         │
//! │     DIVVY_REMAINDER_POLICY=largest_share                               │
//! │                                                                         │
//! │  2. TOML text supplied by the host (CoreConfig::from_toml_str)         │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! │     10 significant digits, cents, 0.01 tolerances, first participant  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The core never reads files; the host passes the text in.
//!
//! ## Configuration Format
//! ```toml
//! [precision]
//! significant_digits = 10
//! minor_units = 2
//!
//! [split]
//! tolerance = "0.01"
//! remainder_policy = "first_participant"
//! progressive_step = "0.2"
//!
//! [settlement]
//! tolerance = "0.01"
//! ```

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{CoreError, CoreResult};
use crate::precision::{Precision, DEFAULT_MINOR_UNITS, DEFAULT_SIGNIFICANT_DIGITS};

/// Upper bound of significant digits a `Decimal` can carry.
const MAX_SIGNIFICANT_DIGITS: u32 = 28;

/// Largest supported minor-unit scale.
const MAX_MINOR_UNITS: u32 = 10;

// =============================================================================
// Remainder Policy
// =============================================================================

/// Which participant absorbs rounding residue first.
///
/// ## Policy Comparison
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │  500.00 split 3 ways (truncated shares 166.66 ×3, residue 0.02)        │
/// │                                                                         │
/// │  FIRST_PARTICIPANT (Default)        │  LARGEST_SHARE                    │
/// │  ──────────────────────────         │  ─────────────                    │
/// │  participant order                  │  raw share descending, then       │
/// │                                     │  participant order                │
/// │  → 166.67, 166.67, 166.66           │  → same here (equal raw shares)   │
/// │                                                                         │
/// │  Weighted 1500 by [0.8, 2.0, 1.5]:                                      │
/// │  → 279.07, 697.68, 523.25           │  → 279.06, 697.68, 523.26         │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemainderPolicy {
    /// Residue goes to participants in their listed order.
    #[default]
    FirstParticipant,

    /// Residue goes to the participants with the largest raw shares.
    LargestShare,
}

impl std::fmt::Display for RemainderPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RemainderPolicy::FirstParticipant => write!(f, "first_participant"),
            RemainderPolicy::LargestShare => write!(f, "largest_share"),
        }
    }
}

impl std::str::FromStr for RemainderPolicy {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "first_participant" | "first" => Ok(RemainderPolicy::FirstParticipant),
            "largest_share" | "largest" => Ok(RemainderPolicy::LargestShare),
            other => Err(CoreError::InvalidConfig(format!(
                "Unknown remainder policy: '{}'. Valid options: first_participant, largest_share",
                other
            ))),
        }
    }
}

// =============================================================================
// Sections
// =============================================================================

/// Precision applied when values leave the core.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrecisionSettings {
    /// Significant digits for externalized values (half-up).
    #[serde(default = "default_significant_digits")]
    pub significant_digits: u32,

    /// Decimal places of the smallest currency unit.
    #[serde(default = "default_minor_units")]
    pub minor_units: u32,
}

fn default_significant_digits() -> u32 {
    DEFAULT_SIGNIFICANT_DIGITS
}

fn default_minor_units() -> u32 {
    DEFAULT_MINOR_UNITS
}

impl Default for PrecisionSettings {
    fn default() -> Self {
        PrecisionSettings {
            significant_digits: default_significant_digits(),
            minor_units: default_minor_units(),
        }
    }
}

/// Split calculator behaviour.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SplitSettings {
    /// Epsilon for percentage, amount and adjustment sums.
    #[serde(default = "default_tolerance")]
    pub tolerance: Decimal,

    /// Tie-break for remainder correction.
    #[serde(default)]
    pub remainder_policy: RemainderPolicy,

    /// Multiplier increment per income rank (income-progressive).
    #[serde(default = "default_progressive_step")]
    pub progressive_step: Decimal,
}

fn default_tolerance() -> Decimal {
    Decimal::new(1, 2)
}

fn default_progressive_step() -> Decimal {
    Decimal::new(2, 1)
}

impl Default for SplitSettings {
    fn default() -> Self {
        SplitSettings {
            tolerance: default_tolerance(),
            remainder_policy: RemainderPolicy::default(),
            progressive_step: default_progressive_step(),
        }
    }
}

/// Settlement optimizer behaviour.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettlementSettings {
    /// Net positions within this distance of zero count as settled.
    #[serde(default = "default_tolerance")]
    pub tolerance: Decimal,
}

impl Default for SettlementSettings {
    fn default() -> Self {
        SettlementSettings {
            tolerance: default_tolerance(),
        }
    }
}

// =============================================================================
// Core Config
// =============================================================================

/// Complete configuration for divvy-core.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CoreConfig {
    #[serde(default)]
    pub precision: PrecisionSettings,

    #[serde(default)]
    pub split: SplitSettings,

    #[serde(default)]
    pub settlement: SettlementSettings,
}

impl CoreConfig {
    /// Parses and validates configuration text.
    pub fn from_toml_str(text: &str) -> CoreResult<Self> {
        let config: CoreConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Renders this configuration as TOML.
    pub fn to_toml_string(&self) -> CoreResult<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Applies `DIVVY_*` environment overrides, then validates.
    pub fn with_env_overrides(mut self) -> CoreResult<Self> {
        self.apply_overrides(|key| std::env::var(key).ok());
        self.validate()?;
        Ok(self)
    }

    /// Applies overrides from an arbitrary key lookup.
    ///
    /// Unparseable values are skipped with a warning.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup("DIVVY_SIGNIFICANT_DIGITS") {
            match value.parse::<u32>() {
                Ok(digits) => {
                    debug!(digits, "Overriding significant digits from environment");
                    self.precision.significant_digits = digits;
                }
                Err(_) => warn!(value = %value, "Ignoring invalid DIVVY_SIGNIFICANT_DIGITS"),
            }
        }

        if let Some(value) = lookup("DIVVY_MINOR_UNITS") {
            match value.parse::<u32>() {
                Ok(units) => self.precision.minor_units = units,
                Err(_) => warn!(value = %value, "Ignoring invalid DIVVY_MINOR_UNITS"),
            }
        }

        if let Some(value) = lookup("DIVVY_SPLIT_TOLERANCE") {
            match value.parse::<Decimal>() {
                Ok(tolerance) => {
                    debug!(%tolerance, "Overriding split tolerance from environment");
                    self.split.tolerance = tolerance;
                }
                Err(_) => warn!(value = %value, "Ignoring invalid DIVVY_SPLIT_TOLERANCE"),
            }
        }

        if let Some(value) = lookup("DIVVY_REMAINDER_POLICY") {
            match value.parse::<RemainderPolicy>() {
                Ok(policy) => {
                    debug!(%policy, "Overriding remainder policy from environment");
                    self.split.remainder_policy = policy;
                }
                Err(e) => warn!(error = %e, "Ignoring DIVVY_REMAINDER_POLICY"),
            }
        }

        if let Some(value) = lookup("DIVVY_PROGRESSIVE_STEP") {
            match value.parse::<Decimal>() {
                Ok(step) => self.split.progressive_step = step,
                Err(_) => warn!(value = %value, "Ignoring invalid DIVVY_PROGRESSIVE_STEP"),
            }
        }

        if let Some(value) = lookup("DIVVY_SETTLEMENT_TOLERANCE") {
            match value.parse::<Decimal>() {
                Ok(tolerance) => self.settlement.tolerance = tolerance,
                Err(_) => warn!(value = %value, "Ignoring invalid DIVVY_SETTLEMENT_TOLERANCE"),
            }
        }
    }

    /// Validates the configuration.
    pub fn validate(&self) -> CoreResult<()> {
        let digits = self.precision.significant_digits;
        if digits == 0 || digits > MAX_SIGNIFICANT_DIGITS {
            return Err(CoreError::InvalidConfig(format!(
                "significant_digits must be between 1 and {}, got {}",
                MAX_SIGNIFICANT_DIGITS, digits
            )));
        }

        if self.precision.minor_units > MAX_MINOR_UNITS {
            return Err(CoreError::InvalidConfig(format!(
                "minor_units must be at most {}, got {}",
                MAX_MINOR_UNITS, self.precision.minor_units
            )));
        }

        if self.split.tolerance.is_sign_negative() || self.split.tolerance.is_zero() {
            return Err(CoreError::InvalidConfig(
                "split.tolerance must be greater than 0".into(),
            ));
        }

        if self.settlement.tolerance.is_sign_negative() || self.settlement.tolerance.is_zero() {
            return Err(CoreError::InvalidConfig(
                "settlement.tolerance must be greater than 0".into(),
            ));
        }

        if self.split.progressive_step.is_sign_negative() {
            return Err(CoreError::InvalidConfig(
                "split.progressive_step must not be negative".into(),
            ));
        }

        Ok(())
    }

    // =========================================================================
    // Convenience Methods
    // =========================================================================

    /// Precision derived from the `[precision]` section.
    pub fn precision(&self) -> Precision {
        Precision::new(
            self.precision.significant_digits,
            self.precision.minor_units,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::collections::HashMap;

    #[test]
    fn test_remainder_policy_parsing() {
        assert_eq!(
            "first_participant".parse::<RemainderPolicy>().unwrap(),
            RemainderPolicy::FirstParticipant
        );
        assert_eq!(
            "largest-share".parse::<RemainderPolicy>().unwrap(),
            RemainderPolicy::LargestShare
        );
        assert!("random".parse::<RemainderPolicy>().is_err());
    }

    #[test]
    fn test_default_config() {
        let config = CoreConfig::default();
        assert_eq!(config.precision.significant_digits, 10);
        assert_eq!(config.precision.minor_units, 2);
        assert_eq!(config.split.tolerance, dec!(0.01));
        assert_eq!(config.split.progressive_step, dec!(0.2));
        assert_eq!(config.split.remainder_policy, RemainderPolicy::FirstParticipant);
        assert_eq!(config.settlement.tolerance, dec!(0.01));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = CoreConfig::from_toml_str(
            r#"
            [split]
            remainder_policy = "largest_share"
            tolerance = "0.05"
            "#,
        )
        .unwrap();

        assert_eq!(config.split.remainder_policy, RemainderPolicy::LargestShare);
        assert_eq!(config.split.tolerance, dec!(0.05));
        assert_eq!(config.split.progressive_step, dec!(0.2));
        assert_eq!(config.precision.minor_units, 2);
    }

    #[test]
    fn test_config_validation() {
        let mut config = CoreConfig::default();
        config.precision.significant_digits = 0;
        assert!(config.validate().is_err());

        config = CoreConfig::default();
        config.split.tolerance = Decimal::ZERO;
        assert!(config.validate().is_err());

        config = CoreConfig::default();
        config.split.progressive_step = dec!(-0.1);
        assert!(config.validate().is_err());

        assert!(CoreConfig::from_toml_str("[precision]\nminor_units = 11\n").is_err());
    }

    #[test]
    fn test_overrides_from_lookup() {
        let env: HashMap<&str, &str> = [
            ("DIVVY_REMAINDER_POLICY", "largest"),
            ("DIVVY_SETTLEMENT_TOLERANCE", "0.5"),
            ("DIVVY_MINOR_UNITS", "not-a-number"),
        ]
        .into_iter()
        .collect();

        let mut config = CoreConfig::default();
        config.apply_overrides(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.split.remainder_policy, RemainderPolicy::LargestShare);
        assert_eq!(config.settlement.tolerance, dec!(0.5));
        assert_eq!(config.precision.minor_units, 2);
    }

    #[test]
    fn test_toml_serialization() {
        let toml_str = CoreConfig::default().to_toml_string().unwrap();
        assert!(toml_str.contains("[precision]"));
        assert!(toml_str.contains("[split]"));
        assert!(toml_str.contains("[settlement]"));

        let back = CoreConfig::from_toml_str(&toml_str).unwrap();
        assert_eq!(back.split.tolerance, dec!(0.01));
    }
}
