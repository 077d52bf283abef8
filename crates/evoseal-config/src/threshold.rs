// crates/evoseal-config/src/threshold.rs
// ============================================================================
// Module: Threshold Pair
// Description: Per-metric and per-resource warn/critical threshold pairs.
// Purpose: Let `metric_thresholds` and `resource_thresholds` be validated at
//          load time rather than re-checked on every detector invocation.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! A [`ThresholdPair`] always carries the direction its two values are
//! ordered in, because the ordering constraint itself depends on whether the
//! underlying metric is "lower is better" or "higher is better": a
//! lower-better metric (e.g. latency) is ordered `warn <= critical`, while a
//! higher-better metric (e.g. accuracy) is ordered `warn >= critical`.
//! Resource dimensions (cpu, memory, disk, net) are always lower-better.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::error::ConfigError;

// ============================================================================
// SECTION: Direction
// ============================================================================

/// Which direction of change past a threshold pair counts as adverse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThresholdDirection {
    /// Crossing upward is adverse; `warn <= critical`.
    LowerBetter,
    /// Crossing downward is adverse; `warn >= critical`.
    HigherBetter,
}

// ============================================================================
// SECTION: Threshold Pair
// ============================================================================

/// A validated `{warn, critical}` threshold pair for one metric or resource
/// dimension.
///
/// # Invariants
/// - `warn` and `critical` are finite.
/// - Ordered consistently with `direction`, enforced by [`Self::validate`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ThresholdPair {
    /// Value at which a warning-level finding is raised.
    pub warn: f64,
    /// Value at which a critical-level finding is raised.
    pub critical: f64,
    /// Which direction of crossing is adverse.
    #[serde(default = "default_direction")]
    pub direction: ThresholdDirection,
}

/// Default direction for thresholds that omit it: resource dimensions and
/// most metrics (latency, error rate, resource usage) are lower-better.
const fn default_direction() -> ThresholdDirection {
    ThresholdDirection::LowerBetter
}

impl ThresholdPair {
    /// Validates that `warn` and `critical` are finite and consistently
    /// ordered for `direction`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when a value is non-finite or the
    /// pair is ordered against its direction.
    pub fn validate(&self, field: &str) -> Result<(), ConfigError> {
        if !self.warn.is_finite() || !self.critical.is_finite() {
            return Err(ConfigError::Invalid(format!("{field} thresholds must be finite")));
        }
        let ordered = match self.direction {
            ThresholdDirection::LowerBetter => self.warn <= self.critical,
            ThresholdDirection::HigherBetter => self.warn >= self.critical,
        };
        if !ordered {
            return Err(ConfigError::Invalid(format!(
                "{field} warn/critical ordering does not match direction {:?}",
                self.direction
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    //! Test-only lint relaxations for panic-based assertions and debug output.
    #![allow(
        clippy::panic,
        clippy::print_stdout,
        clippy::print_stderr,
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::use_debug,
        clippy::dbg_macro,
        clippy::panic_in_result_fn,
        clippy::unwrap_in_result,
        reason = "Test-only output and panic-based assertions are permitted."
    )]
    use super::*;

    #[test]
    fn lower_better_requires_warn_at_most_critical() {
        let pair = ThresholdPair { warn: 0.1, critical: 0.2, direction: ThresholdDirection::LowerBetter };
        assert!(pair.validate("latency").is_ok());
        let inverted = ThresholdPair { warn: 0.3, critical: 0.2, direction: ThresholdDirection::LowerBetter };
        assert!(inverted.validate("latency").is_err());
    }

    #[test]
    fn higher_better_requires_warn_at_least_critical() {
        let pair = ThresholdPair { warn: 0.8, critical: 0.6, direction: ThresholdDirection::HigherBetter };
        assert!(pair.validate("accuracy").is_ok());
        let inverted = ThresholdPair { warn: 0.5, critical: 0.6, direction: ThresholdDirection::HigherBetter };
        assert!(inverted.validate("accuracy").is_err());
    }

    #[test]
    fn non_finite_values_are_rejected() {
        let pair = ThresholdPair { warn: f64::NAN, critical: 1.0, direction: ThresholdDirection::LowerBetter };
        assert!(pair.validate("x").is_err());
    }
}
