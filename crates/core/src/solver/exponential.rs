//! Attenuation factor `1 - exp(-τ)` along a segment
//!
//! The sweep evaluates this once per segment, polar angle and group, so it is the
//! innermost operation of the solver. [`ExpEvaluator::Intrinsic`] calls `exp_m1`
//! directly; [`ExpEvaluator::Table`] precomputes a linear interpolation table whose
//! spacing bounds the interpolation error.

use crate::error::ConfigurationError;
use serde::{Deserialize, Serialize};

/// Optical thickness beyond which the attenuation is exactly one in `f64`
pub const MAX_OPTICAL_THICKNESS: f64 = 700.0;

/// How the attenuation factor is evaluated
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpEvaluator {
    /// `-exp_m1(-τ)` on every call
    #[default]
    Intrinsic,
    /// Linear interpolation table with a bounded absolute error
    Table { max_error: f64 },
}

impl ExpEvaluator {
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        match *self {
            Self::Intrinsic => Ok(()),
            Self::Table { max_error } if max_error > 0.0 && max_error < 1.0 => Ok(()),
            Self::Table { max_error } => Err(ConfigurationError::InvalidOption {
                name: "exponential",
                reason: format!("table error bound {max_error} must lie in (0, 1)"),
            }),
        }
    }

    /// Build the evaluator used by the sweep
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::InvalidOption`] for a table error bound outside `(0, 1)`
    pub fn build(&self) -> Result<Exponential, ConfigurationError> {
        self.validate()?;
        Ok(match *self {
            Self::Intrinsic => Exponential { table: None },
            Self::Table { max_error } => Exponential {
                table: Some(ExpTable::new(max_error)),
            },
        })
    }
}

/// Interpolation table of `1 - exp(-τ)` over `[0, max_tau]`
#[derive(Debug, Clone)]
struct ExpTable {
    inverse_spacing: f64,
    max_tau: f64,
    /// Per interval: value at the left node and slope
    entries: Vec<(f64, f64)>,
}

impl ExpTable {
    fn new(max_error: f64) -> Self {
        // Linear interpolation error is at most h²/8 · max|f''| and |f''| ≤ 1
        let spacing = (8.0 * max_error).sqrt();
        // Past ln(1/ε) the factor is within ε of one
        let max_tau = (1.0 / max_error).ln().max(10.0);
        let num_intervals = (max_tau / spacing).ceil() as usize;
        let spacing = max_tau / num_intervals as f64;

        let entries = (0..num_intervals)
            .map(|i| {
                let left = -(-(i as f64) * spacing).exp_m1();
                let right = -(-((i + 1) as f64) * spacing).exp_m1();
                (left, (right - left) / spacing)
            })
            .collect();

        Self {
            inverse_spacing: 1.0 / spacing,
            max_tau,
            entries,
        }
    }

    #[inline]
    fn evaluate(&self, tau: f64) -> f64 {
        if tau >= self.max_tau {
            return -(-tau).exp_m1();
        }
        let x = tau * self.inverse_spacing;
        let i = (x as usize).min(self.entries.len() - 1);
        let (value, slope) = self.entries[i];
        value + slope * (tau - i as f64 / self.inverse_spacing)
    }
}

/// Attenuation evaluator built from an [`ExpEvaluator`]
#[derive(Debug, Clone, Default)]
pub struct Exponential {
    table: Option<ExpTable>,
}

impl Exponential {
    /// `1 - exp(-τ)` with τ clamped to `[0, MAX_OPTICAL_THICKNESS]`
    #[inline]
    pub fn attenuation(&self, tau: f64) -> f64 {
        let tau = tau.clamp(0.0, MAX_OPTICAL_THICKNESS);
        match &self.table {
            Some(table) => table.evaluate(tau),
            None => -(-tau).exp_m1(),
        }
    }

    pub fn is_tabulated(&self) -> bool {
        self.table.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_intrinsic_matches_exp() {
        let exp = Exponential::default();
        for tau in [1e-12_f64, 1e-6, 0.1, 1.0, 5.0, 40.0] {
            assert_abs_diff_eq!(exp.attenuation(tau), 1.0 - (-tau).exp(), epsilon = 1e-15);
        }
        // Tiny τ keeps full relative precision
        assert!((exp.attenuation(1e-12) - 1e-12).abs() < 1e-24);
    }

    #[test]
    fn test_clamping() {
        let exp = Exponential::default();
        assert_eq!(exp.attenuation(-3.0), 0.0);
        assert_eq!(exp.attenuation(1e6), 1.0);
        assert!(exp.attenuation(f64::INFINITY) <= 1.0);
    }

    #[test]
    fn test_table_respects_error_bound() {
        for max_error in [1e-4, 1e-6] {
            let exp = ExpEvaluator::Table { max_error }.build().unwrap();
            assert!(exp.is_tabulated());
            let mut tau = 0.0_f64;
            while tau < 25.0 {
                let exact = -(-tau).exp_m1();
                assert!(
                    (exp.attenuation(tau) - exact).abs() <= max_error,
                    "error too large at τ = {tau}"
                );
                tau += 0.0137;
            }
        }
    }

    #[test]
    fn test_invalid_table_rejected() {
        assert!(ExpEvaluator::Table { max_error: 0.0 }.validate().is_err());
        assert!(ExpEvaluator::Table { max_error: 2.0 }.build().is_err());
        assert!(ExpEvaluator::Intrinsic.validate().is_ok());
    }

    #[test]
    fn test_serde_names() {
        let json = serde_json::to_string(&ExpEvaluator::Intrinsic).unwrap();
        assert_eq!(json, "\"intrinsic\"");
        let parsed: ExpEvaluator =
            serde_json::from_str(r#"{"table":{"max_error":1e-5}}"#).unwrap();
        assert_eq!(parsed, ExpEvaluator::Table { max_error: 1e-5 });
    }
}
