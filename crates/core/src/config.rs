//! Run configuration
//!
//! [`RunOptions`] carries every knob of a full geometry → tracks → eigenvalue run
//! and splits into [`TrackOptions`] for the track generator and [`SolverOptions`]
//! for the transport solver. All three have defaults and (de)serialize with serde,
//! so a run can be described by a small JSON file:
//!
//! ```json
//! { "num_threads": 4, "track_spacing": 0.05, "num_azim": 16 }
//! ```
//!
//! Missing keys take their default values.

use crate::error::ConfigurationError;
use crate::solver::exponential::ExpEvaluator;
use crate::tracking::quadrature::PolarQuadrature;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Options of the track generator
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackOptions {
    /// Azimuthal angles over the full circle, a positive multiple of 4
    pub num_azim: usize,
    /// Requested perpendicular distance between tracks
    pub spacing: f64,
    pub polar: PolarQuadrature,
}

impl Default for TrackOptions {
    fn default() -> Self {
        Self {
            num_azim: 4,
            spacing: 0.1,
            polar: PolarQuadrature::default(),
        }
    }
}

impl TrackOptions {
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.num_azim == 0 || self.num_azim % 4 != 0 {
            return Err(ConfigurationError::InvalidOption {
                name: "num_azim",
                reason: format!("{} is not a positive multiple of 4", self.num_azim),
            });
        }
        if !(self.spacing.is_finite() && self.spacing > 0.0) {
            return Err(ConfigurationError::InvalidOption {
                name: "track_spacing",
                reason: format!("{} must be positive", self.spacing),
            });
        }
        Ok(())
    }
}

/// Options of the transport solver
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverOptions {
    /// Size of a dedicated thread pool; 0 uses the global rayon pool
    pub num_threads: usize,
    /// Convergence tolerance on the relative k change and the source residual
    pub tolerance: f64,
    pub max_iterations: usize,
    pub exponential: ExpEvaluator,
}

impl Default for SolverOptions {
    fn default() -> Self {
        Self {
            num_threads: 1,
            tolerance: 1e-5,
            max_iterations: 1000,
            exponential: ExpEvaluator::default(),
        }
    }
}

impl SolverOptions {
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if !(self.tolerance.is_finite() && self.tolerance > 0.0) {
            return Err(ConfigurationError::InvalidOption {
                name: "tolerance",
                reason: format!("{} must be positive", self.tolerance),
            });
        }
        if self.max_iterations == 0 {
            return Err(ConfigurationError::InvalidOption {
                name: "max_iterations",
                reason: "at least one iteration is required".to_string(),
            });
        }
        self.exponential.validate()
    }
}

/// Complete run configuration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunOptions {
    pub num_threads: usize,
    pub track_spacing: f64,
    pub num_azim: usize,
    pub tolerance: f64,
    pub max_iterations: usize,
    pub polar: PolarQuadrature,
    pub exponential: ExpEvaluator,
}

impl Default for RunOptions {
    fn default() -> Self {
        let tracks = TrackOptions::default();
        let solver = SolverOptions::default();
        Self {
            num_threads: solver.num_threads,
            track_spacing: tracks.spacing,
            num_azim: tracks.num_azim,
            tolerance: solver.tolerance,
            max_iterations: solver.max_iterations,
            polar: tracks.polar,
            exponential: solver.exponential,
        }
    }
}

impl RunOptions {
    pub fn track_options(&self) -> TrackOptions {
        TrackOptions {
            num_azim: self.num_azim,
            spacing: self.track_spacing,
            polar: self.polar,
        }
    }

    pub fn solver_options(&self) -> SolverOptions {
        SolverOptions {
            num_threads: self.num_threads,
            tolerance: self.tolerance,
            max_iterations: self.max_iterations,
            exponential: self.exponential,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigurationError> {
        self.track_options().validate()?;
        self.solver_options().validate()
    }

    /// Parse and validate options from JSON
    pub fn from_json_str(json: &str) -> Result<Self, ConfigurationError> {
        let options: Self = serde_json::from_str(json).map_err(|e| ConfigurationError::Load {
            source: "run options".to_string(),
            reason: e.to_string(),
        })?;
        options.validate()?;
        Ok(options)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigurationError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| ConfigurationError::Load {
            source: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::from_json_str(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_reference_options() {
        let options = RunOptions::default();
        assert_eq!(options.num_threads, 1);
        assert_eq!(options.track_spacing, 0.1);
        assert_eq!(options.num_azim, 4);
        assert_eq!(options.tolerance, 1e-5);
        assert_eq!(options.max_iterations, 1000);
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let options =
            RunOptions::from_json_str(r#"{"num_azim": 16, "polar": "tabuchi_yamamoto2"}"#)
                .unwrap();
        assert_eq!(options.num_azim, 16);
        assert_eq!(options.polar, PolarQuadrature::TabuchiYamamoto2);
        assert_eq!(options.track_spacing, 0.1);
        assert_eq!(options.track_options().num_azim, 16);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let err = RunOptions::from_json_str(r#"{"num_azim": 6}"#).unwrap_err();
        assert!(matches!(
            err,
            ConfigurationError::InvalidOption {
                name: "num_azim",
                ..
            }
        ));
        assert!(RunOptions::from_json_str(r#"{"tolerance": 0.0}"#).is_err());
        assert!(RunOptions::from_json_str("[1, 2]").is_err());
    }

    #[test]
    fn test_round_trip() {
        let options = RunOptions {
            num_threads: 8,
            exponential: ExpEvaluator::Table { max_error: 1e-6 },
            ..RunOptions::default()
        };
        let json = serde_json::to_string(&options).unwrap();
        assert_eq!(RunOptions::from_json_str(&json).unwrap(), options);
    }
}
