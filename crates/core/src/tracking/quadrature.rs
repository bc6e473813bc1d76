//! Azimuthal and polar angular quadratures
//!
//! Azimuthal angles are corrected so that every track of an angle starts and ends
//! at evenly spaced points of the bounding box. This makes the track layout cyclic:
//! a track leaving one side always meets the start or end of another track at the
//! complementary (reflective) or same (periodic) angle.

use crate::error::ConfigurationError;
use serde::{Deserialize, Serialize};
use std::f64::consts::{PI, TAU};

/// Tabuchi–Yamamoto polar quadrature over one polar half-space
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolarQuadrature {
    TabuchiYamamoto1,
    TabuchiYamamoto2,
    #[default]
    TabuchiYamamoto3,
}

impl PolarQuadrature {
    /// Quadrature with `num_polar` angles (1, 2 or 3)
    pub fn tabuchi_yamamoto(num_polar: usize) -> Result<Self, ConfigurationError> {
        match num_polar {
            1 => Ok(Self::TabuchiYamamoto1),
            2 => Ok(Self::TabuchiYamamoto2),
            3 => Ok(Self::TabuchiYamamoto3),
            n => Err(ConfigurationError::InvalidOption {
                name: "num_polar",
                reason: format!("Tabuchi-Yamamoto quadrature has 1, 2 or 3 angles, not {n}"),
            }),
        }
    }

    pub fn num_polar(self) -> usize {
        self.sin_thetas().len()
    }

    /// Sines of the polar angles
    pub fn sin_thetas(self) -> &'static [f64] {
        match self {
            Self::TabuchiYamamoto1 => &[0.798184],
            Self::TabuchiYamamoto2 => &[0.363900, 0.899900],
            Self::TabuchiYamamoto3 => &[0.166648, 0.537707, 0.932954],
        }
    }

    /// Polar weights, summing to one
    pub fn weights(self) -> &'static [f64] {
        match self {
            Self::TabuchiYamamoto1 => &[1.0],
            Self::TabuchiYamamoto2 => &[0.212854, 0.787146],
            Self::TabuchiYamamoto3 => &[0.046233, 0.283619, 0.670148],
        }
    }
}

/// One corrected azimuthal angle in `[0, π)`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AzimuthalAngle {
    /// Corrected angle in radians
    pub phi: f64,
    /// Fraction of the full circle represented by this angle
    pub weight: f64,
    /// Effective perpendicular distance between neighboring tracks
    pub spacing: f64,
    /// Tracks starting on the bottom side
    pub num_x: usize,
    /// Tracks starting on the left (φ < π/2) or right (φ > π/2) side
    pub num_y: usize,
}

impl AzimuthalAngle {
    pub fn num_tracks(&self) -> usize {
        self.num_x + self.num_y
    }

    /// Distance between track end points along the x axis
    pub fn dx(&self, width: f64) -> f64 {
        width / self.num_x as f64
    }

    /// Distance between track end points along the y axis
    pub fn dy(&self, height: f64) -> f64 {
        height / self.num_y as f64
    }
}

/// Corrected azimuthal angles over `[0, π)`
///
/// Each track is swept in both directions, so these angles cover the full circle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AzimuthalQuadrature {
    angles: Vec<AzimuthalAngle>,
}

impl AzimuthalQuadrature {
    /// Build the corrected quadrature for a `width × height` box
    ///
    /// # Arguments
    ///
    /// * `num_azim` - Number of angles over the full circle, a positive multiple of 4
    /// * `spacing` - Requested perpendicular track spacing
    /// * `width`, `height` - Extent of the bounding box
    pub fn new(
        num_azim: usize,
        spacing: f64,
        width: f64,
        height: f64,
    ) -> Result<Self, ConfigurationError> {
        if num_azim == 0 || num_azim % 4 != 0 {
            return Err(ConfigurationError::InvalidOption {
                name: "num_azim",
                reason: format!("{num_azim} is not a positive multiple of 4"),
            });
        }
        if !(spacing.is_finite() && spacing > 0.0) {
            return Err(ConfigurationError::InvalidOption {
                name: "track_spacing",
                reason: format!("{spacing} must be positive"),
            });
        }

        let half = num_azim / 2;
        let mut angles = vec![
            AzimuthalAngle {
                phi: 0.0,
                weight: 0.0,
                spacing: 0.0,
                num_x: 0,
                num_y: 0,
            };
            half
        ];

        for i in 0..num_azim / 4 {
            let phi = TAU / num_azim as f64 * (i as f64 + 0.5);
            let num_x = (width / spacing * phi.sin().abs()).floor() as usize + 1;
            let num_y = (height / spacing * phi.cos().abs()).floor() as usize + 1;
            let phi_eff = (height * num_x as f64 / (width * num_y as f64)).atan();
            let effective = width / num_x as f64 * phi_eff.sin();

            angles[i] = AzimuthalAngle {
                phi: phi_eff,
                weight: 0.0,
                spacing: effective,
                num_x,
                num_y,
            };
            angles[half - 1 - i] = AzimuthalAngle {
                phi: PI - phi_eff,
                ..angles[i]
            };
        }

        // Width of each angle's arc between midpoints to its neighbors
        for i in 0..half {
            let above = if i + 1 < half {
                0.5 * (angles[i + 1].phi - angles[i].phi)
            } else {
                PI - angles[i].phi
            };
            let below = if i > 0 {
                0.5 * (angles[i].phi - angles[i - 1].phi)
            } else {
                angles[i].phi
            };
            angles[i].weight = (above + below) / TAU;
        }

        Ok(Self { angles })
    }

    pub fn angles(&self) -> &[AzimuthalAngle] {
        &self.angles
    }

    pub fn num_angles(&self) -> usize {
        self.angles.len()
    }

    /// Index of the angle mirrored about π/2
    #[inline]
    pub fn complement(&self, angle: usize) -> usize {
        self.angles.len() - 1 - angle
    }

    pub fn total_tracks(&self) -> usize {
        self.angles.iter().map(AzimuthalAngle::num_tracks).sum()
    }
}
