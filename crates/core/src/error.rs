//! Error taxonomy for the geometry → tracking → solver pipeline
//!
//! Three fatal families, each carrying the identifier of the offending entity:
//!
//! - [`ConfigurationError`]: malformed geometry, materials or options. Raised at the
//!   offending construction call or at [`crate::geometry::Geometry::finalize`].
//! - [`TracingError`]: a ray cannot be segmented (gap in the geometry). Raised by
//!   [`crate::tracking::TrackGenerator::generate`].
//! - [`NumericError`]: bad cross-section denominators or NaN flux. Aborts the current
//!   solve only; geometry and tracks stay reusable.
//!
//! Running out of iterations is not an error: the solver returns its best estimate
//! with `converged == false`.

use crate::core_types::ids::{CellId, FsrId, LatticeId, MaterialId, SurfaceId, TrackId, UniverseId};
use std::fmt;

/// Result alias used throughout the crate
pub type Result<T, E = MocError> = std::result::Result<T, E>;

/// Malformed geometry, material data or options
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigurationError {
    /// A cell references a surface that was never added
    UnknownSurface { cell: Option<CellId>, surface: SurfaceId },
    /// A fill references a material that was never added
    UnknownMaterial { cell: CellId, material: MaterialId },
    /// A fill, lattice entry or root references an unregistered universe
    UnknownUniverse { universe: UniverseId },
    /// A fill references an unregistered lattice
    UnknownLattice { lattice: LatticeId },
    /// A universe lists a cell that was never added
    UnknownCell { cell: CellId },
    /// A cell has no fill at finalize time
    UnfilledCell { cell: CellId },
    /// A universe transitively fills itself
    CyclicFill { universe: UniverseId },
    /// `finalize` was called without a root universe
    NoRootUniverse,
    /// The root universe is not closed by planes on every side
    UnboundedRoot { universe: UniverseId },
    /// A periodic side has no periodic counterpart on the opposite side
    UnpairedPeriodic { surface: SurfaceId },
    /// An operation needed a finalized geometry
    NotFinalized,
    /// Surface coefficients do not describe a curve
    InvalidSurface { surface: Option<SurfaceId>, reason: String },
    /// Lattice shape or widths are invalid
    InvalidLattice { lattice: Option<LatticeId>, reason: String },
    /// Ring/sector subdivision cannot be applied to the cell
    InvalidSubdivision { cell: CellId, reason: String },
    /// Cross-section arrays are inconsistent
    InvalidMaterial { name: String, reason: String },
    /// Materials in one geometry disagree on the number of energy groups
    GroupMismatch { material: MaterialId, expected: usize, found: usize },
    /// Track generator or solver option out of range
    InvalidOption { name: &'static str, reason: String },
    /// Material library or options file could not be read or parsed
    Load { source: String, reason: String },
}

impl fmt::Display for ConfigurationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownSurface {
                cell: Some(cell),
                surface,
            } => write!(f, "{cell} references unknown {surface}"),
            Self::UnknownSurface {
                cell: None,
                surface,
            } => write!(f, "unknown {surface}"),
            Self::UnknownMaterial { cell, material } => {
                write!(f, "{cell} is filled with unknown {material}")
            }
            Self::UnknownUniverse { universe } => write!(f, "{universe} is not registered"),
            Self::UnknownLattice { lattice } => write!(f, "{lattice} is not registered"),
            Self::UnknownCell { cell } => write!(f, "{cell} is not registered"),
            Self::UnfilledCell { cell } => write!(f, "{cell} has no fill"),
            Self::CyclicFill { universe } => write!(f, "{universe} transitively fills itself"),
            Self::NoRootUniverse => write!(f, "no root universe was set"),
            Self::UnboundedRoot { universe } => {
                write!(f, "root {universe} is not bounded by planes on all four sides")
            }
            Self::UnpairedPeriodic { surface } => write!(
                f,
                "periodic {surface} has no periodic surface on the opposite side"
            ),
            Self::NotFinalized => write!(f, "geometry has not been finalized"),
            Self::InvalidSurface {
                surface: Some(surface),
                reason,
            } => write!(f, "{surface} is invalid: {reason}"),
            Self::InvalidSurface {
                surface: None,
                reason,
            } => write!(f, "invalid surface: {reason}"),
            Self::InvalidLattice {
                lattice: Some(lattice),
                reason,
            } => write!(f, "{lattice} is invalid: {reason}"),
            Self::InvalidLattice {
                lattice: None,
                reason,
            } => write!(f, "invalid lattice: {reason}"),
            Self::InvalidSubdivision { cell, reason } => {
                write!(f, "{cell} cannot be subdivided: {reason}")
            }
            Self::InvalidMaterial { name, reason } => {
                write!(f, "material '{name}' is invalid: {reason}")
            }
            Self::GroupMismatch {
                material,
                expected,
                found,
            } => write!(
                f,
                "{material} has {found} energy groups, expected {expected}"
            ),
            Self::InvalidOption { name, reason } => write!(f, "option '{name}': {reason}"),
            Self::Load { source, reason } => write!(f, "cannot load {source}: {reason}"),
        }
    }
}

/// Failure while ray tracing the geometry
#[derive(Debug, Clone, PartialEq)]
pub enum TracingError {
    /// A point on the track lies inside the bounding box but in no cell
    Gap { track: TrackId, x: f64, y: f64 },
    /// The bounding box has zero or non-finite extent
    EmptyDomain { width: f64, height: f64 },
}

impl fmt::Display for TracingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Gap { track, x, y } => write!(
                f,
                "{track} crosses ({x:.6}, {y:.6}) which lies in no cell"
            ),
            Self::EmptyDomain { width, height } => {
                write!(f, "bounding box {width} x {height} cannot be tracked")
            }
        }
    }
}

/// Numerical breakdown during a solve
#[derive(Debug, Clone, PartialEq)]
pub enum NumericError {
    /// Total cross section too small to divide by
    NonPositiveTotal {
        material: MaterialId,
        group: usize,
        value: f64,
    },
    /// Scalar flux became NaN or infinite
    NonFiniteFlux {
        fsr: FsrId,
        group: usize,
        iteration: usize,
    },
    /// The total fission source vanished, k cannot be updated
    ZeroFissionSource { iteration: usize },
}

impl fmt::Display for NumericError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NonPositiveTotal {
                material,
                group,
                value,
            } => write!(
                f,
                "{material} has total cross section {value:e} in group {group}"
            ),
            Self::NonFiniteFlux {
                fsr,
                group,
                iteration,
            } => write!(
                f,
                "scalar flux in {fsr}, group {group} is not finite at iteration {iteration}"
            ),
            Self::ZeroFissionSource { iteration } => {
                write!(f, "total fission source is zero at iteration {iteration}")
            }
        }
    }
}

/// Any fatal pipeline error
#[derive(Debug, Clone, PartialEq)]
pub enum MocError {
    Configuration(ConfigurationError),
    Tracing(TracingError),
    Numeric(NumericError),
}

impl fmt::Display for MocError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Configuration(e) => write!(f, "configuration error: {e}"),
            Self::Tracing(e) => write!(f, "tracing error: {e}"),
            Self::Numeric(e) => write!(f, "numeric error: {e}"),
        }
    }
}

impl std::error::Error for ConfigurationError {}
impl std::error::Error for TracingError {}
impl std::error::Error for NumericError {}

impl std::error::Error for MocError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Configuration(e) => Some(e),
            Self::Tracing(e) => Some(e),
            Self::Numeric(e) => Some(e),
        }
    }
}

impl From<ConfigurationError> for MocError {
    fn from(e: ConfigurationError) -> Self {
        Self::Configuration(e)
    }
}

impl From<TracingError> for MocError {
    fn from(e: TracingError) -> Self {
        Self::Tracing(e)
    }
}

impl From<NumericError> for MocError {
    fn from(e: NumericError) -> Self {
        Self::Numeric(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_the_entity() {
        let err: MocError = ConfigurationError::UnfilledCell {
            cell: CellId::new(4),
        }
        .into();
        assert_eq!(err.to_string(), "configuration error: cell 4 has no fill");

        let err: MocError = TracingError::Gap {
            track: TrackId::new(9),
            x: 1.0,
            y: -0.5,
        }
        .into();
        assert!(err.to_string().contains("track 9"));
    }

    #[test]
    fn test_source_exposes_family() {
        use std::error::Error;
        let err = MocError::from(NumericError::ZeroFissionSource { iteration: 3 });
        assert!(err.source().is_some());
        assert!(matches!(err, MocError::Numeric(_)));
    }
}
