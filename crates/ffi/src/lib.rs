//! C interface to the MOC transport engine
//!
//! A host builds a problem on an opaque [`MocInstance`] in pipeline order:
//! materials and surfaces, cells, universes and lattices, `moc_finalize`,
//! `moc_generate_tracks`, then `moc_compute_eigenvalue`. Every call returns a
//! [`MocErrorCode`]; details of the last failure on the calling thread are
//! available from `moc_get_last_error`.

pub mod error;
pub mod geometry;
mod helpers;
pub mod instance;
pub mod queries;
pub mod simulation;

pub use error::{moc_get_last_error, moc_get_last_error_code, MocErrorCode};
pub use geometry::{MocBoundaryType, MocFillKind};
pub use instance::{moc_destroy, moc_new, MocInstance};
pub use simulation::{MocEigenvalueResult, MocRunOptions};
