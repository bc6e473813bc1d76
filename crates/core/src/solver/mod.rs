//! k-eigenvalue transport solver module
//!
//! The core abstraction is the `TransportSolver` trait, implemented by
//! [`CpuSolver`]: power iteration with a parallel method-of-characteristics sweep
//! over a [`crate::tracking::TrackSet`].
//!
//! # Example
//!
//! ```rust,ignore
//! use moc_core::solver::{create_transport_solver, TransportSolver};
//!
//! let mut solver = create_transport_solver(&geometry, &tracks, options.solver_options())?;
//! let result = solver.compute_eigenvalue(1000, 1e-5)?;
//! println!("k = {:.5}", result.k_eff);
//! ```

mod cpu;
pub mod exponential;
mod fields;
pub mod snapshot;
mod source;
pub mod state;
mod sweep;
#[allow(clippy::module_name_repetitions)]
mod r#trait;

// Re-exports
pub use cpu::{CpuSolver, MIN_SIGMA_T};
pub use exponential::{ExpEvaluator, Exponential};
pub use fields::FluxField;
pub use r#trait::TransportSolver;
pub use snapshot::{RegionSolution, SolutionSnapshot};
pub use state::{EigenvalueResult, InitialGuess, IterationRecord, SolverState};

use crate::config::SolverOptions;
use crate::error::MocError;
use crate::geometry::Geometry;
use crate::tracking::TrackSet;
use tracing::info;

/// Create a transport solver for a tracked geometry
///
/// # Arguments
///
/// * `geometry` - Finalized geometry
/// * `tracks` - Tracks generated for `geometry`
/// * `options` - Solver options
///
/// # Returns
///
/// A boxed `TransportSolver` trait object
///
/// # Errors
///
/// Same as [`CpuSolver::new`]
pub fn create_transport_solver<'a>(
    geometry: &'a Geometry,
    tracks: &'a TrackSet,
    options: SolverOptions,
) -> Result<Box<dyn TransportSolver + 'a>, MocError> {
    info!(
        "Using CPU transport solver ({} FSRs, {} tracks)",
        geometry.num_fsrs(),
        tracks.num_tracks()
    );
    Ok(Box::new(CpuSolver::new(geometry, tracks, options)?))
}
