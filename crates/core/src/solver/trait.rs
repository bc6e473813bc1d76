//! Transport solver trait definition
//!
//! This module defines the `TransportSolver` trait, the interface between a tracked
//! geometry and anything that needs an eigenvalue or a flux distribution. The CPU
//! solver is the only backend; the trait keeps callers such as the C API and the
//! demo independent of it.

use super::snapshot::SolutionSnapshot;
use super::state::{EigenvalueResult, InitialGuess, IterationRecord, SolverState};
use crate::core_types::ids::FsrId;
use crate::error::MocError;
use crate::timer::Timer;
use std::borrow::Cow;

/// Backend-agnostic interface for k-eigenvalue transport solves
pub trait TransportSolver: Send {
    /// Run power iteration from a uniform flux guess
    ///
    /// # Arguments
    ///
    /// * `max_iterations` - Iteration cap; reaching it is not an error
    /// * `tolerance` - Bound on both the relative k change and the source residual
    ///
    /// # Errors
    ///
    /// Returns a [`crate::error::NumericError`] if the flux stops being finite or the
    /// fission source vanishes. The solver can be rerun afterwards.
    fn compute_eigenvalue(
        &mut self,
        max_iterations: usize,
        tolerance: f64,
    ) -> Result<EigenvalueResult, MocError> {
        self.compute_eigenvalue_with_guess(max_iterations, tolerance, InitialGuess::Uniform)
    }

    /// Run power iteration from the given starting point
    ///
    /// [`InitialGuess::Previous`] reuses the flux, boundary fluxes and k of the last
    /// solve and falls back to a uniform guess when there is none.
    fn compute_eigenvalue_with_guess(
        &mut self,
        max_iterations: usize,
        tolerance: f64,
        guess: InitialGuess,
    ) -> Result<EigenvalueResult, MocError>;

    fn state(&self) -> SolverState;

    /// Current multiplication factor
    fn k_eff(&self) -> f64;

    /// Scalar flux in one FSR and group, `None` when out of range
    fn scalar_flux(&self, fsr: FsrId, group: usize) -> Option<f64>;

    /// Scalar flux of every FSR, region-major (`fsr * num_groups + group`)
    ///
    /// # Returns
    ///
    /// Flux array. The CPU backend returns a borrowed slice.
    fn read_flux(&self) -> Cow<'_, [f64]>;

    /// Tracked area of every FSR
    fn fsr_volumes(&self) -> &[f64];

    /// Fission rate `V · Σ νΣf φ` of every FSR
    fn fission_rates(&self) -> Vec<f64>;

    /// Vacuum leakage of the last sweep per unit fission source
    fn leakage(&self) -> f64;

    /// Convergence history of the last solve
    fn history(&self) -> &[IterationRecord];

    /// Time splits accumulated over all solves
    fn timer(&self) -> &Timer;

    /// Read-only copy of the current solution
    fn snapshot(&self) -> SolutionSnapshot;

    /// Get problem dimensions
    ///
    /// # Returns
    ///
    /// Tuple of `(num_fsrs, num_groups)`
    fn dimensions(&self) -> (usize, usize);
}
