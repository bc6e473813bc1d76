//! Solver lifecycle and per-solve results

use serde::{Deserialize, Serialize};

/// Lifecycle of a transport solver
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SolverState {
    /// No flux has been computed
    #[default]
    Uninitialized,
    /// Flux guess is set, no sweep done yet
    FluxInitialized,
    /// Power iteration in progress
    Sweeping,
    /// Last solve met the tolerance
    Converged,
    /// Last solve ran out of iterations
    MaxItersReached,
}

impl SolverState {
    /// Whether a flux solution from a completed solve is available
    pub fn has_solution(self) -> bool {
        matches!(self, Self::Converged | Self::MaxItersReached)
    }
}

/// Starting point of a power iteration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum InitialGuess {
    /// Flat flux, k = 1 and zero boundary flux
    #[default]
    Uniform,
    /// Flux, boundary fluxes and k left by the previous solve
    Previous,
}

/// Convergence data of one power iteration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IterationRecord {
    pub iteration: usize,
    pub k_eff: f64,
    /// Change of k relative to the previous iterate
    pub delta_k: f64,
    /// RMS relative change of the fission source
    pub residual: f64,
}

/// Outcome of an eigenvalue solve
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EigenvalueResult {
    pub k_eff: f64,
    pub converged: bool,
    pub iterations: usize,
    pub residual: f64,
    /// Neutrons leaking through vacuum boundaries per unit fission source
    pub leakage: f64,
    /// Production over absorption plus leakage of the final flux
    pub balance_k: f64,
}
