use moc_core::{CpuSolver, EigenvalueResult, RunOptions, TrackGenerator, TransportSolver};
use std::os::raw::c_char;
use tracing::info;

use crate::error::{DefaultMocError, MocErrorCode};
use crate::helpers::{handle_ffi_result_error, str_from, with_state, with_state_mut, write_out};
use crate::instance::MocInstance;

/// Run options exposed to C. Polar quadrature and exponential evaluation keep
/// their defaults unless loaded from JSON with `moc_load_options`.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MocRunOptions {
    /// Worker threads for the sweep, 0 for the global pool
    pub num_threads: usize,
    /// Perpendicular distance between parallel tracks in cm
    pub track_spacing: f64,
    /// Azimuthal angles over [0, 2π), a multiple of 4
    pub num_azim: usize,
    pub tolerance: f64,
    pub max_iterations: usize,
}

impl From<RunOptions> for MocRunOptions {
    fn from(options: RunOptions) -> Self {
        Self {
            num_threads: options.num_threads,
            track_spacing: options.track_spacing,
            num_azim: options.num_azim,
            tolerance: options.tolerance,
            max_iterations: options.max_iterations,
        }
    }
}

/// Outcome of an eigenvalue solve
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MocEigenvalueResult {
    pub k_eff: f64,
    pub converged: bool,
    pub iterations: usize,
    pub residual: f64,
    /// Fraction of neutrons lost through vacuum boundaries
    pub leakage: f64,
    /// Production over absorption plus leakage
    pub balance_k: f64,
}

impl From<EigenvalueResult> for MocEigenvalueResult {
    fn from(result: EigenvalueResult) -> Self {
        Self {
            k_eff: result.k_eff,
            converged: result.converged,
            iterations: result.iterations,
            residual: result.residual,
            leakage: result.leakage,
            balance_k: result.balance_k,
        }
    }
}

/// Read the current run options.
///
/// # Safety
/// `ptr` must come from `moc_new`; `out_options` must be writable.
#[no_mangle]
pub unsafe extern "C" fn moc_get_options(
    ptr: *const MocInstance,
    out_options: *mut MocRunOptions,
) -> MocErrorCode {
    handle_ffi_result_error(|| {
        let options = unsafe { with_state(ptr, |state| Ok(state.options)) }?;
        unsafe { write_out(out_options, options.into(), "out_options") }
    })
}

/// Replace the run options. Invalid options are rejected and the old ones kept.
///
/// Changing options drops existing tracks and solution.
///
/// # Safety
/// `ptr` must come from `moc_new`.
#[no_mangle]
pub unsafe extern "C" fn moc_set_options(ptr: *const MocInstance, options: MocRunOptions) -> MocErrorCode {
    handle_ffi_result_error(|| unsafe {
        with_state_mut(ptr, |state| {
            let updated = RunOptions {
                num_threads: options.num_threads,
                track_spacing: options.track_spacing,
                num_azim: options.num_azim,
                tolerance: options.tolerance,
                max_iterations: options.max_iterations,
                ..state.options
            };
            updated.validate()?;
            state.options = updated;
            state.tracks = None;
            state.solution = None;
            Ok(())
        })
    })
}

/// Load run options from a JSON file; missing fields take their defaults.
///
/// # Safety
/// `ptr` must come from `moc_new`; `path` must be a null-terminated string.
#[no_mangle]
pub unsafe extern "C" fn moc_load_options(ptr: *const MocInstance, path: *const c_char) -> MocErrorCode {
    handle_ffi_result_error(|| {
        let path = unsafe { str_from(path, "path") }?;
        let options = RunOptions::from_json_file(path)?;
        unsafe {
            with_state_mut(ptr, |state| {
                state.options = options;
                state.tracks = None;
                state.solution = None;
                Ok(())
            })
        }
    })
}

/// Lay down cyclic tracks over the finalized geometry.
///
/// # Safety
/// `ptr` must come from `moc_new`; `out_num_tracks` must be writable.
#[no_mangle]
pub unsafe extern "C" fn moc_generate_tracks(
    ptr: *const MocInstance,
    out_num_tracks: *mut usize,
) -> MocErrorCode {
    handle_ffi_result_error(|| {
        let num_tracks = unsafe {
            with_state_mut(ptr, |state| {
                let tracks =
                    TrackGenerator::new(state.options.track_options()).generate(&state.geometry)?;
                let num_tracks = tracks.num_tracks();
                state.tracks = Some(tracks);
                state.solution = None;
                Ok(num_tracks)
            })
        }?;
        unsafe { write_out(out_num_tracks, num_tracks, "out_num_tracks") }
    })
}

/// Run power iteration to convergence or the iteration cap.
///
/// Hitting the cap is not an error: `converged` is false in the result. A
/// numeric failure leaves no solution behind.
///
/// # Safety
/// `ptr` must come from `moc_new`; `out_result` must be writable.
#[no_mangle]
pub unsafe extern "C" fn moc_compute_eigenvalue(
    ptr: *const MocInstance,
    out_result: *mut MocEigenvalueResult,
) -> MocErrorCode {
    handle_ffi_result_error(|| {
        let result = unsafe {
            with_state_mut(ptr, |state| {
                state.solution = None;
                let tracks = state
                    .tracks
                    .as_ref()
                    .ok_or_else(|| DefaultMocError::not_ready("Tracks have not been generated"))?;
                let (result, snapshot) = {
                    let mut solver =
                        CpuSolver::new(&state.geometry, tracks, state.options.solver_options())?;
                    let result = solver.solve()?;
                    (result, solver.snapshot())
                };
                info!(
                    "FFI solve finished: k_eff = {:.6} after {} iterations",
                    result.k_eff, result.iterations
                );
                state.solution = Some(snapshot);
                Ok(result)
            })
        }?;
        unsafe { write_out(out_result, result.into(), "out_result") }
    })
}

/// Write the latest solution as pretty JSON.
///
/// # Safety
/// `ptr` must come from `moc_new`; `path` must be a null-terminated string.
#[no_mangle]
pub unsafe extern "C" fn moc_write_solution(ptr: *const MocInstance, path: *const c_char) -> MocErrorCode {
    handle_ffi_result_error(|| {
        let path = unsafe { str_from(path, "path") }?;
        unsafe {
            with_state(ptr, |state| {
                state.solution()?.write_json(path).map_err(|e| {
                    DefaultMocError::invalid_parameter("path", &e.to_string())
                })
            })
        }
    })
}
