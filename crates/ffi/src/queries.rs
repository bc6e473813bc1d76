use moc_core::{FsrId, Vec2};

use crate::error::{DefaultMocError, MocErrorCode};
use crate::helpers::{handle_ffi_result_error, with_state, write_out};
use crate::instance::MocInstance;

fn fsr_index(fsr: u32, num_fsrs: usize) -> Result<usize, DefaultMocError> {
    let index = FsrId::new(fsr).index();
    if index < num_fsrs {
        Ok(index)
    } else {
        Err(DefaultMocError::invalid_parameter(
            "fsr",
            &format!("{fsr} is out of range for {num_fsrs} regions"),
        ))
    }
}

/// Number of flat source regions of the finalized geometry.
///
/// # Safety
/// `ptr` must come from `moc_new`; `out_num_fsrs` must be writable.
#[no_mangle]
pub unsafe extern "C" fn moc_get_num_fsrs(ptr: *const MocInstance, out_num_fsrs: *mut usize) -> MocErrorCode {
    handle_ffi_result_error(|| {
        let num_fsrs = unsafe {
            with_state(ptr, |state| {
                if state.geometry.is_finalized() {
                    Ok(state.geometry.num_fsrs())
                } else {
                    Err(DefaultMocError::not_ready("Geometry is not finalized"))
                }
            })
        }?;
        unsafe { write_out(out_num_fsrs, num_fsrs, "out_num_fsrs") }
    })
}

/// Number of energy groups shared by the geometry's materials.
///
/// # Safety
/// `ptr` must come from `moc_new`; `out_num_groups` must be writable.
#[no_mangle]
pub unsafe extern "C" fn moc_get_num_groups(
    ptr: *const MocInstance,
    out_num_groups: *mut usize,
) -> MocErrorCode {
    handle_ffi_result_error(|| {
        let num_groups = unsafe { with_state(ptr, |state| Ok(state.geometry.num_groups())) }?;
        unsafe { write_out(out_num_groups, num_groups, "out_num_groups") }
    })
}

/// Region containing the point `(x, y)`.
///
/// Returns `InvalidParameter` for points outside every cell.
///
/// # Safety
/// `ptr` must come from `moc_new`; `out_fsr` must be writable.
#[no_mangle]
pub unsafe extern "C" fn moc_find_fsr(ptr: *const MocInstance, x: f64, y: f64, out_fsr: *mut u32) -> MocErrorCode {
    handle_ffi_result_error(|| {
        let fsr = unsafe {
            with_state(ptr, |state| {
                if !state.geometry.is_finalized() {
                    return Err(DefaultMocError::not_ready("Geometry is not finalized"));
                }
                state.geometry.find_fsr(&Vec2::new(x, y)).ok_or_else(|| {
                    DefaultMocError::invalid_parameter("x, y", &format!("({x}, {y}) is outside the geometry"))
                })
            })
        }?;
        unsafe { write_out(out_fsr, fsr.raw(), "out_fsr") }
    })
}

/// Track-estimated area of a region in cm².
///
/// # Safety
/// `ptr` must come from `moc_new`; `out_volume` must be writable.
#[no_mangle]
pub unsafe extern "C" fn moc_get_fsr_volume(ptr: *const MocInstance, fsr: u32, out_volume: *mut f64) -> MocErrorCode {
    handle_ffi_result_error(|| {
        let volume = unsafe {
            with_state(ptr, |state| {
                let tracks = state.tracks()?;
                let index = fsr_index(fsr, tracks.fsr_volumes().len())?;
                Ok(tracks.fsr_volumes()[index])
            })
        }?;
        unsafe { write_out(out_volume, volume, "out_volume") }
    })
}

/// Multiplication factor of the latest solution.
///
/// # Safety
/// `ptr` must come from `moc_new`; `out_k_eff` must be writable.
#[no_mangle]
pub unsafe extern "C" fn moc_get_k_eff(ptr: *const MocInstance, out_k_eff: *mut f64) -> MocErrorCode {
    handle_ffi_result_error(|| {
        let k_eff = unsafe { with_state(ptr, |state| Ok(state.solution()?.k_eff)) }?;
        unsafe { write_out(out_k_eff, k_eff, "out_k_eff") }
    })
}

/// Scalar flux of one region and group, normalized to unit total fission source.
///
/// # Safety
/// `ptr` must come from `moc_new`; `out_flux` must be writable.
#[no_mangle]
pub unsafe extern "C" fn moc_get_scalar_flux(
    ptr: *const MocInstance,
    fsr: u32,
    group: usize,
    out_flux: *mut f64,
) -> MocErrorCode {
    handle_ffi_result_error(|| {
        let flux = unsafe {
            with_state(ptr, |state| {
                let solution = state.solution()?;
                let index = fsr_index(fsr, solution.num_fsrs())?;
                solution.regions[index].flux.get(group).copied().ok_or_else(|| {
                    DefaultMocError::invalid_parameter(
                        "group",
                        &format!("{group} is out of range for {} groups", solution.num_groups),
                    )
                })
            })
        }?;
        unsafe { write_out(out_flux, flux, "out_flux") }
    })
}

/// Copy the per-region fission rates of the latest solution into `out_rates`.
///
/// `capacity` is the length of `out_rates`; it must be at least the number of regions.
///
/// # Safety
/// `ptr` must come from `moc_new`; `out_rates` must be writable for `capacity` values.
#[no_mangle]
pub unsafe extern "C" fn moc_get_fission_rates(
    ptr: *const MocInstance,
    out_rates: *mut f64,
    capacity: usize,
) -> MocErrorCode {
    handle_ffi_result_error(|| {
        if out_rates.is_null() {
            return Err(DefaultMocError::null_pointer("out_rates"));
        }
        unsafe {
            with_state(ptr, |state| {
                let solution = state.solution()?;
                if capacity < solution.num_fsrs() {
                    return Err(DefaultMocError::invalid_parameter(
                        "capacity",
                        &format!("{capacity} is below the {} regions", solution.num_fsrs()),
                    ));
                }
                // SAFETY: non-null and writable for `capacity >= num_fsrs` values.
                let out = std::slice::from_raw_parts_mut(out_rates, solution.num_fsrs());
                for (slot, region) in out.iter_mut().zip(&solution.regions) {
                    *slot = region.fission_rate;
                }
                Ok(())
            })
        }
    })
}
