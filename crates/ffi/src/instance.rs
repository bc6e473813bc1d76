use moc_core::{Geometry, RunOptions, SolutionSnapshot, TrackSet};
use std::sync::RwLock;

use crate::error::{DefaultMocError, MocErrorCode};
use crate::helpers::{clear_last_error, track_error};

/// Everything one transport problem owns across FFI calls.
///
/// Each stage invalidates the ones after it: editing the geometry drops the tracks
/// and the solution, regenerating tracks drops the solution.
#[derive(Debug, Default)]
pub(crate) struct InstanceState {
    pub(crate) geometry: Geometry,
    pub(crate) options: RunOptions,
    pub(crate) tracks: Option<TrackSet>,
    pub(crate) solution: Option<SolutionSnapshot>,
}

impl InstanceState {
    /// Mutable geometry access for construction calls
    pub(crate) fn geometry_mut(&mut self) -> &mut Geometry {
        self.tracks = None;
        self.solution = None;
        &mut self.geometry
    }

    pub(crate) fn tracks(&self) -> Result<&TrackSet, DefaultMocError> {
        self.tracks
            .as_ref()
            .ok_or_else(|| DefaultMocError::not_ready("Tracks have not been generated"))
    }

    pub(crate) fn solution(&self) -> Result<&SolutionSnapshot, DefaultMocError> {
        self.solution
            .as_ref()
            .ok_or_else(|| DefaultMocError::not_ready("No eigenvalue solution is available"))
    }
}

/// One transport problem: geometry, tracks and the latest solution.
///
/// # Thread Safety
/// The state is protected by an `RwLock`. Queries take a shared `.read()` lock and
/// may run concurrently; construction, track generation and solves take the
/// exclusive `.write()` lock.
///
/// # Usage
/// ```c
/// MocInstance* moc = NULL;
/// moc_new(&moc);
/// // ... moc_add_material / moc_add_surface / moc_add_cell ...
/// moc_finalize(moc, &num_fsrs);
/// moc_generate_tracks(moc, &num_tracks);
/// MocEigenvalueResult result;
/// moc_compute_eigenvalue(moc, &result);
/// moc_destroy(moc);
/// ```
pub struct MocInstance {
    pub(crate) state: RwLock<InstanceState>,
}

impl MocInstance {
    pub(crate) fn new() -> Box<Self> {
        Box::new(Self {
            state: RwLock::new(InstanceState::default()),
        })
    }
}

/// Create an empty transport problem and return it via out-parameter.
///
/// Returns
/// - `MocErrorCode::Ok` (0) - success, `out_instance` contains a valid pointer
/// - `MocErrorCode::NullPointer` - `out_instance` is null
///
/// # Safety
///
/// - `out_instance` must be a valid pointer to writable memory, or null.
/// - The caller takes ownership of the returned instance and MUST call `moc_destroy`
///   exactly once.
#[no_mangle]
pub unsafe extern "C" fn moc_new(out_instance: *mut *mut MocInstance) -> MocErrorCode {
    if out_instance.is_null() {
        return track_error(&DefaultMocError::null_pointer("out_instance"));
    }
    unsafe {
        *out_instance = Box::into_raw(MocInstance::new());
    }
    clear_last_error();
    MocErrorCode::Ok
}

/// Destroy an instance created by `moc_new`. Null is a no-op.
///
/// # Safety
/// - The pointer MUST have been created by `moc_new` and not freed already.
/// - The caller must not use the pointer afterwards.
#[no_mangle]
pub unsafe extern "C" fn moc_destroy(ptr: *mut MocInstance) {
    if ptr.is_null() {
        return;
    }
    // SAFETY: created by `Box::into_raw` in `moc_new` and not yet freed.
    unsafe {
        drop(Box::from_raw(ptr));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MocFfiError;
    use std::ptr;

    #[test]
    fn test_new_and_destroy() {
        let mut moc: *mut MocInstance = ptr::null_mut();
        assert_eq!(unsafe { moc_new(&mut moc) }, MocErrorCode::Ok);
        assert!(!moc.is_null());
        unsafe { moc_destroy(moc) };
        unsafe { moc_destroy(ptr::null_mut()) };
    }

    #[test]
    fn test_new_rejects_null_out() {
        assert_eq!(
            unsafe { moc_new(ptr::null_mut()) },
            MocErrorCode::NullPointer
        );
    }

    #[test]
    fn test_geometry_edits_invalidate_later_stages() {
        let mut state = InstanceState::default();
        assert_eq!(state.tracks().unwrap_err().code(), MocErrorCode::NotReady);
        state.geometry_mut();
        assert!(state.solution.is_none());
    }
}
