use crate::error::{with_last_error_mut, DefaultMocError, MocErrorCode, MocFfiError};
use crate::instance::{InstanceState, MocInstance};
use std::ffi::{CStr, CString};
use std::os::raw::c_char;

/// Set the thread-local error message and code.
/// Accepts any type implementing the `MocFfiError` trait.
pub(crate) fn set_last_error(error: &impl MocFfiError) {
    with_last_error_mut(|(cstring, code)| {
        *cstring = CString::new(error.msg()).ok();
        *code = error.code();
    });
}

/// Track an error by setting it in thread-local storage and returning its code.
#[inline]
pub(crate) fn track_error(error: &impl MocFfiError) -> MocErrorCode {
    set_last_error(error);
    error.code()
}

/// Clear the thread-local error message and code.
/// Called on successful operations.
pub(crate) fn clear_last_error() {
    with_last_error_mut(|(cstring, code)| {
        *cstring = None;
        *code = MocErrorCode::Ok;
    });
}

/// Run an FFI body and translate its result into an error code, recording the
/// message on failure and clearing it on success.
pub(crate) fn handle_ffi_result_error<F>(f: F) -> MocErrorCode
where
    F: FnOnce() -> Result<(), DefaultMocError>,
{
    match f() {
        Ok(()) => {
            clear_last_error();
            MocErrorCode::Ok
        }
        Err(error) => track_error(&error),
    }
}

/// Borrow the instance behind a raw pointer.
///
/// # Safety
/// `ptr` must be null or a pointer returned by `moc_new` that has not been destroyed.
pub(crate) unsafe fn instance_from_ptr<'a>(
    ptr: *const MocInstance,
) -> Result<&'a MocInstance, DefaultMocError> {
    // SAFETY: the caller guarantees a live instance when non-null.
    unsafe { ptr.as_ref() }.ok_or_else(|| DefaultMocError::null_pointer("ptr"))
}

/// Run `f` with shared access to the instance state.
///
/// # Safety
/// Same contract as [`instance_from_ptr`].
pub(crate) unsafe fn with_state<F, R>(ptr: *const MocInstance, f: F) -> Result<R, DefaultMocError>
where
    F: FnOnce(&InstanceState) -> Result<R, DefaultMocError>,
{
    // SAFETY: forwarded to the caller.
    let instance = unsafe { instance_from_ptr(ptr) }?;
    let state = instance
        .state
        .read()
        .map_err(|_| DefaultMocError::lock_poisoned("RwLock"))?;
    f(&state)
}

/// Run `f` with exclusive access to the instance state.
///
/// # Safety
/// Same contract as [`instance_from_ptr`].
pub(crate) unsafe fn with_state_mut<F, R>(
    ptr: *const MocInstance,
    f: F,
) -> Result<R, DefaultMocError>
where
    F: FnOnce(&mut InstanceState) -> Result<R, DefaultMocError>,
{
    // SAFETY: forwarded to the caller.
    let instance = unsafe { instance_from_ptr(ptr) }?;
    let mut state = instance
        .state
        .write()
        .map_err(|_| DefaultMocError::lock_poisoned("RwLock"))?;
    f(&mut state)
}

/// Write `value` through an out-pointer.
///
/// # Safety
/// `out` must be null or valid for a write of `T`.
pub(crate) unsafe fn write_out<T>(out: *mut T, value: T, name: &str) -> Result<(), DefaultMocError> {
    if out.is_null() {
        return Err(DefaultMocError::null_pointer(name));
    }
    // SAFETY: non-null and valid per the caller's contract.
    unsafe { out.write(value) };
    Ok(())
}

/// Borrow `len` elements starting at `data`; a null pointer is accepted only when `len` is 0.
///
/// # Safety
/// When non-null, `data` must point to `len` initialized elements that outlive the call.
pub(crate) unsafe fn slice_from<'a, T>(
    data: *const T,
    len: usize,
    name: &str,
) -> Result<&'a [T], DefaultMocError> {
    if len == 0 {
        return Ok(&[]);
    }
    if data.is_null() {
        return Err(DefaultMocError::null_pointer(name));
    }
    // SAFETY: non-null with `len` elements per the caller's contract.
    Ok(unsafe { std::slice::from_raw_parts(data, len) })
}

/// Borrow a null-terminated UTF-8 string.
///
/// # Safety
/// `data` must be null or point to a null-terminated string that outlives the call.
pub(crate) unsafe fn str_from<'a>(data: *const c_char, name: &str) -> Result<&'a str, DefaultMocError> {
    if data.is_null() {
        return Err(DefaultMocError::null_pointer(name));
    }
    // SAFETY: non-null and null-terminated per the caller's contract.
    unsafe { CStr::from_ptr(data) }
        .to_str()
        .map_err(|_| DefaultMocError::invalid_parameter(name, "must be valid UTF-8"))
}
