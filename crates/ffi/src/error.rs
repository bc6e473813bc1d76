use moc_core::MocError;
use std::cell::RefCell;
use std::ffi::CString;
use std::os::raw::c_char;
use std::ptr;

/// Common interface for FFI error types.
///
/// Provides a unified way to hand errors across the FFI boundary as an error
/// code plus a diagnostic message.
///
/// # Example
/// ```ignore
/// let err = DefaultMocError::null_pointer("ptr");
/// assert_eq!(err.code(), MocErrorCode::NullPointer);
/// assert_eq!(err.msg(), "Parameter 'ptr' cannot be null");
/// ```
pub(crate) trait MocFfiError {
    /// Returns the error code to be returned across the FFI boundary.
    fn code(&self) -> MocErrorCode;

    /// Returns the human-readable error message.
    fn msg(&self) -> &str;
}

/// Default implementation of `MocFfiError` for the FFI error scenarios.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct DefaultMocError {
    code: MocErrorCode,
    msg: String,
}

impl DefaultMocError {
    /// Create error for null pointer passed where non-null required.
    ///
    /// # Arguments
    /// * `param_name` - The name of the parameter that was null (e.g., `"out_instance"`, `"ptr"`)
    pub fn null_pointer(param_name: &str) -> Self {
        Self {
            code: MocErrorCode::NullPointer,
            msg: format!("Parameter '{param_name}' cannot be null"),
        }
    }

    /// Create error for poisoned lock.
    pub fn lock_poisoned(lock_name: &str) -> Self {
        Self {
            code: MocErrorCode::LockPoisoned,
            msg: format!("Lock '{lock_name}' was poisoned by a panic in another thread"),
        }
    }

    /// Create error for an invalid argument.
    ///
    /// # Arguments
    /// * `param_name` - The name of the invalid parameter (e.g., `"num_groups"`, `"halfspaces"`)
    /// * `message` - A description of the validation error
    pub fn invalid_parameter(param_name: &str, message: &str) -> Self {
        Self {
            code: MocErrorCode::InvalidParameter,
            msg: format!("Parameter '{param_name}': {message}"),
        }
    }

    /// Create error for a pipeline stage called out of order.
    pub fn not_ready(message: &str) -> Self {
        Self {
            code: MocErrorCode::NotReady,
            msg: message.to_string(),
        }
    }
}

impl MocFfiError for DefaultMocError {
    fn code(&self) -> MocErrorCode {
        self.code
    }

    fn msg(&self) -> &str {
        &self.msg
    }
}

impl From<MocError> for DefaultMocError {
    fn from(error: MocError) -> Self {
        let code = match &error {
            MocError::Configuration(_) => MocErrorCode::Configuration,
            MocError::Tracing(_) => MocErrorCode::Tracing,
            MocError::Numeric(_) => MocErrorCode::Numeric,
        };
        Self {
            code,
            msg: error.to_string(),
        }
    }
}

impl From<moc_core::ConfigurationError> for DefaultMocError {
    fn from(error: moc_core::ConfigurationError) -> Self {
        MocError::from(error).into()
    }
}

/// FFI error codes returned by the transport functions.
/// Follows standard C convention: 0 = success, non-zero = error.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MocErrorCode {
    /// Operation completed successfully.
    Ok = 0,

    /// Invalid pointer: null pointer passed where non-null required.
    NullPointer = 1,

    /// Lock poisoned: internal synchronization primitive was poisoned by a panic.
    LockPoisoned = 2,

    /// Invalid parameter passed to function.
    InvalidParameter = 3,

    /// Geometry, material or option validation failed.
    Configuration = 4,

    /// A ray fell outside every cell while generating tracks.
    Tracing = 5,

    /// The eigenvalue solve hit a non-physical value.
    Numeric = 6,

    /// The call needs an earlier stage (finalize, tracks, solve) to have run.
    NotReady = 7,
}

impl From<DefaultMocError> for MocErrorCode {
    fn from(error: DefaultMocError) -> Self {
        error.code
    }
}

thread_local! {
    /// Thread-local storage for the most recent FFI error (C string, error code).
    /// The CString is stored so the pointer handed to C stays valid until the next call.
    static LAST_ERROR: RefCell<(Option<CString>, MocErrorCode)> = const { RefCell::new((None, MocErrorCode::Ok)) };
}

/// Internal helper to read `LAST_ERROR` thread-local storage (cstring, code).
pub(crate) fn with_last_error<F, R>(f: F) -> R
where
    F: FnOnce(&(Option<CString>, MocErrorCode)) -> R,
{
    LAST_ERROR.with_borrow(f)
}

/// Internal helper to mutate `LAST_ERROR` thread-local storage (cstring, code).
pub(crate) fn with_last_error_mut<F, R>(f: F) -> R
where
    F: FnOnce(&mut (Option<CString>, MocErrorCode)) -> R,
{
    LAST_ERROR.with_borrow_mut(f)
}

/// Retrieve the most recent FFI error message as a null-terminated C string.
///
/// Returns:
/// - A borrowed pointer to the error message if an error occurred.
/// - `null` if no error has occurred or the message cannot be converted to a C string.
///
/// # Thread Safety
/// Error messages are stored per-thread, each thread has its own error state.
///
/// # Lifetime
/// The returned pointer is valid until the next FFI call on this thread that sets
/// or clears the error.
///
/// **DO NOT FREE THIS POINTER** - it is managed internally.
///
/// Example:
/// ```c
/// MocInstance* moc = NULL;
/// moc_new(&moc);
/// if (moc_finalize(moc, &num_fsrs) != Ok) {
///     const char* error = moc_get_last_error();
///     if (error) {
///         printf("Geometry rejected: %s\n", error);
///     }
/// }
/// ```
#[no_mangle]
pub extern "C" fn moc_get_last_error() -> *const c_char {
    with_last_error(|(cstring, _code)| cstring.as_ref().map_or(ptr::null(), |cs| cs.as_ptr()))
}

/// Retrieve the most recent FFI error code, `Ok` (0) if the last call succeeded.
#[no_mangle]
pub extern "C" fn moc_get_last_error_code() -> MocErrorCode {
    with_last_error(|(_cstring, code)| *code)
}

#[cfg(test)]
mod tests {
    use super::*;
    use moc_core::{CellId, NumericError};

    #[test]
    fn test_core_errors_map_to_their_family() {
        let err: DefaultMocError = MocError::from(NumericError::ZeroFissionSource { iteration: 3 }).into();
        assert_eq!(err.code(), MocErrorCode::Numeric);

        let err: DefaultMocError = moc_core::ConfigurationError::UnfilledCell {
            cell: CellId::new(2),
        }
        .into();
        assert_eq!(err.code(), MocErrorCode::Configuration);
        assert!(err.msg().contains("cell 2"));
    }

    #[test]
    fn test_null_pointer_message() {
        let err = DefaultMocError::null_pointer("ptr");
        assert_eq!(err.code(), MocErrorCode::NullPointer);
        assert_eq!(err.msg(), "Parameter 'ptr' cannot be null");
    }
}
