//! FFI bindings for the personality predictor
//!
//! This module provides C-compatible functions for calling the predictor from
//! other languages. All functions use C strings (null-terminated) and return
//! allocated memory that must be freed by the caller using `pp_free_string`.

use std::cell::RefCell;
use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::ptr;

use crate::pipeline::SharedPredictor;

// Thread-local storage for the last error message
thread_local! {
    static LAST_ERROR: RefCell<Option<CString>> = const { RefCell::new(None) };
}

fn set_last_error(msg: &str) {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = CString::new(msg).ok();
    });
}

fn clear_last_error() {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = None;
    });
}

/// Helper to convert C string to Rust string
unsafe fn cstr_to_string(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    CStr::from_ptr(ptr).to_str().ok().map(|s| s.to_string())
}

/// Helper to convert Rust string to C string (caller must free)
fn string_to_cstr(s: &str) -> *mut c_char {
    match CString::new(s) {
        Ok(cstr) => cstr.into_raw(),
        Err(_) => ptr::null_mut(),
    }
}

// ============================================================================
// Predictor lifecycle
// ============================================================================

/// Opaque handle to a loaded predictor
pub struct PredictorHandle {
    predictor: SharedPredictor,
}

/// Load the three artifacts from `models_dir` and create a predictor.
///
/// # Safety
/// - `models_dir` must be a valid null-terminated C string.
/// - Must be freed with `pp_predictor_free`.
/// - Returns NULL if the artifacts cannot be loaded; call `pp_last_error`.
#[no_mangle]
pub unsafe extern "C" fn pp_predictor_load(models_dir: *const c_char) -> *mut PredictorHandle {
    clear_last_error();

    let dir = match cstr_to_string(models_dir) {
        Some(s) => s,
        None => {
            set_last_error("Invalid models_dir string pointer");
            return ptr::null_mut();
        }
    };

    match SharedPredictor::load_dir(&dir) {
        Ok(predictor) => Box::into_raw(Box::new(PredictorHandle { predictor })),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

/// Free a predictor.
///
/// # Safety
/// - `predictor` must be a valid pointer returned by `pp_predictor_load`, or NULL.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn pp_predictor_free(predictor: *mut PredictorHandle) {
    if !predictor.is_null() {
        drop(Box::from_raw(predictor));
    }
}

/// Replace the predictor's artifacts with those in `models_dir`.
///
/// Returns 0 on success, -1 on error. On error the previous artifacts stay in
/// service.
///
/// # Safety
/// - `predictor` must be a valid pointer returned by `pp_predictor_load`.
/// - `models_dir` must be a valid null-terminated C string.
#[no_mangle]
pub unsafe extern "C" fn pp_predictor_reload(
    predictor: *const PredictorHandle,
    models_dir: *const c_char,
) -> i32 {
    clear_last_error();

    if predictor.is_null() {
        set_last_error("Null predictor pointer");
        return -1;
    }
    let handle = &*predictor;

    let dir = match cstr_to_string(models_dir) {
        Some(s) => s,
        None => {
            set_last_error("Invalid models_dir string pointer");
            return -1;
        }
    };

    match handle.predictor.reload(&dir) {
        Ok(()) => 0,
        Err(e) => {
            set_last_error(&e.to_string());
            -1
        }
    }
}

// ============================================================================
// Prediction
// ============================================================================

/// Classify one JSON request and return the result as JSON.
///
/// # Safety
/// - `predictor` must be a valid pointer returned by `pp_predictor_load`.
/// - `json` must be a valid null-terminated C string.
/// - Returns a newly allocated string that must be freed with `pp_free_string`.
/// - Returns NULL on error; call `pp_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn pp_predict_json(
    predictor: *const PredictorHandle,
    json: *const c_char,
) -> *mut c_char {
    clear_last_error();

    if predictor.is_null() {
        set_last_error("Null predictor pointer");
        return ptr::null_mut();
    }
    let handle = &*predictor;

    let json_str = match cstr_to_string(json) {
        Some(s) => s,
        None => {
            set_last_error("Invalid JSON string pointer");
            return ptr::null_mut();
        }
    };

    let result = match handle.predictor.predict_json(&json_str) {
        Ok(result) => result,
        Err(e) => {
            set_last_error(&format!("{}: {e}", e.code()));
            return ptr::null_mut();
        }
    };

    match serde_json::to_string(&result) {
        Ok(s) => string_to_cstr(&s),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

/// Free a string returned by predictor functions.
///
/// # Safety
/// - `ptr` must be a valid pointer returned by a predictor function, or NULL.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn pp_free_string(ptr: *mut c_char) {
    if !ptr.is_null() {
        drop(CString::from_raw(ptr));
    }
}

// ============================================================================
// Error Handling
// ============================================================================

/// Get the last error message.
///
/// # Safety
/// - Returns a pointer to a thread-local error string.
/// - The returned pointer is valid until the next predictor call on this thread.
/// - Do NOT free the returned pointer.
/// - Returns NULL if no error occurred.
#[no_mangle]
pub unsafe extern "C" fn pp_last_error() -> *const c_char {
    LAST_ERROR.with(|e| match &*e.borrow() {
        Some(cstr) => cstr.as_ptr(),
        None => ptr::null(),
    })
}

/// Get the library version.
///
/// # Safety
/// - Returns a pointer to a static string. Do NOT free.
#[no_mangle]
pub unsafe extern "C" fn pp_version() -> *const c_char {
    static VERSION: &[u8] = concat!(env!("CARGO_PKG_VERSION"), "\0").as_bytes();
    VERSION.as_ptr() as *const c_char
}
