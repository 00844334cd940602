//! FFI bindings for the exposure risk engine
//!
//! C-compatible functions for calling the engine from the mobile host. All
//! inputs are null-terminated UTF-8 JSON strings. Returned strings are newly
//! allocated and must be released with `risk_free_string`.

use std::cell::RefCell;
use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::ptr;

use crate::aggregator::RiskAlgorithm;
use crate::error::RiskError;
use crate::pipeline::{daily_risk_from_json, legacy_risk_from_json, RiskEngine};

thread_local! {
    /// Message of the most recent failed `risk_*` call on this thread
    static RISK_ERROR: RefCell<Option<CString>> = const { RefCell::new(None) };
}

/// Store `message` for `risk_last_error`. Interior NUL bytes are dropped.
fn record_error(message: impl Into<String>) {
    let mut message = message.into();
    message.retain(|c| c != '\0');
    RISK_ERROR.with(|slot| *slot.borrow_mut() = CString::new(message).ok());
}

fn reset_error() {
    RISK_ERROR.with(|slot| slot.borrow_mut().take());
}

/// Copy a borrowed JSON argument into an owned string.
///
/// Records which argument was rejected, and why, before returning `None`.
unsafe fn read_json_arg(ptr: *const c_char, name: &str) -> Option<String> {
    if ptr.is_null() {
        record_error(format!("{name} pointer is null"));
        return None;
    }
    match CStr::from_ptr(ptr).to_str() {
        Ok(json) => Some(json.to_owned()),
        Err(e) => {
            record_error(format!("{name} is not valid UTF-8: {e}"));
            None
        }
    }
}

/// Hand a report to the caller, who releases it with `risk_free_string`.
fn into_c_report(result: Result<String, RiskError>) -> *mut c_char {
    let report = match result {
        Ok(report) => report,
        Err(e) => {
            record_error(e.to_string());
            return ptr::null_mut();
        }
    };
    match CString::new(report) {
        Ok(report) => report.into_raw(),
        Err(e) => {
            record_error(format!("report contains a NUL byte at {}", e.nul_position()));
            ptr::null_mut()
        }
    }
}

// ============================================================================
// Stateless API
// ============================================================================

/// Score windows with the current algorithm and return a JSON report.
///
/// # Safety
/// - `windows_json` and `config_json` must be valid null-terminated C strings.
/// - Returns a newly allocated string that must be freed with `risk_free_string`.
/// - Returns NULL on error; call `risk_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn risk_daily_from_json(
    windows_json: *const c_char,
    config_json: *const c_char,
) -> *mut c_char {
    reset_error();

    let Some(windows) = read_json_arg(windows_json, "windows JSON") else {
        return ptr::null_mut();
    };
    let Some(config) = read_json_arg(config_json, "configuration JSON") else {
        return ptr::null_mut();
    };

    into_c_report(daily_risk_from_json(windows, config))
}

/// Score windows with the legacy algorithm and return a JSON report.
///
/// # Safety
/// - `windows_json` and `config_json` must be valid null-terminated C strings.
/// - Returns a newly allocated string that must be freed with `risk_free_string`.
/// - Returns NULL on error; call `risk_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn risk_legacy_from_json(
    windows_json: *const c_char,
    config_json: *const c_char,
) -> *mut c_char {
    reset_error();

    let Some(windows) = read_json_arg(windows_json, "windows JSON") else {
        return ptr::null_mut();
    };
    let Some(config) = read_json_arg(config_json, "configuration JSON") else {
        return ptr::null_mut();
    };

    into_c_report(legacy_risk_from_json(windows, config))
}

// ============================================================================
// Engine API
// ============================================================================

/// Opaque handle to a RiskEngine
pub struct RiskEngineHandle {
    engine: RiskEngine,
}

/// Create an engine from a configuration snapshot.
///
/// # Safety
/// - `config_json` must be a valid null-terminated C string, or NULL to use
///   the bundled default configuration.
/// - Must be freed with `risk_engine_free`.
/// - Returns NULL if the configuration is invalid.
#[no_mangle]
pub unsafe extern "C" fn risk_engine_new(config_json: *const c_char) -> *mut RiskEngineHandle {
    reset_error();

    let engine = if config_json.is_null() {
        RiskEngine::default()
    } else {
        let Some(json) = read_json_arg(config_json, "configuration JSON") else {
            return ptr::null_mut();
        };
        match RiskEngine::from_json(&json) {
            Ok(engine) => engine,
            Err(e) => {
                record_error(e.to_string());
                return ptr::null_mut();
            }
        }
    };

    Box::into_raw(Box::new(RiskEngineHandle { engine }))
}

/// Free an engine.
///
/// # Safety
/// - `engine` must be a valid pointer returned by `risk_engine_new`, or NULL.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn risk_engine_free(engine: *mut RiskEngineHandle) {
    if !engine.is_null() {
        drop(Box::from_raw(engine));
    }
}

/// Replace the engine's configuration snapshot.
///
/// # Safety
/// - `engine` must be a valid pointer returned by `risk_engine_new`.
/// - `config_json` must be a valid null-terminated C string.
/// - Returns 0 on success, -1 on error (the previous snapshot stays active).
#[no_mangle]
pub unsafe extern "C" fn risk_engine_load_configuration(
    engine: *mut RiskEngineHandle,
    config_json: *const c_char,
) -> i32 {
    reset_error();

    if engine.is_null() {
        record_error("engine pointer is null");
        return -1;
    }

    let handle = &mut *engine;

    let Some(json) = read_json_arg(config_json, "configuration JSON") else {
        return -1;
    };

    match handle.engine.load_configuration(&json) {
        Ok(()) => 0,
        Err(e) => {
            record_error(e.to_string());
            -1
        }
    }
}

unsafe fn engine_assess(
    engine: *const RiskEngineHandle,
    windows_json: *const c_char,
    algorithm: RiskAlgorithm,
) -> *mut c_char {
    reset_error();

    if engine.is_null() {
        record_error("engine pointer is null");
        return ptr::null_mut();
    }

    let handle = &*engine;

    let Some(windows) = read_json_arg(windows_json, "windows JSON") else {
        return ptr::null_mut();
    };

    into_c_report(handle.engine.assess_json(algorithm, &windows))
}

/// Score windows with the engine's configuration using the current algorithm.
///
/// # Safety
/// - `engine` must be a valid pointer returned by `risk_engine_new`.
/// - `windows_json` must be a valid null-terminated C string.
/// - Returns a newly allocated string that must be freed with `risk_free_string`.
/// - Returns NULL on error; call `risk_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn risk_engine_assess_daily(
    engine: *const RiskEngineHandle,
    windows_json: *const c_char,
) -> *mut c_char {
    engine_assess(engine, windows_json, RiskAlgorithm::Daily)
}

/// Score windows with the engine's configuration using the legacy algorithm.
///
/// # Safety
/// Same contract as `risk_engine_assess_daily`.
#[no_mangle]
pub unsafe extern "C" fn risk_engine_assess_legacy(
    engine: *const RiskEngineHandle,
    windows_json: *const c_char,
) -> *mut c_char {
    engine_assess(engine, windows_json, RiskAlgorithm::Legacy)
}

// ============================================================================
// Memory Management
// ============================================================================

/// Free a string returned by the engine.
///
/// # Safety
/// - `ptr` must be a valid pointer returned by a `risk_*` function, or NULL.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn risk_free_string(ptr: *mut c_char) {
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
/// - Returns a pointer to a thread-local error string, valid until the next
///   `risk_*` call on this thread.
/// - Do NOT free the returned pointer.
/// - Returns NULL if no error occurred.
#[no_mangle]
pub unsafe extern "C" fn risk_last_error() -> *const c_char {
    RISK_ERROR.with(|slot| match &*slot.borrow() {
        Some(message) => message.as_ptr(),
        None => ptr::null(),
    })
}

/// Get the engine library version.
///
/// # Safety
/// - Returns a pointer to a static string. Do NOT free.
#[no_mangle]
pub unsafe extern "C" fn risk_version() -> *const c_char {
    static VERSION: &[u8] = concat!(env!("CARGO_PKG_VERSION"), "\0").as_bytes();
    VERSION.as_ptr() as *const c_char
}
