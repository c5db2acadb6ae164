//! FFI bindings for Synheart Touch
//!
//! C-compatible functions for driving a measurement session from a host
//! app. Strings cross the boundary as null-terminated UTF-8; every returned
//! string is newly allocated and must be freed with `touch_free_string`.

use std::cell::RefCell;
use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::ptr;

use chrono::Utc;

use crate::config::SessionConfig;
use crate::error::TouchError;
use crate::replay::TouchSample;
use crate::session::{SampleOutcome, Session};
use crate::types::Measurement;

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

unsafe fn cstr_to_string(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    CStr::from_ptr(ptr).to_str().ok().map(|s| s.to_string())
}

/// Convert to a C string the caller must free
fn string_to_cstr(s: &str) -> *mut c_char {
    match CString::new(s) {
        Ok(cstr) => cstr.into_raw(),
        Err(_) => ptr::null_mut(),
    }
}

fn result_to_cstr(result: Result<String, TouchError>) -> *mut c_char {
    match result {
        Ok(json) => string_to_cstr(&json),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

fn outcome_to_json(outcome: &SampleOutcome) -> Result<String, TouchError> {
    let recorded: Vec<_> = outcome.recorded.iter().map(Measurement::to_record).collect();
    let value = serde_json::json!({
        "recorded": recorded,
        "failure": outcome.failure.map(|f| f.to_string()),
        "state": outcome.state,
    });
    Ok(serde_json::to_string(&value)?)
}

/// Opaque handle to a Session
pub struct TouchSessionHandle {
    session: Session,
}

/// Create a session that starts enrolling now.
///
/// # Safety
/// - `config_json` must be NULL (defaults) or a valid null-terminated C string.
/// - Returns a pointer that must be freed with `touch_session_free`.
/// - Returns NULL on error; call `touch_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn touch_session_new(config_json: *const c_char) -> *mut TouchSessionHandle {
    clear_last_error();

    let config = if config_json.is_null() {
        SessionConfig::default()
    } else {
        let json = match cstr_to_string(config_json) {
            Some(s) => s,
            None => {
                set_last_error("Invalid config string pointer");
                return ptr::null_mut();
            }
        };
        match SessionConfig::from_json(&json) {
            Ok(config) => config,
            Err(e) => {
                set_last_error(&e.to_string());
                return ptr::null_mut();
            }
        }
    };

    match Session::new(config, Utc::now()) {
        Ok(session) => Box::into_raw(Box::new(TouchSessionHandle { session })),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

/// Free a session.
///
/// # Safety
/// - `session` must be a valid pointer returned by `touch_session_new`, or NULL.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn touch_session_free(session: *mut TouchSessionHandle) {
    if !session.is_null() {
        drop(Box::from_raw(session));
    }
}

/// Feed one `touch.sample.v1` record to the session.
///
/// Returns `{"recorded": [...], "failure": null | "...", "state": "..."}`.
/// A tracker failure is not an error; malformed input is.
///
/// # Safety
/// - `session` must be a valid pointer returned by `touch_session_new`.
/// - `sample_json` must be a valid null-terminated C string.
/// - Returns a newly allocated string that must be freed with `touch_free_string`.
/// - Returns NULL on error; call `touch_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn touch_session_push_sample(
    session: *mut TouchSessionHandle,
    sample_json: *const c_char,
) -> *mut c_char {
    clear_last_error();

    if session.is_null() {
        set_last_error("Null session pointer");
        return ptr::null_mut();
    }
    let handle = &mut *session;

    let json = match cstr_to_string(sample_json) {
        Some(s) => s,
        None => {
            set_last_error("Invalid sample string pointer");
            return ptr::null_mut();
        }
    };

    let result = serde_json::from_str::<TouchSample>(&json)
        .map_err(TouchError::from)
        .and_then(|sample| handle.session.handle_sample(&sample))
        .and_then(|outcome| outcome_to_json(&outcome));
    result_to_cstr(result)
}

/// Export the ordered measurement log as snapshot records.
///
/// # Safety
/// - `session` must be a valid pointer returned by `touch_session_new`.
/// - Returns a newly allocated string that must be freed with `touch_free_string`.
/// - Returns NULL on error; call `touch_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn touch_session_snapshot(session: *mut TouchSessionHandle) -> *mut c_char {
    clear_last_error();

    if session.is_null() {
        set_last_error("Null session pointer");
        return ptr::null_mut();
    }
    let handle = &*session;

    result_to_cstr(handle.session.snapshot_json())
}

/// Session report with per-kind aggregates.
///
/// # Safety
/// - `session` must be a valid pointer returned by `touch_session_new`.
/// - Returns a newly allocated string that must be freed with `touch_free_string`.
/// - Returns NULL on error; call `touch_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn touch_session_summary(session: *mut TouchSessionHandle) -> *mut c_char {
    clear_last_error();

    if session.is_null() {
        set_last_error("Null session pointer");
        return ptr::null_mut();
    }
    let handle = &*session;

    let report = handle.session.report();
    result_to_cstr(serde_json::to_string(&report).map_err(TouchError::from))
}

/// Discard collected measurements and restart enrolment now.
///
/// # Safety
/// - `session` must be a valid pointer returned by `touch_session_new`.
/// - Returns 0 on success, non-zero on error.
#[no_mangle]
pub unsafe extern "C" fn touch_session_enroll(session: *mut TouchSessionHandle) -> i32 {
    clear_last_error();

    if session.is_null() {
        set_last_error("Null session pointer");
        return -1;
    }
    let handle = &mut *session;

    handle.session.enroll(Utc::now());
    0
}

/// Free a string returned by Touch functions.
///
/// # Safety
/// - `ptr` must be a valid pointer returned by a Touch function, or NULL.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn touch_free_string(ptr: *mut c_char) {
    if !ptr.is_null() {
        drop(CString::from_raw(ptr));
    }
}

/// Get the last error message.
///
/// # Safety
/// - The returned pointer is valid until the next Touch function call on this thread.
/// - Do NOT free the returned pointer.
/// - Returns NULL if no error occurred.
#[no_mangle]
pub unsafe extern "C" fn touch_last_error() -> *const c_char {
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
pub unsafe extern "C" fn touch_version() -> *const c_char {
    static VERSION: &[u8] = concat!(env!("CARGO_PKG_VERSION"), "\0").as_bytes();
    VERSION.as_ptr() as *const c_char
}
