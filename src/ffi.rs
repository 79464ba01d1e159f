//! FFI bindings for attune-core
//!
//! C-compatible functions for driving a [`SessionAnalyzer`] from other
//! languages. All functions use null-terminated C strings; returned
//! strings are allocated here and must be freed with
//! `attune_free_string`.

use std::cell::RefCell;
use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::ptr;

use crate::analyzer::SessionAnalyzer;
use crate::config::AnalyzerConfig;
use crate::types::FrameSample;

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

/// Helper to convert a C string to a Rust string
unsafe fn cstr_to_string(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    CStr::from_ptr(ptr).to_str().ok().map(|s| s.to_string())
}

/// Helper to convert a Rust string to a C string (caller must free)
fn string_to_cstr(s: &str) -> *mut c_char {
    match CString::new(s) {
        Ok(cstr) => cstr.into_raw(),
        Err(_) => ptr::null_mut(),
    }
}

/// Opaque handle to a SessionAnalyzer
pub struct AnalyzerHandle {
    analyzer: SessionAnalyzer,
}

/// Create a new analyzer.
///
/// `config_json` may be NULL for the default configuration, or a JSON
/// object overriding any subset of the configuration fields.
///
/// # Safety
/// - `config_json` must be NULL or a valid null-terminated C string.
/// - Returns a pointer that must be freed with `attune_analyzer_free`.
/// - Returns NULL on error; call `attune_last_error` for the message.
#[no_mangle]
pub unsafe extern "C" fn attune_analyzer_new(config_json: *const c_char) -> *mut AnalyzerHandle {
    clear_last_error();

    let cfg = if config_json.is_null() {
        AnalyzerConfig::default()
    } else {
        let Some(json) = cstr_to_string(config_json) else {
            set_last_error("Invalid config string pointer");
            return ptr::null_mut();
        };
        match AnalyzerConfig::from_json(&json) {
            Ok(cfg) => cfg,
            Err(e) => {
                set_last_error(&e.to_string());
                return ptr::null_mut();
            }
        }
    };

    let handle = Box::new(AnalyzerHandle {
        analyzer: SessionAnalyzer::new(cfg),
    });
    Box::into_raw(handle)
}

/// Free an analyzer.
///
/// # Safety
/// - `analyzer` must be a valid pointer returned by `attune_analyzer_new`.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn attune_analyzer_free(analyzer: *mut AnalyzerHandle) {
    if !analyzer.is_null() {
        drop(Box::from_raw(analyzer));
    }
}

/// Process one frame and return the events it produced as a JSON array.
///
/// # Safety
/// - `analyzer` must be a valid pointer returned by `attune_analyzer_new`.
/// - `frame_json` must be a valid null-terminated C string holding one
///   frame sample object.
/// - Returns a newly allocated string that must be freed with
///   `attune_free_string`.
/// - Returns NULL on error; call `attune_last_error` for the message.
#[no_mangle]
pub unsafe extern "C" fn attune_analyzer_push_frame(
    analyzer: *mut AnalyzerHandle,
    frame_json: *const c_char,
) -> *mut c_char {
    clear_last_error();

    if analyzer.is_null() {
        set_last_error("Null analyzer pointer");
        return ptr::null_mut();
    }
    let handle = &mut *analyzer;

    let Some(json) = cstr_to_string(frame_json) else {
        set_last_error("Invalid frame string pointer");
        return ptr::null_mut();
    };

    let frame: FrameSample = match serde_json::from_str(&json) {
        Ok(frame) => frame,
        Err(e) => {
            set_last_error(&e.to_string());
            return ptr::null_mut();
        }
    };

    let events = handle.analyzer.update(&frame);
    match serde_json::to_string(&events) {
        Ok(out) => string_to_cstr(&out),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

/// Return the current continuous-signal snapshot as JSON.
///
/// # Safety
/// - `analyzer` must be a valid pointer returned by `attune_analyzer_new`.
/// - Returns a newly allocated string that must be freed with
///   `attune_free_string`.
/// - Returns NULL on error; call `attune_last_error` for the message.
#[no_mangle]
pub unsafe extern "C" fn attune_analyzer_snapshot(
    analyzer: *mut AnalyzerHandle,
) -> *mut c_char {
    clear_last_error();

    if analyzer.is_null() {
        set_last_error("Null analyzer pointer");
        return ptr::null_mut();
    }
    let handle = &*analyzer;

    match serde_json::to_string(&handle.analyzer.snapshot()) {
        Ok(out) => string_to_cstr(&out),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

/// Reset an analyzer back to its freshly constructed state.
///
/// # Safety
/// - `analyzer` must be a valid pointer returned by `attune_analyzer_new`.
#[no_mangle]
pub unsafe extern "C" fn attune_analyzer_reset(analyzer: *mut AnalyzerHandle) {
    if !analyzer.is_null() {
        (*analyzer).analyzer.reset();
    }
}

/// Free a string returned by attune functions.
///
/// # Safety
/// - `ptr` must be a valid pointer returned by an attune function, or NULL.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn attune_free_string(ptr: *mut c_char) {
    if !ptr.is_null() {
        drop(CString::from_raw(ptr));
    }
}

/// Get the last error message.
///
/// # Safety
/// - Returns a pointer to a thread-local error string.
/// - The returned pointer is valid until the next attune call on this thread.
/// - Do NOT free the returned pointer.
/// - Returns NULL if no error occurred.
#[no_mangle]
pub unsafe extern "C" fn attune_last_error() -> *const c_char {
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
pub unsafe extern "C" fn attune_version() -> *const c_char {
    static VERSION: &[u8] = concat!(env!("CARGO_PKG_VERSION"), "\0").as_bytes();
    VERSION.as_ptr() as *const c_char
}
