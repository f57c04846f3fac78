//! FFI bindings for PT Champion grading
//!
//! This module provides C-compatible functions for embedding the grading
//! engine in browser, mobile and other non-Rust hosts. All strings are
//! null-terminated; strings returned by these functions must be freed by the
//! caller using `ptg_free_string`.

use std::cell::RefCell;
use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::ptr;

use crate::scoring::{calculate_score_for_tag, SCORE_SENTINEL};
use crate::session::GradingSession;

// Thread-local storage for the last error message
thread_local! {
    static LAST_ERROR: RefCell<Option<CString>> = const { RefCell::new(None) };
}

/// Set the last error message
fn set_last_error(msg: &str) {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = CString::new(msg).ok();
    });
}

/// Clear the last error message
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
// Stateless API
// ============================================================================

/// Calculate the 0-100 score for a final performance value.
///
/// `performance_value` is a rep count or elapsed seconds.
///
/// # Safety
/// - `exercise_type` must be a valid null-terminated C string.
/// - Returns -1 on error; call `ptg_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn ptg_calculate_score(
    exercise_type: *const c_char,
    performance_value: f64,
) -> i32 {
    clear_last_error();

    let tag = match cstr_to_string(exercise_type) {
        Some(s) => s,
        None => {
            set_last_error("Invalid exercise type string pointer");
            return SCORE_SENTINEL;
        }
    };

    match calculate_score_for_tag(&tag, performance_value) {
        Ok(score) => score as i32,
        Err(e) => {
            set_last_error(&e.to_string());
            SCORE_SENTINEL
        }
    }
}

// ============================================================================
// Stateful Session API
// ============================================================================

/// Opaque handle to a GradingSession
pub struct GradingSessionHandle {
    session: GradingSession,
}

/// Start a grading session for an exercise type.
///
/// # Safety
/// - `exercise_type` must be a valid null-terminated C string.
/// - Returns a pointer that must be freed with `ptg_session_free`.
/// - Returns NULL on error; call `ptg_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn ptg_session_new(exercise_type: *const c_char) -> *mut GradingSessionHandle {
    clear_last_error();

    let tag = match cstr_to_string(exercise_type) {
        Some(s) => s,
        None => {
            set_last_error("Invalid exercise type string pointer");
            return ptr::null_mut();
        }
    };

    match GradingSession::for_tag(&tag) {
        Ok(session) => Box::into_raw(Box::new(GradingSessionHandle { session })),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

/// Free a grading session.
///
/// # Safety
/// - `session` must be a valid pointer returned by `ptg_session_new`, or NULL.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn ptg_session_free(session: *mut GradingSessionHandle) {
    if !session.is_null() {
        drop(Box::from_raw(session));
    }
}

/// Grade one pose frame and return the grading result as JSON.
///
/// # Safety
/// - `session` must be a valid pointer returned by `ptg_session_new`.
/// - `pose_json` must be a valid null-terminated C string.
/// - Returns a newly allocated string that must be freed with `ptg_free_string`.
/// - Returns NULL on error; call `ptg_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn ptg_session_grade(
    session: *mut GradingSessionHandle,
    pose_json: *const c_char,
) -> *mut c_char {
    clear_last_error();

    if session.is_null() {
        set_last_error("Null session pointer");
        return ptr::null_mut();
    }

    let handle = &mut *session;

    let json_str = match cstr_to_string(pose_json) {
        Some(s) => s,
        None => {
            set_last_error("Invalid pose JSON string pointer");
            return ptr::null_mut();
        }
    };

    match handle.session.process_pose_json(&json_str) {
        Ok(result) => string_to_cstr(&result),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

/// Current rep count of a session.
///
/// # Safety
/// - `session` must be a valid pointer returned by `ptg_session_new`.
/// - Returns -1 for a NULL session.
#[no_mangle]
pub unsafe extern "C" fn ptg_session_rep_count(session: *const GradingSessionHandle) -> i32 {
    if session.is_null() {
        set_last_error("Null session pointer");
        return -1;
    }
    let handle = &*session;
    i32::try_from(handle.session.rep_count()).unwrap_or(i32::MAX)
}

/// Save session state to JSON.
///
/// # Safety
/// - `session` must be a valid pointer returned by `ptg_session_new`.
/// - Returns a newly allocated string that must be freed with `ptg_free_string`.
/// - Returns NULL on error; call `ptg_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn ptg_session_save_state(session: *const GradingSessionHandle) -> *mut c_char {
    clear_last_error();

    if session.is_null() {
        set_last_error("Null session pointer");
        return ptr::null_mut();
    }

    let handle = &*session;

    match handle.session.save_state() {
        Ok(json) => string_to_cstr(&json),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

/// Load session state from JSON.
///
/// # Safety
/// - `session` must be a valid pointer returned by `ptg_session_new`.
/// - `json` must be a valid null-terminated C string.
/// - Returns 0 on success, non-zero on error.
/// - On error, call `ptg_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn ptg_session_load_state(
    session: *mut GradingSessionHandle,
    json: *const c_char,
) -> i32 {
    clear_last_error();

    if session.is_null() {
        set_last_error("Null session pointer");
        return -1;
    }

    let handle = &mut *session;

    let json_str = match cstr_to_string(json) {
        Some(s) => s,
        None => {
            set_last_error("Invalid JSON string pointer");
            return -1;
        }
    };

    match handle.session.load_state(&json_str) {
        Ok(()) => 0,
        Err(e) => {
            set_last_error(&e.to_string());
            -1
        }
    }
}

/// Finish a session and return its summary as JSON.
///
/// A negative `performance_value` means "use the counted reps".
///
/// # Safety
/// - `session` must be a valid pointer returned by `ptg_session_new`.
/// - Returns a newly allocated string that must be freed with `ptg_free_string`.
/// - Returns NULL on error; call `ptg_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn ptg_session_finish(
    session: *const GradingSessionHandle,
    performance_value: f64,
) -> *mut c_char {
    clear_last_error();

    if session.is_null() {
        set_last_error("Null session pointer");
        return ptr::null_mut();
    }

    let handle = &*session;
    let performance = (performance_value >= 0.0).then_some(performance_value);

    let summary = handle
        .session
        .finish(performance)
        .and_then(|summary| Ok(serde_json::to_string(&summary)?));

    match summary {
        Ok(json) => string_to_cstr(&json),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

// ============================================================================
// Memory Management
// ============================================================================

/// Free a string returned by grading functions.
///
/// # Safety
/// - `ptr` must be a valid pointer returned by a grading function, or NULL.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn ptg_free_string(ptr: *mut c_char) {
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
/// - The returned pointer is valid until the next grading call on this thread.
/// - Do NOT free the returned pointer.
/// - Returns NULL if no error occurred.
#[no_mangle]
pub unsafe extern "C" fn ptg_last_error() -> *const c_char {
    LAST_ERROR.with(|e| match &*e.borrow() {
        Some(cstr) => cstr.as_ptr(),
        None => ptr::null(),
    })
}

// ============================================================================
// Version Information
// ============================================================================

/// Get the library version.
///
/// # Safety
/// - Returns a pointer to a static string. Do NOT free.
#[no_mangle]
pub unsafe extern "C" fn ptg_version() -> *const c_char {
    static VERSION: &[u8] = concat!(env!("CARGO_PKG_VERSION"), "\0").as_bytes();
    VERSION.as_ptr() as *const c_char
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rep_counter::fixtures::pushup_pose;
    use std::ffi::CString;

    fn pose_cstring(angle: f64) -> CString {
        CString::new(serde_json::to_string(&pushup_pose(angle)).unwrap()).unwrap()
    }

    #[test]
    fn test_ffi_calculate_score() {
        let pushup = CString::new("pushup").unwrap();
        let run = CString::new("run").unwrap();

        unsafe {
            assert_eq!(ptg_calculate_score(pushup.as_ptr(), 68.0), 100);
            assert_eq!(ptg_calculate_score(run.as_ptr(), 912.0), 50);
            assert!(ptg_last_error().is_null());
        }
    }

    #[test]
    fn test_ffi_calculate_score_errors() {
        let unknown = CString::new("burpee").unwrap();
        let pushup = CString::new("pushup").unwrap();

        unsafe {
            assert_eq!(ptg_calculate_score(unknown.as_ptr(), 10.0), -1);
            let error = CStr::from_ptr(ptg_last_error()).to_str().unwrap();
            assert!(error.contains("burpee"));

            assert_eq!(ptg_calculate_score(pushup.as_ptr(), -3.0), -1);
            assert!(!ptg_last_error().is_null());

            assert_eq!(ptg_calculate_score(ptr::null(), 10.0), -1);
        }
    }

    #[test]
    fn test_ffi_session_lifecycle() {
        let pushup = CString::new("pushup").unwrap();

        unsafe {
            let session = ptg_session_new(pushup.as_ptr());
            assert!(!session.is_null());

            for angle in [170.0, 80.0, 170.0] {
                let pose = pose_cstring(angle);
                let result = ptg_session_grade(session, pose.as_ptr());
                assert!(!result.is_null());
                let result_str = CStr::from_ptr(result).to_str().unwrap();
                assert!(result_str.contains("\"isValid\":true"));
                ptg_free_string(result);
            }
            assert_eq!(ptg_session_rep_count(session), 1);

            // Save state and resume in a new session
            let state = ptg_session_save_state(session);
            assert!(!state.is_null());
            let session2 = ptg_session_new(pushup.as_ptr());
            assert_eq!(ptg_session_load_state(session2, state), 0);
            assert_eq!(ptg_session_rep_count(session2), 1);

            let summary = ptg_session_finish(session, -1.0);
            assert!(!summary.is_null());
            let summary_str = CStr::from_ptr(summary).to_str().unwrap();
            assert!(summary_str.contains("\"reps\":1"));
            assert!(summary_str.contains("\"score\":1"));

            ptg_free_string(summary);
            ptg_free_string(state);
            ptg_session_free(session);
            ptg_session_free(session2);
        }
    }

    #[test]
    fn test_ffi_session_errors() {
        let unknown = CString::new("plank").unwrap();
        let run = CString::new("run").unwrap();
        let garbage = CString::new("not json").unwrap();

        unsafe {
            assert!(ptg_session_new(unknown.as_ptr()).is_null());
            assert!(!ptg_last_error().is_null());

            let session = ptg_session_new(run.as_ptr());
            assert!(!session.is_null());

            assert!(ptg_session_grade(session, garbage.as_ptr()).is_null());
            assert!(ptg_session_finish(session, -1.0).is_null());
            let error = CStr::from_ptr(ptg_last_error()).to_str().unwrap();
            assert!(error.contains("run"));

            assert!(ptg_session_grade(ptr::null_mut(), garbage.as_ptr()).is_null());
            assert_eq!(ptg_session_rep_count(ptr::null()), -1);

            ptg_session_free(session);
        }
    }

    #[test]
    fn test_ffi_version() {
        unsafe {
            let version = ptg_version();
            assert!(!version.is_null());

            let version_str = CStr::from_ptr(version).to_str().unwrap();
            assert!(!version_str.is_empty());
        }
    }
}
