//! C API for native hosts
//!
//! Design: Minimal C-compatible interface; failures are reported as status
//! codes (0 success, negative `MarshalError` codes) plus a thread-local last
//! error for functions that return pointers.

use std::cell::Cell;
use std::ffi::{CStr, CString};
use std::os::raw::{c_char, c_void};
use std::ptr;

use crate::errors::{MarshalError, Result};
use crate::interop::{Boundary, LibArgs, NativeString, StringEncoding};
use crate::logging::{self, info};

thread_local! {
    static LAST_ERROR: Cell<i32> = const { Cell::new(0) };
}

fn record<T>(operation: &str, result: Result<T>) -> Option<T> {
    match result {
        Ok(value) => {
            LAST_ERROR.with(|e| e.set(0));
            Some(value)
        }
        Err(err) => {
            logging::log_marshal_error(operation, &err);
            LAST_ERROR.with(|e| e.set(err.status_code()));
            None
        }
    }
}

/// Initialize logging and fix the encoding for this process
#[no_mangle]
pub extern "C" fn hostinterop_init() {
    logging::init();
    let encoding = StringEncoding::selected();
    info!(encoding = %encoding, "Marshalling boundary ready");
}

/// Status code of the last failed call on this thread (0 if it succeeded)
#[no_mangle]
pub extern "C" fn hostinterop_last_error() -> i32 {
    LAST_ERROR.with(Cell::get)
}

/// Process encoding: 1 for UTF-8, 2 for UTF-16
#[no_mangle]
pub extern "C" fn hostinterop_encoding() -> i32 {
    match StringEncoding::selected() {
        StringEncoding::Utf8 => 1,
        StringEncoding::Utf16 => 2,
    }
}

/// Marshal a UTF-8 string into a native string owned by the caller
///
/// Returns null on failure. Free the result with `hostinterop_string_release`.
#[no_mangle]
pub extern "C" fn hostinterop_string_to_native(utf8: *const c_char) -> *mut c_void {
    let result = if utf8.is_null() {
        Err(MarshalError::invalid_argument("string must not be null"))
    } else {
        let c_str = unsafe { CStr::from_ptr(utf8) };
        c_str
            .to_str()
            .map_err(|e| MarshalError::invalid_encoding(StringEncoding::Utf8, e))
            .and_then(NativeString::new)
            .map(NativeString::into_raw)
    };

    record("string_to_native", result).unwrap_or(ptr::null_mut())
}

/// Decode a native string into a newly allocated UTF-8 copy
///
/// Returns null on failure. Free the result with `hostinterop_free_utf8`.
#[no_mangle]
pub extern "C" fn hostinterop_string_from_native(native: *const c_void) -> *mut c_char {
    let result = unsafe { Boundary::platform().from_native(native) }.and_then(|s| {
        CString::new(s).map_err(|_| MarshalError::invalid_argument("decoded string contains NUL"))
    });

    record("string_from_native", result)
        .map(CString::into_raw)
        .unwrap_or(ptr::null_mut())
}

/// Release a native string whose ownership was transferred to the caller
///
/// Returns 0, or a negative status when the buffer is not live.
#[no_mangle]
pub extern "C" fn hostinterop_string_release(native: *mut c_void) -> i32 {
    let result = Boundary::platform().release_raw(native);
    match record("string_release", result) {
        Some(()) => 0,
        None => hostinterop_last_error(),
    }
}

/// Free a UTF-8 string returned by `hostinterop_string_from_native`
#[no_mangle]
pub extern "C" fn hostinterop_free_utf8(s: *mut c_char) {
    if !s.is_null() {
        unsafe {
            drop(CString::from_raw(s));
        }
    }
}

/// Component entry point taking a `LibArgs` block
///
/// Returns 0 on success and 1 when `arg_len` is smaller than the block,
/// other failures as negative status codes.
#[no_mangle]
pub extern "C" fn hostinterop_hello(arg: *const c_void, arg_len: i32) -> i32 {
    let boundary = Boundary::platform();
    let result = unsafe { LibArgs::from_raw(arg, arg_len) }
        .and_then(|args| unsafe { args.message(&boundary) }.map(|message| (message, args.number)));

    match result {
        Ok((message, number)) => {
            LAST_ERROR.with(|e| e.set(0));
            info!(message = %message, number, "Hello from the marshalling boundary");
            0
        }
        Err(err) => {
            let code = match err {
                MarshalError::SizeMismatch { .. } => 1,
                _ => err.status_code(),
            };
            record::<()>("hello", Err(err));
            code
        }
    }
}

/// Component entry point taking `LibArgs` by value
///
/// Returns 0, or a negative status code when the message cannot be decoded.
#[no_mangle]
pub extern "C" fn hostinterop_custom_entry_point(args: LibArgs) -> i32 {
    let result = unsafe { args.message(&Boundary::platform()) };

    match record("custom_entry_point", result) {
        Some(message) => {
            info!(message = %message, number = args.number, "Hello from the custom entry point");
            0
        }
        None => hostinterop_last_error(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_input_sets_last_error() {
        let native = hostinterop_string_to_native(ptr::null());
        assert!(native.is_null());
        assert_eq!(
            hostinterop_last_error(),
            MarshalError::invalid_argument("").status_code()
        );
    }

    #[test]
    fn test_c_round_trip() {
        let _guard = crate::interop::alloc::transfer_guard();
        let input = CString::new("This string is from c#").unwrap();
        let native = hostinterop_string_to_native(input.as_ptr());
        assert!(!native.is_null());
        assert_eq!(hostinterop_last_error(), 0);

        let back = hostinterop_string_from_native(native);
        assert!(!back.is_null());
        let decoded = unsafe { CStr::from_ptr(back) }.to_str().unwrap().to_owned();
        assert_eq!(decoded, "This string is from c#");
        hostinterop_free_utf8(back);

        assert_eq!(hostinterop_string_release(native), 0);
        assert_eq!(
            hostinterop_string_release(native),
            MarshalError::DoubleRelease { address: 0 }.status_code()
        );
    }

    #[test]
    fn test_from_native_null() {
        assert!(hostinterop_string_from_native(ptr::null()).is_null());
        assert_eq!(
            hostinterop_last_error(),
            MarshalError::null_reference("").status_code()
        );
    }

    #[test]
    fn test_hello_rejects_short_block() {
        let message = NativeString::new("from host!").unwrap();
        let args = LibArgs { message: message.as_ptr(), number: 0 };
        let arg = &args as *const LibArgs as *const c_void;
        let len = std::mem::size_of::<LibArgs>() as i32;

        assert_eq!(hostinterop_hello(arg, len), 0);
        assert_eq!(hostinterop_hello(arg, len - 4), 1);
        assert_eq!(
            hostinterop_hello(ptr::null(), len),
            MarshalError::null_reference("").status_code()
        );
    }

    #[test]
    fn test_custom_entry_point_by_value() {
        let message = NativeString::new("from host!").unwrap();
        let args = LibArgs { message: message.as_ptr(), number: -1 };
        assert_eq!(hostinterop_custom_entry_point(args), 0);
        assert_eq!(hostinterop_last_error(), 0);

        let null_message = LibArgs { message: ptr::null(), number: -1 };
        assert_eq!(
            hostinterop_custom_entry_point(null_message),
            MarshalError::null_reference("").status_code()
        );
        assert_eq!(hostinterop_last_error(), MarshalError::null_reference("").status_code());
    }

    #[test]
    fn test_encoding_code() {
        let expected = if cfg!(windows) { 2 } else { 1 };
        assert_eq!(hostinterop_encoding(), expected);
    }
}
