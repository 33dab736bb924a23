//! Bundled native host
//!
//! Declarations for `native/nativehost.c`, compiled and linked by `build.rs`.
//! The signatures mirror `native/include/nativehost.h`.

use core::ffi::{c_char, c_void};

use crate::interop::{ComplicatedParamStruct, StringEncoding};

extern "C" {
    pub fn print_simple_message();
    pub fn print_int(i: i32);
    pub fn print_float(f: f32);
    pub fn print_struct_pointer(params: *const ComplicatedParamStruct);
    pub fn print_struct_copy(params: ComplicatedParamStruct);
    pub fn print_struct_reference(params: *mut ComplicatedParamStruct);
    pub fn native_log(message: *const c_char);
    pub fn native_log_custom_marshalling(message: *const c_void) -> usize;

    pub fn native_struct_size() -> usize;
    pub fn native_struct_align() -> usize;
    pub fn native_struct_offset_value() -> usize;
    pub fn native_struct_offset_flag() -> usize;

    pub fn native_struct_echo(params: ComplicatedParamStruct) -> ComplicatedParamStruct;
    pub fn native_struct_option(params: ComplicatedParamStruct) -> i32;
    pub fn native_struct_mutate(params: *mut ComplicatedParamStruct);

    pub fn native_utf8_len(s: *const c_char) -> usize;
    pub fn native_utf16_len(s: *const u16) -> usize;
    pub fn native_utf8_reply(s: *const c_char) -> *const c_char;
    pub fn native_utf16_reply(s: *const u16) -> *const u16;

    pub fn native_invoke_void(f: Option<extern "C" fn()>);
    pub fn native_invoke_int_to_double(f: Option<extern "C" fn(i32) -> f64>, value: i32) -> f64;
    pub fn native_add_half(value: i32) -> f64;
}

/// Address of the native string-reply function matching the given encoding
pub fn string_reply_fn(encoding: StringEncoding) -> *const c_void {
    match encoding {
        StringEncoding::Utf8 => native_utf8_reply as *const c_void,
        StringEncoding::Utf16 => native_utf16_reply as *const c_void,
    }
}
