//! Test suite for the marshalling boundary

use super::*;
use crate::errors::MarshalError;
use core::ffi::c_void;

// Test helpers
extern "C" fn add_half(i: i32) -> f64 {
    f64::from(i) + 0.5
}

extern "C" fn no_args() -> i32 {
    42
}

extern "C" fn sum3(a: i32, b: i32, c: i32) -> i64 {
    i64::from(a) + i64::from(b) + i64::from(c)
}

extern "C" fn reply_utf8(_arg: *const c_void) -> *const c_void {
    b"This string is from c++ :)\0".as_ptr() as *const c_void
}

extern "C" fn read_struct_by_value(s: ComplicatedParamStruct) -> i32 {
    s.some_option
}

extern "C" fn bump_struct(s: *mut ComplicatedParamStruct) {
    let s = unsafe { &mut *s };
    s.some_option += 1;
    s.do_complicated_thingy = true;
}

const SAMPLE: &str = "This string is from c#";

#[test]
fn test_round_trip_both_encodings() {
    for encoding in [StringEncoding::Utf8, StringEncoding::Utf16] {
        let boundary = Boundary::new(encoding);
        let native = boundary.to_native(SAMPLE).unwrap();
        assert_eq!(native.encoding(), encoding);

        let decoded = unsafe { boundary.from_native(native.as_ptr()) }.unwrap();
        assert_eq!(decoded, SAMPLE);
        boundary.release(native).unwrap();
    }
}

#[test]
fn test_utf8_bytes_are_exact() {
    let native = NativeString::with_encoding(SAMPLE, StringEncoding::Utf8).unwrap();
    assert_eq!(native.as_bytes(), SAMPLE.as_bytes());
    assert_eq!(native.as_bytes_with_terminator().last(), Some(&0));
    assert_eq!(native.byte_len(), SAMPLE.len());
}

#[test]
fn test_utf16_bytes_are_exact() {
    let native = NativeString::with_encoding("héllo 😀", StringEncoding::Utf16).unwrap();
    let expected: Vec<u8> = "héllo 😀"
        .encode_utf16()
        .flat_map(|unit| unit.to_ne_bytes())
        .collect();
    assert_eq!(native.as_bytes(), expected.as_slice());
    assert_eq!(&native.as_bytes_with_terminator()[expected.len()..], &[0, 0]);
}

#[test]
fn test_empty_and_null_rejected() {
    assert!(matches!(
        NativeString::new(""),
        Err(MarshalError::InvalidArgument { .. })
    ));

    let boundary = Boundary::platform();
    assert!(matches!(
        boundary.convert_to_unmanaged(None),
        Err(MarshalError::InvalidArgument { .. })
    ));
    assert!(matches!(
        boundary.convert_to_unmanaged(Some("")),
        Err(MarshalError::InvalidArgument { .. })
    ));
}

#[test]
fn test_interior_nul_rejected() {
    assert!(matches!(
        NativeString::with_encoding("a\0b", StringEncoding::Utf8),
        Err(MarshalError::InvalidArgument { .. })
    ));
}

#[test]
fn test_from_native_null() {
    for encoding in [StringEncoding::Utf8, StringEncoding::Utf16] {
        let result = unsafe { from_native_with(core::ptr::null(), encoding) };
        assert_eq!(result, Err(MarshalError::null_reference("native string")));
    }
}

#[test]
fn test_from_native_does_not_free() {
    let native = NativeString::new(SAMPLE).unwrap();
    let ptr = native.as_ptr();

    unsafe {
        assert_eq!(from_native(ptr).unwrap(), SAMPLE);
        assert_eq!(from_native(ptr).unwrap(), SAMPLE);
    }
    assert!(alloc::is_live(ptr as *const u8));
}

#[test]
fn test_invalid_utf8_rejected() {
    let bytes = [0x66u8, 0xff, 0x6f, 0x00];
    let result = unsafe { from_native_with(bytes.as_ptr() as *const c_void, StringEncoding::Utf8) };
    assert!(matches!(result, Err(MarshalError::InvalidEncoding { .. })));
}

#[test]
fn test_unpaired_surrogate_rejected() {
    let units = [0x0068u16, 0xd800, 0x0069, 0x0000];
    let result =
        unsafe { from_native_with(units.as_ptr() as *const c_void, StringEncoding::Utf16) };
    assert!(matches!(result, Err(MarshalError::InvalidEncoding { .. })));
}

#[test]
fn test_mixed_encoding_detected() {
    let native = NativeString::with_encoding(SAMPLE, StringEncoding::Utf16).unwrap();
    let utf8 = Boundary::new(StringEncoding::Utf8);

    let result = unsafe { utf8.from_native(native.as_ptr()) };
    assert!(matches!(
        result,
        Err(MarshalError::InvalidEncoding { encoding: StringEncoding::Utf8, .. })
    ));
}

#[test]
fn test_ownership_transfer_and_single_release() {
    let _guard = alloc::transfer_guard();
    let raw = NativeString::new(SAMPLE).unwrap().into_raw();
    assert!(alloc::is_live(raw as *const u8));

    release_raw(raw).unwrap();
    assert!(!alloc::is_live(raw as *const u8));

    // The second release is detected and does not reach the allocator
    assert_eq!(
        release_raw(raw),
        Err(MarshalError::DoubleRelease { address: raw as usize })
    );
}

#[test]
fn test_stale_release_spares_reused_address() {
    let _guard = alloc::transfer_guard();
    let raw = NativeString::with_encoding("first owner", StringEncoding::Utf8)
        .unwrap()
        .into_raw();
    release_raw(raw).unwrap();

    // Same size, so the allocator is free to hand back the address just released
    let other = NativeString::with_encoding("other owner", StringEncoding::Utf8).unwrap();

    assert_eq!(
        release_raw(raw),
        Err(MarshalError::DoubleRelease { address: raw as usize })
    );
    assert!(alloc::is_live(other.as_ptr() as *const u8));
    assert_eq!(other.to_string_checked().unwrap(), "other owner");
    other.release().unwrap();
}

#[test]
fn test_owned_buffer_rejects_raw_release() {
    let native = NativeString::new(SAMPLE).unwrap();
    let ptr = native.as_ptr() as *mut c_void;

    assert!(matches!(release_raw(ptr), Err(MarshalError::DoubleRelease { .. })));
    assert!(matches!(
        unsafe { NativeString::from_raw(ptr) },
        Err(MarshalError::DoubleRelease { .. })
    ));
    assert!(alloc::is_live(ptr as *const u8));
    native.release().unwrap();
}

#[test]
fn test_release_null_is_noop() {
    assert_eq!(release_raw(core::ptr::null_mut()), Ok(()));
}

#[test]
fn test_from_raw_reclaims_ownership() {
    let _guard = alloc::transfer_guard();
    let raw = NativeString::with_encoding(SAMPLE, StringEncoding::Utf16)
        .unwrap()
        .into_raw();

    let native = unsafe { NativeString::from_raw(raw) }.unwrap();
    assert_eq!(native.encoding(), StringEncoding::Utf16);
    assert_eq!(native.to_string_checked().unwrap(), SAMPLE);
    drop(native);

    assert!(!alloc::is_live(raw as *const u8));
    assert!(matches!(
        unsafe { NativeString::from_raw(raw) },
        Err(MarshalError::DoubleRelease { .. })
    ));
}

#[test]
fn test_with_native_frees_after_call() {
    let boundary = Boundary::new(StringEncoding::Utf8);
    let mut seen = core::ptr::null();

    let len = boundary
        .with_native(SAMPLE, |ptr| {
            seen = ptr;
            unsafe { from_native_with(ptr, StringEncoding::Utf8) }.unwrap().len()
        })
        .unwrap();

    assert_eq!(len, SAMPLE.len());
    assert!(!alloc::is_live(seen as *const u8));
}

#[test]
fn test_sequential_layout() {
    let layout = ComplicatedParamStruct::layout();
    assert_eq!(layout.size, core::mem::size_of::<ComplicatedParamStruct>());
    assert_eq!(layout.align, core::mem::align_of::<ComplicatedParamStruct>());
    assert_eq!(
        layout.offset_of(0),
        Some(core::mem::offset_of!(ComplicatedParamStruct, some_option))
    );
    assert_eq!(
        layout.offset_of(1),
        Some(core::mem::offset_of!(ComplicatedParamStruct, value_of_option))
    );
    assert_eq!(
        layout.offset_of(2),
        Some(core::mem::offset_of!(ComplicatedParamStruct, do_complicated_thingy))
    );
    assert_eq!(layout.offset_of(3), None);

    let args = LibArgs::layout();
    assert_eq!(args.size, core::mem::size_of::<LibArgs>());
    assert_eq!(args.offset_of(1), Some(core::mem::offset_of!(LibArgs, number)));
}

#[test]
fn test_layout_padding() {
    let layout = StructLayout::sequential(&[FfiType::U8, FfiType::U32, FfiType::U8]);
    assert_eq!(layout.offset_of(1), Some(4));
    assert_eq!(layout.offset_of(2), Some(8));
    assert_eq!(layout.size, 12);
    assert_eq!(layout.padding(), 6);
}

#[test]
fn test_struct_bytes_stable() {
    let params = ComplicatedParamStruct::new(11, 43.67, false);
    let bytes = params.to_native_bytes();
    assert_eq!(bytes.len(), COMPLICATED_PARAM_SIZE);
    assert_eq!(ComplicatedParamStruct::from_native_bytes(&bytes).unwrap(), params);

    let read = unsafe {
        ComplicatedParamStruct::read_from(bytes.as_ptr() as *const c_void, bytes.len())
    };
    assert_eq!(read.unwrap(), params);
}

#[test]
fn test_struct_bytes_match_memory() {
    let params = ComplicatedParamStruct::new(-7, 1.25, true);
    let bytes = params.to_native_bytes();
    let layout = ComplicatedParamStruct::layout();

    // Compare field bytes only; padding in `params` is uninitialized
    let base = &params as *const ComplicatedParamStruct as *const u8;
    for field in &layout.fields {
        let memory =
            unsafe { core::slice::from_raw_parts(base.add(field.offset), field.ty.size()) };
        assert_eq!(&bytes[field.offset..field.offset + field.ty.size()], memory);
    }
}

#[test]
fn test_struct_bytes_rejected() {
    assert_eq!(
        ComplicatedParamStruct::from_native_bytes(&[0u8; 8]),
        Err(MarshalError::SizeMismatch { expected: COMPLICATED_PARAM_SIZE, found: 8 })
    );

    let mut bytes = ComplicatedParamStruct::default().to_native_bytes();
    bytes[core::mem::offset_of!(ComplicatedParamStruct, do_complicated_thingy)] = 2;
    assert!(matches!(
        ComplicatedParamStruct::from_native_bytes(&bytes),
        Err(MarshalError::InvalidArgument { .. })
    ));
}

#[test]
fn test_struct_passing_modes() {
    let mut params = ComplicatedParamStruct::new(11, 43.67, false);

    let option = unsafe { pass_by_value(params, read_struct_by_value) };
    assert_eq!(option, 11);
    assert_eq!(params, ComplicatedParamStruct::new(11, 43.67, false));

    unsafe { pass_by_reference(&mut params, bump_struct) };
    assert_eq!(params, ComplicatedParamStruct::new(12, 43.67, true));
}

#[test]
fn test_lib_args_size_check() {
    let message = NativeString::new("from host!").unwrap();
    let args = LibArgs { message: message.as_ptr(), number: 3 };
    let ptr = &args as *const LibArgs as *const c_void;
    let size = core::mem::size_of::<LibArgs>() as i32;

    let read = unsafe { LibArgs::from_raw(ptr, size) }.unwrap();
    assert_eq!(read.number, 3);
    assert_eq!(unsafe { read.message(&Boundary::platform()) }.unwrap(), "from host!");

    assert!(matches!(
        unsafe { LibArgs::from_raw(ptr, size - 1) },
        Err(MarshalError::SizeMismatch { .. })
    ));
    assert!(matches!(
        unsafe { LibArgs::from_raw(ptr, -1) },
        Err(MarshalError::SizeMismatch { found: 0, .. })
    ));
}

#[test]
fn test_signature_display() {
    let sig = Signature::c(vec![FfiType::I32], FfiType::F64);
    assert_eq!(sig.to_string(), "extern \"C\" fn(int32_t) -> double");
    assert_eq!(sig.arity(), 1);
}

#[test]
fn test_static_signatures() {
    assert_eq!(
        <extern "C" fn(i32) -> f64 as NativeFn>::signature(),
        Signature::c(vec![FfiType::I32], FfiType::F64)
    );
    assert_eq!(
        <extern "C" fn() as NativeFn>::signature(),
        Signature::c(vec![], FfiType::Void)
    );
}

#[test]
fn test_callback_invoke() {
    let cb = Callback::<extern "C" fn(i32) -> f64>::new(add_half);
    assert_eq!(cb.invoke(20), 20.5);

    let cb = Callback::<extern "C" fn() -> i32>::new(no_args);
    assert_eq!(cb.invoke(), 42);

    let cb = Callback::<extern "C" fn(i32, i32, i32) -> i64>::new(sum3);
    assert_eq!(cb.invoke(1, 2, 3), 6);
}

#[test]
fn test_callback_bind_checks_signature() {
    let raw = add_half as *const c_void;

    let declared = Signature::c(vec![FfiType::I32], FfiType::F64);
    let cb = unsafe { Callback::<extern "C" fn(i32) -> f64>::bind(raw, &declared) }.unwrap();
    assert_eq!(cb.invoke(1), 1.5);
    assert_eq!(cb.as_raw(), raw);

    let wrong_ret = Signature::c(vec![FfiType::I32], FfiType::F32);
    assert!(matches!(
        unsafe { Callback::<extern "C" fn(i32) -> f64>::bind(raw, &wrong_ret) },
        Err(MarshalError::SignatureMismatch { .. })
    ));

    let wrong_arity = Signature::c(vec![FfiType::I32, FfiType::I32], FfiType::F64);
    assert!(matches!(
        unsafe { Callback::<extern "C" fn(i32) -> f64>::bind(raw, &wrong_arity) },
        Err(MarshalError::SignatureMismatch { .. })
    ));
}

#[test]
fn test_callback_bind_null() {
    let declared = Signature::c(vec![], FfiType::I32);
    assert_eq!(
        unsafe { Callback::<extern "C" fn() -> i32>::bind(core::ptr::null(), &declared) }
            .unwrap_err(),
        MarshalError::null_reference("callback")
    );
}

#[test]
fn test_string_callback() {
    let boundary = Boundary::new(StringEncoding::Utf8);
    let declared = Callback::<StringCallbackFn>::string_signature();

    let cb = unsafe { Callback::<StringCallbackFn>::bind(reply_utf8 as *const c_void, &declared) }
        .unwrap();
    assert_eq!(
        cb.invoke_with_string(&boundary, "String from c#").unwrap(),
        "This string is from c++ :)"
    );
}

#[test]
fn test_interop_stats() {
    let stats = stats();
    assert_eq!(stats.encoding, StringEncoding::platform());
}
