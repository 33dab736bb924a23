//! Native strings: owned, encoded, null-terminated buffers
//!
//! A `NativeString` owns its allocation. Dropping it (or calling `release`)
//! frees the buffer once; `into_raw` hands ownership to the receiver, who
//! gives it back through `release_raw` or `NativeString::from_raw`. The
//! registry records which of the two holds each buffer, and each release path
//! only frees buffers in its own state.

use core::ffi::{c_char, c_void};
use core::mem::ManuallyDrop;
use core::ptr::{self, NonNull};
use std::ffi::CStr;

use super::alloc::{self, Ownership};
use super::encoding::StringEncoding;
use crate::errors::{MarshalError, Result};
use crate::logging;

/// Owned native string buffer
#[derive(Debug)]
pub struct NativeString {
    ptr: NonNull<u8>,
    /// Encoded length in bytes, terminator excluded
    len: usize,
    encoding: StringEncoding,
}

// The buffer has exactly one owner and no interior sharing
unsafe impl Send for NativeString {}

impl NativeString {
    /// Marshal `value` with the process-wide encoding
    pub fn new(value: &str) -> Result<Self> {
        Self::with_encoding(value, StringEncoding::selected())
    }

    /// Marshal an optional value; `None` stands for a null managed string
    pub fn from_optional(value: Option<&str>, encoding: StringEncoding) -> Result<Self> {
        match value {
            Some(value) => Self::with_encoding(value, encoding),
            None => Err(MarshalError::invalid_argument("string must not be null")),
        }
    }

    /// Marshal `value` with an explicit encoding
    pub fn with_encoding(value: &str, encoding: StringEncoding) -> Result<Self> {
        if value.is_empty() {
            return Err(MarshalError::invalid_argument("string must not be empty"));
        }
        if value.contains('\0') {
            return Err(MarshalError::invalid_argument(
                "string contains an interior NUL and would be truncated",
            ));
        }

        let native = match encoding {
            StringEncoding::Utf8 => {
                let bytes = value.as_bytes();
                let ptr = alloc::allocate(bytes.len() + 1, encoding)?;
                unsafe {
                    ptr::copy_nonoverlapping(bytes.as_ptr(), ptr.as_ptr(), bytes.len());
                    *ptr.as_ptr().add(bytes.len()) = 0;
                }
                Self { ptr, len: bytes.len(), encoding }
            }
            StringEncoding::Utf16 => {
                let units: Vec<u16> = value.encode_utf16().collect();
                let len = units.len() * 2;
                let ptr = alloc::allocate(len + 2, encoding)?;
                // The native allocator aligns at least to 8, enough for u16
                let wide = ptr.as_ptr() as *mut u16;
                unsafe {
                    ptr::copy_nonoverlapping(units.as_ptr(), wide, units.len());
                    *wide.add(units.len()) = 0;
                }
                Self { ptr, len, encoding }
            }
        };

        logging::log_to_native(encoding, native.len, native.ptr.as_ptr());
        Ok(native)
    }

    /// Reclaim ownership of a buffer previously given away with `into_raw`
    ///
    /// # Safety
    /// `ptr` must have come from `into_raw` and must not be owned by anyone else.
    pub unsafe fn from_raw(ptr: *mut c_void) -> Result<Self> {
        let ptr =
            NonNull::new(ptr as *mut u8).ok_or(MarshalError::null_reference("native string"))?;
        let allocation = alloc::transition(ptr, Ownership::Transferred, Ownership::Owned)?;

        Ok(Self {
            ptr,
            len: allocation.size - allocation.encoding.terminator_len(),
            encoding: allocation.encoding,
        })
    }

    /// Pointer to the first code unit, valid while `self` is alive
    #[inline]
    pub fn as_ptr(&self) -> *const c_void {
        self.ptr.as_ptr() as *const c_void
    }

    #[inline]
    pub fn encoding(&self) -> StringEncoding {
        self.encoding
    }

    /// Encoded length in bytes, terminator excluded
    #[inline]
    pub fn byte_len(&self) -> usize {
        self.len
    }

    /// Encoded bytes, terminator excluded
    pub fn as_bytes(&self) -> &[u8] {
        unsafe { core::slice::from_raw_parts(self.ptr.as_ptr(), self.len) }
    }

    /// Encoded bytes including the terminator
    pub fn as_bytes_with_terminator(&self) -> &[u8] {
        let total = self.len + self.encoding.terminator_len();
        unsafe { core::slice::from_raw_parts(self.ptr.as_ptr(), total) }
    }

    /// Decode the buffer back into a Rust string
    pub fn to_string_checked(&self) -> Result<String> {
        unsafe { from_native_with(self.as_ptr(), self.encoding) }
    }

    /// Transfer ownership to the receiver; the buffer is no longer freed on drop
    pub fn into_raw(self) -> *mut c_void {
        let this = ManuallyDrop::new(self);
        if let Err(err) = alloc::transition(this.ptr, Ownership::Owned, Ownership::Transferred) {
            logging::log_marshal_error("into_raw", &err);
        }
        logging::log_ownership_transfer(this.ptr.as_ptr());
        this.ptr.as_ptr() as *mut c_void
    }

    /// Free the buffer now
    pub fn release(self) -> Result<()> {
        let this = ManuallyDrop::new(self);
        alloc::release(this.ptr, Ownership::Owned).map(|_| ())
    }
}

impl Drop for NativeString {
    fn drop(&mut self) {
        if let Err(err) = alloc::release(self.ptr, Ownership::Owned) {
            logging::log_marshal_error("native_string_drop", &err);
        }
    }
}

/// Decode a native string with the process-wide encoding
///
/// # Safety
/// `ptr` must be null or point to a terminated string in that encoding.
pub unsafe fn from_native(ptr: *const c_void) -> Result<String> {
    from_native_with(ptr, StringEncoding::selected())
}

/// Decode a native string with an explicit encoding
///
/// Pure read: the buffer is neither freed nor modified.
///
/// # Safety
/// `ptr` must be null or point to a terminated string in `encoding`.
pub unsafe fn from_native_with(ptr: *const c_void, encoding: StringEncoding) -> Result<String> {
    if ptr.is_null() {
        return Err(MarshalError::null_reference("native string"));
    }

    // Buffers this boundary produced carry their encoding; mixing is an error
    if let Some(allocation) = alloc::lookup(ptr as *const u8) {
        if allocation.encoding != encoding {
            return Err(MarshalError::invalid_encoding(
                encoding,
                format!("buffer was marshalled as {}", allocation.encoding),
            ));
        }
    }

    let decoded = match encoding {
        StringEncoding::Utf8 => CStr::from_ptr(ptr as *const c_char)
            .to_str()
            .map(str::to_owned)
            .map_err(|e| MarshalError::invalid_encoding(encoding, e))?,
        StringEncoding::Utf16 => {
            let wide = ptr as *const u16;
            if !wide.is_aligned() {
                return Err(MarshalError::invalid_argument("utf-16 buffer is not 2-byte aligned"));
            }
            let mut len = 0;
            while *wide.add(len) != 0 {
                len += 1;
            }
            let units = core::slice::from_raw_parts(wide, len);
            String::from_utf16(units).map_err(|e| MarshalError::invalid_encoding(encoding, e))?
        }
    };

    logging::log_from_native(encoding, decoded.len(), ptr as *const u8);
    Ok(decoded)
}

/// Release a buffer whose ownership was transferred with `into_raw`
///
/// Null is a no-op. An address that is not live as a transferred buffer
/// yields `DoubleRelease` and nothing is freed.
pub fn release_raw(ptr: *mut c_void) -> Result<()> {
    match NonNull::new(ptr as *mut u8) {
        Some(ptr) => alloc::release(ptr, Ownership::Transferred).map(|_| ()),
        None => Ok(()),
    }
}
