//! Fixed-layout structs shared with native code
//!
//! Layouts are sequential in declared field order with C padding rules.
//! `StructLayout::sequential` computes them from `FfiType` descriptors so the
//! Rust `#[repr(C)]` definitions can be checked against an independent model.

use core::ffi::c_void;
use core::mem::{align_of, offset_of, size_of};

use super::marshaller::Boundary;
use super::types::FfiType;
use crate::errors::{MarshalError, Result};

/// One field placed in a struct layout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldLayout {
    pub ty: FfiType,
    pub offset: usize,
}

/// Computed native layout of a sequential struct
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructLayout {
    pub fields: Vec<FieldLayout>,
    pub size: usize,
    pub align: usize,
}

impl StructLayout {
    /// Lay out `fields` in order, padding each to its alignment
    pub fn sequential(fields: &[FfiType]) -> Self {
        let mut offset = 0;
        let mut align = 1;
        let mut placed = Vec::with_capacity(fields.len());

        for &ty in fields {
            let field_align = ty.align();
            offset = round_up(offset, field_align);
            placed.push(FieldLayout { ty, offset });
            offset += ty.size();
            align = align.max(field_align);
        }

        Self {
            fields: placed,
            size: round_up(offset, align),
            align,
        }
    }

    pub fn offset_of(&self, index: usize) -> Option<usize> {
        self.fields.get(index).map(|f| f.offset)
    }

    /// Bytes not covered by any field
    pub fn padding(&self) -> usize {
        self.size - self.fields.iter().map(|f| f.ty.size()).sum::<usize>()
    }
}

#[inline]
const fn round_up(value: usize, align: usize) -> usize {
    (value + align - 1) / align * align
}

/// Parameter struct matching the native `complicated_param_struct`
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ComplicatedParamStruct {
    pub some_option: i32,
    pub value_of_option: f64,
    pub do_complicated_thingy: bool,
}

/// Native size of `ComplicatedParamStruct` in bytes
pub const COMPLICATED_PARAM_SIZE: usize = size_of::<ComplicatedParamStruct>();

impl ComplicatedParamStruct {
    pub const FIELDS: [FfiType; 3] = [FfiType::I32, FfiType::F64, FfiType::Bool];

    pub const fn new(some_option: i32, value_of_option: f64, do_complicated_thingy: bool) -> Self {
        Self { some_option, value_of_option, do_complicated_thingy }
    }

    pub fn layout() -> StructLayout {
        StructLayout::sequential(&Self::FIELDS)
    }

    /// Native byte image, padding zeroed
    pub fn to_native_bytes(&self) -> [u8; COMPLICATED_PARAM_SIZE] {
        let mut bytes = [0u8; COMPLICATED_PARAM_SIZE];
        let option_at = offset_of!(Self, some_option);
        let value_at = offset_of!(Self, value_of_option);
        let flag_at = offset_of!(Self, do_complicated_thingy);

        bytes[option_at..option_at + 4].copy_from_slice(&self.some_option.to_ne_bytes());
        bytes[value_at..value_at + 8].copy_from_slice(&self.value_of_option.to_ne_bytes());
        bytes[flag_at] = u8::from(self.do_complicated_thingy);
        bytes
    }

    /// Rebuild from a native byte image
    pub fn from_native_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != COMPLICATED_PARAM_SIZE {
            return Err(MarshalError::SizeMismatch {
                expected: COMPLICATED_PARAM_SIZE,
                found: bytes.len(),
            });
        }

        let option_at = offset_of!(Self, some_option);
        let value_at = offset_of!(Self, value_of_option);
        let flag_at = offset_of!(Self, do_complicated_thingy);

        let mut option = [0u8; 4];
        option.copy_from_slice(&bytes[option_at..option_at + 4]);
        let mut value = [0u8; 8];
        value.copy_from_slice(&bytes[value_at..value_at + 8]);

        let flag = match bytes[flag_at] {
            0 => false,
            1 => true,
            other => {
                return Err(MarshalError::invalid_argument(format!(
                    "bool field holds {:#04x}, expected 0 or 1",
                    other
                )))
            }
        };

        Ok(Self {
            some_option: i32::from_ne_bytes(option),
            value_of_option: f64::from_ne_bytes(value),
            do_complicated_thingy: flag,
        })
    }

    /// Read a struct from native memory of `len` bytes
    ///
    /// # Safety
    /// `ptr` must be null or valid for reads of `len` bytes.
    pub unsafe fn read_from(ptr: *const c_void, len: usize) -> Result<Self> {
        if ptr.is_null() {
            return Err(MarshalError::null_reference("struct pointer"));
        }
        let bytes = core::slice::from_raw_parts(ptr as *const u8, len);
        Self::from_native_bytes(bytes)
    }
}

/// Pass a struct by value; the callee gets its own copy
///
/// # Safety
/// `f` must be a valid function with exactly this native signature.
pub unsafe fn pass_by_value<R>(
    value: ComplicatedParamStruct,
    f: unsafe extern "C" fn(ComplicatedParamStruct) -> R,
) -> R {
    tracing::trace!(event = "struct_by_value", size_bytes = COMPLICATED_PARAM_SIZE);
    f(value)
}

/// Pass a struct by reference; the pointer is valid only for the call
///
/// Changes the callee makes are visible in `value` afterwards.
///
/// # Safety
/// `f` must be a valid function with exactly this native signature and must
/// not retain the pointer.
pub unsafe fn pass_by_reference<R>(
    value: &mut ComplicatedParamStruct,
    f: unsafe extern "C" fn(*mut ComplicatedParamStruct) -> R,
) -> R {
    let address = value as *const ComplicatedParamStruct;
    tracing::trace!(event = "struct_by_reference", address = ?address);
    f(value)
}

/// Entry-point argument block: a native string message and a number
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct LibArgs {
    pub message: *const c_void,
    pub number: i32,
}

impl LibArgs {
    pub const FIELDS: [FfiType; 2] = [FfiType::String, FfiType::I32];

    pub fn layout() -> StructLayout {
        StructLayout::sequential(&Self::FIELDS)
    }

    /// Read an argument block from `(arg, arg_len)`
    ///
    /// # Safety
    /// `arg` must be null or valid for reads of `arg_len` bytes.
    pub unsafe fn from_raw(arg: *const c_void, arg_len: i32) -> Result<Self> {
        if arg.is_null() {
            return Err(MarshalError::null_reference("argument block"));
        }
        let found = usize::try_from(arg_len).unwrap_or(0);
        if found < size_of::<Self>() {
            return Err(MarshalError::SizeMismatch {
                expected: size_of::<Self>(),
                found,
            });
        }
        Ok((arg as *const Self).read_unaligned())
    }

    /// Decode the message field
    ///
    /// # Safety
    /// `self.message` must be null or a terminated string in the boundary's encoding.
    pub unsafe fn message(&self, boundary: &Boundary) -> Result<String> {
        boundary.from_native(self.message)
    }
}

const _: () = {
    assert!(align_of::<ComplicatedParamStruct>() == align_of::<f64>());
    assert!(offset_of!(ComplicatedParamStruct, some_option) == 0);
};
