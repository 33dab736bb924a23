//! Type descriptors for values crossing the boundary
//!
//! Sizes and alignments come from the Rust primitives themselves, which match
//! the C ABI of the target.

use core::ffi::c_void;
use core::fmt;
use core::mem::{align_of, size_of};

/// FFI-compatible type descriptor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum FfiType {
    Void,
    Bool,
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    F32,
    F64,
    Pointer,
    /// Pointer to a null-terminated native string
    String,
}

impl FfiType {
    /// Get size of type in bytes
    #[inline]
    pub const fn size(self) -> usize {
        match self {
            Self::Void => 0,
            Self::Bool => size_of::<bool>(),
            Self::I8 | Self::U8 => 1,
            Self::I16 | Self::U16 => 2,
            Self::I32 | Self::U32 => 4,
            Self::F32 => size_of::<f32>(),
            Self::I64 | Self::U64 => 8,
            Self::F64 => size_of::<f64>(),
            Self::Pointer | Self::String => size_of::<*const c_void>(),
        }
    }

    /// Get alignment requirement
    #[inline]
    pub const fn align(self) -> usize {
        match self {
            Self::Void => 1,
            Self::Bool => align_of::<bool>(),
            Self::I8 | Self::U8 => align_of::<u8>(),
            Self::I16 | Self::U16 => align_of::<u16>(),
            Self::I32 | Self::U32 => align_of::<u32>(),
            Self::F32 => align_of::<f32>(),
            Self::I64 | Self::U64 => align_of::<u64>(),
            Self::F64 => align_of::<f64>(),
            Self::Pointer | Self::String => align_of::<*const c_void>(),
        }
    }

    #[inline]
    pub const fn is_pointer(self) -> bool {
        matches!(self, Self::Pointer | Self::String)
    }

    /// Whether both types are passed identically at the native ABI level
    #[inline]
    pub const fn abi_equivalent(self, other: Self) -> bool {
        self as u8 == other as u8 || (self.is_pointer() && other.is_pointer())
    }

    /// C spelling used in signatures and diagnostics
    pub const fn c_name(self) -> &'static str {
        match self {
            Self::Void => "void",
            Self::Bool => "bool",
            Self::I8 => "int8_t",
            Self::I16 => "int16_t",
            Self::I32 => "int32_t",
            Self::I64 => "int64_t",
            Self::U8 => "uint8_t",
            Self::U16 => "uint16_t",
            Self::U32 => "uint32_t",
            Self::U64 => "uint64_t",
            Self::F32 => "float",
            Self::F64 => "double",
            Self::Pointer => "void*",
            Self::String => "char_t const*",
        }
    }
}

impl fmt::Display for FfiType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.c_name())
    }
}

/// Rust types with a fixed native representation
pub trait NativeType: Copy {
    const FFI_TYPE: FfiType;
}

macro_rules! native_type {
    ($($ty:ty => $ffi:ident),* $(,)?) => {
        $(impl NativeType for $ty {
            const FFI_TYPE: FfiType = FfiType::$ffi;
        })*
    };
}

native_type! {
    () => Void,
    bool => Bool,
    i8 => I8,
    i16 => I16,
    i32 => I32,
    i64 => I64,
    u8 => U8,
    u16 => U16,
    u32 => U32,
    u64 => U64,
    f32 => F32,
    f64 => F64,
}

impl<T> NativeType for *const T {
    const FFI_TYPE: FfiType = FfiType::Pointer;
}

impl<T> NativeType for *mut T {
    const FFI_TYPE: FfiType = FfiType::Pointer;
}
