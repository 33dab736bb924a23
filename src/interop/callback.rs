//! Type-checked native callbacks
//!
//! A raw function pointer becomes callable only after binding: the declared
//! native `Signature` is compared with the static signature of the Rust
//! function-pointer type it will be called through. After that, arity and
//! argument types are enforced by the compiler.

use core::ffi::c_void;
use core::fmt;
use core::ptr::NonNull;

use super::abi::CallingConvention;
use super::marshaller::Boundary;
use super::types::{FfiType, NativeType};
use crate::errors::{MarshalError, Result};
use crate::logging;

/// Native function signature descriptor
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Signature {
    pub convention: CallingConvention,
    pub params: Vec<FfiType>,
    pub ret: FfiType,
}

impl Signature {
    pub fn new(convention: CallingConvention, params: Vec<FfiType>, ret: FfiType) -> Self {
        Self { convention, params, ret }
    }

    /// `extern "C"` signature
    pub fn c(params: impl Into<Vec<FfiType>>, ret: FfiType) -> Self {
        Self::new(CallingConvention::C, params.into(), ret)
    }

    #[inline]
    pub fn arity(&self) -> usize {
        self.params.len()
    }

    /// Whether a call through `self` is ABI-correct for a function declared as `other`
    pub fn is_compatible_with(&self, other: &Signature) -> bool {
        self.convention.is_compatible_with(other.convention)
            && self.ret.abi_equivalent(other.ret)
            && self.params.len() == other.params.len()
            && self
                .params
                .iter()
                .zip(&other.params)
                .all(|(a, b)| a.abi_equivalent(*b))
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} fn(", self.convention)?;
        for (i, param) in self.params.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", param)?;
        }
        write!(f, ") -> {}", self.ret)
    }
}

mod sealed {
    pub trait Sealed {}
}

/// Function-pointer types a `Callback` can wrap
pub trait NativeFn: Copy + sealed::Sealed {
    /// Static signature of this function-pointer type
    fn signature() -> Signature;

    /// # Safety
    /// `ptr` must point to a function with exactly `Self::signature()`.
    unsafe fn from_raw(ptr: NonNull<c_void>) -> Self;

    fn as_raw(self) -> *const c_void;
}

/// A native function pointer bound to a verified signature
#[derive(Clone, Copy)]
pub struct Callback<F: NativeFn> {
    func: F,
}

impl<F: NativeFn> Callback<F> {
    /// Wrap a Rust `extern "C"` function; its signature is known statically
    pub fn new(func: F) -> Self {
        Self { func }
    }

    /// Bind a raw pointer after checking the declared native signature
    ///
    /// # Safety
    /// `declared` must truthfully describe the function at `raw`.
    pub unsafe fn bind(raw: *const c_void, declared: &Signature) -> Result<Self> {
        let expected = F::signature();
        if !expected.is_compatible_with(declared) {
            logging::log_callback_rejected(&expected, declared);
            return Err(MarshalError::signature_mismatch(&expected, declared));
        }

        let ptr = NonNull::new(raw as *mut c_void).ok_or(MarshalError::null_reference("callback"))?;
        logging::log_callback_bound(&expected, raw);
        Ok(Self { func: F::from_raw(ptr) })
    }

    pub fn signature(&self) -> Signature {
        F::signature()
    }

    /// The typed function pointer, for handing to native code
    #[inline]
    pub fn get(&self) -> F {
        self.func
    }

    #[inline]
    pub fn as_raw(&self) -> *const c_void {
        self.func.as_raw()
    }
}

impl<F: NativeFn> fmt::Debug for Callback<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Callback")
            .field("signature", &F::signature().to_string())
            .field("address", &self.as_raw())
            .finish()
    }
}

macro_rules! native_fn {
    ($($arg:ident: $ty:ident),*) => {
        impl<R: NativeType, $($ty: NativeType),*> sealed::Sealed for extern "C" fn($($ty),*) -> R {}

        impl<R: NativeType, $($ty: NativeType),*> NativeFn for extern "C" fn($($ty),*) -> R {
            fn signature() -> Signature {
                Signature::c(vec![$($ty::FFI_TYPE),*], R::FFI_TYPE)
            }

            unsafe fn from_raw(ptr: NonNull<c_void>) -> Self {
                core::mem::transmute_copy::<*mut c_void, Self>(&ptr.as_ptr())
            }

            fn as_raw(self) -> *const c_void {
                self as *const c_void
            }
        }

        impl<R: NativeType, $($ty: NativeType),*> Callback<extern "C" fn($($ty),*) -> R> {
            /// Synchronously call into native code
            pub fn invoke(&self, $($arg: $ty),*) -> R {
                logging::log_callback_invoke(self.as_raw());
                (self.func)($($arg),*)
            }
        }
    };
}

native_fn!();
native_fn!(a: A);
native_fn!(a: A, b: B);
native_fn!(a: A, b: B, c: C);

/// Native string in, native string out
pub type StringCallbackFn = extern "C" fn(*const c_void) -> *const c_void;

impl Callback<StringCallbackFn> {
    /// Declared signature of a string in/out callback
    pub fn string_signature() -> Signature {
        Signature::c(vec![FfiType::String], FfiType::String)
    }

    /// Marshal `value`, call, and decode the reply
    ///
    /// The argument buffer is freed once the call returns. The reply is
    /// borrowed from native code and is never freed here.
    pub fn invoke_with_string(&self, boundary: &Boundary, value: &str) -> Result<String> {
        let reply = boundary.with_native(value, |arg| self.invoke(arg))?;
        unsafe { boundary.from_native(reply) }
    }
}
