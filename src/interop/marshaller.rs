//! String marshallers
//!
//! `StringMarshaller` is the custom-marshaller contract: convert to native,
//! convert back, free. `Boundary` implements it with an encoding chosen once
//! and injected at construction, so every string through a given boundary uses
//! the same encoding in both directions.

use core::ffi::c_void;

use super::encoding::StringEncoding;
use super::string::{self, NativeString};
use crate::config::BridgeConfig;
use crate::errors::Result;

/// Bidirectional string conversion with explicit ownership
pub trait StringMarshaller {
    /// Encoding used for both directions
    fn encoding(&self) -> StringEncoding;

    /// Managed to native; `None` is a null managed string and is rejected
    fn convert_to_unmanaged(&self, value: Option<&str>) -> Result<NativeString> {
        NativeString::from_optional(value, self.encoding())
    }

    /// Native to managed
    ///
    /// # Safety
    /// `ptr` must be null or point to a terminated string in `self.encoding()`.
    unsafe fn convert_to_managed(&self, ptr: *const c_void) -> Result<String> {
        string::from_native_with(ptr, self.encoding())
    }

    /// Free a buffer produced by `convert_to_unmanaged`
    fn free(&self, value: NativeString) -> Result<()> {
        value.release()
    }
}

/// The marshalling boundary with its encoding fixed at construction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Boundary {
    encoding: StringEncoding,
}

impl Boundary {
    #[inline]
    pub const fn new(encoding: StringEncoding) -> Self {
        Self { encoding }
    }

    /// Boundary using the process-wide platform selection
    pub fn platform() -> Self {
        Self::new(StringEncoding::selected())
    }

    pub fn from_config(config: &BridgeConfig) -> Self {
        Self::new(config.strings.encoding.resolve())
    }

    #[inline]
    pub fn encoding(&self) -> StringEncoding {
        self.encoding
    }

    /// ToNative
    pub fn to_native(&self, value: &str) -> Result<NativeString> {
        NativeString::with_encoding(value, self.encoding)
    }

    /// FromNative
    ///
    /// # Safety
    /// `ptr` must be null or point to a terminated string in this boundary's encoding.
    pub unsafe fn from_native(&self, ptr: *const c_void) -> Result<String> {
        string::from_native_with(ptr, self.encoding)
    }

    /// Release an owned buffer
    pub fn release(&self, value: NativeString) -> Result<()> {
        value.release()
    }

    /// Release a buffer whose ownership came back from native code
    pub fn release_raw(&self, ptr: *mut c_void) -> Result<()> {
        string::release_raw(ptr)
    }

    /// Marshal `value` for one synchronous native call and free it afterwards
    ///
    /// The pointer handed to `call` must not be retained past its return.
    pub fn with_native<R>(&self, value: &str, call: impl FnOnce(*const c_void) -> R) -> Result<R> {
        let native = self.to_native(value)?;
        let result = call(native.as_ptr());
        native.release()?;
        Ok(result)
    }
}

impl Default for Boundary {
    fn default() -> Self {
        Self::platform()
    }
}

impl StringMarshaller for Boundary {
    fn encoding(&self) -> StringEncoding {
        self.encoding
    }
}
