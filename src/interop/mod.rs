//! Interoperability - the marshalling boundary
//!
//! Design: explicit ownership for every buffer that crosses into native code
//!
//! Architecture:
//! - `encoding.rs` - platform string encoding, selected once per process
//! - `alloc.rs` - the designated native allocator and live-buffer registry
//! - `string.rs` - `NativeString` (to native, from native, release)
//! - `marshaller.rs` - `StringMarshaller` and the configured `Boundary`
//! - `types.rs` - FFI type descriptors
//! - `layout.rs` - sequential struct layouts, by-value and by-reference passing
//! - `abi.rs` - calling conventions
//! - `callback.rs` - signature-checked native callbacks

mod abi;
pub mod alloc;
mod callback;
mod encoding;
mod layout;
mod marshaller;
mod string;
mod types;

pub use abi::CallingConvention;
pub use callback::{Callback, NativeFn, Signature, StringCallbackFn};
pub use encoding::StringEncoding;
pub use layout::{
    pass_by_reference, pass_by_value, ComplicatedParamStruct, FieldLayout, LibArgs,
    StructLayout, COMPLICATED_PARAM_SIZE,
};
pub use marshaller::{Boundary, StringMarshaller};
pub use string::{from_native, from_native_with, release_raw, NativeString};
pub use types::{FfiType, NativeType};

/// Interop statistics for monitoring
#[derive(Debug, Clone, Copy)]
pub struct InteropStats {
    pub encoding: StringEncoding,
    pub live_buffers: usize,
}

/// Get interop statistics
pub fn stats() -> InteropStats {
    InteropStats {
        encoding: StringEncoding::selected(),
        live_buffers: alloc::live_count(),
    }
}

#[cfg(test)]
mod tests;
