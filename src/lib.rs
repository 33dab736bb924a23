//! hostinterop - a marshalling boundary between managed values and native code
//!
//! Strings, fixed-layout structs, and function pointers cross the boundary
//! with explicit ownership: every native buffer has exactly one owner and is
//! freed once, by the allocator that produced it.

pub mod bindings;
pub mod config;
pub mod errors;
pub mod interop;
pub mod logging;
pub mod native;

// Re-export commonly used items
pub use config::{BridgeConfig, EncodingChoice};
pub use errors::{MarshalError, Result};
pub use interop::{
    Boundary, Callback, CallingConvention, ComplicatedParamStruct, FfiType, LibArgs,
    NativeString, Signature, StringEncoding, StringMarshaller,
};
pub use logging::LogConfig;

/// Initialize logging from `config` and build the boundary it describes
pub fn init(config: &BridgeConfig) -> Boundary {
    logging::init_with_config(LogConfig::from_settings(&config.logging));
    let boundary = Boundary::from_config(config);
    tracing::info!(encoding = %boundary.encoding(), "Marshalling boundary initialized");
    boundary
}
