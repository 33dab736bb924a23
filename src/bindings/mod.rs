//! FFI bindings exposing the boundary to native hosts

pub mod c_api;

pub use c_api::*;
