//! Logging infrastructure - structured tracing at the boundary
//!
//! Design: Uses `tracing` for structured, contextual logging with:
//! - Configurable log level
//! - Zero-cost when disabled
//! - Console or file output, human-readable or JSON

use core::ffi::c_void;
use once_cell::sync::OnceCell;
use parking_lot::{const_mutex, Mutex};
use std::io;
use std::path::Path;
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan, writer::BoxMakeWriter},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Layer, Registry,
};

use crate::config::LoggingConfig;
use crate::errors::MarshalError;
use crate::interop::{Signature, StringEncoding};

pub use tracing::{debug, error, info, trace, warn};

/// Global logging state
static LOGGER_INITIALIZED: OnceCell<()> = OnceCell::new();

/// Keeps the file writer flushing until process exit
static FILE_GUARD: Mutex<Option<WorkerGuard>> = const_mutex(None);

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Default log level
    pub level: Level,
    /// Log file path; console (stderr) when `None`
    pub log_path: Option<String>,
    /// Enable JSON format (vs human-readable)
    pub json_format: bool,
    /// Show span events (new/close)
    pub show_spans: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            log_path: None,
            json_format: false,
            show_spans: false,
        }
    }
}

impl LogConfig {
    /// Create config from environment variables
    pub fn from_env() -> Self {
        let mut config = Self::default();

        // HOSTINTEROP_LOG_LEVEL: trace, debug, info, warn, error
        if let Ok(level_str) = std::env::var("HOSTINTEROP_LOG_LEVEL") {
            config.level = parse_level(&level_str);
        }

        // HOSTINTEROP_LOG_FILE: path to log file
        if let Ok(path) = std::env::var("HOSTINTEROP_LOG_FILE") {
            config.log_path = Some(path);
        }

        config.json_format = std::env::var("HOSTINTEROP_LOG_JSON").is_ok();
        config.show_spans = std::env::var("HOSTINTEROP_LOG_SPANS").is_ok();

        config
    }

    /// Create config from the `[logging]` table of the configuration file
    pub fn from_settings(settings: &LoggingConfig) -> Self {
        Self {
            level: parse_level(&settings.level),
            log_path: settings.file.clone(),
            json_format: settings.json,
            show_spans: settings.spans,
        }
    }

    /// Verbose console config for debugging
    pub fn debug() -> Self {
        Self {
            level: Level::TRACE,
            log_path: None,
            json_format: false,
            show_spans: true,
        }
    }
}

fn parse_level(level: &str) -> Level {
    match level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    }
}

/// Initialize logging with configuration from the environment
pub fn init() {
    init_with_config(LogConfig::from_env());
}

/// Initialize logging with custom configuration
///
/// Only the first call installs a subscriber; later calls are ignored.
pub fn init_with_config(config: LogConfig) {
    LOGGER_INITIALIZED.get_or_init(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("hostinterop={}", config.level.as_str().to_lowercase()))
        });

        let span_events = if config.show_spans {
            FmtSpan::NEW | FmtSpan::CLOSE
        } else {
            FmtSpan::NONE
        };

        let writer = match &config.log_path {
            Some(path) => {
                let path = Path::new(path);
                let directory = path
                    .parent()
                    .filter(|dir| !dir.as_os_str().is_empty())
                    .unwrap_or_else(|| Path::new("."));
                let file_name = path
                    .file_name()
                    .map(|name| name.to_os_string())
                    .unwrap_or_else(|| "hostinterop.log".into());

                let appender = tracing_appender::rolling::never(directory, file_name);
                let (non_blocking, guard) = tracing_appender::non_blocking(appender);
                *FILE_GUARD.lock() = Some(guard);
                BoxMakeWriter::new(non_blocking)
            }
            None => BoxMakeWriter::new(io::stderr),
        };

        let base = fmt::layer()
            .with_writer(writer)
            .with_span_events(span_events)
            .with_target(true)
            .with_thread_ids(cfg!(debug_assertions));

        let layer: Box<dyn Layer<Registry> + Send + Sync> = if config.json_format {
            base.json().with_filter(filter).boxed()
        } else {
            base.compact().with_filter(filter).boxed()
        };

        // Another subscriber may already be installed by the host application
        let _ = tracing_subscriber::registry().with(layer).try_init();
    });
}

/// Check if logging is initialized
pub fn is_initialized() -> bool {
    LOGGER_INITIALIZED.get().is_some()
}

// ============================================================================
// Boundary-specific logging functions
// ============================================================================

/// Log native allocation
#[inline]
pub fn log_allocation(size: usize, ptr: *const u8) {
    trace!(
        event = "allocation",
        size_bytes = size,
        address = ?ptr,
        "Native buffer allocated"
    );
}

/// Log native deallocation
#[inline]
pub fn log_deallocation(size: usize, ptr: *const u8) {
    trace!(
        event = "deallocation",
        size_bytes = size,
        address = ?ptr,
        "Native buffer released"
    );
}

/// Log a release of an address that is not live
pub fn log_release_rejected(ptr: *const u8) {
    warn!(
        event = "release_rejected",
        address = ?ptr,
        "Release of a buffer that is not live"
    );
}

#[inline]
pub fn log_to_native(encoding: StringEncoding, bytes: usize, ptr: *const u8) {
    debug!(
        event = "to_native",
        encoding = %encoding,
        bytes,
        address = ?ptr,
        "String marshalled to native"
    );
}

#[inline]
pub fn log_from_native(encoding: StringEncoding, bytes: usize, ptr: *const u8) {
    debug!(
        event = "from_native",
        encoding = %encoding,
        bytes,
        address = ?ptr,
        "String marshalled from native"
    );
}

#[inline]
pub fn log_ownership_transfer(ptr: *const u8) {
    trace!(
        event = "ownership_transfer",
        address = ?ptr,
        "Buffer ownership handed to receiver"
    );
}

pub fn log_callback_bound(signature: &Signature, ptr: *const c_void) {
    debug!(
        event = "callback_bound",
        signature = %signature,
        address = ?ptr,
        "Callback bound"
    );
}

pub fn log_callback_rejected(expected: &Signature, declared: &Signature) {
    error!(
        event = "callback_rejected",
        expected = %expected,
        declared = %declared,
        "Callback signature mismatch"
    );
}

#[inline]
pub fn log_callback_invoke(ptr: *const c_void) {
    trace!(
        event = "callback_invoke",
        address = ?ptr,
        "Calling into native code"
    );
}

/// Log a boundary error that cannot be returned to a caller
pub fn log_marshal_error(operation: &str, err: &MarshalError) {
    error!(
        event = "marshal_error",
        operation,
        code = err.status_code(),
        error = %err,
        "Marshalling error"
    );
}
