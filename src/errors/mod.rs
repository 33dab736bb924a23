use std::fmt;

use crate::interop::StringEncoding;

/// Errors raised at the marshalling boundary.
///
/// Every operation either completes or fails before any buffer becomes
/// visible to the caller, so there is no partial-success variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarshalError {
    /// Null or empty input where a non-empty value is required
    InvalidArgument { reason: String },
    /// Null pointer handed to a decode or bind operation
    NullReference { what: &'static str },
    /// Declared native signature disagrees with the statically typed callable
    SignatureMismatch { expected: String, found: String },
    /// Native buffer is not the size the layout requires
    SizeMismatch { expected: usize, found: usize },
    /// Bytes at the pointer are not valid in the selected encoding
    InvalidEncoding { encoding: StringEncoding, detail: String },
    /// Address was already released, or was never produced by this boundary
    DoubleRelease { address: usize },
    /// The native allocator returned null
    AllocationFailed { size: usize },
}

pub type Result<T> = std::result::Result<T, MarshalError>;

impl MarshalError {
    pub fn invalid_argument(reason: impl Into<String>) -> Self {
        Self::InvalidArgument { reason: reason.into() }
    }

    pub fn null_reference(what: &'static str) -> Self {
        Self::NullReference { what }
    }

    pub fn signature_mismatch(expected: impl fmt::Display, found: impl fmt::Display) -> Self {
        Self::SignatureMismatch {
            expected: expected.to_string(),
            found: found.to_string(),
        }
    }

    pub fn invalid_encoding(encoding: StringEncoding, detail: impl fmt::Display) -> Self {
        Self::InvalidEncoding {
            encoding,
            detail: detail.to_string(),
        }
    }

    /// Stable status code reported through the C API (0 is success)
    pub const fn status_code(&self) -> i32 {
        match self {
            Self::InvalidArgument { .. } => -1,
            Self::NullReference { .. } => -2,
            Self::SignatureMismatch { .. } => -3,
            Self::SizeMismatch { .. } => -4,
            Self::InvalidEncoding { .. } => -5,
            Self::DoubleRelease { .. } => -6,
            Self::AllocationFailed { .. } => -7,
        }
    }
}

impl fmt::Display for MarshalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidArgument { reason } => {
                write!(f, "Invalid argument: {}", reason)
            }
            Self::NullReference { what } => {
                write!(f, "Null reference: {} must not be null", what)
            }
            Self::SignatureMismatch { expected, found } => {
                write!(f, "Signature mismatch: expected {}, found {}", expected, found)
            }
            Self::SizeMismatch { expected, found } => {
                write!(f, "Size mismatch: expected {} bytes, found {}", expected, found)
            }
            Self::InvalidEncoding { encoding, detail } => {
                write!(f, "Invalid {} data: {}", encoding, detail)
            }
            Self::DoubleRelease { address } => {
                write!(f, "Buffer at {:#x} is not live (already released or foreign)", address)
            }
            Self::AllocationFailed { size } => {
                write!(f, "Native allocator failed to provide {} bytes", size)
            }
        }
    }
}

impl std::error::Error for MarshalError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes_are_distinct() {
        let errors = [
            MarshalError::invalid_argument("empty"),
            MarshalError::null_reference("ptr"),
            MarshalError::signature_mismatch("fn() -> void", "fn(i32) -> f64"),
            MarshalError::SizeMismatch { expected: 24, found: 8 },
            MarshalError::invalid_encoding(StringEncoding::Utf8, "bad byte"),
            MarshalError::DoubleRelease { address: 0x10 },
            MarshalError::AllocationFailed { size: 1 },
        ];

        let mut codes: Vec<i32> = errors.iter().map(MarshalError::status_code).collect();
        assert!(codes.iter().all(|&c| c < 0));
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), errors.len());
    }

    #[test]
    fn test_display_messages() {
        let err = MarshalError::null_reference("native string");
        assert_eq!(err.to_string(), "Null reference: native string must not be null");

        let err = MarshalError::SizeMismatch { expected: 24, found: 16 };
        assert_eq!(err.to_string(), "Size mismatch: expected 24 bytes, found 16");
    }
}
