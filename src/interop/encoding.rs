//! String encoding selection
//!
//! Windows-family hosts exchange wide (UTF-16) strings, everything else UTF-8.
//! The choice is a pure function of the target and is computed once per process.

use core::fmt;
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};

/// Encoding of a string buffer crossing the boundary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StringEncoding {
    /// Null-terminated UTF-8 (`char*`)
    Utf8,
    /// Null-terminated UTF-16 in native byte order (`wchar_t*` on Windows)
    Utf16,
}

static SELECTED: OnceCell<StringEncoding> = OnceCell::new();

impl StringEncoding {
    /// Platform convention, decided at compile time
    #[inline]
    pub const fn platform() -> Self {
        #[cfg(windows)]
        return Self::Utf16;

        #[cfg(not(windows))]
        return Self::Utf8;
    }

    /// Process-wide selection; identical for every call in a process
    pub fn selected() -> Self {
        *SELECTED.get_or_init(|| {
            let encoding = Self::platform();
            tracing::debug!(event = "encoding_selected", encoding = %encoding);
            encoding
        })
    }

    /// Size of one code unit in bytes
    #[inline]
    pub const fn unit_size(self) -> usize {
        match self {
            Self::Utf8 => 1,
            Self::Utf16 => 2,
        }
    }

    /// Size of the null terminator in bytes
    #[inline]
    pub const fn terminator_len(self) -> usize {
        self.unit_size()
    }

    /// Required alignment of a buffer in this encoding
    #[inline]
    pub const fn align(self) -> usize {
        self.unit_size()
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::Utf8 => "utf-8",
            Self::Utf16 => "utf-16",
        }
    }
}

impl Default for StringEncoding {
    fn default() -> Self {
        Self::selected()
    }
}

impl fmt::Display for StringEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
