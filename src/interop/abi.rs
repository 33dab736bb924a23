//! Calling conventions accepted at the boundary
//!
//! Only flat C-compatible conventions exist here: no hidden `this` or closure
//! parameter is ever passed.

use core::fmt;

/// Calling convention of a native function
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum CallingConvention {
    /// `extern "C"`, the platform C convention
    C,
    /// `extern "system"`; `__stdcall` on 32-bit Windows, identical to `C` elsewhere
    System,
}

impl CallingConvention {
    /// Whether `System` resolves to a different convention than `C` on this target
    #[inline]
    pub const fn system_differs() -> bool {
        cfg!(all(windows, target_arch = "x86"))
    }

    /// Check whether two conventions produce the same call sequence on this target
    #[inline]
    pub const fn is_compatible_with(self, other: Self) -> bool {
        self as u8 == other as u8 || !Self::system_differs()
    }

    pub const fn keyword(self) -> &'static str {
        match self {
            Self::C => "C",
            Self::System => "system",
        }
    }
}

impl Default for CallingConvention {
    #[inline]
    fn default() -> Self {
        Self::C
    }
}

impl fmt::Display for CallingConvention {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "extern \"{}\"", self.keyword())
    }
}
