//! Result codes returned by the shell file-operation engine.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A 32-bit engine result code (HRESULT).
///
/// Some layers report these as signed integers while the documented
/// constants are unsigned; [`ResultCode::from_signed`] normalizes the sign
/// representation so comparisons and table lookups always see the unsigned
/// form.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResultCode(pub u32);

impl ResultCode {
    /// Plain success.
    pub const S_OK: Self = Self(0);

    /// The code observed for a successful move/copy/rename/delete.
    ///
    /// Not found in the published documentation; treat as provisional and
    /// prefer [`ResultCode::is_success`] over equality checks.
    pub const SUCCESS: Self = Self(0x0027_0008);

    /// Unspecified failure.
    pub const E_FAIL: Self = Self(0x8000_4005);
    /// Catastrophic/unexpected failure; also the engine's "nothing to do"
    /// signal when no operations were queued.
    pub const E_UNEXPECTED: Self = Self(0x8000_FFFF);
    /// General access denied.
    pub const E_ACCESS_DENIED: Self = Self(0x8007_0005);
    /// The system cannot find the file specified.
    pub const E_FILE_NOT_FOUND: Self = Self(0x8007_0002);
    /// The system cannot find the path specified.
    pub const E_PATH_NOT_FOUND: Self = Self(0x8007_0003);
    /// The operation was canceled by the user.
    pub const E_CANCELLED: Self = Self(0x8007_04C7);
    /// One or more arguments are invalid.
    pub const E_INVALID_ARG: Self = Self(0x8007_0057);

    /// The target of a folder operation already exists as a file.
    pub const E_DESTINATION_IS_FILE: Self = Self(0x8027_000B);
    /// The target of a file operation already exists as a folder.
    pub const E_DESTINATION_IS_FOLDER: Self = Self(0x8027_000C);
    /// Elevated permissions are required to perform the operation.
    pub const E_REQUIRES_ELEVATION: Self = Self(0x8027_0002);
    /// Access denied on the source.
    pub const E_ACCESS_DENIED_SOURCE: Self = Self(0x8027_0021);
    /// Access denied on the destination.
    pub const E_ACCESS_DENIED_DESTINATION: Self = Self(0x8027_0022);
    /// The destination file already exists.
    pub const E_ALREADY_EXISTS_NORMAL: Self = Self(0x8027_0029);
    /// The destination already exists as a read-only file.
    pub const E_ALREADY_EXISTS_READONLY: Self = Self(0x8027_002A);
    /// The destination already exists as a system file.
    pub const E_ALREADY_EXISTS_SYSTEM: Self = Self(0x8027_002B);
    /// The destination already exists as a folder.
    pub const E_ALREADY_EXISTS_FOLDER: Self = Self(0x8027_002C);

    /// Normalize a signed code to its unsigned 32-bit equivalent.
    pub const fn from_signed(code: i32) -> Self {
        Self(code as u32)
    }

    /// Whether the severity bit is clear, i.e. the code reports success.
    pub const fn is_success(self) -> bool {
        self.0 & 0x8000_0000 == 0
    }

    /// Whether the code is one of the file/path not-found failures.
    pub const fn is_not_found(self) -> bool {
        self.0 == Self::E_FILE_NOT_FOUND.0 || self.0 == Self::E_PATH_NOT_FOUND.0
    }
}

impl fmt::Display for ResultCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#010x}", self.0)
    }
}

impl fmt::Debug for ResultCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ResultCode({:#010x})", self.0)
    }
}

impl From<i32> for ResultCode {
    fn from(code: i32) -> Self {
        Self::from_signed(code)
    }
}

impl From<u32> for ResultCode {
    fn from(code: u32) -> Self {
        Self(code)
    }
}
