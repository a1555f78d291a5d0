//! Error taxonomy for shell file operations.

use std::path::PathBuf;

use thiserror::Error;

use crate::code::ResultCode;

/// Errors surfaced by file-operation sessions.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum OpError {
    /// Path resolution failed and no forcing was requested.
    #[error("path not found: {path}")]
    NotFound { path: PathBuf },

    /// The destination exists as a file where a folder was expected, or
    /// vice versa.
    #[error("destination exists with mismatched type ({code})")]
    TypeMismatch { code: ResultCode },

    /// Access denied on source or destination, or elevation required.
    #[error("access denied ({code})")]
    PermissionDenied { code: ResultCode },

    /// The destination already exists (folder, normal, read-only, and
    /// system variants all fold here).
    #[error("destination already exists ({code})")]
    AlreadyExists { code: ResultCode },

    /// The user cancelled the operation.
    #[error("user cancelled the operation")]
    Cancelled,

    /// A session scope was entered while already open.
    #[error("file operation session is not reentrant")]
    Reentrancy,

    /// An operation was attempted outside an open session scope.
    #[error("file operation session is not open")]
    NotOpen,

    /// The engine's own unexpected-failure signal; absorbed by commit when
    /// nothing was queued, surfaced otherwise.
    #[error("the operation engine reported an unexpected failure")]
    Unexpected,

    /// A user progress handler failed or panicked during a commit.
    #[error("progress handler failed: {message}")]
    Handler { message: String },

    /// Any engine failure not otherwise classified.
    #[error("file operation failed ({code}): {message}")]
    OperationFailed { code: ResultCode, message: String },
}

impl OpError {
    /// Classify a normalized engine result code.
    ///
    /// This is the single translation point between raw codes and the typed
    /// taxonomy; callers normalize sign representation first (or construct
    /// the [`ResultCode`] via [`ResultCode::from_signed`]). Unmatched codes
    /// become [`OpError::OperationFailed`] carrying the code and message.
    pub fn from_code(code: ResultCode, message: impl Into<String>) -> Self {
        match code {
            ResultCode::E_DESTINATION_IS_FILE | ResultCode::E_DESTINATION_IS_FOLDER => {
                Self::TypeMismatch { code }
            }
            ResultCode::E_REQUIRES_ELEVATION
            | ResultCode::E_ACCESS_DENIED_SOURCE
            | ResultCode::E_ACCESS_DENIED_DESTINATION
            | ResultCode::E_ACCESS_DENIED => Self::PermissionDenied { code },
            ResultCode::E_ALREADY_EXISTS_NORMAL
            | ResultCode::E_ALREADY_EXISTS_READONLY
            | ResultCode::E_ALREADY_EXISTS_SYSTEM
            | ResultCode::E_ALREADY_EXISTS_FOLDER => Self::AlreadyExists { code },
            ResultCode::E_CANCELLED => Self::Cancelled,
            ResultCode::E_UNEXPECTED => Self::Unexpected,
            _ => Self::OperationFailed {
                code,
                message: message.into(),
            },
        }
    }
}

/// Result type alias for winshell operations.
pub type Result<T> = std::result::Result<T, OpError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification_table() {
        assert!(matches!(
            OpError::from_code(ResultCode::E_DESTINATION_IS_FILE, ""),
            OpError::TypeMismatch { .. }
        ));
        assert!(matches!(
            OpError::from_code(ResultCode::E_ACCESS_DENIED_SOURCE, ""),
            OpError::PermissionDenied { .. }
        ));
        assert!(matches!(
            OpError::from_code(ResultCode::E_ALREADY_EXISTS_READONLY, ""),
            OpError::AlreadyExists { .. }
        ));
        assert_eq!(
            OpError::from_code(ResultCode::E_CANCELLED, ""),
            OpError::Cancelled
        );
        assert_eq!(
            OpError::from_code(ResultCode::E_UNEXPECTED, ""),
            OpError::Unexpected
        );
    }

    #[test]
    fn test_unmatched_codes_keep_diagnostics() {
        let err = OpError::from_code(ResultCode::E_FAIL, "engine said no");
        match err {
            OpError::OperationFailed { code, message } => {
                assert_eq!(code, ResultCode::E_FAIL);
                assert_eq!(message, "engine said no");
            }
            other => panic!("expected OperationFailed, got {other:?}"),
        }
    }

    #[test]
    fn test_classification_after_sign_normalization() {
        // The engine hands some codes out as signed values.
        let code = ResultCode::from_signed(0x8027002Cu32 as i32);
        assert!(matches!(
            OpError::from_code(code, ""),
            OpError::AlreadyExists { .. }
        ));
    }
}
