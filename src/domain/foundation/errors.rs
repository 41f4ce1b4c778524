//! Error types for the domain layer.

use std::fmt;
use thiserror::Error;

/// Errors that occur while validating caller input.
///
/// Always raised before any storage write.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Field '{field}' cannot be empty")]
    EmptyField { field: String },

    #[error("Field '{field}' must be between {min} and {max}, got {actual}")]
    OutOfRange {
        field: String,
        min: usize,
        max: usize,
        actual: usize,
    },

    #[error("Field '{field}' has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    #[error("A message needs content or at least one attachment")]
    ContentOrAttachmentRequired,
}

impl ValidationError {
    /// Creates an empty field validation error.
    pub fn empty_field(field: impl Into<String>) -> Self {
        ValidationError::EmptyField { field: field.into() }
    }

    /// Creates an out of range validation error.
    pub fn out_of_range(field: impl Into<String>, min: usize, max: usize, actual: usize) -> Self {
        ValidationError::OutOfRange {
            field: field.into(),
            min,
            max,
            actual,
        }
    }

    /// Creates an invalid format validation error.
    pub fn invalid_format(field: impl Into<String>, reason: impl Into<String>) -> Self {
        ValidationError::InvalidFormat {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Checks that `value` is a non-empty string of at most `max` characters.
pub fn require_text(field: &str, value: &str, max: usize) -> Result<(), ValidationError> {
    let len = value.chars().count();
    if len == 0 {
        return Err(ValidationError::empty_field(field));
    }
    if len > max {
        return Err(ValidationError::out_of_range(field, 1, max, len));
    }
    Ok(())
}

/// Checks that `actual` lies within `[min, max]`.
pub fn require_range(field: &str, actual: usize, min: usize, max: usize) -> Result<(), ValidationError> {
    if actual < min || actual > max {
        return Err(ValidationError::out_of_range(field, min, max, actual));
    }
    Ok(())
}

/// Error codes organized by category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    // Validation errors
    ValidationFailed,

    // Not found errors
    ConversationNotFound,
    MessageNotFound,

    // Infrastructure errors
    StorageError,
    StorageTimeout,
    PartialFailure,
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorCode::ValidationFailed => "VALIDATION_FAILED",
            ErrorCode::ConversationNotFound => "CONVERSATION_NOT_FOUND",
            ErrorCode::MessageNotFound => "MESSAGE_NOT_FOUND",
            ErrorCode::StorageError => "STORAGE_ERROR",
            ErrorCode::StorageTimeout => "STORAGE_TIMEOUT",
            ErrorCode::PartialFailure => "PARTIAL_FAILURE",
        };
        write!(f, "{}", s)
    }
}
