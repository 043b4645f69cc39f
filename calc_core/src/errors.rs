//! # Error Types
//!
//! Structured error types for calc_core. Calculators only ever fail with
//! [`CalcError::ValidationFailed`], which carries every field-level problem at
//! once so a form can highlight all of them. The remaining variants belong to
//! projects, file I/O and report rendering.
//!
//! ## Example
//!
//! ```rust
//! use calc_core::errors::{CalcError, CalcResult, FieldError};
//!
//! fn check_area(area_m2: f64) -> CalcResult<()> {
//!     if area_m2 <= 0.0 {
//!         return Err(CalcError::validation(vec![FieldError::new(
//!             "areaM2",
//!             area_m2.to_string(),
//!             "must be > 0",
//!         )]));
//!     }
//!     Ok(())
//! }
//!
//! let err = check_area(0.0).unwrap_err();
//! assert_eq!(err.error_code(), "VALIDATION_FAILED");
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for calc_core operations
pub type CalcResult<T> = Result<T, CalcError>;

/// A single rejected input field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    /// Field name as it appears in the JSON form (e.g. `doorWidthM`)
    pub field: String,
    /// The offending value as submitted, empty when the field was missing
    pub value: String,
    /// Violated constraint (e.g. "must be > 0")
    pub reason: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, value: impl Into<String>, reason: impl Into<String>) -> Self {
        FieldError {
            field: field.into(),
            value: value.into(),
            reason: reason.into(),
        }
    }
}

impl std::fmt::Display for FieldError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.value.is_empty() {
            write!(f, "{} {}", self.field, self.reason)
        } else {
            write!(f, "{} {} (got '{}')", self.field, self.reason, self.value)
        }
    }
}

fn join_field_errors(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Structured error type for calculation operations.
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "details")]
pub enum CalcError {
    /// One or more input fields are missing, malformed or out of range
    #[error("Validation failed: {}", join_field_errors(.errors))]
    ValidationFailed { errors: Vec<FieldError> },

    /// An input value is invalid outside of form validation (e.g. CLI arguments)
    #[error("Invalid input for '{field}': {value} - {reason}")]
    InvalidInput {
        field: String,
        value: String,
        reason: String,
    },

    /// A project item could not be found
    #[error("Item not found: {id}")]
    ItemNotFound { id: String },

    /// File I/O error
    #[error("File error: {operation} on '{path}' - {reason}")]
    FileError {
        operation: String,
        path: String,
        reason: String,
    },

    /// File is locked by another user/process
    #[error("File locked: '{path}' is locked by {locked_by} since {locked_at}")]
    FileLocked {
        path: String,
        locked_by: String,
        locked_at: String,
    },

    /// JSON serialization/deserialization error
    #[error("Serialization error: {reason}")]
    SerializationError { reason: String },

    /// Schema version mismatch
    #[error("Version mismatch: file version {file_version}, expected {expected_version}")]
    VersionMismatch {
        file_version: String,
        expected_version: String,
    },

    /// Typst compilation or PDF export failed
    #[error("Report error: {reason}")]
    ReportFailed { reason: String },
}

impl CalcError {
    /// Create a ValidationFailed error from collected field errors
    pub fn validation(errors: Vec<FieldError>) -> Self {
        CalcError::ValidationFailed { errors }
    }

    /// Create an InvalidInput error
    pub fn invalid_input(field: impl Into<String>, value: impl Into<String>, reason: impl Into<String>) -> Self {
        CalcError::InvalidInput {
            field: field.into(),
            value: value.into(),
            reason: reason.into(),
        }
    }

    /// Create a FileError
    pub fn file_error(operation: impl Into<String>, path: impl Into<String>, reason: impl Into<String>) -> Self {
        CalcError::FileError {
            operation: operation.into(),
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a FileLocked error
    pub fn file_locked(path: impl Into<String>, locked_by: impl Into<String>, locked_at: impl Into<String>) -> Self {
        CalcError::FileLocked {
            path: path.into(),
            locked_by: locked_by.into(),
            locked_at: locked_at.into(),
        }
    }

    /// Create a SerializationError from any displayable cause
    pub fn serialization(reason: impl std::fmt::Display) -> Self {
        CalcError::SerializationError {
            reason: reason.to_string(),
        }
    }

    /// Field-level problems, empty for every variant except `ValidationFailed`
    pub fn field_errors(&self) -> &[FieldError] {
        match self {
            CalcError::ValidationFailed { errors } => errors,
            _ => &[],
        }
    }

    /// Check if this is a recoverable error (e.g., can retry)
    pub fn is_recoverable(&self) -> bool {
        matches!(self, CalcError::FileLocked { .. })
    }

    /// Get a short error code for programmatic handling
    pub fn error_code(&self) -> &'static str {
        match self {
            CalcError::ValidationFailed { .. } => "VALIDATION_FAILED",
            CalcError::InvalidInput { .. } => "INVALID_INPUT",
            CalcError::ItemNotFound { .. } => "ITEM_NOT_FOUND",
            CalcError::FileError { .. } => "FILE_ERROR",
            CalcError::FileLocked { .. } => "FILE_LOCKED",
            CalcError::SerializationError { .. } => "SERIALIZATION_ERROR",
            CalcError::VersionMismatch { .. } => "VERSION_MISMATCH",
            CalcError::ReportFailed { .. } => "REPORT_FAILED",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_json_shape() {
        let error = CalcError::validation(vec![FieldError::new("doorWidthM", "0", "must be > 0")]);
        let json = serde_json::to_value(&error).unwrap();
        assert_eq!(json["type"], "ValidationFailed");
        assert_eq!(json["details"]["errors"][0]["field"], "doorWidthM");

        let roundtrip: CalcError = serde_json::from_value(json).unwrap();
        assert_eq!(error, roundtrip);
    }

    #[test]
    fn test_validation_message_lists_every_field() {
        let error = CalcError::validation(vec![
            FieldError::new("doorWidthM", "0", "must be > 0"),
            FieldError::new("peopleCount", "", "is required"),
        ]);
        let message = error.to_string();
        assert!(message.contains("doorWidthM must be > 0 (got '0')"));
        assert!(message.contains("peopleCount is required"));
        assert_eq!(error.field_errors().len(), 2);
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(CalcError::invalid_input("kind", "x", "unknown").error_code(), "INVALID_INPUT");
        assert_eq!(CalcError::serialization("bad json").error_code(), "SERIALIZATION_ERROR");
        assert!(CalcError::file_locked("a.ort", "me", "now").is_recoverable());
        assert!(CalcError::serialization("x").field_errors().is_empty());
    }
}
