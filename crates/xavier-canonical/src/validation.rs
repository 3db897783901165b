use thiserror::Error;

/// Validation errors for canonical primitives.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// When a value does not match the required pattern.
    #[error("{field} ('{value}') is not allowed")]
    PatternMismatch {
        /// Field name that failed validation.
        field: &'static str,
        /// Offending value.
        value: String,
    },
    /// When a validation pattern itself fails to compile.
    #[error("{field} pattern is invalid: {reason}")]
    Pattern {
        /// Field the pattern guards.
        field: &'static str,
        /// Compiler message.
        reason: String,
    },
}
