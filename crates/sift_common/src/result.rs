//! Common result and error types for the Sift checker.

/// The standard result type for fallible internal operations.
///
/// An `Err` here means Sift itself is broken, never that the checked
/// program is. Unresolvable names, missing modules, and other user-level
/// outcomes are ordinary values (an absent fact), not errors.
pub type SiftResult<T> = Result<T, InternalError>;

/// A bug in Sift.
///
/// Raised when an operation that should be infallible by construction
/// fails anyway, e.g. a codec refusing data the checker itself produced.
/// Carries a human-readable description for the crash report.
#[derive(Debug, thiserror::Error)]
#[error("internal checker error: {message}")]
pub struct InternalError {
    /// Description of the internal error.
    pub message: String,
}

impl InternalError {
    /// Creates a new internal error with the given message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Creates an internal error naming the operation that failed and the
    /// underlying cause.
    pub fn in_operation(operation: &str, cause: impl std::fmt::Display) -> Self {
        Self {
            message: format!("{operation}: {cause}"),
        }
    }
}

impl From<String> for InternalError {
    fn from(message: String) -> Self {
        Self { message }
    }
}
