//! Common result and error types for the gatesim workspace.

use std::any::Any;

/// The standard result type for fallible internal operations.
///
/// `Err` indicates a bug in gatesim itself, never a problem with the circuit
/// being simulated. Degenerate circuits are tolerated and simulated anyway.
pub type GateResult<T> = Result<T, InternalError>;

/// An internal error indicating a bug in gatesim, not a user input problem.
#[derive(Debug, thiserror::Error)]
#[error("internal simulator error: {message}")]
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

    /// Converts a payload caught by `std::panic::catch_unwind`, keeping the
    /// panic message when it is a string.
    pub fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let message = match payload.downcast::<String>() {
            Ok(s) => *s,
            Err(payload) => payload
                .downcast_ref::<&str>()
                .map_or_else(|| "evaluation panicked".to_string(), |s| s.to_string()),
        };
        Self { message }
    }
}

impl From<String> for InternalError {
    fn from(message: String) -> Self {
        Self { message }
    }
}
