//! Error types for circuit loading and simulation driving.
//!
//! Evaluation itself never fails: structural problems, unknown component
//! types, runaway recursion and non-convergence are all tolerated by the
//! evaluator. These errors cover everything around it.

use std::io;

use gatesim_common::InternalError;
use gatesim_config::ConfigError;

/// Errors that can occur while loading, driving, or recording a simulation.
#[derive(Debug, thiserror::Error)]
pub enum SimError {
    /// The simulator configuration could not be loaded.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Reading a circuit or writing a waveform failed.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A circuit file could not be decoded.
    #[error("invalid circuit file: {0}")]
    CircuitFormat(#[from] serde_json::Error),

    /// A label or id did not name any node in the circuit.
    #[error("no node named '{0}'")]
    UnknownNode(String),

    /// A value literal could not be applied to a node.
    #[error("cannot drive '{node}' with '{value}': {reason}")]
    InvalidDrive {
        /// The node the value was meant for.
        node: String,
        /// The offending literal.
        value: String,
        /// Why the value was rejected.
        reason: String,
    },

    /// Evaluation panicked; the tick was abandoned.
    #[error(transparent)]
    Internal(#[from] InternalError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_unknown_node() {
        let err = SimError::UnknownNode("clk".to_string());
        assert_eq!(format!("{err}"), "no node named 'clk'");
    }

    #[test]
    fn display_invalid_drive() {
        let err = SimError::InvalidDrive {
            node: "A".to_string(),
            value: "maybe".to_string(),
            reason: "not a value literal".to_string(),
        };
        assert_eq!(
            format!("{err}"),
            "cannot drive 'A' with 'maybe': not a value literal"
        );
    }

    #[test]
    fn config_error_is_transparent() {
        let err: SimError = ConfigError::OutOfRange {
            key: "engine.max_passes",
            reason: "must be at least 1".to_string(),
        }
        .into();
        assert_eq!(format!("{err}"), "`engine.max_passes` must be at least 1");
    }

    #[test]
    fn from_io_error() {
        let err: SimError = io::Error::new(io::ErrorKind::NotFound, "gone").into();
        assert!(matches!(err, SimError::Io(_)));
        assert!(format!("{err}").starts_with("I/O error:"));
    }

    #[test]
    fn from_json_error() {
        let json_err = serde_json::from_str::<u32>("nope").unwrap_err();
        let err: SimError = json_err.into();
        assert!(format!("{err}").starts_with("invalid circuit file:"));
    }
}
