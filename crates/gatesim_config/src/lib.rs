//! Parsing and validation of `gatesim.toml` simulator configuration files.
//!
//! This crate reads the configuration file and produces a strongly-typed
//! [`SimulatorConfig`]: engine limits for the tick evaluator, an optional
//! clock frequency override, and defaults for batch runs. Every section and
//! field is optional.

#![warn(missing_docs)]

pub mod error;
pub mod loader;
pub mod types;

pub use error::ConfigError;
pub use loader::{
    load_config, load_config_file, load_config_from_str, CONFIG_FILE_NAME, DEFAULT_CONFIG,
};
pub use types::*;
