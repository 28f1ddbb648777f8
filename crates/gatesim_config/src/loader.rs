//! Configuration file loading and validation.

use crate::error::ConfigError;
use crate::types::SimulatorConfig;
use std::path::Path;

/// File name looked up in a configuration directory.
pub const CONFIG_FILE_NAME: &str = "gatesim.toml";

/// The configuration written by `gatesim init`, spelling out every default.
pub const DEFAULT_CONFIG: &str = r#"# gatesim simulator configuration

[engine]
# Propagation passes per evaluation of one circuit level.
max_passes = 10
# Composite nesting depth beyond which evaluation stops.
max_depth = 20
# Milliseconds between ticks; oscillator half periods are counted in ticks.
tick_interval_ms = 50

[clock]
# Uncomment to run every oscillator at a fixed frequency.
# frequency = "1Hz"

[run]
ticks = 1
realtime = false
"#;

/// Loads and validates `gatesim.toml` from a directory.
///
/// A missing file is not an error: every setting has a default.
pub fn load_config(dir: &Path) -> Result<SimulatorConfig, ConfigError> {
    let config_path = dir.join(CONFIG_FILE_NAME);
    if !config_path.exists() {
        return Ok(SimulatorConfig::default());
    }
    load_config_file(&config_path)
}

/// Loads and validates a configuration file at an explicit path.
///
/// Unlike [`load_config`], a missing file is an error.
pub fn load_config_file(path: &Path) -> Result<SimulatorConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    load_config_from_str(&content)
}

/// Parses and validates a `gatesim.toml` configuration from a string.
///
/// Useful for testing without filesystem dependencies.
pub fn load_config_from_str(content: &str) -> Result<SimulatorConfig, ConfigError> {
    let config: SimulatorConfig = toml::from_str(content)?;
    validate_config(&config)?;
    Ok(config)
}

/// Checks value ranges that the type system does not enforce.
fn validate_config(config: &SimulatorConfig) -> Result<(), ConfigError> {
    if config.engine.max_passes == 0 {
        return Err(ConfigError::OutOfRange {
            key: "engine.max_passes",
            reason: "must be at least 1".to_string(),
        });
    }
    if config.engine.tick_interval_ms == 0 {
        return Err(ConfigError::OutOfRange {
            key: "engine.tick_interval_ms",
            reason: "must be positive".to_string(),
        });
    }
    if let Some(freq) = config.clock.frequency {
        if !freq.is_valid() {
            return Err(ConfigError::OutOfRange {
                key: "clock.frequency",
                reason: format!("must be positive, got {freq}"),
            });
        }
    }
    Ok(())
}
