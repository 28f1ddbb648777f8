//! Shared steps of the circuit commands: configuration and circuit loading.

use std::path::{Path, PathBuf};

use gatesim_config::SimulatorConfig;
use gatesim_ir::Circuit;

use crate::GlobalArgs;

/// Loads the simulator configuration.
///
/// With `--config`, a file path is read directly and a directory is searched
/// for `gatesim.toml`. Without it, the current directory is searched; a
/// missing file yields defaults.
pub fn load_config(global: &GlobalArgs) -> Result<SimulatorConfig, Box<dyn std::error::Error>> {
    let config = match &global.config {
        Some(path) => {
            let p = PathBuf::from(path);
            if p.is_dir() {
                gatesim_config::load_config(&p)?
            } else {
                gatesim_config::load_config_file(&p)?
            }
        }
        None => gatesim_config::load_config(&std::env::current_dir()?)?,
    };
    tracing::debug!(limits = ?config.engine, "configuration loaded");
    Ok(config)
}

/// Loads a circuit file, applying the configured frequency override.
pub fn load_circuit(
    path: &str,
    config: &SimulatorConfig,
) -> Result<Circuit, Box<dyn std::error::Error>> {
    let mut circuit = gatesim_sim::load_circuit(Path::new(path))?;
    if let Some(freq) = config.clock.frequency {
        gatesim_sim::clock::set_frequency_all(&mut circuit, freq);
    }
    Ok(circuit)
}
