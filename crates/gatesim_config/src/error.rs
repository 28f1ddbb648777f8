//! Error types for configuration loading and validation.

use std::path::PathBuf;

/// Errors that can occur when loading or validating a `gatesim.toml` configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The configuration file exists (or was named explicitly) but could not
    /// be read.
    #[error("cannot read {}: {source}", path.display())]
    Read {
        /// The file that was being read.
        path: PathBuf,
        /// The underlying I/O failure.
        #[source]
        source: std::io::Error,
    },

    /// The content is not TOML, or does not match the configuration schema.
    #[error("invalid configuration: {0}")]
    Parse(#[from] toml::de::Error),

    /// A setting parsed but lies outside its allowed range.
    #[error("`{key}` {reason}")]
    OutOfRange {
        /// Dotted name of the offending setting.
        key: &'static str,
        /// What the setting must satisfy.
        reason: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_out_of_range() {
        let err = ConfigError::OutOfRange {
            key: "engine.max_passes",
            reason: "must be at least 1".to_string(),
        };
        assert_eq!(format!("{err}"), "`engine.max_passes` must be at least 1");
    }

    #[test]
    fn display_read_error_names_the_file() {
        let err = ConfigError::Read {
            path: PathBuf::from("/tmp/gatesim.toml"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "file not found"),
        };
        assert_eq!(format!("{err}"), "cannot read /tmp/gatesim.toml: file not found");
    }

    #[test]
    fn parse_error_from_toml() {
        let toml_err = toml::from_str::<toml::Value>("= 1").unwrap_err();
        let err = ConfigError::from(toml_err);
        assert!(format!("{err}").starts_with("invalid configuration:"));
    }
}
