//! `gatesim init`: write a default configuration file.

use std::fs;
use std::path::PathBuf;

use gatesim_config::{CONFIG_FILE_NAME, DEFAULT_CONFIG};

use crate::GlobalArgs;

/// Runs the `gatesim init` command.
///
/// Creates `dir` if needed and writes `gatesim.toml` into it. An existing
/// file is left alone unless `force` is set.
pub fn run(
    dir: Option<String>,
    force: bool,
    global: &GlobalArgs,
) -> Result<i32, Box<dyn std::error::Error>> {
    let dir = match dir {
        Some(d) => PathBuf::from(d),
        None => std::env::current_dir()?,
    };
    fs::create_dir_all(&dir)?;

    let path = dir.join(CONFIG_FILE_NAME);
    if path.exists() && !force {
        return Err(format!(
            "'{}' already exists (use --force to overwrite)",
            path.display()
        )
        .into());
    }
    fs::write(&path, DEFAULT_CONFIG)?;

    if !global.quiet {
        eprintln!("     Created {}", path.display());
    }
    Ok(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quiet() -> GlobalArgs {
        GlobalArgs {
            quiet: true,
            verbose: false,
            config: None,
        }
    }

    #[test]
    fn writes_loadable_default_config() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("lab");
        let code = run(Some(target.to_str().unwrap().to_string()), false, &quiet()).unwrap();
        assert_eq!(code, 0);
        let config = gatesim_config::load_config(&target).unwrap();
        assert_eq!(config.engine.max_passes, 10);
    }

    #[test]
    fn refuses_to_overwrite_without_force() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().to_str().unwrap().to_string();
        fs::write(dir.path().join(CONFIG_FILE_NAME), "# mine\n").unwrap();
        assert!(run(Some(target.clone()), false, &quiet()).is_err());
        assert_eq!(
            fs::read_to_string(dir.path().join(CONFIG_FILE_NAME)).unwrap(),
            "# mine\n"
        );
        assert_eq!(run(Some(target), true, &quiet()).unwrap(), 0);
        assert_eq!(
            fs::read_to_string(dir.path().join(CONFIG_FILE_NAME)).unwrap(),
            DEFAULT_CONFIG
        );
    }
}
