//! Diagnostic logging for the CLI.
//!
//! Library crates emit `tracing` events; this installs the subscriber that
//! prints them. User-facing progress lines go through `eprintln!` instead
//! and are not affected by the filter.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter directive used when `RUST_LOG` is unset.
fn default_directive(quiet: bool, verbose: bool) -> &'static str {
    if quiet {
        "error"
    } else if verbose {
        "debug"
    } else {
        "warn"
    }
}

/// Installs a stderr subscriber filtered by `RUST_LOG`, falling back to
/// a level derived from `-q`/`-v`.
pub fn init(quiet: bool, verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(quiet, verbose)));

    // A subscriber may already be installed when embedded in tests.
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directive_follows_flags() {
        assert_eq!(default_directive(false, false), "warn");
        assert_eq!(default_directive(false, true), "debug");
        assert_eq!(default_directive(true, false), "error");
    }
}
