//! gatesim CLI: runs, inspects and explores digital circuit files.
//!
//! Provides `gatesim run` for batch simulation, `gatesim nets` for dumping
//! the net partition of a circuit, `gatesim repl` for interactive stepping,
//! and `gatesim init` for writing a default `gatesim.toml`.

#![warn(missing_docs)]

mod init;
mod logging;
mod nets;
mod pipeline;
mod repl;
mod run;

use std::process;

use clap::{Parser, Subcommand};

/// gatesim, a tick-driven digital logic simulator.
#[derive(Parser, Debug)]
#[command(name = "gatesim", version, about = "Digital circuit simulator")]
pub struct Cli {
    /// Suppress all output except errors.
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Enable verbose (debug-level) output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to a `gatesim.toml` configuration file.
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// The subcommand to run.
    #[command(subcommand)]
    pub command: Command,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Simulate a circuit for a number of ticks and print its displays.
    Run(RunArgs),
    /// Print the nets of a circuit.
    Nets(NetsArgs),
    /// Step a circuit interactively.
    Repl(ReplArgs),
    /// Write a default `gatesim.toml`.
    Init {
        /// Directory to write into. Defaults to the current directory.
        dir: Option<String>,

        /// Overwrite an existing configuration file.
        #[arg(long)]
        force: bool,
    },
}

/// Arguments for the `gatesim run` subcommand.
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Circuit file (JSON).
    pub circuit: String,

    /// Number of ticks to simulate (default from `[run] ticks`).
    #[arg(short, long)]
    pub ticks: Option<u64>,

    /// Pace ticks in real time, one tick interval apart.
    #[arg(long)]
    pub realtime: bool,

    /// Drive an input pin or switch before the first tick (`NODE=VALUE`).
    #[arg(short, long = "set", value_name = "NODE=VALUE")]
    pub set: Vec<String>,

    /// Force every oscillator to this frequency (e.g. `2Hz`).
    #[arg(short, long)]
    pub frequency: Option<String>,

    /// Write a VCD waveform of the visible nodes to this path.
    #[arg(long, value_name = "PATH")]
    pub vcd: Option<String>,

    /// Print the final state as JSON.
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `gatesim nets` subcommand.
#[derive(Parser, Debug)]
pub struct NetsArgs {
    /// Circuit file (JSON).
    pub circuit: String,

    /// Print the netlist as JSON.
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `gatesim repl` subcommand.
#[derive(Parser, Debug)]
pub struct ReplArgs {
    /// Circuit file (JSON).
    pub circuit: String,
}

/// Global settings derived from CLI flags.
pub struct GlobalArgs {
    /// Whether to suppress non-error output.
    pub quiet: bool,
    /// Whether to print verbose/debug information.
    pub verbose: bool,
    /// Optional path to a custom config file.
    pub config: Option<String>,
}

fn main() {
    let cli = Cli::parse();
    logging::init(cli.quiet, cli.verbose);

    let global = GlobalArgs {
        quiet: cli.quiet,
        verbose: cli.verbose,
        config: cli.config,
    };

    let result = match cli.command {
        Command::Run(ref args) => run::run(args, &global),
        Command::Nets(ref args) => nets::run(args, &global),
        Command::Repl(ref args) => repl::run(args, &global),
        Command::Init { dir, force } => init::run(dir, force, &global),
    };

    match result {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("error: {e}");
            process::exit(1);
        }
    }
}
