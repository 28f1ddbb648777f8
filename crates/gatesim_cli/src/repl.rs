//! `gatesim repl`: interactive stepping on stdin/stdout.

use gatesim_sim::InteractiveSim;

use crate::{pipeline, GlobalArgs, ReplArgs};

/// Runs the `gatesim repl` command until `quit` or end of input.
pub fn run(args: &ReplArgs, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let config = pipeline::load_config(global)?;
    let circuit = pipeline::load_circuit(&args.circuit, &config)?;
    if !global.quiet {
        eprintln!("   Loaded {}", args.circuit);
    }
    let mut sim = InteractiveSim::new(circuit, config.limits());
    let stdin = std::io::stdin();
    let mut stdout = std::io::stdout();
    sim.run_repl(&mut stdin.lock(), &mut stdout)?;
    Ok(0)
}
