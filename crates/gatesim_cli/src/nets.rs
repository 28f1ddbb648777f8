//! `gatesim nets`: dump the net partition of a circuit file.

use gatesim_sim::interactive::render_nets;
use gatesim_sim::Netlist;

use crate::{pipeline, GlobalArgs, NetsArgs};

/// Runs the `gatesim nets` command.
pub fn run(args: &NetsArgs, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let config = pipeline::load_config(global)?;
    let circuit = pipeline::load_circuit(&args.circuit, &config)?;
    let netlist = Netlist::build(&circuit);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&netlist)?);
    } else {
        println!("{}", render_nets(&netlist, &circuit));
    }
    if !global.quiet {
        eprintln!(
            "   {} node(s), {} wire(s), {} net(s)",
            circuit.node_count(),
            circuit.wire_count(),
            netlist.len()
        );
    }
    Ok(0)
}
