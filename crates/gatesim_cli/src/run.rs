//! `gatesim run`: batch simulation of a circuit file.

use std::path::PathBuf;

use gatesim_common::Frequency;
use gatesim_sim::interactive::format_value;
use gatesim_sim::{readings, simulate, RunOptions};

use crate::{pipeline, GlobalArgs, RunArgs};

/// Runs the `gatesim run` command.
///
/// Prints one line per output pin, light and display to stdout. Returns
/// exit code 1 if any tick had to be abandoned.
pub fn run(args: &RunArgs, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let config = pipeline::load_config(global)?;
    let mut circuit = pipeline::load_circuit(&args.circuit, &config)?;
    let limits = config.limits();

    let frequency = args
        .frequency
        .as_deref()
        .map(str::parse::<Frequency>)
        .transpose()?;
    let ticks = args.ticks.unwrap_or(config.run.ticks);
    let options = RunOptions {
        ticks,
        drives: args.set.clone(),
        frequency,
        realtime: args.realtime || config.run.realtime,
        waveform_path: args.vcd.as_ref().map(PathBuf::from),
    };

    if !global.quiet {
        eprintln!("   Simulating {} for {ticks} tick(s)", args.circuit);
        if global.verbose {
            eprintln!(
                "      Limits {} passes, depth {}, {} ms per tick",
                limits.max_passes, limits.max_depth, limits.tick_interval_ms
            );
        }
    }

    let summary = simulate(&mut circuit, &limits, &options)?;
    let readings = readings(&circuit);

    if args.json {
        let report = serde_json::json!({
            "summary": summary,
            "readings": readings,
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        for r in &readings {
            let name = if r.label.is_empty() {
                format!("#{}", r.node)
            } else {
                r.label.clone()
            };
            println!("{name} = {}", format_value(&r.value));
        }
    }

    if !global.quiet {
        eprintln!(
            "    Finished {} tick(s), {} with changes",
            summary.ticks, summary.changed_ticks
        );
        if let Some(path) = &options.waveform_path {
            eprintln!("   Waveform: {}", path.display());
        }
    }
    if summary.faulted_ticks > 0 {
        eprintln!(
            "error: {} tick(s) abandoned after an internal error",
            summary.faulted_ticks
        );
        return Ok(1);
    }
    Ok(0)
}
