//! Tick-driven evaluation engine for the gatesim digital circuit simulator.
//!
//! Each external tick, a circuit's wires are grouped into nets, every net
//! carries the wired-OR of its sources to its sinks, and every node is
//! re-evaluated until no output changes or the pass cap is reached.
//! User-defined chips evaluate their private internal circuit recursively,
//! and oscillators toggle on a half period counted in ticks.
//!
//! # Usage
//!
//! ```ignore
//! use gatesim_sim::{load_circuit, simulate, RunOptions};
//!
//! let mut circuit = load_circuit(path)?;
//! let summary = simulate(&mut circuit, &limits, &RunOptions { ticks: 20, ..Default::default() })?;
//! for reading in readings(&circuit) {
//!     println!("{} = {}", reading.label, reading.value);
//! }
//! ```
//!
//! # Modules
//!
//! - `netlist`: union-find net partition and the revision-keyed cache
//! - `evaluator`: the multi-pass settle loop and primitive semantics
//! - `composite`: recursion into user-defined chips
//! - `clock`: oscillator half periods
//! - `scheduler`: the external tick driver
//! - `file`: JSON circuit files and `NODE=VALUE` drives
//! - `waveform`: VCD recording
//! - `interactive`: the REPL

#![warn(missing_docs)]

pub mod clock;
pub mod composite;
pub mod error;
pub mod evaluator;
pub mod file;
pub mod interactive;
pub mod netlist;
pub mod scheduler;
pub mod waveform;

use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;

use gatesim_common::{Frequency, Value};
use gatesim_config::EngineLimits;
use gatesim_ir::{Circuit, NodeKind};
use serde::Serialize;

pub use error::SimError;
pub use evaluator::{evaluate, evaluate_with_stats, EvalContext, EvalStats};
pub use file::{apply_drive, load_circuit, parse_circuit, resolve_node, save_circuit};
pub use interactive::InteractiveSim;
pub use netlist::{Net, NetId, Netlist, NetlistCache, Terminal, UnionFind};
pub use scheduler::{Scheduler, TickOutcome};
pub use waveform::{Tracer, VcdRecorder, WaveformRecorder};

/// Options for a batch run.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Number of ticks to evaluate.
    pub ticks: u64,
    /// `NODE=VALUE` assignments applied before the first tick.
    pub drives: Vec<String>,
    /// Frequency forced onto every oscillator, at any depth.
    pub frequency: Option<Frequency>,
    /// Sleep one tick interval between ticks.
    pub realtime: bool,
    /// Where to write a VCD waveform of the visible nodes.
    pub waveform_path: Option<PathBuf>,
}

/// What a batch run did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    /// Ticks evaluated.
    pub ticks: u64,
    /// Ticks in which some output changed.
    pub changed_ticks: u64,
    /// Ticks abandoned because evaluation panicked.
    pub faulted_ticks: u64,
}

/// High-level entry point: drives, ticks and optionally records a circuit.
pub fn simulate(
    circuit: &mut Circuit,
    limits: &EngineLimits,
    options: &RunOptions,
) -> Result<RunSummary, SimError> {
    for assignment in &options.drives {
        apply_drive(circuit, assignment)?;
    }
    if let Some(freq) = options.frequency {
        let n = clock::set_frequency_all(circuit, freq);
        tracing::debug!(oscillators = n, frequency = %freq, "frequency override applied");
    }

    let mut tracer = match &options.waveform_path {
        Some(path) => {
            let writer = BufWriter::new(File::create(path)?);
            let recorder: Box<dyn WaveformRecorder> = Box::new(VcdRecorder::new(writer));
            Some(Tracer::attach(
                circuit,
                recorder,
                "circuit",
                limits.tick_interval_ms,
            )?)
        }
        None => None,
    };

    let mut scheduler = Scheduler::new(*limits);
    scheduler.start();
    let mut summary = RunSummary::default();
    if let Some(t) = tracer.as_mut() {
        t.sample(0, circuit)?;
    }
    for tick in 1..=options.ticks {
        if options.realtime && tick > 1 {
            std::thread::sleep(scheduler.tick_interval());
        }
        match scheduler.tick(circuit) {
            TickOutcome::Settled { changed, .. } => {
                summary.ticks += 1;
                if changed {
                    summary.changed_ticks += 1;
                }
            }
            TickOutcome::Faulted(_) => summary.faulted_ticks += 1,
            TickOutcome::Skipped => {}
        }
        if let Some(t) = tracer.as_mut() {
            t.sample(tick, circuit)?;
        }
    }
    if let Some(t) = tracer {
        t.finish()?;
    }
    Ok(summary)
}

/// The state of one visible node.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Reading {
    /// Node handle.
    pub node: u32,
    /// Node label.
    pub label: String,
    /// Current display value.
    #[serde(serialize_with = "serialize_value")]
    pub value: Value,
}

fn serialize_value<S: serde::Serializer>(value: &Value, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&interactive::format_value(value))
}

/// Display values of every output pin, light and seven-segment display, in
/// node order.
pub fn readings(circuit: &Circuit) -> Vec<Reading> {
    circuit
        .nodes()
        .filter(|(_, n)| {
            matches!(
                n.kind,
                NodeKind::OutputPin { .. } | NodeKind::Light { .. } | NodeKind::SevenSegment { .. }
            )
        })
        .filter_map(|(id, n)| {
            n.display_value().map(|value| Reading {
                node: id.as_raw(),
                label: n.label.clone(),
                value,
            })
        })
        .collect()
}
