//! Oscillator advancement, counted in external ticks.
//!
//! An oscillator toggles once every half period. Half periods are measured
//! in external ticks of a fixed wall-clock interval, independent of how many
//! settling passes a tick takes.

use gatesim_common::Frequency;
use gatesim_ir::{Circuit, NodeKind, Oscillator};

/// Ticks in one half period: `max(1, round((1000 / hz) / 2 / interval))`.
pub fn half_period_ticks(frequency: Frequency, tick_interval_ms: u64) -> u64 {
    frequency.half_period_ticks(tick_interval_ms)
}

/// Advances a running oscillator by one external tick.
///
/// Returns true if the oscillator toggled. Stopped oscillators keep both
/// their counter and their state.
pub fn advance(osc: &mut Oscillator, tick_interval_ms: u64) -> bool {
    if !osc.running {
        return false;
    }
    osc.tick += 1;
    if osc.tick >= half_period_ticks(osc.frequency, tick_interval_ms) {
        osc.tick = 0;
        osc.state = !osc.state;
        return true;
    }
    false
}

/// Sets the frequency of every oscillator in the circuit, including those
/// inside composites. Returns the number of oscillators changed.
pub fn set_frequency_all(circuit: &mut Circuit, frequency: Frequency) -> usize {
    let mut count = 0;
    for (_, node) in circuit.nodes_mut() {
        match &mut node.kind {
            NodeKind::Clock(osc) => {
                osc.frequency = frequency;
                count += 1;
            }
            NodeKind::Composite(chip) => count += set_frequency_all(&mut chip.circuit, frequency),
            _ => {}
        }
    }
    count
}
