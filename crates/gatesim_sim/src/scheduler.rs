//! The external tick driver.
//!
//! A [`Scheduler`] owns everything that must persist between ticks apart
//! from the circuit itself: the engine limits, the netlist cache, and the
//! run/suspend state. It never sleeps; pacing ticks in real time is the
//! caller's job.

use std::panic::{self, AssertUnwindSafe};
use std::time::Duration;

use gatesim_common::{GateResult, InternalError};
use gatesim_config::EngineLimits;
use gatesim_ir::Circuit;

use crate::evaluator::{evaluate_with_stats, EvalContext};
use crate::netlist::NetlistCache;

/// Result of one scheduled tick.
#[derive(Debug)]
pub enum TickOutcome {
    /// The tick was not evaluated (stopped or suspended).
    Skipped,
    /// The circuit was evaluated.
    Settled {
        /// Whether any output changed.
        changed: bool,
        /// Settling passes used at the top level.
        passes: u32,
    },
    /// Evaluation panicked. The circuit keeps whatever state the
    /// abandoned tick had reached.
    Faulted(InternalError),
}

impl TickOutcome {
    /// True if the tick evaluated and changed at least one output.
    pub fn changed(&self) -> bool {
        matches!(self, TickOutcome::Settled { changed: true, .. })
    }
}

/// Drives a circuit one external tick at a time.
pub struct Scheduler {
    limits: EngineLimits,
    cache: NetlistCache,
    running: bool,
    suspended: bool,
    ticks: u64,
    faulted: bool,
}

impl Scheduler {
    /// Creates a stopped scheduler.
    pub fn new(limits: EngineLimits) -> Self {
        Self {
            limits,
            cache: NetlistCache::new(),
            running: false,
            suspended: false,
            ticks: 0,
            faulted: false,
        }
    }

    /// The engine limits every tick runs under.
    pub fn limits(&self) -> &EngineLimits {
        &self.limits
    }

    /// Wall-clock time between ticks.
    pub fn tick_interval(&self) -> Duration {
        self.limits.tick_interval()
    }

    /// Starts periodic ticking; see [`Scheduler::tick`].
    pub fn start(&mut self) {
        self.running = true;
    }

    /// Stops periodic ticking. Manual [`Scheduler::step`]s still work.
    pub fn stop(&mut self) {
        self.running = false;
    }

    /// Whether periodic ticks are being evaluated.
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Suppresses every tick, periodic or manual, until [`Scheduler::resume`].
    ///
    /// Used while the caller mutates the circuit in place, such as during a
    /// drag.
    pub fn suspend(&mut self) {
        self.suspended = true;
    }

    /// Lifts a [`Scheduler::suspend`].
    pub fn resume(&mut self) {
        self.suspended = false;
    }

    /// Whether ticks are currently suppressed.
    pub fn is_suspended(&self) -> bool {
        self.suspended
    }

    /// Number of ticks evaluated so far.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Read access to the netlists built so far.
    pub fn cache(&self) -> &NetlistCache {
        &self.cache
    }

    /// Drops every cached netlist so the next tick rebuilds them.
    pub fn invalidate(&mut self) {
        self.cache.clear();
    }

    /// Periodic entry point: evaluates one tick if the scheduler is running.
    pub fn tick(&mut self, circuit: &mut Circuit) -> TickOutcome {
        if !self.running {
            return TickOutcome::Skipped;
        }
        self.step(circuit)
    }

    /// Evaluates one tick unless suspended.
    pub fn step(&mut self, circuit: &mut Circuit) -> TickOutcome {
        if self.suspended {
            tracing::trace!("tick suppressed while suspended");
            return TickOutcome::Skipped;
        }

        let limits = self.limits;
        let cache = &mut self.cache;
        let result = guarded(|| {
            evaluate_with_stats(circuit, &EvalContext::top_level(&limits), cache)
        });

        match result {
            Ok(stats) => {
                self.ticks += 1;
                self.faulted = false;
                let swept = self.cache.sweep();
                tracing::trace!(
                    tick = self.ticks,
                    changed = stats.changed,
                    passes = stats.passes,
                    swept,
                    "tick settled"
                );
                TickOutcome::Settled {
                    changed: stats.changed,
                    passes: stats.passes,
                }
            }
            Err(err) => {
                if !self.faulted {
                    tracing::error!(tick = self.ticks + 1, "{err}; tick skipped");
                    self.faulted = true;
                }
                // A half-finished build may have left the cache inconsistent.
                self.cache.clear();
                TickOutcome::Faulted(err)
            }
        }
    }

    /// Steps `n` ticks and returns how many of them changed an output.
    pub fn run_ticks(&mut self, circuit: &mut Circuit, n: u64) -> u64 {
        let mut changed = 0;
        for _ in 0..n {
            if self.step(circuit).changed() {
                changed += 1;
            }
        }
        changed
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new(EngineLimits::default())
    }
}

/// Runs `f`, converting a panic into an [`InternalError`].
fn guarded<T>(f: impl FnOnce() -> T) -> GateResult<T> {
    panic::catch_unwind(AssertUnwindSafe(f)).map_err(InternalError::from_panic)
}

#[cfg(test)]
mod tests {
    use super::*;
    use gatesim_common::{Frequency, Value};
    use gatesim_ir::{Composite, GateKind, Node, NodeKind, Oscillator, PinWidth};

    fn not_circuit() -> (Circuit, gatesim_ir::NodeId, gatesim_ir::NodeId) {
        let mut c = Circuit::new();
        let a = c.add_node(Node::new(NodeKind::input_pin(false)));
        let n = c.add_node(Node::new(NodeKind::gate(GateKind::Not)));
        let q = c.add_node(Node::new(NodeKind::output_pin(PinWidth::One)));
        c.connect(a, "out", n, "in");
        c.connect(n, "out", q, "in");
        (c, a, q)
    }

    #[test]
    fn stopped_scheduler_skips_periodic_ticks() {
        let (mut c, _, _) = not_circuit();
        let mut sched = Scheduler::default();
        assert!(matches!(sched.tick(&mut c), TickOutcome::Skipped));
        sched.start();
        assert!(sched.is_running());
        assert!(matches!(sched.tick(&mut c), TickOutcome::Settled { .. }));
        sched.stop();
        assert!(matches!(sched.tick(&mut c), TickOutcome::Skipped));
        assert_eq!(sched.ticks(), 1);
    }

    #[test]
    fn suspended_scheduler_skips_manual_steps() {
        let (mut c, _, _) = not_circuit();
        let mut sched = Scheduler::default();
        sched.suspend();
        assert!(matches!(sched.step(&mut c), TickOutcome::Skipped));
        sched.resume();
        assert!(sched.step(&mut c).changed());
    }

    #[test]
    fn settles_then_reports_no_change() {
        let (mut c, a, q) = not_circuit();
        let mut sched = Scheduler::default();
        assert!(sched.step(&mut c).changed());
        assert!(!sched.step(&mut c).changed());
        assert_eq!(c.node(q).unwrap().display_value(), Some(Value::Bit(true)));
        c.node_mut(a).unwrap().drive(Value::Bit(true));
        assert!(sched.step(&mut c).changed());
        assert_eq!(c.node(q).unwrap().display_value(), Some(Value::Bit(false)));
    }

    #[test]
    fn run_ticks_counts_changes_of_a_blinking_clock() {
        let mut c = Circuit::new();
        let clk = c.add_node(Node::new(NodeKind::Clock(Oscillator::new(Frequency::new(
            10.0,
        )))));
        let inv = c.add_node(Node::new(NodeKind::gate(GateKind::Not)));
        c.connect(clk, "out", inv, "in");
        let mut sched = Scheduler::default();
        // 10 Hz at 50 ms toggles every tick, so the inverter flips every tick.
        assert_eq!(sched.run_ticks(&mut c, 4), 4);
        assert_eq!(sched.ticks(), 4);
    }

    #[test]
    fn unused_netlists_are_swept() {
        let mut inner = Circuit::new();
        let p = inner.add_node(Node::new(NodeKind::input_pin(false)));
        let o = inner.add_node(Node::new(NodeKind::output_pin(PinWidth::One)));
        inner.connect(p, "out", o, "in");
        let mut c = Circuit::new();
        let chip = c.add_node(Node::new(NodeKind::Composite(Box::new(
            Composite::from_circuit("buf", inner),
        ))));
        let mut sched = Scheduler::default();
        sched.step(&mut c);
        assert_eq!(sched.cache().len(), 2);
        c.remove_node(chip);
        sched.step(&mut c);
        assert_eq!(sched.cache().len(), 1);
    }

    #[test]
    fn invalidate_forces_rebuild() {
        let (mut c, _, _) = not_circuit();
        let mut sched = Scheduler::default();
        sched.step(&mut c);
        sched.invalidate();
        assert!(sched.cache().is_empty());
        sched.step(&mut c);
        assert_eq!(sched.cache().builds(), 2);
    }

    #[test]
    fn tick_interval_comes_from_limits() {
        let limits = EngineLimits {
            tick_interval_ms: 20,
            ..EngineLimits::default()
        };
        assert_eq!(
            Scheduler::new(limits).tick_interval(),
            Duration::from_millis(20)
        );
    }

    #[test]
    fn guarded_turns_panics_into_internal_errors() {
        let err = guarded(|| -> u32 { panic!("malformed node") }).unwrap_err();
        assert_eq!(err.message, "malformed node");
        let err = guarded(|| -> u32 { panic!("bad port {}", 3) }).unwrap_err();
        assert_eq!(err.message, "bad port 3");
        assert_eq!(guarded(|| 7).unwrap(), 7);
    }
}
