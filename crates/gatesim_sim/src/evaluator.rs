//! The tick evaluator: settles one circuit level for one external tick.
//!
//! Evaluation runs in two phases:
//!
//! 1. **Reset.** Every node's staged inputs are cleared, Joints are reset to
//!    drive nothing, and oscillators advance (when clocks are enabled for
//!    this call) and publish their output.
//! 2. **Settle.** Up to `max_passes` passes, each of which resolves every
//!    net from its sources' current outputs (wired-OR), stages the net
//!    values on the sinks, then evaluates every node once from its staged
//!    inputs. Settling stops after the first pass beyond the initial one in
//!    which no output port changed.
//!
//! A combinational loop that never settles is cut off at the pass cap and
//! leaves whatever the last pass computed. Nothing here returns an error.

use std::sync::Arc;

use gatesim_common::{BusValue, Value};
use gatesim_config::EngineLimits;
use gatesim_ir::{Circuit, GateKind, Node, NodeKind, PortId, PortValues, ResizeKind, Segments, SEGMENT_PORTS};

use crate::clock;
use crate::composite;
use crate::netlist::{Netlist, NetlistCache};

/// Port ids of merge inputs, in declaration order.
pub(crate) const MERGE_PORTS: [&str; 8] = ["i0", "i1", "i2", "i3", "i4", "i5", "i6", "i7"];
/// Port ids of split outputs, in declaration order.
pub(crate) const SPLIT_PORTS: [&str; 8] = ["o0", "o1", "o2", "o3", "o4", "o5", "o6", "o7"];

/// Per-call evaluation settings.
#[derive(Clone, Copy, Debug)]
pub struct EvalContext<'a> {
    /// Composite nesting depth of the circuit being evaluated (0 = top).
    pub depth: u32,
    /// Whether oscillators advance during this call.
    pub advance_clocks: bool,
    /// Pass and depth limits.
    pub limits: &'a EngineLimits,
}

impl<'a> EvalContext<'a> {
    /// Context for the top-level circuit of an external tick.
    pub fn top_level(limits: &'a EngineLimits) -> Self {
        Self {
            depth: 0,
            advance_clocks: true,
            limits,
        }
    }

    /// Context for a composite's internal circuit: one level deeper, with
    /// clocks frozen.
    pub fn nested(&self) -> Self {
        Self {
            depth: self.depth + 1,
            advance_clocks: false,
            limits: self.limits,
        }
    }
}

/// What one evaluation call did.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EvalStats {
    /// Whether any output port changed during the call.
    pub changed: bool,
    /// Settling passes executed.
    pub passes: u32,
    /// Whether the pass cap stopped a circuit that was still changing.
    pub capped: bool,
    /// Whether the call returned immediately because of the depth limit.
    pub depth_limited: bool,
}

/// Evaluates one circuit level for one external tick.
///
/// Returns true if any node's output changed.
pub fn evaluate(circuit: &mut Circuit, ctx: &EvalContext<'_>, cache: &mut NetlistCache) -> bool {
    evaluate_with_stats(circuit, ctx, cache).changed
}

/// Like [`evaluate`], but reports pass counts and limit hits.
pub fn evaluate_with_stats(
    circuit: &mut Circuit,
    ctx: &EvalContext<'_>,
    cache: &mut NetlistCache,
) -> EvalStats {
    if ctx.depth > ctx.limits.max_depth {
        tracing::warn!(
            depth = ctx.depth,
            max_depth = ctx.limits.max_depth,
            "composite nesting limit reached; skipping"
        );
        return EvalStats {
            depth_limited: true,
            ..EvalStats::default()
        };
    }

    reset(circuit, ctx);
    let netlist: Arc<Netlist> = cache.get_or_build(circuit);

    let mut stats = EvalStats::default();
    let mut net_values: Vec<Value> = Vec::with_capacity(netlist.len());
    for pass in 0..ctx.limits.max_passes {
        stats.passes = pass + 1;
        propagate(circuit, &netlist, &mut net_values);

        let mut any_changed = false;
        for (_, node) in circuit.nodes_mut() {
            let before = node.outputs.clone();
            step_node(node, pass, ctx, cache);
            if outputs_changed(&before, &node.outputs) {
                any_changed = true;
            }
        }

        for (net, value) in netlist.nets().iter().zip(&net_values) {
            for &joint in &net.joints {
                if let Some(j) = circuit.node_mut(joint) {
                    set_port(&mut j.outputs, "joint", *value);
                }
            }
        }

        if any_changed {
            stats.changed = true;
        }
        if pass > 0 && !any_changed {
            return stats;
        }
        stats.capped = any_changed && pass + 1 == ctx.limits.max_passes;
    }

    if stats.capped {
        tracing::trace!(
            depth = ctx.depth,
            passes = stats.passes,
            "pass limit reached before outputs settled"
        );
    }
    stats
}

/// Clears staged inputs, resets Joints, and drives oscillator outputs.
fn reset(circuit: &mut Circuit, ctx: &EvalContext<'_>) {
    let interval = ctx.limits.tick_interval_ms;
    for (_, node) in circuit.nodes_mut() {
        node.inputs.clear();
        match &mut node.kind {
            NodeKind::Joint => {
                node.outputs.clear();
                node.outputs.insert(PortId::from("joint"), Value::Bit(false));
            }
            NodeKind::Clock(osc) => {
                if ctx.advance_clocks {
                    clock::advance(osc, interval);
                }
                set_port(&mut node.outputs, "out", Value::Bit(osc.output()));
            }
            _ => {}
        }
    }
}

/// Resolves every net and stages its value on each sink.
fn propagate(circuit: &mut Circuit, netlist: &Netlist, net_values: &mut Vec<Value>) {
    for (_, node) in circuit.nodes_mut() {
        node.inputs.clear();
    }
    net_values.clear();
    for net in netlist.nets() {
        let value = net.resolve(circuit);
        for sink in &net.sinks {
            let Some(node) = circuit.node_mut(sink.node) else {
                continue;
            };
            let staged = match node.inputs.get(sink.port.as_str()) {
                Some(prev) => prev.merge_or(&value, net.width),
                None => value,
            };
            node.inputs.insert(sink.port.clone(), staged);
        }
        net_values.push(value);
    }
}

/// True if any current output differs from its value before the step.
fn outputs_changed(before: &PortValues, after: &PortValues) -> bool {
    after
        .iter()
        .any(|(port, value)| before.get(port.as_str()) != Some(value))
}

/// Evaluates one node from its staged inputs.
fn step_node(node: &mut Node, pass: u32, ctx: &EvalContext<'_>, cache: &mut NetlistCache) {
    let Node {
        kind,
        inputs,
        outputs,
        ..
    } = node;
    match kind {
        NodeKind::Composite(chip) => composite::step(chip, inputs, outputs, pass, ctx, cache),
        other => step_primitive(other, inputs, outputs),
    }
}

/// Applies a primitive component's function.
pub(crate) fn step_primitive(kind: &mut NodeKind, inputs: &PortValues, outputs: &mut PortValues) {
    match kind {
        NodeKind::InputPin { width, state } => {
            set_port(outputs, "out", state.normalise(width.bits()));
        }
        NodeKind::Switch { on } => set_port(outputs, "out", Value::Bit(*on)),
        NodeKind::OutputPin { width, display } => {
            *display = inputs
                .get("in")
                .copied()
                .unwrap_or_else(|| Value::zero(width.bits()));
        }
        NodeKind::Light { lit } => *lit = bit_in(inputs, "in"),
        NodeKind::Gate { gate } => {
            let q = match gate {
                GateKind::Not => !bit_in(inputs, "in"),
                g => g.apply(bit_in(inputs, "a"), bit_in(inputs, "b")),
            };
            set_port(outputs, "out", Value::Bit(q));
        }
        NodeKind::TriBuffer => {
            let q = bit_in(inputs, "en") && bit_in(inputs, "in");
            set_port(outputs, "out", Value::Bit(q));
        }
        NodeKind::Merge { width } => {
            let n = width.bits();
            let mut bus = BusValue::new(n);
            for (i, port) in MERGE_PORTS.iter().take(n as usize).enumerate() {
                // Port i0 carries the most significant bit.
                bus.set(n - 1 - i as u32, bit_in(inputs, port));
            }
            set_port(outputs, "out", Value::Bus(bus));
        }
        NodeKind::Split { width } => {
            let n = width.bits();
            let lanes = lanes_in(inputs, "in");
            for (k, port) in SPLIT_PORTS.iter().take(n as usize).enumerate() {
                set_port(outputs, port, Value::Bit(lanes.get(n - 1 - k as u32)));
            }
        }
        NodeKind::Resize { direction } => match direction {
            ResizeKind::EightToFour => {
                let lanes = lanes_in(inputs, "in");
                set_port(outputs, "high", Value::Bus(lanes.slice(4, 4)));
                set_port(outputs, "low", Value::Bus(lanes.slice(0, 4)));
            }
            ResizeKind::FourToEight => {
                let low = lanes_in(inputs, "low").resized(4);
                let high = lanes_in(inputs, "high").resized(4);
                set_port(outputs, "out", Value::Bus(low.concat(&high)));
            }
        },
        NodeKind::SevenSegment { segments } => {
            *segments = Segments::from_array(SEGMENT_PORTS.map(|p| bit_in(inputs, p)));
        }
        NodeKind::Clock(_)
        | NodeKind::Joint
        | NodeKind::Comment
        | NodeKind::Composite(_)
        | NodeKind::Unknown => {}
    }
}

/// Reads a staged input as a boolean; absent inputs read as false.
fn bit_in(inputs: &PortValues, port: &str) -> bool {
    inputs.get(port).is_some_and(Value::to_bool)
}

/// Reads a staged input as bus lanes. A scalar becomes a one-lane bus, so
/// it lands in lane 0 only.
fn lanes_in(inputs: &PortValues, port: &str) -> BusValue {
    match inputs.get(port) {
        Some(Value::Bus(bus)) => *bus,
        Some(Value::Bit(b)) => BusValue::from_bits(&[*b]),
        None => BusValue::from_bits(&[false]),
    }
}

/// Writes an output port, reusing the existing key when present.
pub(crate) fn set_port(outputs: &mut PortValues, port: &str, value: Value) {
    match outputs.get_mut(port) {
        Some(slot) => *slot = value,
        None => {
            outputs.insert(PortId::from(port), value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gatesim_common::Frequency;
    use gatesim_ir::{BusWidth, NodeId, Oscillator, PinWidth};

    fn run(c: &mut Circuit) -> EvalStats {
        let limits = EngineLimits::default();
        let mut cache = NetlistCache::new();
        evaluate_with_stats(c, &EvalContext::top_level(&limits), &mut cache)
    }

    fn display(c: &Circuit, id: NodeId) -> Value {
        c.node(id).and_then(Node::display_value).unwrap()
    }

    fn gate_circuit(gate: GateKind, a: bool, b: bool) -> (Circuit, NodeId) {
        let mut c = Circuit::new();
        let pa = c.add_node(Node::new(NodeKind::input_pin(a)));
        let pb = c.add_node(Node::new(NodeKind::input_pin(b)));
        let g = c.add_node(Node::new(NodeKind::gate(gate)));
        let q = c.add_node(Node::new(NodeKind::output_pin(PinWidth::One)));
        c.connect(pa, "out", g, "a");
        c.connect(pb, "out", g, "b");
        c.connect(g, "out", q, "in");
        (c, q)
    }

    #[test]
    fn two_input_gates() {
        let cases = [
            (GateKind::And, [false, false, false, true]),
            (GateKind::Or, [false, true, true, true]),
            (GateKind::Xor, [false, true, true, false]),
            (GateKind::Nand, [true, true, true, false]),
            (GateKind::Nor, [true, false, false, false]),
        ];
        for (gate, expected) in cases {
            for (i, (a, b)) in [(false, false), (false, true), (true, false), (true, true)]
                .into_iter()
                .enumerate()
            {
                let (mut c, q) = gate_circuit(gate, a, b);
                run(&mut c);
                assert_eq!(display(&c, q), Value::Bit(expected[i]), "{gate:?}({a}, {b})");
            }
        }
    }

    #[test]
    fn unconnected_gate_inputs_read_false() {
        let mut c = Circuit::new();
        let g = c.add_node(Node::new(NodeKind::gate(GateKind::Nand)));
        run(&mut c);
        assert_eq!(c.node(g).unwrap().output("out"), Some(&Value::Bit(true)));
    }

    #[test]
    fn tri_buffer_gates_its_input() {
        let mut c = Circuit::new();
        let data = c.add_node(Node::new(NodeKind::input_pin(true)));
        let en = c.add_node(Node::new(NodeKind::input_pin(false)));
        let buf = c.add_node(Node::new(NodeKind::TriBuffer));
        let q = c.add_node(Node::new(NodeKind::output_pin(PinWidth::One)));
        c.connect(data, "out", buf, "in");
        c.connect(en, "out", buf, "en");
        c.connect(buf, "out", q, "in");
        run(&mut c);
        assert_eq!(display(&c, q), Value::Bit(false));
        c.node_mut(en).unwrap().drive(Value::Bit(true));
        run(&mut c);
        assert_eq!(display(&c, q), Value::Bit(true));
    }

    #[test]
    fn merge_puts_first_port_in_msb() {
        let mut c = Circuit::new();
        let merge = c.add_node(Node::new(NodeKind::Merge {
            width: BusWidth::Four,
        }));
        let hi = c.add_node(Node::new(NodeKind::input_pin(true)));
        c.connect(hi, "out", merge, "i0");
        let q = c.add_node(Node::new(NodeKind::output_pin(PinWidth::Four)));
        c.connect(merge, "out", q, "in");
        run(&mut c);
        assert_eq!(display(&c, q), Value::Bus(BusValue::from_u64(0b1000, 4)));
    }

    #[test]
    fn split_scalar_lands_in_last_port() {
        let mut node = NodeKind::Split {
            width: BusWidth::Four,
        };
        let mut inputs = PortValues::new();
        inputs.insert("in".into(), Value::Bit(true));
        let mut outputs = PortValues::new();
        step_primitive(&mut node, &inputs, &mut outputs);
        assert_eq!(outputs.get("o3"), Some(&Value::Bit(true)));
        assert_eq!(outputs.get("o0"), Some(&Value::Bit(false)));
    }

    #[test]
    fn resize_round_trip() {
        let mut c = Circuit::new();
        let src = c.add_node(Node::new(NodeKind::bus_input_pin(PinWidth::Eight)));
        c.node_mut(src)
            .unwrap()
            .drive(Value::Bus(BusValue::from_u64(0xA5, 8)));
        let down = c.add_node(Node::new(NodeKind::Resize {
            direction: ResizeKind::EightToFour,
        }));
        let up = c.add_node(Node::new(NodeKind::Resize {
            direction: ResizeKind::FourToEight,
        }));
        let hi = c.add_node(Node::new(NodeKind::output_pin(PinWidth::Four)));
        let q = c.add_node(Node::new(NodeKind::output_pin(PinWidth::Eight)));
        c.connect(src, "out", down, "in");
        c.connect(down, "high", up, "high");
        c.connect(down, "low", up, "low");
        c.connect(down, "high", hi, "in");
        c.connect(up, "out", q, "in");
        run(&mut c);
        assert_eq!(display(&c, hi), Value::Bus(BusValue::from_u64(0xA, 4)));
        assert_eq!(display(&c, q), Value::Bus(BusValue::from_u64(0xA5, 8)));
    }

    #[test]
    fn seven_segment_latches_inputs() {
        let mut c = Circuit::new();
        let on = c.add_node(Node::new(NodeKind::input_pin(true)));
        let seg = c.add_node(Node::new(NodeKind::SevenSegment {
            segments: Segments::default(),
        }));
        c.connect(on, "out", seg, "a");
        c.connect(on, "out", seg, "dp");
        run(&mut c);
        match &c.node(seg).unwrap().kind {
            NodeKind::SevenSegment { segments } => {
                assert!(segments.a && segments.dp);
                assert!(!segments.b && !segments.g);
            }
            other => panic!("unexpected kind {other:?}"),
        }
    }

    #[test]
    fn chain_settles_in_one_call() {
        let mut c = Circuit::new();
        let a = c.add_node(Node::new(NodeKind::input_pin(false)));
        let mut prev = a;
        for _ in 0..5 {
            let g = c.add_node(Node::new(NodeKind::gate(GateKind::Not)));
            c.connect(prev, "out", g, "in");
            prev = g;
        }
        let q = c.add_node(Node::new(NodeKind::output_pin(PinWidth::One)));
        c.connect(prev, "out", q, "in");
        let stats = run(&mut c);
        assert!(stats.changed);
        assert!(!stats.capped);
        assert_eq!(display(&c, q), Value::Bit(true));
    }

    #[test]
    fn stable_circuit_reports_no_change() {
        let (mut c, _) = gate_circuit(GateKind::And, true, true);
        let limits = EngineLimits::default();
        let mut cache = NetlistCache::new();
        let ctx = EvalContext::top_level(&limits);
        assert!(evaluate(&mut c, &ctx, &mut cache));
        assert!(!evaluate(&mut c, &ctx, &mut cache));
        assert_eq!(cache.builds(), 1);
    }

    #[test]
    fn ring_oscillator_hits_pass_cap() {
        let mut c = Circuit::new();
        let g = c.add_node(Node::new(NodeKind::gate(GateKind::Not)));
        c.connect(g, "out", g, "in");
        let stats = run(&mut c);
        assert!(stats.capped);
        assert_eq!(stats.passes, EngineLimits::default().max_passes);
    }

    #[test]
    fn depth_limit_returns_unchanged() {
        let (mut c, q) = gate_circuit(GateKind::Or, true, false);
        let limits = EngineLimits::default();
        let ctx = EvalContext {
            depth: limits.max_depth + 1,
            advance_clocks: true,
            limits: &limits,
        };
        let stats = evaluate_with_stats(&mut c, &ctx, &mut NetlistCache::new());
        assert!(stats.depth_limited);
        assert!(!stats.changed);
        assert_eq!(display(&c, q), Value::Bit(false));
    }

    #[test]
    fn joints_display_their_net() {
        let mut c = Circuit::new();
        let a = c.add_node(Node::new(NodeKind::input_pin(true)));
        let j = c.add_node(Node::new(NodeKind::Joint));
        let q = c.add_node(Node::new(NodeKind::output_pin(PinWidth::One)));
        c.connect(a, "out", j, "joint");
        c.connect(j, "joint", q, "in");
        run(&mut c);
        assert_eq!(display(&c, j), Value::Bit(true));
        assert_eq!(display(&c, q), Value::Bit(true));
    }

    #[test]
    fn clock_output_follows_running_flag() {
        let mut c = Circuit::new();
        let mut osc = Oscillator::new(Frequency::new(50.0));
        osc.running = false;
        osc.state = true;
        let clk = c.add_node(Node::new(NodeKind::Clock(osc)));
        let q = c.add_node(Node::new(NodeKind::output_pin(PinWidth::One)));
        c.connect(clk, "out", q, "in");
        run(&mut c);
        assert_eq!(display(&c, q), Value::Bit(false));
        if let NodeKind::Clock(osc) = &mut c.node_mut(clk).unwrap().kind {
            osc.toggle_running();
        }
        run(&mut c);
        // Running again: advanced once (50 Hz toggles every tick) from high to low.
        assert_eq!(display(&c, q), Value::Bit(false));
        run(&mut c);
        assert_eq!(display(&c, q), Value::Bit(true));
    }

    #[test]
    fn unknown_nodes_are_inert() {
        let mut c = Circuit::new();
        let a = c.add_node(Node::new(NodeKind::input_pin(true)));
        let u = c.add_node(Node::new(NodeKind::Unknown));
        c.connect(a, "out", u, "x");
        run(&mut c);
        assert!(c.node(u).unwrap().outputs.is_empty());
    }
}
