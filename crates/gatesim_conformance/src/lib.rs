//! Conformance test helpers for the gatesim evaluation engine.
//!
//! Provides a small test bench that owns a circuit together with the engine
//! state needed to tick it, plus builders for the reference circuits the
//! integration tests share.

#![warn(missing_docs)]

use gatesim_common::Value;
use gatesim_config::EngineLimits;
use gatesim_ir::{BusWidth, Circuit, Composite, GateKind, Node, NodeId, NodeKind, PinWidth};
use gatesim_sim::{evaluate_with_stats, EvalContext, EvalStats, NetlistCache, Netlist};

/// A circuit plus the engine state needed to evaluate it tick by tick.
pub struct Bench {
    /// The circuit under test.
    pub circuit: Circuit,
    /// Limits used for every tick.
    pub limits: EngineLimits,
    cache: NetlistCache,
}

impl Bench {
    /// Wraps a circuit with default limits.
    pub fn new(circuit: Circuit) -> Self {
        Self::with_limits(circuit, EngineLimits::default())
    }

    /// Wraps a circuit with custom limits.
    pub fn with_limits(circuit: Circuit, limits: EngineLimits) -> Self {
        Self {
            circuit,
            limits,
            cache: NetlistCache::new(),
        }
    }

    /// Evaluates one external tick.
    pub fn tick(&mut self) -> EvalStats {
        let ctx = EvalContext::top_level(&self.limits);
        evaluate_with_stats(&mut self.circuit, &ctx, &mut self.cache)
    }

    /// Evaluates `n` ticks and returns the stats of the last one.
    pub fn ticks(&mut self, n: u64) -> EvalStats {
        let mut last = EvalStats::default();
        for _ in 0..n {
            last = self.tick();
        }
        last
    }

    /// The display value of the node labelled `label`.
    ///
    /// Panics if no such node exists.
    pub fn read(&self, label: &str) -> Value {
        let id = self.id(label);
        self.circuit
            .node(id)
            .and_then(Node::display_value)
            .unwrap_or_else(|| panic!("node '{label}' has no display value"))
    }

    /// The display value of the node labelled `label`, as a boolean.
    pub fn read_bool(&self, label: &str) -> bool {
        self.read(label).to_bool()
    }

    /// Drives the input pin or switch labelled `label`.
    pub fn set(&mut self, label: &str, value: bool) {
        let id = self.id(label);
        let driven = self
            .circuit
            .node_mut(id)
            .map(|n| n.drive(Value::Bit(value)))
            .unwrap_or(false);
        assert!(driven, "node '{label}' cannot be driven");
    }

    /// Looks up a node by label. Panics if no such node exists.
    pub fn id(&self, label: &str) -> NodeId {
        self.circuit
            .find_by_label(label)
            .unwrap_or_else(|| panic!("no node labelled '{label}'"))
    }

    /// A fresh netlist of the current circuit.
    pub fn netlist(&self) -> Netlist {
        Netlist::build(&self.circuit)
    }
}

/// `A -> NOT -> Q`.
pub fn inverter(a: bool) -> Circuit {
    let mut c = Circuit::new();
    let pa = c.add_node(Node::new(NodeKind::input_pin(a)).with_label("A"));
    let g = c.add_node(Node::new(NodeKind::gate(GateKind::Not)));
    let q = c.add_node(Node::new(NodeKind::output_pin(PinWidth::One)).with_label("Q"));
    c.connect(pa, "out", g, "in");
    c.connect(g, "out", q, "in");
    c
}

/// Two switches `A` and `B` into an AND gate lighting `L`.
pub fn and_light(a: bool, b: bool) -> Circuit {
    let mut c = Circuit::new();
    let sa = c.add_node(Node::new(NodeKind::Switch { on: a }).with_label("A"));
    let sb = c.add_node(Node::new(NodeKind::Switch { on: b }).with_label("B"));
    let g = c.add_node(Node::new(NodeKind::gate(GateKind::And)));
    let l = c.add_node(Node::new(NodeKind::Light { lit: false }).with_label("L"));
    c.connect(sa, "out", g, "a");
    c.connect(sb, "out", g, "b");
    c.connect(g, "out", l, "in");
    c
}

/// Four input pins `I0..I3` merged into a bus `BUS`, split again, and shown
/// on output pins `O0..O3`.
pub fn merge_split_loop(bits: [bool; 4]) -> Circuit {
    let mut c = Circuit::new();
    let merge = c.add_node(Node::new(NodeKind::Merge {
        width: BusWidth::Four,
    }));
    let split = c.add_node(Node::new(NodeKind::Split {
        width: BusWidth::Four,
    }));
    let bus = c.add_node(Node::new(NodeKind::output_pin(PinWidth::Four)).with_label("BUS"));
    c.connect(merge, "out", split, "in");
    c.connect(merge, "out", bus, "in");
    for (k, &bit) in bits.iter().enumerate() {
        let pin = c.add_node(Node::new(NodeKind::input_pin(bit)).with_label(format!("I{k}")));
        let out =
            c.add_node(Node::new(NodeKind::output_pin(PinWidth::One)).with_label(format!("O{k}")));
        c.connect(pin, "out", merge, format!("i{k}"));
        c.connect(split, format!("o{k}"), out, "in");
    }
    c
}

/// A chip whose internal circuit wires one input pin straight to one output
/// pin.
pub fn pass_through_chip() -> Composite {
    let mut inner = Circuit::new();
    let i = inner.add_node(Node::new(NodeKind::input_pin(false)).with_label("IN").at(0, 0));
    let o = inner.add_node(
        Node::new(NodeKind::output_pin(PinWidth::One))
            .with_label("OUT")
            .at(100, 0),
    );
    inner.connect(i, "out", o, "in");
    Composite::from_circuit("WIRE", inner)
}

/// Input `A` through a chip instance to output `Q`.
pub fn chip_circuit(chip: Composite, a: bool) -> Circuit {
    let mut c = Circuit::new();
    let pa = c.add_node(Node::new(NodeKind::input_pin(a)).with_label("A"));
    let x = c.add_node(Node::new(NodeKind::Composite(Box::new(chip))).with_label("X"));
    let q = c.add_node(Node::new(NodeKind::output_pin(PinWidth::One)).with_label("Q"));
    c.connect(pa, "out", x, "in0");
    c.connect(x, "out0", q, "in");
    c
}

/// A one-bit full adder over inputs `A`, `B`, `CIN` with outputs `S` and
/// `COUT`.
pub fn full_adder() -> Circuit {
    let mut c = Circuit::new();
    let a = c.add_node(Node::new(NodeKind::input_pin(false)).with_label("A").at(0, 0));
    let b = c.add_node(Node::new(NodeKind::input_pin(false)).with_label("B").at(0, 40));
    let cin = c.add_node(Node::new(NodeKind::input_pin(false)).with_label("CIN").at(0, 80));
    let x1 = c.add_node(Node::new(NodeKind::gate(GateKind::Xor)));
    let x2 = c.add_node(Node::new(NodeKind::gate(GateKind::Xor)));
    let a1 = c.add_node(Node::new(NodeKind::gate(GateKind::And)));
    let a2 = c.add_node(Node::new(NodeKind::gate(GateKind::And)));
    let or = c.add_node(Node::new(NodeKind::gate(GateKind::Or)));
    let s = c.add_node(
        Node::new(NodeKind::output_pin(PinWidth::One))
            .with_label("S")
            .at(200, 0),
    );
    let cout = c.add_node(
        Node::new(NodeKind::output_pin(PinWidth::One))
            .with_label("COUT")
            .at(200, 40),
    );
    c.connect(a, "out", x1, "a");
    c.connect(b, "out", x1, "b");
    c.connect(x1, "out", x2, "a");
    c.connect(cin, "out", x2, "b");
    c.connect(x2, "out", s, "in");
    c.connect(a, "out", a1, "a");
    c.connect(b, "out", a1, "b");
    c.connect(x1, "out", a2, "a");
    c.connect(cin, "out", a2, "b");
    c.connect(a1, "out", or, "a");
    c.connect(a2, "out", or, "b");
    c.connect(or, "out", cout, "in");
    c
}
