//! End-to-end behaviour of small reference circuits, ticked the way the
//! scheduler ticks them.

use gatesim_common::{Frequency, Value};
use gatesim_conformance::{
    and_light, chip_circuit, full_adder, inverter, merge_split_loop, pass_through_chip, Bench,
};
use gatesim_config::EngineLimits;
use gatesim_ir::{Circuit, Composite, GateKind, Node, NodeKind, Oscillator, PinWidth};

// ---------------------------------------------------------------------------
// Gates
// ---------------------------------------------------------------------------

#[test]
fn inverter_follows_its_input() {
    let mut bench = Bench::new(inverter(false));
    bench.tick();
    assert!(bench.read_bool("Q"));

    bench.set("A", true);
    let stats = bench.tick();
    assert!(stats.changed);
    assert!(!bench.read_bool("Q"));
}

#[test]
fn and_of_switches_lights_only_when_both_on() {
    for (a, b) in [(false, false), (false, true), (true, false), (true, true)] {
        let mut bench = Bench::new(and_light(a, b));
        bench.tick();
        assert_eq!(bench.read_bool("L"), a && b, "A={a} B={b}");
    }
}

#[test]
fn closing_the_second_switch_lights_the_lamp() {
    let mut bench = Bench::new(and_light(true, false));
    bench.tick();
    assert!(!bench.read_bool("L"));
    bench.set("B", true);
    assert!(bench.tick().changed);
    assert!(bench.read_bool("L"));
}

#[test]
fn full_adder_truth_table() {
    let mut bench = Bench::new(full_adder());
    for n in 0u8..8 {
        let (a, b, cin) = (n & 4 != 0, n & 2 != 0, n & 1 != 0);
        bench.set("A", a);
        bench.set("B", b);
        bench.set("CIN", cin);
        let stats = bench.tick();
        assert!(!stats.capped);
        let total = u8::from(a) + u8::from(b) + u8::from(cin);
        assert_eq!(bench.read_bool("S"), total & 1 == 1, "inputs {n:03b}");
        assert_eq!(bench.read_bool("COUT"), total >= 2, "inputs {n:03b}");
    }
}

#[test]
fn settled_circuit_reports_no_change() {
    let mut bench = Bench::new(full_adder());
    bench.set("A", true);
    assert!(bench.tick().changed);
    let again = bench.tick();
    assert!(!again.changed);
    assert_eq!(again.passes, 2);
}

// ---------------------------------------------------------------------------
// Buses
// ---------------------------------------------------------------------------

#[test]
fn merge_then_split_restores_the_bits() {
    let bits = [true, false, true, false];
    let mut bench = Bench::new(merge_split_loop(bits));
    bench.tick();
    for (k, &bit) in bits.iter().enumerate() {
        assert_eq!(bench.read_bool(&format!("O{k}")), bit, "bit {k}");
    }
    // The first merge input is the bus's most significant bit.
    assert_eq!(bench.read("BUS").hex(), "A");
}

#[test]
fn merge_split_loop_tracks_input_changes() {
    let mut bench = Bench::new(merge_split_loop([false; 4]));
    bench.tick();
    assert_eq!(bench.read("BUS").hex(), "0");
    bench.set("I3", true);
    bench.tick();
    assert!(bench.read_bool("O3"));
    assert!(!bench.read_bool("O0"));
    assert_eq!(bench.read("BUS").hex(), "1");
}

// ---------------------------------------------------------------------------
// Composites
// ---------------------------------------------------------------------------

#[test]
fn chip_passes_its_input_through() {
    let mut bench = Bench::new(chip_circuit(pass_through_chip(), true));
    bench.tick();
    assert!(bench.read_bool("Q"));

    bench.set("A", false);
    bench.tick();
    assert!(!bench.read_bool("Q"));
}

#[test]
fn chips_nest() {
    // The middle circuit's own A/Q pins become the outer chip's ports.
    let middle = chip_circuit(pass_through_chip(), false);
    let outer = Composite::from_circuit("WIRE2", middle);
    assert_eq!(outer.inputs.len(), 1);
    assert_eq!(outer.outputs.len(), 1);

    let mut bench = Bench::new(chip_circuit(outer, true));
    bench.tick();
    assert!(bench.read_bool("Q"));
}

#[test]
fn nesting_beyond_the_depth_limit_leaves_outputs_low() {
    let limits = EngineLimits {
        max_depth: 0,
        ..EngineLimits::default()
    };
    let mut bench = Bench::with_limits(chip_circuit(pass_through_chip(), true), limits);
    bench.tick();
    assert!(!bench.read_bool("Q"));
}

#[test]
fn clocks_inside_chips_do_not_advance() {
    let mut inner = Circuit::new();
    let clk = inner.add_node(Node::new(NodeKind::Clock(Oscillator::new(Frequency::new(10.0)))));
    let o = inner.add_node(Node::new(NodeKind::output_pin(PinWidth::One)).with_label("OUT"));
    inner.connect(clk, "out", o, "in");
    let chip = Composite::from_circuit("BLINK", inner);

    let mut outer = Circuit::new();
    let x = outer.add_node(Node::new(NodeKind::Composite(Box::new(chip))));
    let q = outer.add_node(Node::new(NodeKind::output_pin(PinWidth::One)).with_label("Q"));
    outer.connect(x, "out0", q, "in");

    let mut bench = Bench::new(outer);
    for _ in 0..30 {
        bench.tick();
        assert!(!bench.read_bool("Q"));
    }
}

// ---------------------------------------------------------------------------
// Clocks
// ---------------------------------------------------------------------------

#[test]
fn one_hz_clock_has_a_ten_tick_half_period() {
    let mut c = Circuit::new();
    let clk = c.add_node(
        Node::new(NodeKind::Clock(Oscillator::new(Frequency::new(1.0)))).with_label("CLK"),
    );
    let q = c.add_node(Node::new(NodeKind::output_pin(PinWidth::One)).with_label("Q"));
    c.connect(clk, "out", q, "in");

    let mut bench = Bench::new(c);
    let mut edges = Vec::new();
    let mut last = false;
    for t in 1..=40u64 {
        bench.tick();
        let now = bench.read_bool("Q");
        assert_eq!(now, (t / 10) % 2 == 1, "tick {t}");
        if now != last {
            edges.push(t);
            last = now;
        }
    }
    assert_eq!(edges, vec![10, 20, 30, 40]);
}

#[test]
fn stopped_clock_drives_low() {
    let mut osc = Oscillator::new(Frequency::new(10.0));
    osc.state = true;
    osc.running = false;
    let mut c = Circuit::new();
    let clk = c.add_node(Node::new(NodeKind::Clock(osc)).with_label("CLK"));
    let g = c.add_node(Node::new(NodeKind::gate(GateKind::Not)));
    let q = c.add_node(Node::new(NodeKind::output_pin(PinWidth::One)).with_label("Q"));
    c.connect(clk, "out", g, "in");
    c.connect(g, "out", q, "in");

    let mut bench = Bench::new(c);
    bench.ticks(5);
    assert!(bench.read_bool("Q"));
    assert_eq!(bench.read("CLK"), Value::Bit(false));
}
