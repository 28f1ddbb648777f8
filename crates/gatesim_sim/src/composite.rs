//! Evaluation of user-defined chips.
//!
//! A composite's external port `i` is bound to the `i`-th internal pin of
//! the same direction, ordered top to bottom. Each pass, parent inputs are
//! copied onto the internal input pins, the internal circuit is re-evaluated
//! when anything could have changed, and the values arriving at the internal
//! output pins become the composite's outputs.

use gatesim_common::Value;
use gatesim_ir::{Circuit, Composite, NodeKind, PinBindings, PortValues};

use crate::evaluator::{evaluate, set_port, EvalContext};
use crate::netlist::NetlistCache;

/// Returns the chip's pin bindings, recomputing them if the internal circuit
/// has been edited since they were cached.
pub fn bindings(chip: &mut Composite) -> &PinBindings {
    let revision = chip.circuit.revision();
    if chip
        .bindings
        .as_ref()
        .is_some_and(|b| b.revision != revision)
    {
        tracing::trace!(chip = %chip.name, revision, "refreshing pin bindings");
        chip.bindings = None;
    }
    let circuit = &chip.circuit;
    chip.bindings
        .get_or_insert_with(|| compute_bindings(circuit))
}

fn compute_bindings(circuit: &Circuit) -> PinBindings {
    let (inputs, outputs) = circuit.sorted_pins();
    PinBindings {
        revision: circuit.revision(),
        inputs,
        outputs,
        has_clock: circuit.contains_clock(),
    }
}

/// Evaluates a composite node for one pass of its parent.
pub(crate) fn step(
    chip: &mut Composite,
    inputs: &PortValues,
    outputs: &mut PortValues,
    pass: u32,
    ctx: &EvalContext<'_>,
    cache: &mut NetlistCache,
) {
    let PinBindings {
        inputs: in_pins,
        outputs: out_pins,
        has_clock,
        ..
    } = bindings(chip).clone();

    for (decl, &pin) in chip.inputs.iter().zip(&in_pins) {
        let Some(node) = chip.circuit.node_mut(pin) else {
            continue;
        };
        let value = inputs
            .get(decl.id.as_str())
            .copied()
            .unwrap_or_else(|| Value::zero(node.pin_width()));
        node.drive(value);
        if let NodeKind::InputPin { state, .. } = &node.kind {
            let state = *state;
            set_port(&mut node.outputs, "out", state);
        }
    }

    let mut input_changed = false;
    for decl in &chip.inputs {
        let current = inputs.get(decl.id.as_str());
        if chip.last_inputs.get(decl.id.as_str()) != current {
            input_changed = true;
            match current {
                Some(v) => {
                    chip.last_inputs.insert(decl.id.clone(), *v);
                }
                None => {
                    chip.last_inputs.remove(decl.id.as_str());
                }
            }
        }
    }
    let before = chip.last_inputs.len();
    chip.last_inputs
        .retain(|port, _| chip.inputs.iter().any(|d| &d.id == port));
    if chip.last_inputs.len() != before {
        input_changed = true;
    }

    if has_clock || input_changed || pass == 0 {
        evaluate(&mut chip.circuit, &ctx.nested(), cache);
    }

    for (decl, &pin) in chip.outputs.iter().zip(&out_pins) {
        let value = chip
            .circuit
            .node(pin)
            .and_then(|n| n.input("in"))
            .copied()
            .unwrap_or(Value::Bit(false));
        set_port(outputs, decl.id.as_str(), value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gatesim_config::EngineLimits;
    use gatesim_ir::{GateKind, Node, NodeId, PinWidth, Point};

    fn inverter_chip() -> Composite {
        let mut inner = Circuit::new();
        let a = inner.add_node(Node::new(NodeKind::input_pin(false)).with_label("a"));
        let n = inner.add_node(Node::new(NodeKind::gate(GateKind::Not)));
        let q = inner.add_node(Node::new(NodeKind::output_pin(PinWidth::One)).with_label("q"));
        inner.connect(a, "out", n, "in");
        inner.connect(n, "out", q, "in");
        Composite::from_circuit("inv", inner)
    }

    fn step_once(chip: &mut Composite, inputs: &PortValues, pass: u32) -> PortValues {
        let limits = EngineLimits::default();
        let mut cache = NetlistCache::new();
        let mut outputs = PortValues::new();
        step(
            chip,
            inputs,
            &mut outputs,
            pass,
            &EvalContext::top_level(&limits),
            &mut cache,
        );
        outputs
    }

    #[test]
    fn disconnected_input_drives_false() {
        let mut chip = inverter_chip();
        let out = step_once(&mut chip, &PortValues::new(), 0);
        assert_eq!(out.get("out0"), Some(&Value::Bit(true)));
    }

    #[test]
    fn driven_input_propagates() {
        let mut chip = inverter_chip();
        let mut inputs = PortValues::new();
        inputs.insert("in0".into(), Value::Bit(true));
        let out = step_once(&mut chip, &inputs, 0);
        assert_eq!(out.get("out0"), Some(&Value::Bit(false)));
        assert_eq!(chip.last_inputs.get("in0"), Some(&Value::Bit(true)));
    }

    #[test]
    fn unchanged_inputs_skip_reevaluation_after_first_pass() {
        let mut chip = inverter_chip();
        let mut inputs = PortValues::new();
        inputs.insert("in0".into(), Value::Bit(true));
        step_once(&mut chip, &inputs, 0);
        // Tamper with the internal output pin; a skipped evaluation leaves it.
        let (_, outs) = chip.circuit.sorted_pins();
        let pin: NodeId = outs[0];
        chip.circuit
            .node_mut(pin)
            .unwrap()
            .inputs
            .insert("in".into(), Value::Bit(true));
        let out = step_once(&mut chip, &inputs, 1);
        assert_eq!(out.get("out0"), Some(&Value::Bit(true)));
        let out = step_once(&mut chip, &inputs, 0);
        assert_eq!(out.get("out0"), Some(&Value::Bit(false)));
    }

    #[test]
    fn bindings_follow_pin_moves() {
        let mut inner = Circuit::new();
        let top = inner.add_node(Node::new(NodeKind::input_pin(false)).at(0, 0));
        let bottom = inner.add_node(Node::new(NodeKind::input_pin(false)).at(0, 50));
        let mut chip = Composite::from_circuit("two", inner);
        assert_eq!(bindings(&mut chip).inputs, vec![top, bottom]);
        chip.circuit.move_node(top, Point::new(0, 100));
        assert_eq!(bindings(&mut chip).inputs, vec![bottom, top]);
    }

    #[test]
    fn missing_internal_pin_leaves_output_alone() {
        let mut chip = inverter_chip();
        let (_, outs) = chip.circuit.sorted_pins();
        chip.circuit.remove_node(outs[0]);
        let mut outputs = PortValues::new();
        outputs.insert("out0".into(), Value::Bit(true));
        let limits = EngineLimits::default();
        step(
            &mut chip,
            &PortValues::new(),
            &mut outputs,
            0,
            &EvalContext::top_level(&limits),
            &mut NetlistCache::new(),
        );
        assert_eq!(outputs.get("out0"), Some(&Value::Bit(true)));
    }
}
