//! Circuit files and command-line drive assignments.
//!
//! Circuits are stored as JSON: the serde form of [`Circuit`], a node array
//! (vacant slots as `null`) plus a wire array. Nodes are named on the command
//! line either by label or by their numeric handle.

use std::fs;
use std::path::Path;

use gatesim_common::Value;
use gatesim_ir::{Circuit, NodeId};

use crate::error::SimError;

/// Reads a circuit from a JSON file.
pub fn load_circuit(path: &Path) -> Result<Circuit, SimError> {
    let text = fs::read_to_string(path)?;
    let circuit = parse_circuit(&text)?;
    tracing::debug!(
        path = %path.display(),
        nodes = circuit.node_count(),
        wires = circuit.wire_count(),
        "loaded circuit"
    );
    Ok(circuit)
}

/// Parses a circuit from JSON text.
pub fn parse_circuit(text: &str) -> Result<Circuit, SimError> {
    Ok(serde_json::from_str(text)?)
}

/// Writes a circuit to a JSON file, pretty-printed.
pub fn save_circuit(path: &Path, circuit: &Circuit) -> Result<(), SimError> {
    let text = serde_json::to_string_pretty(circuit)?;
    fs::write(path, text)?;
    Ok(())
}

/// Resolves a node name: an exact label match first, then a numeric handle.
pub fn resolve_node(circuit: &Circuit, name: &str) -> Result<NodeId, SimError> {
    if let Some(id) = circuit.find_by_label(name) {
        return Ok(id);
    }
    name.parse::<u32>()
        .ok()
        .map(NodeId::from_raw)
        .filter(|&id| circuit.node(id).is_some())
        .ok_or_else(|| SimError::UnknownNode(name.to_string()))
}

/// Applies a `NODE=VALUE` assignment to an input pin or switch.
pub fn apply_drive(circuit: &mut Circuit, assignment: &str) -> Result<NodeId, SimError> {
    let (name, literal) = assignment
        .split_once('=')
        .ok_or_else(|| SimError::InvalidDrive {
            node: assignment.to_string(),
            value: String::new(),
            reason: "expected NODE=VALUE".to_string(),
        })?;
    let name = name.trim();
    let id = resolve_node(circuit, name)?;
    drive_node(circuit, id, name, literal)?;
    Ok(id)
}

/// Parses `literal` at the node's pin width and drives the node with it.
pub fn drive_node(
    circuit: &mut Circuit,
    id: NodeId,
    name: &str,
    literal: &str,
) -> Result<Value, SimError> {
    let invalid = |reason: &str| SimError::InvalidDrive {
        node: name.to_string(),
        value: literal.trim().to_string(),
        reason: reason.to_string(),
    };
    let node = circuit
        .node_mut(id)
        .ok_or_else(|| SimError::UnknownNode(name.to_string()))?;
    let value = Value::parse_literal(literal, node.pin_width())
        .ok_or_else(|| invalid("not a value literal"))?;
    if !node.drive(value) {
        return Err(invalid("only input pins and switches can be driven"));
    }
    Ok(value)
}
