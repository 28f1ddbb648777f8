//! The editable circuit graph: nodes in a slot arena plus unordered wires.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use crate::arena::SlotArena;
use crate::ids::{NodeId, PortId};
use crate::node::{Node, Point};

static NEXT_REVISION: AtomicU64 = AtomicU64::new(1);

/// Returns a revision stamp no other circuit edit has ever produced.
fn fresh_revision() -> u64 {
    NEXT_REVISION.fetch_add(1, Ordering::Relaxed)
}

/// One end of a wire: a port on a node.
#[derive(Clone, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub struct Endpoint {
    /// The node the wire attaches to.
    pub node: NodeId,
    /// The port on that node.
    pub port: PortId,
}

impl Endpoint {
    /// Creates an endpoint.
    pub fn new(node: NodeId, port: impl Into<PortId>) -> Self {
        Self {
            node,
            port: port.into(),
        }
    }
}

/// An undirected connection between two terminals.
///
/// Direction carries no meaning; `from`/`to` only record how it was drawn.
#[derive(Clone, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub struct Wire {
    /// First endpoint.
    pub from: Endpoint,
    /// Second endpoint.
    pub to: Endpoint,
}

impl Wire {
    /// Returns true if either end attaches to `node`.
    pub fn touches(&self, node: NodeId) -> bool {
        self.from.node == node || self.to.node == node
    }

    /// Returns true if the wire joins `a` and `b`, in either orientation.
    pub fn joins(&self, a: &Endpoint, b: &Endpoint) -> bool {
        (&self.from == a && &self.to == b) || (&self.from == b && &self.to == a)
    }
}

/// A circuit: component instances and the wires between their ports.
///
/// Every structural edit (adding or removing nodes or wires, moving a node)
/// stamps the circuit with a fresh revision. Derived data such as a netlist
/// is valid exactly as long as the revision it was built from is current.
/// Clones share a revision until either side is edited, since they share a
/// topology until then.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Circuit {
    nodes: SlotArena<NodeId, Node>,
    #[serde(default)]
    wires: Vec<Wire>,
    #[serde(skip, default = "fresh_revision")]
    revision: u64,
}

impl Default for Circuit {
    fn default() -> Self {
        Self::new()
    }
}

impl Circuit {
    /// Creates an empty circuit.
    pub fn new() -> Self {
        Self {
            nodes: SlotArena::new(),
            wires: Vec::new(),
            revision: fresh_revision(),
        }
    }

    /// The current structural revision.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Marks the topology as changed, invalidating derived data.
    pub fn touch(&mut self) {
        self.revision = fresh_revision();
    }

    /// Adds a node and returns its handle.
    pub fn add_node(&mut self, node: Node) -> NodeId {
        self.touch();
        self.nodes.alloc(node)
    }

    /// Removes a node together with every wire attached to it.
    pub fn remove_node(&mut self, id: NodeId) -> Option<Node> {
        let node = self.nodes.remove(id)?;
        self.wires.retain(|w| !w.touches(id));
        self.touch();
        Some(node)
    }

    /// Wires two ports together.
    ///
    /// Endpoints are not validated: wires naming missing nodes are ignored
    /// when the netlist is built.
    pub fn connect(
        &mut self,
        from: NodeId,
        from_port: impl Into<PortId>,
        to: NodeId,
        to_port: impl Into<PortId>,
    ) {
        self.wires.push(Wire {
            from: Endpoint::new(from, from_port),
            to: Endpoint::new(to, to_port),
        });
        self.touch();
    }

    /// Removes every wire joining the two ports, in either orientation.
    /// Returns the number of wires removed.
    pub fn disconnect(
        &mut self,
        a: NodeId,
        a_port: impl Into<PortId>,
        b: NodeId,
        b_port: impl Into<PortId>,
    ) -> usize {
        let a = Endpoint::new(a, a_port);
        let b = Endpoint::new(b, b_port);
        let before = self.wires.len();
        self.wires.retain(|w| !w.joins(&a, &b));
        let removed = before - self.wires.len();
        if removed > 0 {
            self.touch();
        }
        removed
    }

    /// Moves a node. Returns false if the node does not exist.
    ///
    /// Position orders a composite's pins, so a move counts as a structural
    /// edit.
    pub fn move_node(&mut self, id: NodeId, to: Point) -> bool {
        let Some(node) = self.nodes.get_mut(id) else {
            return false;
        };
        node.position = to;
        self.touch();
        true
    }

    /// Looks up a node.
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    /// Looks up a node for state changes. Edits made through this handle are
    /// not structural and do not change the revision.
    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id)
    }

    /// Iterates over live nodes in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &Node)> {
        self.nodes.iter()
    }

    /// Iterates mutably over live nodes in insertion order.
    pub fn nodes_mut(&mut self) -> impl Iterator<Item = (NodeId, &mut Node)> {
        self.nodes.iter_mut()
    }

    /// The number of live nodes.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// All wires, in insertion order.
    pub fn wires(&self) -> &[Wire] {
        &self.wires
    }

    /// The number of wires.
    pub fn wire_count(&self) -> usize {
        self.wires.len()
    }

    /// Finds the first node carrying `label`.
    pub fn find_by_label(&self, label: &str) -> Option<NodeId> {
        self.nodes
            .iter()
            .find(|(_, n)| n.label == label)
            .map(|(id, _)| id)
    }

    /// Input and output pins, each ascending by vertical position. Pins at
    /// the same height keep insertion order.
    pub fn sorted_pins(&self) -> (Vec<NodeId>, Vec<NodeId>) {
        let mut ins: Vec<(i32, NodeId)> = Vec::new();
        let mut outs: Vec<(i32, NodeId)> = Vec::new();
        for (id, node) in self.nodes.iter() {
            if node.is_input_pin() {
                ins.push((node.position.y, id));
            } else if node.is_output_pin() {
                outs.push((node.position.y, id));
            }
        }
        ins.sort_by_key(|&(y, _)| y);
        outs.sort_by_key(|&(y, _)| y);
        (
            ins.into_iter().map(|(_, id)| id).collect(),
            outs.into_iter().map(|(_, id)| id).collect(),
        )
    }

    /// Returns true if any node, at any composite depth, is an oscillator.
    pub fn contains_clock(&self) -> bool {
        self.nodes.values().any(Node::contains_clock)
    }
}
