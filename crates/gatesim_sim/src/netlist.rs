//! Net partitioning: groups wired terminals into nets with union-find.
//!
//! A terminal is a `(node, port)` pair. Every port of a Joint folds into the
//! Joint's single terminal, so any number of wires can meet at one point.
//! Each net records its bit width (the widest terminal on it), its sources
//! (output and bidirectional terminals), its sinks (input and bidirectional
//! terminals) and the Joints it passes through.
//!
//! Netlists depend only on topology, so they are cached by circuit revision
//! in a [`NetlistCache`] and shared between every circuit at that revision.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use gatesim_common::Value;
use gatesim_ir::{Circuit, NodeId, PortId, PortRole};
use serde::Serialize;

/// Disjoint-set forest with union by rank and path halving.
#[derive(Debug, Clone)]
pub struct UnionFind {
    parent: Vec<usize>,
    rank: Vec<u8>,
}

impl UnionFind {
    /// Creates `n` singleton sets.
    pub fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
            rank: vec![0; n],
        }
    }

    /// Returns the representative of `x`'s set.
    pub fn find(&mut self, mut x: usize) -> usize {
        while self.parent[x] != x {
            self.parent[x] = self.parent[self.parent[x]];
            x = self.parent[x];
        }
        x
    }

    /// Merges the sets containing `a` and `b`. Returns false if they were
    /// already one set.
    pub fn union(&mut self, a: usize, b: usize) -> bool {
        let ra = self.find(a);
        let rb = self.find(b);
        if ra == rb {
            return false;
        }
        match self.rank[ra].cmp(&self.rank[rb]) {
            std::cmp::Ordering::Less => self.parent[ra] = rb,
            std::cmp::Ordering::Greater => self.parent[rb] = ra,
            std::cmp::Ordering::Equal => {
                self.parent[rb] = ra;
                self.rank[ra] += 1;
            }
        }
        true
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.parent.len()
    }

    /// Returns true if there are no elements.
    pub fn is_empty(&self) -> bool {
        self.parent.is_empty()
    }
}

/// Index of a net within its [`Netlist`].
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize)]
#[serde(transparent)]
pub struct NetId(u32);

impl NetId {
    /// Returns the raw index.
    pub fn as_raw(self) -> u32 {
        self.0
    }
}

impl fmt::Display for NetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

/// A `(node, port)` connection point.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize)]
pub struct Terminal {
    /// The node.
    pub node: NodeId,
    /// The port on that node.
    pub port: PortId,
}

impl fmt::Display for Terminal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.node, self.port)
    }
}

/// A maximal set of terminals connected by wires.
#[derive(Clone, Debug, Serialize)]
pub struct Net {
    /// This net's index.
    pub id: NetId,
    /// Widest declared width among the net's terminals.
    pub width: u32,
    /// Terminals whose output values are OR-ed into the net.
    pub sources: Vec<Terminal>,
    /// Terminals that receive the net's value.
    pub sinks: Vec<Terminal>,
    /// Joints on this net.
    pub joints: Vec<NodeId>,
}

impl Net {
    /// Wired-OR of every source's current output, at the net's width.
    ///
    /// Sources that have not driven their port yet contribute nothing.
    pub fn resolve(&self, circuit: &Circuit) -> Value {
        let mut value = Value::zero(self.width);
        for src in &self.sources {
            let driven = circuit
                .node(src.node)
                .and_then(|n| n.outputs.get(src.port.as_str()));
            if let Some(driven) = driven {
                value = value.merge_or(driven, self.width);
            }
        }
        value
    }
}

/// The net partition of one circuit revision.
#[derive(Clone, Debug, Serialize)]
pub struct Netlist {
    nets: Vec<Net>,
    revision: u64,
    node_count: usize,
    wire_count: usize,
    #[serde(skip)]
    terminal_nets: HashMap<Terminal, NetId>,
    #[serde(skip)]
    joint_nets: HashMap<NodeId, NetId>,
}

struct TermInfo {
    terminal: Terminal,
    role: PortRole,
    width: u32,
    joint: bool,
}

impl Netlist {
    /// Partitions the circuit's terminals into nets.
    ///
    /// Wire ends naming missing nodes are skipped; the other end still
    /// becomes a terminal on its own net. Nets are numbered in order of first
    /// appearance in the wire list.
    pub fn build(circuit: &Circuit) -> Self {
        let mut terms: Vec<TermInfo> = Vec::new();
        let mut index: HashMap<Terminal, usize> = HashMap::new();

        let mut ensure = |node_id: NodeId, port: &PortId| -> Option<usize> {
            let node = circuit.node(node_id)?;
            let meta = node.port_meta(port.as_str());
            let terminal = Terminal {
                node: node_id,
                port: if meta.joint {
                    PortId::from("joint")
                } else {
                    port.clone()
                },
            };
            if let Some(&i) = index.get(&terminal) {
                return Some(i);
            }
            let i = terms.len();
            index.insert(terminal.clone(), i);
            terms.push(TermInfo {
                terminal,
                role: meta.role,
                width: meta.width,
                joint: meta.joint,
            });
            Some(i)
        };

        let mut pairs = Vec::with_capacity(circuit.wire_count());
        for wire in circuit.wires() {
            let a = ensure(wire.from.node, &wire.from.port);
            let b = ensure(wire.to.node, &wire.to.port);
            if let (Some(a), Some(b)) = (a, b) {
                pairs.push((a, b));
            }
        }

        let mut uf = UnionFind::new(terms.len());
        for (a, b) in pairs {
            uf.union(a, b);
        }

        let mut nets: Vec<Net> = Vec::new();
        let mut net_of_root: HashMap<usize, usize> = HashMap::new();
        let mut terminal_nets = HashMap::with_capacity(terms.len());
        let mut joint_nets = HashMap::new();
        for (i, t) in terms.into_iter().enumerate() {
            let root = uf.find(i);
            let slot = *net_of_root.entry(root).or_insert_with(|| {
                nets.push(Net {
                    id: NetId(nets.len() as u32),
                    width: 1,
                    sources: Vec::new(),
                    sinks: Vec::new(),
                    joints: Vec::new(),
                });
                nets.len() - 1
            });
            let net = &mut nets[slot];
            net.width = net.width.max(t.width);
            terminal_nets.insert(t.terminal.clone(), net.id);
            if t.joint {
                joint_nets.insert(t.terminal.node, net.id);
                net.joints.push(t.terminal.node);
                continue;
            }
            if matches!(t.role, PortRole::Output | PortRole::Io) {
                net.sources.push(t.terminal.clone());
            }
            if matches!(t.role, PortRole::Input | PortRole::Io) {
                net.sinks.push(t.terminal);
            }
        }

        tracing::debug!(
            nodes = circuit.node_count(),
            wires = circuit.wire_count(),
            nets = nets.len(),
            revision = circuit.revision(),
            "netlist rebuilt"
        );

        Self {
            nets,
            revision: circuit.revision(),
            node_count: circuit.node_count(),
            wire_count: circuit.wire_count(),
            terminal_nets,
            joint_nets,
        }
    }

    /// The nets, indexed by [`NetId`].
    pub fn nets(&self) -> &[Net] {
        &self.nets
    }

    /// Looks up a net.
    pub fn net(&self, id: NetId) -> Option<&Net> {
        self.nets.get(id.0 as usize)
    }

    /// Number of nets.
    pub fn len(&self) -> usize {
        self.nets.len()
    }

    /// Returns true if no wire connects anything.
    pub fn is_empty(&self) -> bool {
        self.nets.is_empty()
    }

    /// Revision of the circuit this netlist was built from.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Returns true if this netlist describes the circuit's current topology.
    pub fn is_valid_for(&self, circuit: &Circuit) -> bool {
        self.revision == circuit.revision()
    }

    /// Coarse validity check comparing node and wire counts only.
    ///
    /// Misses edits that keep both counts (rewiring one wire, say); prefer
    /// [`is_valid_for`](Self::is_valid_for).
    pub fn counts_match(&self, circuit: &Circuit) -> bool {
        self.node_count == circuit.node_count() && self.wire_count == circuit.wire_count()
    }

    /// The net a port belongs to, if any wire reaches it. Any port name on
    /// a Joint resolves to the Joint's net.
    pub fn net_of(&self, node: NodeId, port: &str) -> Option<NetId> {
        if let Some(&net) = self.joint_nets.get(&node) {
            return Some(net);
        }
        self.terminal_nets
            .get(&Terminal {
                node,
                port: PortId::from(port),
            })
            .copied()
    }

    /// The value a net currently carries, computed from its sources.
    pub fn value(&self, id: NetId, circuit: &Circuit) -> Option<Value> {
        self.net(id).map(|net| net.resolve(circuit))
    }
}

struct CacheEntry {
    netlist: Arc<Netlist>,
    used: bool,
}

/// Netlists keyed by circuit revision.
///
/// Clones of a circuit share a revision until edited, so every instance of
/// one composite shares a single internal netlist.
#[derive(Default)]
pub struct NetlistCache {
    entries: HashMap<u64, CacheEntry>,
    builds: u64,
}

impl NetlistCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the netlist for the circuit's current revision, building it
    /// on a miss.
    pub fn get_or_build(&mut self, circuit: &Circuit) -> Arc<Netlist> {
        let entry = match self.entries.entry(circuit.revision()) {
            Entry::Occupied(e) => e.into_mut(),
            Entry::Vacant(e) => {
                self.builds += 1;
                e.insert(CacheEntry {
                    netlist: Arc::new(Netlist::build(circuit)),
                    used: false,
                })
            }
        };
        entry.used = true;
        Arc::clone(&entry.netlist)
    }

    /// Returns the cached netlist for a revision without building.
    pub fn get(&self, revision: u64) -> Option<Arc<Netlist>> {
        self.entries.get(&revision).map(|e| Arc::clone(&e.netlist))
    }

    /// Drops entries not requested since the previous sweep. Returns the
    /// number of entries dropped.
    pub fn sweep(&mut self) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, e| std::mem::take(&mut e.used));
        before - self.entries.len()
    }

    /// Drops every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Number of cached netlists.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total netlists built over the cache's lifetime.
    pub fn builds(&self) -> u64 {
        self.builds
    }
}

impl fmt::Debug for NetlistCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NetlistCache")
            .field("entries", &self.entries.len())
            .field("builds", &self.builds)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gatesim_common::BusValue;
    use gatesim_ir::{GateKind, Node, NodeKind, PinWidth};

    fn pin(c: &mut Circuit, on: bool) -> NodeId {
        c.add_node(Node::new(NodeKind::input_pin(on)))
    }

    #[test]
    fn union_find_basics() {
        let mut uf = UnionFind::new(5);
        assert!(uf.union(0, 1));
        assert!(uf.union(3, 4));
        assert!(!uf.union(1, 0));
        assert_eq!(uf.find(0), uf.find(1));
        assert_ne!(uf.find(1), uf.find(3));
        assert!(uf.union(1, 4));
        assert_eq!(uf.find(0), uf.find(3));
        assert_ne!(uf.find(2), uf.find(0));
        assert_eq!(uf.len(), 5);
    }

    #[test]
    fn roles_split_sources_and_sinks() {
        let mut c = Circuit::new();
        let a = pin(&mut c, true);
        let g = c.add_node(Node::new(NodeKind::gate(GateKind::Not)));
        c.connect(a, "out", g, "in");
        let nl = Netlist::build(&c);
        assert_eq!(nl.len(), 1);
        let net = &nl.nets()[0];
        assert_eq!(net.sources.len(), 1);
        assert_eq!(net.sources[0].node, a);
        assert_eq!(net.sinks.len(), 1);
        assert_eq!(net.sinks[0].node, g);
        assert!(net.joints.is_empty());
    }

    #[test]
    fn joint_ports_fold_into_one_terminal() {
        let mut c = Circuit::new();
        let a = pin(&mut c, true);
        let j = c.add_node(Node::new(NodeKind::Joint));
        let g1 = c.add_node(Node::new(NodeKind::gate(GateKind::Not)));
        let g2 = c.add_node(Node::new(NodeKind::gate(GateKind::Not)));
        c.connect(a, "out", j, "joint");
        c.connect(j, "p1", g1, "in");
        c.connect(j, "whatever", g2, "in");
        let nl = Netlist::build(&c);
        assert_eq!(nl.len(), 1);
        let net = &nl.nets()[0];
        assert_eq!(net.joints, vec![j]);
        assert_eq!(net.sinks.len(), 2);
        assert_eq!(nl.net_of(j, "anything"), Some(net.id));
        assert_eq!(nl.net_of(g2, "in"), Some(net.id));
    }

    #[test]
    fn width_is_widest_terminal() {
        let mut c = Circuit::new();
        let bus = c.add_node(Node::new(NodeKind::bus_input_pin(PinWidth::Eight)));
        let bit = pin(&mut c, false);
        let out = c.add_node(Node::new(NodeKind::output_pin(PinWidth::Four)));
        c.connect(bus, "out", out, "in");
        c.connect(bit, "out", out, "in");
        let nl = Netlist::build(&c);
        assert_eq!(nl.len(), 1);
        assert_eq!(nl.nets()[0].width, 8);
    }

    #[test]
    fn dangling_end_keeps_the_live_terminal() {
        let mut c = Circuit::new();
        let a = pin(&mut c, true);
        let gone = pin(&mut c, false);
        let g = c.add_node(Node::new(NodeKind::gate(GateKind::Not)));
        c.connect(a, "out", g, "in");
        c.connect(gone, "out", g, "in");
        // Drop the node without pruning so the wire dangles.
        let mut raw = serde_json::to_value(&c).unwrap();
        raw["nodes"][gone.as_raw() as usize] = serde_json::Value::Null;
        let c: Circuit = serde_json::from_value(raw).unwrap();
        let nl = Netlist::build(&c);
        assert_eq!(nl.len(), 1);
        assert_eq!(nl.nets()[0].sources.len(), 1);
        assert_eq!(nl.net_of(gone, "out"), None);
    }

    #[test]
    fn undeclared_ports_are_bidirectional() {
        let mut c = Circuit::new();
        let a = pin(&mut c, true);
        let g = c.add_node(Node::new(NodeKind::gate(GateKind::And)));
        c.connect(a, "out", g, "bogus");
        let nl = Netlist::build(&c);
        let net = &nl.nets()[0];
        assert_eq!(net.sources.len(), 2);
        assert_eq!(net.sinks.len(), 1);
    }

    #[test]
    fn resolve_is_wired_or() {
        let mut c = Circuit::new();
        let a = pin(&mut c, true);
        let b = pin(&mut c, false);
        let q = c.add_node(Node::new(NodeKind::output_pin(PinWidth::One)));
        c.connect(a, "out", q, "in");
        c.connect(b, "out", q, "in");
        let nl = Netlist::build(&c);
        let id = nl.net_of(q, "in").unwrap();
        assert_eq!(nl.value(id, &c), Some(Value::Bit(false)));
        c.node_mut(a).unwrap().outputs.insert("out".into(), Value::Bit(true));
        c.node_mut(b).unwrap().outputs.insert("out".into(), Value::Bit(false));
        assert_eq!(nl.value(id, &c), Some(Value::Bit(true)));
    }

    #[test]
    fn scalar_source_broadcasts_onto_bus_net() {
        let mut c = Circuit::new();
        let a = pin(&mut c, true);
        let q = c.add_node(Node::new(NodeKind::output_pin(PinWidth::Four)));
        c.connect(a, "out", q, "in");
        c.node_mut(a).unwrap().outputs.insert("out".into(), Value::Bit(true));
        let nl = Netlist::build(&c);
        let net = &nl.nets()[0];
        assert_eq!(net.resolve(&c), Value::Bus(BusValue::from_u64(0xF, 4)));
    }

    #[test]
    fn validity_tracks_revision_not_counts() {
        let mut c = Circuit::new();
        let a = pin(&mut c, true);
        let g1 = c.add_node(Node::new(NodeKind::gate(GateKind::Not)));
        let g2 = c.add_node(Node::new(NodeKind::gate(GateKind::Not)));
        c.connect(a, "out", g1, "in");
        let nl = Netlist::build(&c);
        assert!(nl.is_valid_for(&c));
        c.disconnect(a, "out", g1, "in");
        c.connect(a, "out", g2, "in");
        assert!(nl.counts_match(&c));
        assert!(!nl.is_valid_for(&c));
    }

    #[test]
    fn cache_shares_and_sweeps() {
        let mut c = Circuit::new();
        let a = pin(&mut c, true);
        let g = c.add_node(Node::new(NodeKind::gate(GateKind::Not)));
        c.connect(a, "out", g, "in");
        let twin = c.clone();

        let mut cache = NetlistCache::new();
        let first = cache.get_or_build(&c);
        let second = cache.get_or_build(&twin);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.builds(), 1);

        assert_eq!(cache.sweep(), 0);
        c.touch();
        cache.get_or_build(&c);
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.sweep(), 1);
        assert!(cache.get(twin.revision()).is_none());
        assert!(cache.get(c.revision()).is_some());
    }
}
