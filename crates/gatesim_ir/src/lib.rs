//! Circuit data model for the gatesim simulator.
//!
//! A [`Circuit`] owns its nodes (component instances) in a slot arena and an
//! unordered list of point-to-point [`Wire`]s. Nodes are a tagged union over
//! the primitive component kinds plus user-defined composites, each of which
//! owns a private copy of its internal circuit.
//!
//! The static [`catalog`] describes the ports of every primitive component
//! and the rule for deriving each port's bit width.

#![warn(missing_docs)]

pub mod arena;
pub mod catalog;
pub mod circuit;
pub mod ids;
pub mod node;

pub use arena::{ArenaId, SlotArena};
pub use catalog::{
    catalog, infer_bus_width, port_meta_in, ComponentDef, ComponentType, PortDecl, PortMeta,
    PortRole, SEGMENT_PORTS,
};
pub use circuit::{Circuit, Endpoint, Wire};
pub use ids::{NodeId, PortId};
pub use node::{
    BusWidth, Composite, GateKind, Node, NodeKind, Oscillator, PinBindings, PinWidth, Point,
    PortValues, ResizeKind, Segments,
};
