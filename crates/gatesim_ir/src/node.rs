//! Component instances and their per-kind state.
//!
//! A [`Node`] pairs shared bookkeeping (label, position, staged input values,
//! current output values) with a [`NodeKind`] that carries exactly the state
//! its component needs: oscillator fields only on clocks, the internal
//! circuit only on composites.

use std::collections::BTreeMap;

use gatesim_common::{BusValue, Frequency, Value};
use serde::{Deserialize, Serialize};

use crate::catalog::{port_meta_in, ComponentType, PortDecl, PortMeta};
use crate::circuit::Circuit;
use crate::ids::{NodeId, PortId};

/// Values keyed by port, used for both staged inputs and current outputs.
pub type PortValues = BTreeMap<PortId, Value>;

/// Canvas position. Only the vertical coordinate matters to simulation, as
/// it orders a composite's internal pins.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default, Serialize, Deserialize)]
pub struct Point {
    /// Horizontal coordinate.
    pub x: i32,
    /// Vertical coordinate; smaller is higher on the canvas.
    pub y: i32,
}

impl Point {
    /// Creates a point.
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Width of an input or output pin.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum PinWidth {
    /// A single bit.
    #[default]
    One,
    /// A 4-bit bus.
    Four,
    /// An 8-bit bus.
    Eight,
}

impl PinWidth {
    /// Number of bits.
    pub fn bits(self) -> u32 {
        match self {
            PinWidth::One => 1,
            PinWidth::Four => 4,
            PinWidth::Eight => 8,
        }
    }
}

impl TryFrom<u32> for PinWidth {
    type Error = String;

    fn try_from(bits: u32) -> Result<Self, String> {
        match bits {
            1 => Ok(PinWidth::One),
            4 => Ok(PinWidth::Four),
            8 => Ok(PinWidth::Eight),
            other => Err(format!("unsupported pin width {other}")),
        }
    }
}

impl From<PinWidth> for u32 {
    fn from(w: PinWidth) -> u32 {
        w.bits()
    }
}

/// Width of a merge or split component.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum BusWidth {
    /// Four lanes.
    Four,
    /// Eight lanes.
    Eight,
}

impl BusWidth {
    /// Number of bits.
    pub fn bits(self) -> u32 {
        match self {
            BusWidth::Four => 4,
            BusWidth::Eight => 8,
        }
    }
}

impl TryFrom<u32> for BusWidth {
    type Error = String;

    fn try_from(bits: u32) -> Result<Self, String> {
        match bits {
            4 => Ok(BusWidth::Four),
            8 => Ok(BusWidth::Eight),
            other => Err(format!("unsupported bus width {other}")),
        }
    }
}

impl From<BusWidth> for u32 {
    fn from(w: BusWidth) -> u32 {
        w.bits()
    }
}

/// The boolean function of a logic gate.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GateKind {
    /// `a & b`
    And,
    /// `a | b`
    Or,
    /// `a ^ b`
    Xor,
    /// `!(a & b)`
    Nand,
    /// `!(a | b)`
    Nor,
    /// `!in`
    Not,
}

impl GateKind {
    /// Applies the gate. `Not` reads only `a`.
    pub fn apply(self, a: bool, b: bool) -> bool {
        match self {
            GateKind::And => a && b,
            GateKind::Or => a || b,
            GateKind::Xor => a ^ b,
            GateKind::Nand => !(a && b),
            GateKind::Nor => !(a || b),
            GateKind::Not => !a,
        }
    }
}

/// Direction of a bus resizer.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResizeKind {
    /// `high` and `low` nibbles into one byte.
    FourToEight,
    /// One byte into `high` and `low` nibbles.
    EightToFour,
}

/// Lit segments of a seven-segment display.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default, Serialize, Deserialize)]
pub struct Segments {
    /// Top.
    pub a: bool,
    /// Upper right.
    pub b: bool,
    /// Lower right.
    pub c: bool,
    /// Bottom.
    pub d: bool,
    /// Lower left.
    pub e: bool,
    /// Upper left.
    pub f: bool,
    /// Middle.
    pub g: bool,
    /// Decimal point.
    pub dp: bool,
}

impl Segments {
    /// Builds the segment set from one boolean per port in
    /// [`SEGMENT_PORTS`](crate::catalog::SEGMENT_PORTS) order.
    pub fn from_array(bits: [bool; 8]) -> Self {
        let [a, b, c, d, e, f, g, dp] = bits;
        Self {
            a,
            b,
            c,
            d,
            e,
            f,
            g,
            dp,
        }
    }

    /// Returns the segments in port order.
    pub fn to_array(self) -> [bool; 8] {
        [
            self.a, self.b, self.c, self.d, self.e, self.f, self.g, self.dp,
        ]
    }

    /// Packs the segments into an 8-bit bus, segment `a` at bit 0.
    pub fn to_bus(self) -> BusValue {
        BusValue::from_bits(&self.to_array())
    }
}

/// Persistent state of a free-running oscillator.
#[derive(Clone, Copy, PartialEq, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct Oscillator {
    /// Toggle rate (one full period is two toggles).
    pub frequency: Frequency,
    /// Whether the oscillator is advancing and driving its output.
    pub running: bool,
    /// Current toggle state.
    pub state: bool,
    /// External ticks since the last toggle.
    pub tick: u64,
}

impl Oscillator {
    /// Slowest frequency reachable through [`slower`](Self::slower).
    pub const MIN_FREQUENCY: Frequency = Frequency::new(0.5);
    /// Fastest frequency reachable through [`faster`](Self::faster).
    pub const MAX_FREQUENCY: Frequency = Frequency::new(10.0);
    /// Frequency change per step.
    pub const FREQUENCY_STEP: f64 = 0.5;

    /// Creates a running oscillator in the low state.
    pub fn new(frequency: Frequency) -> Self {
        Self {
            frequency,
            running: true,
            state: false,
            tick: 0,
        }
    }

    /// The value driven onto the `out` port: the toggle state while
    /// running, low otherwise.
    pub fn output(&self) -> bool {
        self.running && self.state
    }

    /// Starts or pauses the oscillator.
    pub fn toggle_running(&mut self) {
        self.running = !self.running;
    }

    /// Raises the frequency by one step, up to the maximum.
    pub fn faster(&mut self) {
        self.frequency = Frequency::new(self.frequency.hz() + Self::FREQUENCY_STEP)
            .clamped(Self::MIN_FREQUENCY, Self::MAX_FREQUENCY);
    }

    /// Lowers the frequency by one step, down to the minimum.
    pub fn slower(&mut self) {
        self.frequency = Frequency::new(self.frequency.hz() - Self::FREQUENCY_STEP)
            .clamped(Self::MIN_FREQUENCY, Self::MAX_FREQUENCY);
    }
}

impl Default for Oscillator {
    fn default() -> Self {
        Self::new(Frequency::default())
    }
}

/// Internal pins of a composite in port order, derived from its circuit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PinBindings {
    /// Revision of the internal circuit these bindings were computed from.
    pub revision: u64,
    /// Internal input pins, ascending by vertical position.
    pub inputs: Vec<NodeId>,
    /// Internal output pins, ascending by vertical position.
    pub outputs: Vec<NodeId>,
    /// Whether the internal circuit contains an oscillator at any depth.
    pub has_clock: bool,
}

/// A user-defined chip wrapping a private internal circuit.
///
/// External port `i` binds to the `i`-th internal input (or output) pin in
/// ascending vertical order. Moving internal pins therefore reorders the
/// external ports.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Composite {
    /// Library name of the chip.
    pub name: String,
    /// External input ports, in binding order.
    pub inputs: Vec<PortDecl>,
    /// External output ports, in binding order.
    pub outputs: Vec<PortDecl>,
    /// The instance's own copy of the internal circuit.
    pub circuit: Circuit,
    /// Cached pin order, refreshed when the internal circuit's revision moves.
    #[serde(skip)]
    pub bindings: Option<PinBindings>,
    /// Input values seen on the previous evaluation, per port.
    #[serde(skip)]
    pub last_inputs: PortValues,
}

impl Composite {
    /// Wraps a circuit with explicitly declared external ports.
    pub fn new(
        name: impl Into<String>,
        inputs: Vec<PortDecl>,
        outputs: Vec<PortDecl>,
        circuit: Circuit,
    ) -> Self {
        Self {
            name: name.into(),
            inputs,
            outputs,
            circuit,
            bindings: None,
            last_inputs: PortValues::new(),
        }
    }

    /// Wraps a circuit, deriving one external port per internal pin.
    ///
    /// Ports are named `in0..`/`out0..` in binding order and labelled after
    /// the pins; bus pins produce bus ports of the same width.
    pub fn from_circuit(name: impl Into<String>, circuit: Circuit) -> Self {
        let (ins, outs) = circuit.sorted_pins();
        let decl = |prefix: &str, fallback: &str, i: usize, id: NodeId| {
            let node = circuit.node(id);
            let width = node.map(Node::pin_width).unwrap_or(1);
            let label = node
                .map(|n| n.label.clone())
                .filter(|l| !l.is_empty())
                .unwrap_or_else(|| fallback.to_string());
            PortDecl {
                id: PortId::new(format!("{prefix}{i}")),
                label,
                bus: width > 1,
                width: (width > 1).then_some(width),
            }
        };
        let inputs = ins
            .iter()
            .enumerate()
            .map(|(i, &id)| decl("in", "in", i, id))
            .collect();
        let outputs = outs
            .iter()
            .enumerate()
            .map(|(i, &id)| decl("out", "out", i, id))
            .collect();
        Self::new(name, inputs, outputs, circuit)
    }

    /// Resolves the role and width of one of the chip's external ports.
    pub fn port_meta(&self, port: &str) -> PortMeta {
        port_meta_in(
            ComponentType::Composite.type_name(),
            &self.inputs,
            &self.outputs,
            port,
        )
    }
}

/// The component-specific part of a node.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NodeKind {
    /// Externally driven input pin.
    InputPin {
        /// Bus width of the pin.
        #[serde(default)]
        width: PinWidth,
        /// Driven value.
        #[serde(default)]
        state: Value,
    },
    /// Externally toggled switch.
    Switch {
        /// Whether the switch is closed.
        #[serde(default)]
        on: bool,
    },
    /// Output pin displaying its input.
    OutputPin {
        /// Bus width of the pin.
        #[serde(default)]
        width: PinWidth,
        /// Last received value, for display.
        #[serde(default)]
        display: Value,
    },
    /// Indicator light.
    Light {
        /// Whether the light is on.
        #[serde(default)]
        lit: bool,
    },
    /// Combinational logic gate.
    Gate {
        /// The gate's boolean function.
        gate: GateKind,
    },
    /// Tri-state buffer.
    TriBuffer,
    /// Scalars into a bus.
    Merge {
        /// Number of lanes.
        width: BusWidth,
    },
    /// A bus into scalars.
    Split {
        /// Number of lanes.
        width: BusWidth,
    },
    /// Nibble/byte converter.
    Resize {
        /// Conversion direction.
        direction: ResizeKind,
    },
    /// Seven-segment display.
    #[serde(rename = "7SEG")]
    SevenSegment {
        /// Lit segments, for display.
        #[serde(default)]
        segments: Segments,
    },
    /// Free-running oscillator.
    Clock(Oscillator),
    /// Connectivity-only junction.
    Joint,
    /// Canvas annotation.
    Comment,
    /// User-defined chip.
    #[serde(rename = "CUSTOM")]
    Composite(Box<Composite>),
    /// A type this build does not know; it is carried along but never evaluated.
    #[serde(other)]
    Unknown,
}

impl NodeKind {
    /// Creates a 1-bit input pin driving `state`.
    pub fn input_pin(state: bool) -> Self {
        NodeKind::InputPin {
            width: PinWidth::One,
            state: Value::Bit(state),
        }
    }

    /// Creates a bus input pin of the given width, initially all low.
    pub fn bus_input_pin(width: PinWidth) -> Self {
        NodeKind::InputPin {
            width,
            state: Value::zero(width.bits()),
        }
    }

    /// Creates an output pin of the given width.
    pub fn output_pin(width: PinWidth) -> Self {
        NodeKind::OutputPin {
            width,
            display: Value::zero(width.bits()),
        }
    }

    /// Creates a logic gate.
    pub fn gate(gate: GateKind) -> Self {
        NodeKind::Gate { gate }
    }

    /// Returns the catalog type of this kind, `None` for unknown types.
    pub fn component_type(&self) -> Option<ComponentType> {
        use ComponentType as T;
        let ty = match self {
            NodeKind::InputPin { width, .. } => match width {
                PinWidth::One => T::PinIn,
                PinWidth::Four => T::PinIn4,
                PinWidth::Eight => T::PinIn8,
            },
            NodeKind::OutputPin { width, .. } => match width {
                PinWidth::One => T::PinOut,
                PinWidth::Four => T::PinOut4,
                PinWidth::Eight => T::PinOut8,
            },
            NodeKind::Switch { .. } => T::Switch,
            NodeKind::Light { .. } => T::Light,
            NodeKind::Gate { gate } => match gate {
                GateKind::And => T::And,
                GateKind::Or => T::Or,
                GateKind::Xor => T::Xor,
                GateKind::Nand => T::Nand,
                GateKind::Nor => T::Nor,
                GateKind::Not => T::Not,
            },
            NodeKind::TriBuffer => T::TriBuffer,
            NodeKind::Merge { width } => match width {
                BusWidth::Four => T::Merge4,
                BusWidth::Eight => T::Merge8,
            },
            NodeKind::Split { width } => match width {
                BusWidth::Four => T::Split4,
                BusWidth::Eight => T::Split8,
            },
            NodeKind::Resize { direction } => match direction {
                ResizeKind::FourToEight => T::Resize4To8,
                ResizeKind::EightToFour => T::Resize8To4,
            },
            NodeKind::SevenSegment { .. } => T::SevenSegment,
            NodeKind::Clock(_) => T::Clock,
            NodeKind::Joint => T::Joint,
            NodeKind::Comment => T::Comment,
            NodeKind::Composite(_) => T::Composite,
            NodeKind::Unknown => return None,
        };
        Some(ty)
    }
}

/// A component instance.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Node {
    /// Display label.
    #[serde(default)]
    pub label: String,
    /// Canvas position.
    #[serde(default)]
    pub position: Point,
    /// Component kind and kind-specific state.
    pub kind: NodeKind,
    /// Values received from nets during the current pass.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub inputs: PortValues,
    /// Values currently driven on output ports.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub outputs: PortValues,
}

impl Node {
    /// Creates a node at the origin, labelled with its catalog default.
    pub fn new(kind: NodeKind) -> Self {
        let label = match &kind {
            NodeKind::Composite(c) => c.name.clone(),
            other => other
                .component_type()
                .and_then(ComponentType::definition)
                .map(|def| def.label.to_string())
                .unwrap_or_default(),
        };
        Self {
            label,
            position: Point::default(),
            kind,
            inputs: PortValues::new(),
            outputs: PortValues::new(),
        }
    }

    /// Sets the label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Sets the position.
    pub fn at(mut self, x: i32, y: i32) -> Self {
        self.position = Point::new(x, y);
        self
    }

    /// Returns the catalog type, `None` for unknown types.
    pub fn component_type(&self) -> Option<ComponentType> {
        self.kind.component_type()
    }

    /// Resolves the role and width of a port on this node.
    pub fn port_meta(&self, port: &str) -> PortMeta {
        match &self.kind {
            NodeKind::Joint => PortMeta::JOINT,
            NodeKind::Composite(c) => c.port_meta(port),
            kind => match kind.component_type().and_then(ComponentType::definition) {
                Some(def) => def.port_meta(port),
                None => port_meta_in("", &[], &[], port),
            },
        }
    }

    /// Returns true for a Joint.
    pub fn is_joint(&self) -> bool {
        matches!(self.kind, NodeKind::Joint)
    }

    /// Returns true for an input pin of any width.
    pub fn is_input_pin(&self) -> bool {
        matches!(self.kind, NodeKind::InputPin { .. })
    }

    /// Returns true for an output pin of any width.
    pub fn is_output_pin(&self) -> bool {
        matches!(self.kind, NodeKind::OutputPin { .. })
    }

    /// Width in bits of an input or output pin; 1 for other kinds.
    pub fn pin_width(&self) -> u32 {
        match &self.kind {
            NodeKind::InputPin { width, .. } | NodeKind::OutputPin { width, .. } => width.bits(),
            _ => 1,
        }
    }

    /// Returns true if this node is an oscillator or a composite that
    /// contains one at any depth.
    pub fn contains_clock(&self) -> bool {
        match &self.kind {
            NodeKind::Clock(_) => true,
            NodeKind::Composite(c) => c.circuit.contains_clock(),
            _ => false,
        }
    }

    /// The value received on an input port this pass.
    pub fn input(&self, port: &str) -> Option<&Value> {
        self.inputs.get(port)
    }

    /// The value currently driven on an output port.
    pub fn output(&self, port: &str) -> Option<&Value> {
        self.outputs.get(port)
    }

    /// Sets the externally controlled state of an input pin or switch.
    ///
    /// Input pins normalise the value to their width; switches reduce it to
    /// a boolean. Returns false, changing nothing, for any other kind.
    pub fn drive(&mut self, value: Value) -> bool {
        match &mut self.kind {
            NodeKind::InputPin { width, state } => {
                *state = value.normalise(width.bits());
                true
            }
            NodeKind::Switch { on } => {
                *on = value.to_bool();
                true
            }
            _ => false,
        }
    }

    /// The value a user would see on this node.
    ///
    /// Output pins, lights and displays report their display state; sources
    /// report what they drive; other nodes report their `out` port if any.
    pub fn display_value(&self) -> Option<Value> {
        match &self.kind {
            NodeKind::OutputPin { display, .. } => Some(*display),
            NodeKind::Light { lit } => Some(Value::Bit(*lit)),
            NodeKind::SevenSegment { segments } => Some(Value::Bus(segments.to_bus())),
            NodeKind::InputPin { state, .. } => Some(*state),
            NodeKind::Switch { on } => Some(Value::Bit(*on)),
            NodeKind::Clock(osc) => Some(Value::Bit(osc.output())),
            NodeKind::Joint => self.outputs.get("joint").copied(),
            _ => self.outputs.get("out").copied(),
        }
    }
}
