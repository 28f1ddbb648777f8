//! Static descriptors of the primitive component types.
//!
//! The engine consumes these descriptors to classify terminals: which ports
//! are inputs or outputs, and how many bits each port carries. Nothing here
//! is computed per tick.

use crate::ids::PortId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::OnceLock;

/// Tag for every component type the simulator knows about.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ComponentType {
    /// 1-bit input pin.
    PinIn,
    /// 4-bit input pin.
    #[serde(rename = "PIN_IN_4")]
    PinIn4,
    /// 8-bit input pin.
    #[serde(rename = "PIN_IN_8")]
    PinIn8,
    /// 1-bit output pin.
    PinOut,
    /// 4-bit output pin.
    #[serde(rename = "PIN_OUT_4")]
    PinOut4,
    /// 8-bit output pin.
    #[serde(rename = "PIN_OUT_8")]
    PinOut8,
    /// Free-running oscillator.
    Clock,
    /// Toggle switch.
    Switch,
    /// Indicator light.
    Light,
    /// Free-text annotation with no ports.
    Comment,
    /// Two-input AND gate.
    And,
    /// Two-input OR gate.
    Or,
    /// Two-input XOR gate.
    Xor,
    /// Inverter.
    Not,
    /// Two-input NAND gate.
    Nand,
    /// Two-input NOR gate.
    Nor,
    /// Connectivity-only junction.
    Joint,
    /// Four scalars into a 4-bit bus.
    #[serde(rename = "MERGE_4")]
    Merge4,
    /// A 4-bit bus into four scalars.
    #[serde(rename = "SPLIT_4")]
    Split4,
    /// Eight scalars into an 8-bit bus.
    #[serde(rename = "MERGE_8")]
    Merge8,
    /// An 8-bit bus into eight scalars.
    #[serde(rename = "SPLIT_8")]
    Split8,
    /// Two 4-bit buses into one 8-bit bus.
    #[serde(rename = "RESIZE_4_8")]
    Resize4To8,
    /// One 8-bit bus into two 4-bit buses.
    #[serde(rename = "RESIZE_8_4")]
    Resize8To4,
    /// Tri-state buffer (drives false when disabled).
    TriBuffer,
    /// Seven-segment display with decimal point.
    #[serde(rename = "7SEG")]
    SevenSegment,
    /// User-defined chip wrapping an internal circuit.
    #[serde(rename = "CUSTOM")]
    Composite,
}

impl ComponentType {
    /// Every primitive type with a static catalog entry.
    pub const PRIMITIVES: [ComponentType; 25] = [
        ComponentType::PinIn,
        ComponentType::PinIn4,
        ComponentType::PinIn8,
        ComponentType::PinOut,
        ComponentType::PinOut4,
        ComponentType::PinOut8,
        ComponentType::Clock,
        ComponentType::Switch,
        ComponentType::Light,
        ComponentType::Comment,
        ComponentType::And,
        ComponentType::Or,
        ComponentType::Xor,
        ComponentType::Not,
        ComponentType::Nand,
        ComponentType::Nor,
        ComponentType::Joint,
        ComponentType::Merge4,
        ComponentType::Split4,
        ComponentType::Merge8,
        ComponentType::Split8,
        ComponentType::Resize4To8,
        ComponentType::Resize8To4,
        ComponentType::TriBuffer,
        ComponentType::SevenSegment,
    ];

    /// The library type name, e.g. `"PIN_IN_4"` or `"7SEG"`.
    pub fn type_name(self) -> &'static str {
        match self {
            ComponentType::PinIn => "PIN_IN",
            ComponentType::PinIn4 => "PIN_IN_4",
            ComponentType::PinIn8 => "PIN_IN_8",
            ComponentType::PinOut => "PIN_OUT",
            ComponentType::PinOut4 => "PIN_OUT_4",
            ComponentType::PinOut8 => "PIN_OUT_8",
            ComponentType::Clock => "CLOCK",
            ComponentType::Switch => "SWITCH",
            ComponentType::Light => "LIGHT",
            ComponentType::Comment => "COMMENT",
            ComponentType::And => "AND",
            ComponentType::Or => "OR",
            ComponentType::Xor => "XOR",
            ComponentType::Not => "NOT",
            ComponentType::Nand => "NAND",
            ComponentType::Nor => "NOR",
            ComponentType::Joint => "JOINT",
            ComponentType::Merge4 => "MERGE_4",
            ComponentType::Split4 => "SPLIT_4",
            ComponentType::Merge8 => "MERGE_8",
            ComponentType::Split8 => "SPLIT_8",
            ComponentType::Resize4To8 => "RESIZE_4_8",
            ComponentType::Resize8To4 => "RESIZE_8_4",
            ComponentType::TriBuffer => "TRI_BUFFER",
            ComponentType::SevenSegment => "7SEG",
            ComponentType::Composite => "CUSTOM",
        }
    }

    /// Looks a type up by its library name.
    pub fn from_type_name(name: &str) -> Option<Self> {
        if name == "CUSTOM" {
            return Some(ComponentType::Composite);
        }
        Self::PRIMITIVES
            .into_iter()
            .find(|ty| ty.type_name() == name)
    }

    /// Returns the static definition of a primitive; `None` for composites.
    pub fn definition(self) -> Option<&'static ComponentDef> {
        catalog().get(&self)
    }
}

/// A port declared on a component type.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortDecl {
    /// Port identifier, unique within its component.
    pub id: PortId,
    /// Display label.
    #[serde(default)]
    pub label: String,
    /// Whether the port carries a multi-bit bus.
    #[serde(default)]
    pub bus: bool,
    /// Explicit bit width of a bus port, overriding name-based inference.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
}

impl PortDecl {
    /// Declares a single-bit port.
    pub fn bit(id: &str, label: &str) -> Self {
        Self {
            id: PortId::from(id),
            label: label.to_string(),
            bus: false,
            width: None,
        }
    }

    /// Declares a bus port.
    pub fn bus(id: &str, label: &str) -> Self {
        Self {
            id: PortId::from(id),
            label: label.to_string(),
            bus: true,
            width: None,
        }
    }
}

/// Static descriptor of a primitive component type.
#[derive(Clone, Debug)]
pub struct ComponentDef {
    /// The type this descriptor belongs to.
    pub component: ComponentType,
    /// Default display label for new instances.
    pub label: &'static str,
    /// Input ports in declaration order.
    pub inputs: Vec<PortDecl>,
    /// Output ports in declaration order.
    pub outputs: Vec<PortDecl>,
}

impl ComponentDef {
    /// Resolves the role and width of one of this component's ports.
    pub fn port_meta(&self, port: &str) -> PortMeta {
        if self.component == ComponentType::Joint {
            return PortMeta::JOINT;
        }
        port_meta_in(
            self.component.type_name(),
            &self.inputs,
            &self.outputs,
            port,
        )
    }
}

/// The role a terminal plays on its net.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum PortRole {
    /// Receives the net value.
    Input,
    /// Contributes to the net value.
    Output,
    /// Both contributes and receives (bidirectional or undeclared).
    Io,
}

/// Role and bit width resolved for a (node, port) terminal.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct PortMeta {
    /// Input, output, or bidirectional.
    pub role: PortRole,
    /// Declared bit width (at least 1).
    pub width: u32,
    /// True for a Joint's single connectivity point.
    pub joint: bool,
}

impl PortMeta {
    /// Metadata shared by every Joint terminal.
    pub const JOINT: PortMeta = PortMeta {
        role: PortRole::Io,
        width: 1,
        joint: true,
    };
}

/// Resolves a port's role and width against explicit port lists.
///
/// A port found on both sides, or on neither, is bidirectional. Undeclared
/// ports are one bit wide.
pub fn port_meta_in(
    type_name: &str,
    inputs: &[PortDecl],
    outputs: &[PortDecl],
    port: &str,
) -> PortMeta {
    let input = inputs.iter().find(|p| p.id.as_str() == port);
    let output = outputs.iter().find(|p| p.id.as_str() == port);
    let role = match (input.is_some(), output.is_some()) {
        (true, false) => PortRole::Input,
        (false, true) => PortRole::Output,
        _ => PortRole::Io,
    };
    let width = input
        .or(output)
        .map(|decl| infer_bus_width(type_name, decl))
        .unwrap_or(1)
        .max(1);
    PortMeta {
        role,
        width,
        joint: false,
    }
}

/// Derives the bit width of a declared port.
///
/// Non-bus ports are one bit. An explicit width wins, and resizers declare
/// their sides explicitly. Other bus ports take their width from a `_8`/`_4`
/// type-name suffix, then from a label mentioning 8, defaulting to 4.
pub fn infer_bus_width(type_name: &str, port: &PortDecl) -> u32 {
    if !port.bus {
        return 1;
    }
    if let Some(width) = port.width {
        return width;
    }
    let id = port.id.as_str();
    match type_name {
        "RESIZE_8_4" => return if id == "in" { 8 } else { 4 },
        "RESIZE_4_8" => return if id == "out" { 8 } else { 4 },
        _ => {}
    }
    if type_name.ends_with("_8") {
        return 8;
    }
    if type_name.ends_with("_4") {
        return 4;
    }
    let label = port.label.to_ascii_lowercase();
    if label.contains('8') {
        8
    } else {
        4
    }
}

/// Port ids of the seven-segment display, in segment order.
pub const SEGMENT_PORTS: [&str; 8] = ["a", "b", "c", "d", "e", "f", "g", "dp"];

/// Returns the static catalog of primitive component definitions.
pub fn catalog() -> &'static BTreeMap<ComponentType, ComponentDef> {
    static CATALOG: OnceLock<BTreeMap<ComponentType, ComponentDef>> = OnceLock::new();
    CATALOG.get_or_init(build_catalog)
}

fn build_catalog() -> BTreeMap<ComponentType, ComponentDef> {
    use ComponentType as T;

    let gate2 = || vec![PortDecl::bit("a", "A"), PortDecl::bit("b", "B")];
    let q = || vec![PortDecl::bit("out", "Q")];
    // Merge/split bit ports are labelled MSB first: port 0 carries bit N-1.
    let numbered = |prefix: &str, n: u32| -> Vec<PortDecl> {
        (0..n)
            .map(|i| PortDecl::bit(&format!("{prefix}{i}"), &(n - 1 - i).to_string()))
            .collect()
    };

    let entries = [
        (T::PinIn, "Input Pin", vec![], vec![PortDecl::bit("out", "Val")]),
        (T::PinIn4, "Input 4b", vec![], vec![PortDecl::bus("out", "4b")]),
        (T::PinIn8, "Input 8b", vec![], vec![PortDecl::bus("out", "8b")]),
        (T::PinOut, "Output Pin", vec![PortDecl::bit("in", "Val")], vec![]),
        (T::PinOut4, "Output 4b", vec![PortDecl::bus("in", "4b")], vec![]),
        (T::PinOut8, "Output 8b", vec![PortDecl::bus("in", "8b")], vec![]),
        (T::Clock, "Clock", vec![], vec![PortDecl::bit("out", "Clk")]),
        (T::Switch, "Switch", vec![], vec![PortDecl::bit("out", "Out")]),
        (T::Light, "Light", vec![PortDecl::bit("in", "In")], vec![]),
        (T::Comment, "Comment", vec![], vec![]),
        (T::And, "AND", gate2(), q()),
        (T::Or, "OR", gate2(), q()),
        (T::Xor, "XOR", gate2(), q()),
        (T::Not, "NOT", vec![PortDecl::bit("in", "In")], q()),
        (T::Nand, "NAND", gate2(), q()),
        (T::Nor, "NOR", gate2(), q()),
        (
            T::Joint,
            "Joint",
            vec![PortDecl::bit("joint", "")],
            vec![PortDecl::bit("joint", "")],
        ),
        (T::Merge4, "1→4BIT", numbered("i", 4), vec![PortDecl::bus("out", "4b")]),
        (T::Split4, "4→1BIT", vec![PortDecl::bus("in", "4b")], numbered("o", 4)),
        (T::Merge8, "1→8BIT", numbered("i", 8), vec![PortDecl::bus("out", "8b")]),
        (T::Split8, "8→1BIT", vec![PortDecl::bus("in", "8b")], numbered("o", 8)),
        (
            T::Resize4To8,
            "4→8BIT",
            vec![
                PortDecl::bus("high", "High 4b"),
                PortDecl::bus("low", "Low 4b"),
            ],
            vec![PortDecl::bus("out", "8b")],
        ),
        (
            T::Resize8To4,
            "8→4BIT",
            vec![PortDecl::bus("in", "8b")],
            vec![
                PortDecl::bus("high", "High 4b"),
                PortDecl::bus("low", "Low 4b"),
            ],
        ),
        (
            T::TriBuffer,
            "3-State",
            vec![PortDecl::bit("in", "In"), PortDecl::bit("en", "En")],
            vec![PortDecl::bit("out", "Out")],
        ),
        (
            T::SevenSegment,
            "7-Seg",
            SEGMENT_PORTS.iter().map(|p| PortDecl::bit(p, p)).collect(),
            vec![],
        ),
    ];

    entries
        .into_iter()
        .map(|(component, label, inputs, outputs)| {
            (
                component,
                ComponentDef {
                    component,
                    label,
                    inputs,
                    outputs,
                },
            )
        })
        .collect()
}
