//! Identifier types for nodes and ports.

use crate::arena::ArenaId;
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;

/// Opaque, copyable handle for a node in a [`Circuit`](crate::Circuit).
///
/// Handles are slot indices into the circuit's arena and stay valid until the
/// node is removed; afterwards they resolve to nothing rather than to a
/// different node.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(u32);

impl NodeId {
    /// Creates an ID from a raw `u32` index.
    pub fn from_raw(index: u32) -> Self {
        Self(index)
    }

    /// Returns the raw `u32` index.
    pub fn as_raw(self) -> u32 {
        self.0
    }
}

impl ArenaId for NodeId {
    fn from_raw(index: u32) -> Self {
        Self(index)
    }

    fn as_raw(self) -> u32 {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Name of a port on a component, such as `"a"`, `"out"`, or `"i3"`.
///
/// Borrows as `str`, so port maps can be queried with string literals.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PortId(String);

impl PortId {
    /// Creates a port ID from any string-like value.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the port name.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for PortId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for PortId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for PortId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl fmt::Display for PortId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for PortId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PortId({:?})", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn node_id_roundtrip() {
        let id = NodeId::from_raw(42);
        assert_eq!(id.as_raw(), 42);
        assert_eq!(format!("{id}"), "#42");
    }

    #[test]
    fn port_map_lookup_by_str() {
        let mut map = BTreeMap::new();
        map.insert(PortId::from("out"), 1);
        assert_eq!(map.get("out"), Some(&1));
        assert_eq!(map.get("in"), None);
    }

    #[test]
    fn port_id_serde_is_plain_string() {
        let json = serde_json::to_string(&PortId::new("en")).unwrap();
        assert_eq!(json, "\"en\"");
    }
}
