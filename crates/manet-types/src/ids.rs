//! Stable identifiers and the arena-index pattern used to avoid
//! back-references between nodes and interfaces.
//!
//! `NodeId` and interface names are the stable, human-assigned handles that
//! survive a topology reload; `InterfaceId` is a transient arena index valid
//! only for the `Topology` instance that produced it. `LinkId` is built from
//! the stable names, not the index, because MCS hysteresis state must
//! survive across recomputes that rebuild the arena.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A node name, as declared in the topology.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub String);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for NodeId {
    fn from(s: &str) -> Self {
        NodeId(s.to_string())
    }
}

impl From<String> for NodeId {
    fn from(s: String) -> Self {
        NodeId(s)
    }
}

/// Arena index into `Topology::interfaces`. Only valid for the `Topology`
/// that handed it out; never persisted across a reload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InterfaceId(pub usize);

impl fmt::Display for InterfaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "iface#{}", self.0)
    }
}

/// Stable key for a directed link: `(tx_node, tx_iface, rx_node, rx_iface)`.
///
/// Used as the MCS hysteresis key (§4.11) — deliberately independent of
/// `InterfaceId`, which is rebuilt every batch.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LinkId {
    pub tx_node: NodeId,
    pub tx_iface: String,
    pub rx_node: NodeId,
    pub rx_iface: String,
}

impl LinkId {
    pub fn new(
        tx_node: impl Into<NodeId>,
        tx_iface: impl Into<String>,
        rx_node: impl Into<NodeId>,
        rx_iface: impl Into<String>,
    ) -> Self {
        LinkId {
            tx_node: tx_node.into(),
            tx_iface: tx_iface.into(),
            rx_node: rx_node.into(),
            rx_iface: rx_iface.into(),
        }
    }
}

impl fmt::Display for LinkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}->{}:{}",
            self.tx_node, self.tx_iface, self.rx_node, self.rx_iface
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn link_id_formats_as_arrow() {
        let id = LinkId::new("n1", "wlan0", "n2", "wlan0");
        assert_eq!(id.to_string(), "n1:wlan0->n2:wlan0");
    }

    #[test]
    fn link_id_equality_ignores_interface_id() {
        let a = LinkId::new("n1", "wlan0", "n2", "wlan0");
        let b = LinkId::new("n1", "wlan0", "n2", "wlan0");
        assert_eq!(a, b);
    }
}
