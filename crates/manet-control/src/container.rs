//! Container-orchestrator driver boundary (§4.9 step 2, §6.2, §9 open
//! question). `manet-control` does not manage container lifecycle — that is
//! an explicit Non-goal — it only needs the mapping a real driver would
//! already have computed: which local interface and namespace correspond to
//! a node or a (node, peer) pair.
//!
//! `StaticContainerBackend` is the test double named by the open-question
//! resolution: a caller-supplied mapping, sufficient to exercise the
//! orchestrator's own recompute/shaping logic without a real container
//! runtime.

use std::collections::HashMap;

/// Local-interface and namespace lookups the orchestrator needs from
/// whatever actually created the containers/netns/veths (§4.9 step 2).
pub trait ContainerBackend: Send + Sync {
    /// Interface name on `node` dedicated to its point-to-point link with
    /// `peer`.
    fn point_to_point_interface(&self, node: &str, peer: &str) -> Option<String>;

    /// Interface name on `node` attached to the shared broadcast domain
    /// named `bridge_name`.
    fn bridge_interface(&self, node: &str, bridge_name: &str) -> Option<String>;

    /// Network namespace (or container id) that owns `node`, used to run
    /// `tc` commands at the correct privilege/namespace level (§6.3).
    fn namespace(&self, node: &str) -> Option<String>;
}

/// A caller-supplied, fixed mapping. Never discovers anything on its own;
/// every lookup is whatever was registered via the `with_*` builders.
#[derive(Debug, Clone, Default)]
pub struct StaticContainerBackend {
    point_to_point: HashMap<(String, String), String>,
    bridges: HashMap<(String, String), String>,
    namespaces: HashMap<String, String>,
}

impl StaticContainerBackend {
    pub fn new() -> Self {
        StaticContainerBackend::default()
    }

    pub fn with_point_to_point(
        mut self,
        node: impl Into<String>,
        peer: impl Into<String>,
        iface: impl Into<String>,
    ) -> Self {
        self.point_to_point
            .insert((node.into(), peer.into()), iface.into());
        self
    }

    pub fn with_bridge_interface(
        mut self,
        node: impl Into<String>,
        bridge_name: impl Into<String>,
        iface: impl Into<String>,
    ) -> Self {
        self.bridges
            .insert((node.into(), bridge_name.into()), iface.into());
        self
    }

    pub fn with_namespace(mut self, node: impl Into<String>, namespace: impl Into<String>) -> Self {
        self.namespaces.insert(node.into(), namespace.into());
        self
    }
}

impl ContainerBackend for StaticContainerBackend {
    fn point_to_point_interface(&self, node: &str, peer: &str) -> Option<String> {
        self.point_to_point
            .get(&(node.to_string(), peer.to_string()))
            .cloned()
    }

    fn bridge_interface(&self, node: &str, bridge_name: &str) -> Option<String> {
        self.bridges
            .get(&(node.to_string(), bridge_name.to_string()))
            .cloned()
    }

    fn namespace(&self, node: &str) -> Option<String> {
        self.namespaces.get(node).cloned()
    }
}
