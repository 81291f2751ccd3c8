//! Batch recompute orchestration (§4.9 steps 4-5): builds link specs from a
//! `Topology`, drives `manet_channel::compute_batch`, then builds and
//! applies shaping plans through the container backend.
//!
//! Grounded on `links_sinr_computer.py`'s `compute()` for the link
//! enumeration/index shape and on `topology/netem.py` + `shared_netem.py`
//! for the point-to-point vs shared-bridge dispatch.
//!
//! Link enumeration decision (open question, not named explicitly by
//! spec.md): every ordered pair of distinct nodes' wireless interfaces is a
//! directed link, with interferers drawn from every other wireless
//! interface excluding both endpoints' own nodes (§4.7 step c). Nothing in
//! the data model declares point-to-point adjacency explicitly, so a full
//! mesh over wireless interfaces is the only enumeration consistent with
//! the control surface only ever naming nodes, never links.

use crate::container::ContainerBackend;
use crate::executor::NamespaceCommandExecutor;
use manet_channel::{compute_batch, ChannelMetrics, LinkEndpoint, LinkSpec, McsTable, PathCache, PathSolver};
use manet_shaper::{
    apply_plan, build_point_to_point_plan, build_shared_bridge_plan, DefaultParams, PeerShaping,
};
use manet_types::{InterfaceKind, Topology, WirelessParams};
use std::collections::HashMap;
use tracing::warn;

fn to_endpoint(node: &str, iface: &str, w: &WirelessParams) -> LinkEndpoint {
    LinkEndpoint {
        node: node.to_string(),
        iface: iface.to_string(),
        position: w.position(),
        tx_power_dbm: w.tx_power_dbm,
        gain_dbi: w.antenna.explicit_gain_dbi().unwrap_or(0.0),
        antenna: w.antenna,
        polarization: w.polarization,
        frequency_hz: w.center_freq_hz,
        bandwidth_hz: w.bandwidth_hz,
        noise_figure_db: w.noise_figure_db,
        rx_sensitivity_dbm: w.rx_sensitivity_dbm,
        modulation: w.modulation.clone(),
        is_active: w.is_active,
        mac_model: w.mac_model.clone(),
    }
}

fn wireless_interfaces(topology: &Topology) -> Vec<(&str, &str, &WirelessParams)> {
    topology
        .nodes
        .iter()
        .flat_map(|n| {
            n.interfaces.iter().filter_map(move |i| match &i.kind {
                InterfaceKind::Wireless(w) => Some((n.name.0.as_str(), i.name.as_str(), w)),
                InterfaceKind::Fixed(_) => None,
            })
        })
        .collect()
}

/// Directed link for every ordered pair of distinct nodes' wireless
/// interfaces (§4.7).
pub fn build_link_specs(topology: &Topology) -> Vec<LinkSpec> {
    let interfaces = wireless_interfaces(topology);
    let mut links = Vec::new();

    for &(tx_node, tx_iface, tx_w) in &interfaces {
        for &(rx_node, rx_iface, rx_w) in &interfaces {
            if tx_node == rx_node {
                continue;
            }
            let tx = to_endpoint(tx_node, tx_iface, tx_w);
            let rx = to_endpoint(rx_node, rx_iface, rx_w);
            let interferers = interfaces
                .iter()
                .filter(|&&(n, _, _)| n != tx_node && n != rx_node)
                .map(|&(n, i, w)| to_endpoint(n, i, w))
                .collect();
            links.push(LinkSpec { tx, rx, interferers });
        }
    }

    links
}

/// Result of one full recompute + reshape pass (§4.9 step 4-5).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecomputeReport {
    pub links_computed: usize,
    pub degraded_links: usize,
    pub shaping_failures: Vec<String>,
}

fn bridge_for<'a>(topology: &'a Topology, node: &str, peer: &str) -> Option<&'a str> {
    topology
        .shared_bridges
        .iter()
        .find(|b| {
            b.nodes.iter().any(|n| n.0 == node) && b.nodes.iter().any(|n| n.0 == peer)
        })
        .map(|b| b.name.as_str())
}

/// Apply shaping for every node's outbound traffic, choosing shared-bridge
/// or point-to-point mode per peer depending on `SharedBridge` membership
/// (§4.8, §6.3). Failures are collected, never propagated (§4.8, §7).
pub fn apply_shaping(
    topology: &Topology,
    metrics: &[ChannelMetrics],
    backend: &dyn ContainerBackend,
) -> Vec<String> {
    let by_pair: HashMap<(&str, &str), &ChannelMetrics> = metrics
        .iter()
        .map(|m| ((m.tx_node.as_str(), m.rx_node.as_str()), m))
        .collect();

    let mut failures = Vec::new();
    let node_names: Vec<&str> = topology.nodes.iter().map(|n| n.name.0.as_str()).collect();

    for &node in &node_names {
        let mut handled_bridges: Vec<&str> = Vec::new();

        for &peer in &node_names {
            if peer == node {
                continue;
            }
            let Some(metric) = by_pair.get(&(node, peer)) else {
                continue;
            };

            if let Some(bridge_name) = bridge_for(topology, node, peer) {
                if handled_bridges.contains(&bridge_name) {
                    continue;
                }
                handled_bridges.push(bridge_name);

                let bridge = topology
                    .shared_bridges
                    .iter()
                    .find(|b| b.name == bridge_name)
                    .expect("bridge_for only returns names present in topology");

                let Some(iface) = backend.bridge_interface(node, bridge_name) else {
                    failures.push(format!("{node}: no bridge interface for {bridge_name}"));
                    continue;
                };
                let Some(namespace) = backend.namespace(node) else {
                    failures.push(format!("{node}: no namespace"));
                    continue;
                };

                let peers: Vec<PeerShaping> = bridge
                    .nodes
                    .iter()
                    .filter(|n| n.0 != node)
                    .filter_map(|n| {
                        let peer_node = topology.node(&n.0)?;
                        let dst_ip = peer_node.first_wireless()?.ip_address.as_deref()?;
                        let m = by_pair.get(&(node, n.0.as_str()))?;
                        Some(PeerShaping::from_metrics(dst_ip, m))
                    })
                    .collect();

                let plan = build_shared_bridge_plan(&iface, &peers, &DefaultParams::default());
                let mut executor = NamespaceCommandExecutor::new(namespace);
                if let Err(err) = apply_plan(&mut executor, &iface, &plan) {
                    warn!(node, bridge_name, %err, "shaping failed");
                    failures.push(format!("{node}/{bridge_name}: {err}"));
                }
            } else {
                let Some(iface) = backend.point_to_point_interface(node, peer) else {
                    failures.push(format!("{node}->{peer}: no point-to-point interface"));
                    continue;
                };
                let Some(namespace) = backend.namespace(node) else {
                    failures.push(format!("{node}: no namespace"));
                    continue;
                };

                let plan = build_point_to_point_plan(
                    &iface,
                    metric.delay_ms,
                    metric.jitter_ms,
                    manet_shaper::DEFAULT_DELAY_CORRELATION_PERCENT,
                    metric.loss_percent,
                    metric.rate_mbps,
                );
                let mut executor = NamespaceCommandExecutor::new(namespace);
                if let Err(err) = apply_plan(&mut executor, &iface, &plan) {
                    warn!(node, peer, %err, "shaping failed");
                    failures.push(format!("{node}->{peer}: {err}"));
                }
            }
        }
    }

    failures
}

/// One full batch recompute + reshape pass, tying C8 and C9 together
/// (§4.9 step 4-5). The channel-metrics batch never aborts (per-link
/// failures degrade locally); shaping failures are per-interface and
/// collected into the report rather than raised.
pub fn recompute_and_shape(
    topology: &Topology,
    solver: &mut dyn PathSolver,
    cache: &PathCache,
    mcs_tables: &mut HashMap<String, McsTable>,
    backend: &dyn ContainerBackend,
) -> (Vec<ChannelMetrics>, RecomputeReport) {
    let links = build_link_specs(topology);
    let metrics = compute_batch(
        &links,
        solver,
        cache,
        &topology.scene.0,
        mcs_tables,
        topology.enable_sinr,
    );
    let degraded_links = metrics.iter().filter(|m| m.degraded).count();
    let shaping_failures = apply_shaping(topology, &metrics, backend);

    let report = RecomputeReport {
        links_computed: metrics.len(),
        degraded_links,
        shaping_failures,
    };
    (metrics, report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use manet_types::{
        Antenna, FecType, InterfaceKind, Interface, MacModel, Modulation, ModulationScheme, Node,
        Polarization, SceneRef, Topology, WirelessParams,
    };

    fn wireless(x: f64, ip: &str) -> Interface {
        Interface {
            name: "wlan0".into(),
            ip_address: Some(ip.into()),
            kind: InterfaceKind::Wireless(WirelessParams {
                x,
                y: 0.0,
                z: 1.0,
                tx_power_dbm: 20.0,
                center_freq_hz: 5.18e9,
                bandwidth_hz: 80e6,
                antenna: Antenna::Gain(2.15),
                polarization: Polarization::V,
                noise_figure_db: 7.0,
                rx_sensitivity_dbm: -90.0,
                modulation: Modulation::Fixed {
                    modulation: ModulationScheme::Qam64,
                    fec: FecType::Ldpc,
                    code_rate: 0.5,
                },
                is_active: true,
                mac_model: MacModel::None,
            }),
        }
    }

    fn three_node_topology() -> Topology {
        Topology {
            name: "t".into(),
            scene: SceneRef("vacuum".into()),
            enable_sinr: true,
            nodes: vec![
                Node {
                    name: "a".into(),
                    interfaces: vec![wireless(0.0, "10.0.0.1")],
                },
                Node {
                    name: "b".into(),
                    interfaces: vec![wireless(20.0, "10.0.0.2")],
                },
                Node {
                    name: "c".into(),
                    interfaces: vec![wireless(40.0, "10.0.0.3")],
                },
            ],
            shared_bridges: vec![],
        }
    }

    #[test]
    fn link_specs_form_a_full_mesh_excluding_self_pairs() {
        let topo = three_node_topology();
        let links = build_link_specs(&topo);
        assert_eq!(links.len(), 6); // 3 nodes, ordered pairs: 3*2
        assert!(links.iter().all(|l| l.tx.node != l.rx.node));
    }

    #[test]
    fn each_link_excludes_same_node_interferers() {
        let topo = three_node_topology();
        let links = build_link_specs(&topo);
        let ab = links
            .iter()
            .find(|l| l.tx.node == "a" && l.rx.node == "b")
            .unwrap();
        assert_eq!(ab.interferers.len(), 1);
        assert_eq!(ab.interferers[0].node, "c");
    }

    #[test]
    fn shaping_without_backend_mappings_records_failures_not_panics() {
        use manet_channel::{FsplFallback, PathCache};
        use std::collections::HashMap as Map;

        let topo = three_node_topology();
        let mut solver = FsplFallback::default();
        let cache = PathCache::new();
        let mut tables: Map<String, McsTable> = Map::new();
        let backend = crate::container::StaticContainerBackend::new();

        let (metrics, report) =
            recompute_and_shape(&topo, &mut solver, &cache, &mut tables, &backend);
        assert_eq!(metrics.len(), 6);
        assert_eq!(report.links_computed, 6);
        assert!(!report.shaping_failures.is_empty());
    }

    #[test]
    fn registered_backend_mapping_avoids_the_missing_interface_failure() {
        use manet_channel::{FsplFallback, PathCache};
        use std::collections::HashMap as Map;

        let topo = three_node_topology();
        let mut solver = FsplFallback::default();
        let cache = PathCache::new();
        let mut tables: Map<String, McsTable> = Map::new();
        let backend = crate::container::StaticContainerBackend::new()
            .with_point_to_point("a", "b", "veth-ab")
            .with_namespace("a", "ns-a");

        let (_metrics, report) =
            recompute_and_shape(&topo, &mut solver, &cache, &mut tables, &backend);
        // a->b now has both a registered interface and namespace, so its
        // failure (if any, since `tc` itself is not run in unit tests) is
        // never "no point-to-point interface" or "no namespace".
        assert!(!report
            .shaping_failures
            .iter()
            .any(|f| f.starts_with("a->b: no")));
    }
}
