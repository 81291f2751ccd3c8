//! Orchestrator state (C10, §4.9).
//!
//! `AppState { inner: Arc<Inner> }` wrapping a mutex-guarded core mirrors
//! `strata-control::state::AppState`'s `Arc<Inner>` handle pattern, except
//! the whole mutable core — topology, solver, MCS tables, last result — sits
//! behind one `tokio::sync::Mutex` rather than a `DashMap` of independent
//! entries: §5 requires every mutating endpoint to serialize against the
//! recompute path, and a single mutex is the simplest thing that actually
//! guarantees that (the teacher's per-entry `DashMap` concurrency doesn't
//! give that guarantee, so it isn't reused here).

use crate::container::ContainerBackend;
use crate::error::ApiError;
use crate::recompute::{recompute_and_shape, RecomputeReport};
use manet_channel::{resolve_engine, EngineSelection, McsTable, PathCache, PathSolver, ProcessMode};
use manet_types::{InterfaceKind, Topology};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

struct Core {
    topology: Topology,
    solver: Box<dyn PathSolver + Send>,
    cache: PathCache,
    mcs_tables: HashMap<String, McsTable>,
    backend: Box<dyn ContainerBackend>,
    last_report: RecomputeReport,
    process_mode: ProcessMode,
    /// Whether an external ray-tracing solver is registered alongside the
    /// always-available FSPL fallback (§4.3 engine selection).
    solver_present: bool,
}

impl Core {
    fn recompute(&mut self) -> RecomputeReport {
        let (_metrics, report) = recompute_and_shape(
            &self.topology,
            self.solver.as_mut(),
            &self.cache,
            &mut self.mcs_tables,
            self.backend.as_ref(),
        );
        self.last_report = report.clone();
        report
    }
}

struct Inner {
    core: tokio::sync::Mutex<Core>,
    running: AtomicBool,
}

/// Cloneable handle to the orchestrator's shared state, passed to axum as
/// the router's `State`.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<Inner>,
}

impl AppState {
    /// Construct the orchestrator: validates the topology (§4.9 step 1),
    /// loads the scene on the solver (idempotent, §4.9 step 3, fails
    /// startup on error), then runs the first batch recompute and shaping
    /// pass (§4.9 step 4).
    pub fn new(
        topology: Topology,
        solver: Box<dyn PathSolver + Send>,
        mcs_tables: HashMap<String, McsTable>,
        backend: Box<dyn ContainerBackend>,
    ) -> Result<Self, ApiError> {
        Self::with_engine_mode(topology, solver, mcs_tables, backend, ProcessMode::Normal, false)
    }

    /// Construct the orchestrator with an explicit process mode and whether
    /// an external solver is registered (§4.3). `solver` is still the engine
    /// actually used for path computation; `solver_present` only feeds the
    /// `auto | solver | fallback` resolution exposed via [`Self::request_engine`].
    pub fn with_engine_mode(
        topology: Topology,
        mut solver: Box<dyn PathSolver + Send>,
        mcs_tables: HashMap<String, McsTable>,
        backend: Box<dyn ContainerBackend>,
        process_mode: ProcessMode,
        solver_present: bool,
    ) -> Result<Self, ApiError> {
        topology.validate()?;
        for warning in topology.mac_model_without_sinr_warnings() {
            tracing::warn!(%warning, "mac model declared without sinr enabled");
        }

        solver
            .load_scene(&topology.scene.0, 0.0, 0.0)
            .map_err(|e| ApiError::internal(format!("scene load failed: {e}")))?;

        let mut core = Core {
            topology,
            solver,
            cache: PathCache::new(),
            mcs_tables,
            backend,
            last_report: RecomputeReport::default(),
            process_mode,
            solver_present,
        };
        let report = core.recompute();
        tracing::info!(
            links = report.links_computed,
            degraded = report.degraded_links,
            failures = report.shaping_failures.len(),
            "initial channel batch computed and shaped"
        );

        Ok(AppState {
            inner: Arc::new(Inner {
                core: tokio::sync::Mutex::new(core),
                running: AtomicBool::new(true),
            }),
        })
    }

    pub fn mark_stopped(&self) {
        self.inner.running.store(false, Ordering::SeqCst);
    }

    /// `POST /engine` (§4.3, §4.10): resolves an `auto | solver | fallback`
    /// request against the process mode and whether a solver is registered.
    /// Returns `true` when the resolution selects the solver. Rejection
    /// (no solver present, or an explicit `solver` request while the process
    /// is pinned to fallback) surfaces as `ApiError::unavailable` (503).
    pub async fn request_engine(&self, requested: EngineSelection) -> Result<bool, ApiError> {
        let core = self.inner.core.lock().await;
        let use_solver = resolve_engine(requested, core.process_mode, core.solver_present)?;
        Ok(use_solver)
    }

    /// `{status, running}` for `GET /health` (§4.10). Degraded means either
    /// the last batch produced a degraded link or a shaping command failed.
    pub async fn health(&self) -> (bool, bool) {
        let running = self.inner.running.load(Ordering::SeqCst);
        let core = self.inner.core.lock().await;
        let degraded = core.last_report.degraded_links > 0 || !core.last_report.shaping_failures.is_empty();
        (running, degraded)
    }

    /// `POST /position` (§4.10): updates every wireless interface of `node`
    /// and triggers a full recompute.
    pub async fn update_position(
        &self,
        node: &str,
        x: f64,
        y: f64,
        z: f64,
    ) -> Result<(f64, f64, f64), ApiError> {
        let mut core = self.inner.core.lock().await;

        let node_cfg = core
            .topology
            .node_mut(node)
            .ok_or_else(|| ApiError::not_found(format!("node '{node}' not found")))?;

        let mut touched = false;
        for iface in &mut node_cfg.interfaces {
            if let InterfaceKind::Wireless(w) = &mut iface.kind {
                w.x = x;
                w.y = y;
                w.z = z;
                touched = true;
            }
        }
        if !touched {
            return Err(ApiError::bad_request(format!(
                "node '{node}' does not have wireless capability"
            )));
        }

        core.recompute();
        Ok((x, y, z))
    }

    /// `GET /position/{node}` (§4.10): position from the node's first
    /// wireless interface.
    pub async fn get_position(&self, node: &str) -> Result<(f64, f64, f64), ApiError> {
        let core = self.inner.core.lock().await;
        let node_cfg = core
            .topology
            .node(node)
            .ok_or_else(|| ApiError::not_found(format!("node '{node}' not found")))?;
        let wireless = node_cfg
            .first_wireless()
            .and_then(|i| i.wireless())
            .ok_or_else(|| ApiError::bad_request(format!("node '{node}' has no wireless capability")))?;
        Ok(wireless.position())
    }

    /// `POST /interface` (§4.10): flips the activity flag on a named
    /// wireless interface and triggers a recompute.
    pub async fn set_interface_active(
        &self,
        node: &str,
        interface: &str,
        is_active: bool,
    ) -> Result<(), ApiError> {
        let mut core = self.inner.core.lock().await;

        let node_cfg = core
            .topology
            .node_mut(node)
            .ok_or_else(|| ApiError::not_found(format!("node '{node}' not found")))?;

        let iface = node_cfg.interface_mut(interface).ok_or_else(|| {
            ApiError::not_found(format!("interface '{interface}' not found on node '{node}'"))
        })?;

        let wireless = iface.wireless_mut().ok_or_else(|| {
            ApiError::bad_request(format!(
                "interface '{interface}' is not wireless (fixed_netem cannot be toggled)"
            ))
        })?;
        wireless.is_active = is_active;

        core.recompute();
        Ok(())
    }

    /// `GET /interface/{node}/{iface}` (§4.10).
    pub async fn get_interface_active(&self, node: &str, interface: &str) -> Result<bool, ApiError> {
        let core = self.inner.core.lock().await;
        let node_cfg = core
            .topology
            .node(node)
            .ok_or_else(|| ApiError::not_found(format!("node '{node}' not found")))?;
        let iface = node_cfg.interface(interface).ok_or_else(|| {
            ApiError::not_found(format!("interface '{interface}' not found on node '{node}'"))
        })?;
        let wireless = iface
            .wireless()
            .ok_or_else(|| ApiError::bad_request(format!("interface '{interface}' is not wireless")))?;
        Ok(wireless.is_active)
    }

    /// `POST /recompute` (§4.10): force a full recompute without changing
    /// state.
    pub async fn force_recompute(&self) -> RecomputeReport {
        let mut core = self.inner.core.lock().await;
        core.recompute()
    }

    /// `GET /nodes` (§4.10): every node with its current position.
    pub async fn list_nodes(&self) -> Vec<(String, (f64, f64, f64))> {
        let core = self.inner.core.lock().await;
        core.topology
            .nodes
            .iter()
            .filter_map(|n| {
                let wireless = n.first_wireless()?.wireless()?;
                Some((n.name.0.clone(), wireless.position()))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::StaticContainerBackend;
    use manet_channel::FsplFallback;
    use manet_types::{
        Antenna, FecType, Interface, MacModel, Modulation, ModulationScheme, Node, Polarization,
        SceneRef, WirelessParams,
    };

    fn wireless_node(name: &str, x: f64) -> Node {
        Node {
            name: name.into(),
            interfaces: vec![Interface {
                name: "wlan0".into(),
                ip_address: Some(format!("10.0.0.{}", x as u32 + 1)),
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
            }],
        }
    }

    fn two_node_topology() -> Topology {
        Topology {
            name: "t".into(),
            scene: SceneRef("vacuum".into()),
            enable_sinr: true,
            nodes: vec![wireless_node("a", 0.0), wireless_node("b", 20.0)],
            shared_bridges: vec![],
        }
    }

    async fn fresh_state() -> AppState {
        AppState::new(
            two_node_topology(),
            Box::new(FsplFallback::default()),
            HashMap::new(),
            Box::new(StaticContainerBackend::new()),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn health_reports_running_immediately_after_construction() {
        let state = fresh_state().await;
        let (running, _degraded) = state.health().await;
        assert!(running);
    }

    #[tokio::test]
    async fn update_position_changes_subsequent_reads() {
        let state = fresh_state().await;
        state.update_position("a", 5.0, 6.0, 7.0).await.unwrap();
        let pos = state.get_position("a").await.unwrap();
        assert_eq!(pos, (5.0, 6.0, 7.0));
    }

    #[tokio::test]
    async fn update_position_unknown_node_is_not_found() {
        let state = fresh_state().await;
        let err = state.update_position("ghost", 0.0, 0.0, 0.0).await;
        assert!(err.is_err());
    }

    #[tokio::test]
    async fn set_interface_active_flips_and_persists() {
        let state = fresh_state().await;
        state.set_interface_active("a", "wlan0", false).await.unwrap();
        assert!(!state.get_interface_active("a", "wlan0").await.unwrap());
        state.set_interface_active("a", "wlan0", true).await.unwrap();
        assert!(state.get_interface_active("a", "wlan0").await.unwrap());
    }

    #[tokio::test]
    async fn set_interface_active_unknown_interface_is_not_found() {
        let state = fresh_state().await;
        let err = state.set_interface_active("a", "wlan9", true).await;
        assert!(err.is_err());
    }

    #[tokio::test]
    async fn list_nodes_reports_every_node_position() {
        let state = fresh_state().await;
        let nodes = state.list_nodes().await;
        assert_eq!(nodes.len(), 2);
    }

    #[tokio::test]
    async fn force_recompute_returns_a_report() {
        let state = fresh_state().await;
        let report = state.force_recompute().await;
        assert_eq!(report.links_computed, 2);
    }

    #[tokio::test]
    async fn request_engine_auto_resolves_to_fallback_when_no_solver_present() {
        let state = fresh_state().await;
        let use_solver = state.request_engine(EngineSelection::Auto).await.unwrap();
        assert!(!use_solver);
    }

    #[tokio::test]
    async fn request_engine_explicit_solver_is_unavailable_without_one_registered() {
        let state = fresh_state().await;
        let err = state.request_engine(EngineSelection::Solver).await;
        assert!(err.is_err());
    }
}
