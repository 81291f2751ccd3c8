//! Declarative network description (§3).
//!
//! Ad-hoc runtime-typed config at the load boundary becomes tagged variants
//! here (§9 design notes): `Antenna`, `Modulation`, `MacModel`. Everything in
//! this module is validated once at `Topology::validate` and never again in
//! the hot path.

use crate::error::ConfigError;
use crate::ids::NodeId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Either an explicit antenna gain or a named radiation pattern.
///
/// Exactly one of the source format's `antenna_gain_dbi` / `antenna_pattern`
/// fields is set; this enum makes that invariant unrepresentable-otherwise
/// instead of checked at every use site.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Antenna {
    Gain(f64),
    Pattern(AntennaPattern),
}

impl Antenna {
    /// Explicit dBi gain if this antenna carries one; patterns have their
    /// gain folded into the solver's path loss instead (§4.1, §4.4 step 5).
    pub fn explicit_gain_dbi(&self) -> Option<f64> {
        match self {
            Antenna::Gain(g) => Some(*g),
            Antenna::Pattern(_) => None,
        }
    }

    /// True when this antenna's gain is embedded in solver path loss rather
    /// than applied explicitly by the caller.
    pub fn gains_embedded(&self) -> bool {
        matches!(self, Antenna::Pattern(_))
    }

    /// Cache-key tag, `"iso"` for an explicit gain (isotropic from the
    /// solver's perspective) or the pattern's own tag.
    pub fn cache_tag(&self) -> &'static str {
        match self {
            Antenna::Gain(_) => "iso",
            Antenna::Pattern(p) => p.as_str(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AntennaPattern {
    Iso,
    Dipole,
    HalfwaveDipole,
    Sector3gpp,
}

impl AntennaPattern {
    pub fn as_str(&self) -> &'static str {
        match self {
            AntennaPattern::Iso => "iso",
            AntennaPattern::Dipole => "dipole",
            AntennaPattern::HalfwaveDipole => "halfwave_dipole",
            AntennaPattern::Sector3gpp => "sector_3gpp",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Polarization {
    V,
    H,
    Vh,
    Cross,
}

/// Modulation tag; bits-per-symbol is derived from this, never stored
/// alongside it (single source of truth, see `manet_channel::modulation`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModulationScheme {
    Bpsk,
    Qpsk,
    Qam16,
    Qam64,
    Qam256,
    Qam1024,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FecType {
    None,
    Ldpc,
    Polar,
    Turbo,
}

/// Either a fixed (modulation, fec, code_rate) triple or a reference to a
/// named MCS table loaded elsewhere. Exactly one is set (§3 invariant).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Modulation {
    Fixed {
        modulation: ModulationScheme,
        fec: FecType,
        code_rate: f64,
    },
    Table {
        mcs_table_ref: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotMode {
    Fixed,
    RoundRobin,
    Random,
    Distributed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CsmaParams {
    #[serde(default = "default_carrier_sense_multiplier")]
    pub carrier_sense_multiplier: f64,
    #[serde(default = "default_traffic_load")]
    pub traffic_load: f64,
}

fn default_carrier_sense_multiplier() -> f64 {
    2.5
}

fn default_traffic_load() -> f64 {
    0.3
}

impl Default for CsmaParams {
    fn default() -> Self {
        CsmaParams {
            carrier_sense_multiplier: default_carrier_sense_multiplier(),
            traffic_load: default_traffic_load(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TdmaParams {
    pub frame_ms: f64,
    pub num_slots: u32,
    pub slot_mode: SlotMode,
    #[serde(default)]
    pub fixed_slot_map: Option<HashMap<String, Vec<u32>>>,
    #[serde(default)]
    pub slot_probability: Option<f64>,
}

/// Tagged MAC model descriptor (§4.6, §9 design notes).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MacModel {
    None,
    Csma(CsmaParams),
    Tdma(TdmaParams),
}

impl Default for MacModel {
    fn default() -> Self {
        MacModel::None
    }
}

/// Per-interface wireless radio parameters (§3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WirelessParams {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub tx_power_dbm: f64,
    pub center_freq_hz: f64,
    pub bandwidth_hz: f64,
    pub antenna: Antenna,
    pub polarization: Polarization,
    pub noise_figure_db: f64,
    pub rx_sensitivity_dbm: f64,
    pub modulation: Modulation,
    #[serde(default = "default_active")]
    pub is_active: bool,
    #[serde(default)]
    pub mac_model: MacModel,
}

fn default_active() -> bool {
    true
}

impl WirelessParams {
    pub fn position(&self) -> (f64, f64, f64) {
        (self.x, self.y, self.z)
    }

    fn validate(&self, node: &str, iface: &str) -> Result<(), ConfigError> {
        if !(0.0..=20.0).contains(&self.noise_figure_db) {
            return Err(ConfigError::NoiseFigureOutOfRange(self.noise_figure_db));
        }
        if !(-150.0..=0.0).contains(&self.rx_sensitivity_dbm) {
            return Err(ConfigError::SensitivityOutOfRange(self.rx_sensitivity_dbm));
        }
        if let MacModel::Tdma(t) = &self.mac_model {
            if t.slot_mode == SlotMode::Fixed && t.fixed_slot_map.is_none() {
                return Err(ConfigError::MissingFixedSlotMap);
            }
        }
        let _ = (node, iface);
        Ok(())
    }
}

/// Fixed (non-wireless) netem parameters for a wired interface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixedNetem {
    pub delay_ms: f64,
    pub jitter_ms: f64,
    pub loss_percent: f64,
    pub rate_mbps: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InterfaceKind {
    Wireless(WirelessParams),
    Fixed(FixedNetem),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Interface {
    pub name: String,
    #[serde(default)]
    pub ip_address: Option<String>,
    pub kind: InterfaceKind,
}

impl Interface {
    pub fn is_wireless(&self) -> bool {
        matches!(self.kind, InterfaceKind::Wireless(_))
    }

    pub fn wireless(&self) -> Option<&WirelessParams> {
        match &self.kind {
            InterfaceKind::Wireless(w) => Some(w),
            InterfaceKind::Fixed(_) => None,
        }
    }

    pub fn wireless_mut(&mut self) -> Option<&mut WirelessParams> {
        match &mut self.kind {
            InterfaceKind::Wireless(w) => Some(w),
            InterfaceKind::Fixed(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub name: NodeId,
    pub interfaces: Vec<Interface>,
}

impl Node {
    pub fn interface(&self, name: &str) -> Option<&Interface> {
        self.interfaces.iter().find(|i| i.name == name)
    }

    pub fn interface_mut(&mut self, name: &str) -> Option<&mut Interface> {
        self.interfaces.iter_mut().find(|i| i.name == name)
    }

    /// First wireless interface, used by the control surface's position
    /// endpoints (§4.10) which expose one position per node.
    pub fn first_wireless(&self) -> Option<&Interface> {
        self.interfaces.iter().find(|i| i.is_wireless())
    }

    pub fn first_wireless_mut(&mut self) -> Option<&mut Interface> {
        self.interfaces.iter_mut().find(|i| i.is_wireless())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SharedBridge {
    pub name: String,
    pub nodes: Vec<NodeId>,
    #[serde(default = "default_self_isolation_db")]
    pub self_isolation_db: f64,
}

fn default_self_isolation_db() -> f64 {
    30.0
}

/// Opaque identifier for the propagation environment (§3).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SceneRef(pub String);

/// A named bundle of nodes, immutable after load except for the
/// orchestrator's own update endpoints (§5).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Topology {
    pub name: String,
    pub scene: SceneRef,
    #[serde(default = "default_enable_sinr")]
    pub enable_sinr: bool,
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub shared_bridges: Vec<SharedBridge>,
}

fn default_enable_sinr() -> bool {
    true
}

impl Topology {
    pub fn node(&self, name: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.name.0 == name)
    }

    pub fn node_mut(&mut self, name: &str) -> Option<&mut Node> {
        self.nodes.iter_mut().find(|n| n.name.0 == name)
    }

    pub fn node_names(&self) -> Vec<String> {
        self.nodes.iter().map(|n| n.name.0.clone()).collect()
    }

    /// Validates §3 invariants. Called once at load; never in the hot path
    /// (§9 design notes).
    pub fn validate(&self) -> Result<(), ConfigError> {
        for node in &self.nodes {
            if node.interfaces.is_empty() {
                return Err(ConfigError::EmptyNode(node.name.0.clone()));
            }
            for iface in &node.interfaces {
                if let InterfaceKind::Wireless(w) = &iface.kind {
                    w.validate(&node.name.0, &iface.name)?;
                }
            }
        }
        Ok(())
    }

    /// Nodes that declare a MAC model while SINR is disabled (§4.9 step 1).
    /// Not a hard validation failure — the orchestrator logs these at WARN
    /// and the MAC model is simply never consulted (§4.7 step g uses
    /// `snr_db` instead of `sinr_db` whenever `enable_sinr` is false).
    pub fn mac_model_without_sinr_warnings(&self) -> Vec<ConfigError> {
        if self.enable_sinr {
            return Vec::new();
        }
        self.nodes
            .iter()
            .filter(|n| {
                n.interfaces.iter().any(|i| match &i.kind {
                    InterfaceKind::Wireless(w) => !matches!(w.mac_model, MacModel::None),
                    InterfaceKind::Fixed(_) => false,
                })
            })
            .map(|n| ConfigError::MacModelWithoutSinr(n.name.0.clone()))
            .collect()
    }
}
