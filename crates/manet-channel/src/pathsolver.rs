//! PathSolver trait and FSPL fallback implementation (C3).
//!
//! Duck-typed "engine" abstraction (solver vs fallback) becomes a trait with
//! two implementations, selected at startup; caching is layered outside the
//! trait (§9 design notes), in [`crate::cache::PathCache`].

use crate::linkbudget::{distance_3d, fspl};
use manet_types::{ChannelError, Polarization};
use std::collections::HashMap;

/// Shape of propagation solution for one directed (tx, rx) pair (§3).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DominantKind {
    Los,
    Nlos,
    Diffraction,
    FsplEstimate,
    None,
}

/// Output of the path solver for one directed (tx, rx, antenna, scene)
/// tuple. When the solver used antenna patterns, the pattern gains are
/// embedded in `path_loss_db`; this is load-bearing for C8's link-budget
/// call (§3, §4.1).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PathResult {
    pub path_loss_db: f64,
    pub min_delay_ns: f64,
    pub max_delay_ns: f64,
    pub rms_delay_ns: f64,
    pub num_paths: u32,
    pub dominant_kind: DominantKind,
    pub gains_embedded: bool,
}

impl PathResult {
    /// Degraded record for a failed path computation (§7, §4.7 step 6).
    pub fn degraded() -> Self {
        PathResult {
            path_loss_db: 200.0,
            min_delay_ns: 0.0,
            max_delay_ns: 0.0,
            rms_delay_ns: 0.0,
            num_paths: 0,
            dominant_kind: DominantKind::None,
            gains_embedded: false,
        }
    }
}

/// Per-ray interaction detail, for debugging only; never consumed by the
/// pipeline (§4.3).
#[derive(Debug, Clone, Default)]
pub struct PathDetails {
    pub rays: Vec<String>,
}

/// Antenna description passed to the solver: either an explicit dBi gain
/// (isotropic from the solver's perspective) or a named radiation pattern.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SolverAntenna {
    Iso,
    Pattern(manet_types::AntennaPattern),
}

impl SolverAntenna {
    pub fn cache_tag(&self) -> &'static str {
        match self {
            SolverAntenna::Iso => "iso",
            SolverAntenna::Pattern(p) => p.as_str(),
        }
    }

    pub fn embeds_gain(&self) -> bool {
        matches!(self, SolverAntenna::Pattern(_))
    }
}

/// Engine selection requested by a caller (§4.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineSelection {
    Auto,
    Solver,
    Fallback,
}

/// The process-wide mode: whether an external solver may ever be used.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessMode {
    Normal,
    ForceFallback,
}

/// Interface contract for propagation solvers (§4.3, §6.1). All methods are
/// total: failure is returned, never thrown.
pub trait PathSolver {
    fn load_scene(&mut self, scene_ref: &str, freq_hz: f64, bw_hz: f64) -> Result<(), ChannelError>;
    fn clear_devices(&mut self);
    fn add_transmitter(
        &mut self,
        name: &str,
        pos: (f64, f64, f64),
        antenna: SolverAntenna,
        polarization: Polarization,
    );
    fn add_receiver(
        &mut self,
        name: &str,
        pos: (f64, f64, f64),
        antenna: SolverAntenna,
        polarization: Polarization,
    );
    /// Computes the path for the transmitter(s)/receiver(s) registered via
    /// `add_transmitter`/`add_receiver` since the last `clear_devices` call.
    /// Zero registered transmitters or receivers is a usage error (§4.3).
    fn compute_paths(&mut self) -> Result<PathResult, ChannelError>;
    fn get_path_details(&self) -> PathDetails;
}

/// Closed-form free-space fallback (§4.3). Always available; ignores scene
/// geometry and treats propagation as Friis plus an optional indoor-loss
/// constant.
pub struct FsplFallback {
    indoor: bool,
    indoor_loss_db: f64,
    frequency_hz: f64,
    transmitters: HashMap<String, (f64, f64, f64)>,
    receivers: HashMap<String, (f64, f64, f64)>,
}

impl FsplFallback {
    pub fn new(indoor: bool) -> Self {
        FsplFallback {
            indoor,
            indoor_loss_db: 10.0,
            frequency_hz: 5.18e9,
            transmitters: HashMap::new(),
            receivers: HashMap::new(),
        }
    }
}

impl Default for FsplFallback {
    fn default() -> Self {
        FsplFallback::new(false)
    }
}

const SPEED_OF_LIGHT_M_S: f64 = 299_792_458.0;
const FALLBACK_DELAY_SPREAD_NS: f64 = 5.0;

impl PathSolver for FsplFallback {
    fn load_scene(&mut self, _scene_ref: &str, freq_hz: f64, _bw_hz: f64) -> Result<(), ChannelError> {
        self.frequency_hz = freq_hz;
        Ok(())
    }

    fn clear_devices(&mut self) {
        self.transmitters.clear();
        self.receivers.clear();
    }

    fn add_transmitter(
        &mut self,
        name: &str,
        pos: (f64, f64, f64),
        _antenna: SolverAntenna,
        _polarization: Polarization,
    ) {
        self.transmitters.insert(name.to_string(), pos);
    }

    fn add_receiver(
        &mut self,
        name: &str,
        pos: (f64, f64, f64),
        _antenna: SolverAntenna,
        _polarization: Polarization,
    ) {
        self.receivers.insert(name.to_string(), pos);
    }

    fn compute_paths(&mut self) -> Result<PathResult, ChannelError> {
        if self.transmitters.is_empty() || self.receivers.is_empty() {
            return Err(ChannelError::InvalidRequest(
                "at least one transmitter and one receiver must be registered".into(),
            ));
        }
        let tx_pos = *self.transmitters.values().next().unwrap();
        let rx_pos = *self.receivers.values().next().unwrap();

        let distance = distance_3d(tx_pos, rx_pos).max(0.1);
        let indoor_loss = if self.indoor { self.indoor_loss_db } else { 0.0 };
        let path_loss_db = fspl(distance, self.frequency_hz) + indoor_loss;
        let delay_ns = distance / SPEED_OF_LIGHT_M_S * 1e9;
        Ok(PathResult {
            path_loss_db,
            min_delay_ns: delay_ns,
            max_delay_ns: delay_ns + FALLBACK_DELAY_SPREAD_NS,
            rms_delay_ns: delay_ns + FALLBACK_DELAY_SPREAD_NS / 2.0,
            num_paths: 1,
            dominant_kind: DominantKind::FsplEstimate,
            gains_embedded: false,
        })
    }

    fn get_path_details(&self) -> PathDetails {
        PathDetails::default()
    }
}

/// Resolves an `EngineSelection` request against the process mode and
/// whether an external solver is present, per §4.3's `auto | solver |
/// fallback` rule.
pub fn resolve_engine(
    requested: EngineSelection,
    process_mode: ProcessMode,
    solver_present: bool,
) -> Result<bool, ChannelError> {
    match (requested, process_mode) {
        (EngineSelection::Solver, ProcessMode::ForceFallback) => Err(
            ChannelError::SolverUnavailable(
                "explicit solver request rejected: process is in force_fallback mode".into(),
            ),
        ),
        (EngineSelection::Solver, ProcessMode::Normal) => {
            if solver_present {
                Ok(true)
            } else {
                Err(ChannelError::SolverUnavailable(
                    "no path solver registered".into(),
                ))
            }
        }
        (EngineSelection::Fallback, _) => Ok(false),
        (EngineSelection::Auto, ProcessMode::ForceFallback) => Ok(false),
        (EngineSelection::Auto, ProcessMode::Normal) => Ok(solver_present),
    }
}
