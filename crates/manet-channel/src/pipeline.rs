//! Per-link batch pipeline (C8): ties path solving, link budget, modulation,
//! interference, SINR, MCS selection, and MAC throughput scaling into one
//! `ChannelMetrics` record per directed link.
//!
//! Grounded on `links_sinr_computer.py`'s `_compute_batch_with_sinr`.

use crate::cache::{PathCache, PathCacheKey};
use crate::interference::{compute_interference, Interferer, NO_INTERFERENCE_DBM};
use crate::linkbudget::{rx_power_dbm, thermal_noise};
use crate::mac::{
    csma_throughput_multiplier, csma_tx_probabilities, estimate_communication_range,
    tdma_throughput_multiplier, tdma_tx_probabilities, MacInterferer,
};
use crate::mcs::McsTable;
use crate::modulation::{
    bler, effective_rate_mbps, netem_delay_ms, netem_jitter_ms, per_from_ber, per_to_loss_percent,
};
use crate::pathsolver::{PathResult, PathSolver, SolverAntenna};
use crate::sinr::{compute_sinr, Regime, SinrInput};
use manet_types::{Antenna, LinkId, MacModel, Modulation, Polarization};
use std::collections::{HashMap, HashSet};
use tracing::warn;

const DEFAULT_PACKET_BYTES: u32 = 1500;
const DEFAULT_BLOCK_LENGTH_BITS: u32 = 1024;
const MIN_SNR_FOR_CS_RANGE_DB: f64 = 20.0;

/// One interface as seen by the pipeline, already resolved from the
/// topology (§4.7 step 3 — the "interface-keyed indices").
#[derive(Debug, Clone)]
pub struct LinkEndpoint {
    pub node: String,
    pub iface: String,
    pub position: (f64, f64, f64),
    pub tx_power_dbm: f64,
    pub gain_dbi: f64,
    pub antenna: Antenna,
    pub polarization: Polarization,
    pub frequency_hz: f64,
    pub bandwidth_hz: f64,
    pub noise_figure_db: f64,
    pub rx_sensitivity_dbm: f64,
    pub modulation: Modulation,
    pub is_active: bool,
    pub mac_model: MacModel,
}

/// One directed link to compute metrics for (§4.7).
#[derive(Debug, Clone)]
pub struct LinkSpec {
    pub tx: LinkEndpoint,
    pub rx: LinkEndpoint,
    /// Every other active interface sharing the medium with this link,
    /// already filtered of tx/rx/same-node interfaces (§4.7 step c).
    pub interferers: Vec<LinkEndpoint>,
}

/// Result of computing one directed link (§3).
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelMetrics {
    pub tx_node: String,
    pub tx_iface: String,
    pub rx_node: String,
    pub rx_iface: String,
    pub path_loss_db: f64,
    pub snr_db: f64,
    pub sinr_db: f64,
    pub regime: Regime,
    pub mcs_index: u32,
    pub ber: f64,
    pub bler: f64,
    pub per: f64,
    pub delay_ms: f64,
    pub jitter_ms: f64,
    pub loss_percent: f64,
    pub rate_mbps: f64,
    pub degraded: bool,
}

impl ChannelMetrics {
    /// Degraded record for a failed link (§4.7 step 6, §7).
    pub fn degraded(tx: &LinkEndpoint, rx: &LinkEndpoint) -> Self {
        ChannelMetrics {
            tx_node: tx.node.clone(),
            tx_iface: tx.iface.clone(),
            rx_node: rx.node.clone(),
            rx_iface: rx.iface.clone(),
            path_loss_db: 200.0,
            snr_db: -200.0,
            sinr_db: -200.0,
            regime: Regime::NoiseLimited,
            mcs_index: 0,
            ber: 0.5,
            bler: 1.0,
            per: 1.0,
            delay_ms: 0.0,
            jitter_ms: 0.0,
            loss_percent: 100.0,
            rate_mbps: 0.1,
            degraded: true,
        }
    }
}

fn solver_antenna(antenna: &Antenna) -> SolverAntenna {
    match antenna {
        Antenna::Gain(_) => SolverAntenna::Iso,
        Antenna::Pattern(p) => SolverAntenna::Pattern(*p),
    }
}

/// Resolves the path between one (tx, rx) pair via the cache, falling back
/// to the solver on a miss (§4.3, §4.4 step 4, §4.11). Every propagation
/// lookup in the pipeline — the signal path and every interferer path alike
/// — goes through here so solver-specific adjustments (e.g. indoor loss)
/// apply uniformly.
fn solve_path(
    solver: &mut dyn PathSolver,
    cache: &PathCache,
    scene_id: &str,
    tx: &LinkEndpoint,
    rx: &LinkEndpoint,
) -> Result<PathResult, manet_types::ChannelError> {
    let key = PathCacheKey::new(
        scene_id,
        tx.position,
        rx.position,
        solver_antenna(&tx.antenna).cache_tag(),
        solver_antenna(&rx.antenna).cache_tag(),
        tx.polarization,
        rx.polarization,
    );
    if let Some(cached) = cache.get(&key) {
        return Ok(cached);
    }
    solver.clear_devices();
    solver.add_transmitter("tx", tx.position, solver_antenna(&tx.antenna), tx.polarization);
    solver.add_receiver("rx", rx.position, solver_antenna(&rx.antenna), rx.polarization);
    let result = solver.compute_paths()?;
    cache.insert(key, result);
    Ok(result)
}

fn tx_probability(
    mac_model: &MacModel,
    tx: &LinkEndpoint,
    interferer: &LinkEndpoint,
) -> f64 {
    match mac_model {
        MacModel::None => 1.0,
        MacModel::Csma(params) => {
            let comm_range = estimate_communication_range(
                tx.tx_power_dbm,
                tx.gain_dbi,
                tx.gain_dbi,
                tx.frequency_hz,
                tx.bandwidth_hz,
                tx.noise_figure_db,
                MIN_SNR_FOR_CS_RANGE_DB,
            );
            let distance = crate::linkbudget::distance_3d(tx.position, interferer.position);
            let probs = csma_tx_probabilities(
                params,
                comm_range,
                &[MacInterferer {
                    node: &interferer.node,
                    distance_to_tx_m: distance,
                }],
            );
            probs.get(&interferer.node).copied().unwrap_or(1.0)
        }
        MacModel::Tdma(params) => {
            let probs = tdma_tx_probabilities(params, &tx.node, &[interferer.node.as_str()]);
            probs.get(&interferer.node).copied().unwrap_or(1.0)
        }
    }
}

fn throughput_multiplier(mac_model: &MacModel, node: &str, num_nodes: usize) -> f64 {
    match mac_model {
        MacModel::None => 1.0,
        MacModel::Csma(_) => csma_throughput_multiplier(),
        MacModel::Tdma(params) => tdma_throughput_multiplier(params, node, num_nodes),
    }
}

/// Compute `ChannelMetrics` for one link, given an already-solved path
/// result (§4.7 steps b, d-j). Kept separate from path solving so callers
/// can batch solver invocations under a single cache/solver borrow.
fn compute_link_metrics(
    link: &LinkSpec,
    path: PathResult,
    solver: &mut dyn PathSolver,
    cache: &PathCache,
    scene_id: &str,
    mcs_tables: &mut HashMap<String, McsTable>,
    link_id: &LinkId,
) -> ChannelMetrics {
    let tx = &link.tx;
    let rx = &link.rx;

    let gains_embedded = path.gains_embedded;
    let rx_power = rx_power_dbm(
        tx.tx_power_dbm,
        tx.gain_dbi,
        rx.gain_dbi,
        path.path_loss_db,
        gains_embedded,
    );
    let noise_dbm = thermal_noise(rx.bandwidth_hz, 290.0, rx.noise_figure_db);
    let snr_db = rx_power - noise_dbm;

    let num_nodes = link
        .interferers
        .iter()
        .map(|i| i.node.as_str())
        .collect::<HashSet<_>>()
        .len()
        + 2;

    let mut interferers = Vec::with_capacity(link.interferers.len());
    for interferer in &link.interferers {
        if !interferer.is_active {
            continue;
        }
        let p_i = tx_probability(&tx.mac_model, tx, interferer);
        let interferer_path = solve_path(solver, cache, scene_id, interferer, rx).unwrap_or_else(|err| {
            warn!(
                interferer = %interferer.node,
                victim = %rx.node,
                error = %err,
                "interferer path computation failed, using degraded path loss"
            );
            PathResult::degraded()
        });
        interferers.push(Interferer {
            source: interferer.node.as_str(),
            tx_power_dbm: interferer.tx_power_dbm,
            tx_gain_dbi: interferer.gain_dbi,
            rx_gain_dbi: rx.gain_dbi,
            frequency_hz: interferer.frequency_hz,
            bandwidth_hz: interferer.bandwidth_hz,
            path_loss_db: interferer_path.path_loss_db,
            gains_embedded: interferer_path.gains_embedded,
            tx_probability: p_i,
        });
    }

    let outcome = compute_interference(rx.frequency_hz, rx.bandwidth_hz, &interferers);
    let strongest = interferers
        .iter()
        .zip(outcome.terms.iter())
        .map(|(_, t)| t.power_dbm)
        .fold(NO_INTERFERENCE_DBM, f64::max);

    let sinr_input = SinrInput {
        rx_power_dbm: rx_power,
        noise_dbm,
        interference_dbm: outcome.total_interference_dbm,
        rx_sensitivity_dbm: rx.rx_sensitivity_dbm,
        capture_enabled: false,
        capture_threshold_db: 6.0,
        strongest_interferer_dbm: strongest,
    };
    let sinr_result = compute_sinr(sinr_input);

    let effective_snr_db = sinr_result.sinr_db;

    let (modulation, fec, code_rate, mcs_index) = match &rx.modulation {
        Modulation::Fixed {
            modulation,
            fec,
            code_rate,
        } => (*modulation, *fec, *code_rate, 0u32),
        Modulation::Table { mcs_table_ref } => {
            let table = mcs_tables
                .get_mut(mcs_table_ref)
                .expect("mcs table reference resolved at load time");
            let entry = table.select_mcs(effective_snr_db, Some(link_id));
            (entry.modulation, entry.fec_type, entry.code_rate, entry.mcs_index)
        }
    };

    let ber = crate::modulation::ber_awgn(modulation, effective_snr_db);
    let bler_value = bler(modulation, fec, code_rate, effective_snr_db, DEFAULT_BLOCK_LENGTH_BITS);
    let per = per_from_ber(ber, DEFAULT_PACKET_BYTES * 8);

    let delay_ms = netem_delay_ms(path.min_delay_ns);
    let jitter_ms = netem_jitter_ms(path.max_delay_ns - path.min_delay_ns);
    let loss_percent = per_to_loss_percent(per);
    let bits_per_symbol = crate::modulation::bits_per_symbol(modulation);
    let mut rate_mbps = effective_rate_mbps(rx.bandwidth_hz / 1e6, bits_per_symbol, code_rate, per);

    if let MacModel::Tdma(_) = &tx.mac_model {
        rate_mbps *= throughput_multiplier(&tx.mac_model, &tx.node, num_nodes);
        rate_mbps = rate_mbps.max(0.1);
    }

    ChannelMetrics {
        tx_node: tx.node.clone(),
        tx_iface: tx.iface.clone(),
        rx_node: rx.node.clone(),
        rx_iface: rx.iface.clone(),
        path_loss_db: path.path_loss_db,
        snr_db,
        sinr_db: sinr_result.sinr_db,
        regime: sinr_result.regime,
        mcs_index,
        ber,
        bler: bler_value,
        per,
        delay_ms,
        jitter_ms,
        loss_percent,
        rate_mbps,
        degraded: false,
    }
}

/// Compute channel metrics for a batch of links (§4.7). Resets MCS
/// hysteresis on every involved table, reuses `solver`/`cache` across
/// links, and isolates per-link failures into degraded records rather than
/// aborting the batch.
pub fn compute_batch(
    links: &[LinkSpec],
    solver: &mut dyn PathSolver,
    cache: &PathCache,
    scene_id: &str,
    mcs_tables: &mut HashMap<String, McsTable>,
    enable_sinr: bool,
) -> Vec<ChannelMetrics> {
    for table in mcs_tables.values_mut() {
        table.reset_all_link_states();
    }

    let mut results = Vec::with_capacity(links.len());

    for link in links {
        let link_id = LinkId::new(
            link.tx.node.clone(),
            link.tx.iface.clone(),
            link.rx.node.clone(),
            link.rx.iface.clone(),
        );

        let path_result = solve_path(solver, cache, scene_id, &link.tx, &link.rx);

        let metrics = match path_result {
            Ok(path) => {
                let mut metrics = compute_link_metrics(
                    link,
                    path,
                    solver,
                    cache,
                    scene_id,
                    mcs_tables,
                    &link_id,
                );
                if !enable_sinr {
                    // §4.7 step g: feed snr_db into everything downstream of
                    // MCS selection when SINR is disabled for this topology.
                    metrics.sinr_db = metrics.snr_db;
                }
                metrics
            }
            Err(err) => {
                warn!(link = %link_id, error = %err, "path computation failed, using degraded record");
                ChannelMetrics::degraded(&link.tx, &link.rx)
            }
        };

        results.push(metrics);
    }

    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pathsolver::FsplFallback;
    use manet_types::{AntennaPattern, FecType, ModulationScheme};

    fn endpoint(node: &str, iface: &str, pos: (f64, f64, f64)) -> LinkEndpoint {
        LinkEndpoint {
            node: node.to_string(),
            iface: iface.to_string(),
            position: pos,
            tx_power_dbm: 20.0,
            gain_dbi: 2.15,
            antenna: Antenna::Gain(2.15),
            polarization: Polarization::V,
            frequency_hz: 5.18e9,
            bandwidth_hz: 80e6,
            noise_figure_db: 7.0,
            rx_sensitivity_dbm: -90.0,
            modulation: Modulation::Fixed {
                modulation: ModulationScheme::Qam64,
                fec: FecType::Ldpc,
                code_rate: 0.5,
            },
            is_active: true,
            mac_model: MacModel::None,
        }
    }

    #[test]
    fn vacuum_20m_scenario_end_to_end() {
        let tx = endpoint("a", "wlan0", (0.0, 0.0, 1.0));
        let rx = endpoint("b", "wlan0", (20.0, 0.0, 1.0));
        let link = LinkSpec {
            tx,
            rx,
            interferers: vec![],
        };

        let mut solver = FsplFallback::default();
        let cache = PathCache::new();
        let mut tables = HashMap::new();

        let results = compute_batch(&[link], &mut solver, &cache, "vacuum", &mut tables, true);
        assert_eq!(results.len(), 1);
        let m = &results[0];
        assert!(!m.degraded);
        assert!((m.path_loss_db - 72.75).abs() < 0.5, "{}", m.path_loss_db);
        assert!(m.rate_mbps > 100.0, "{}", m.rate_mbps);
        assert!(m.loss_percent < 1.0, "{}", m.loss_percent);
        assert!((m.sinr_db - m.snr_db).abs() < 1e-6);
    }

    #[test]
    fn path_cache_hit_skips_recompute_but_keeps_result() {
        let tx = endpoint("a", "wlan0", (0.0, 0.0, 1.0));
        let rx = endpoint("b", "wlan0", (20.0, 0.0, 1.0));
        let link = LinkSpec {
            tx: tx.clone(),
            rx: rx.clone(),
            interferers: vec![],
        };

        let mut solver = FsplFallback::default();
        let cache = PathCache::new();
        let mut tables = HashMap::new();

        let first = compute_batch(&[link.clone()], &mut solver, &cache, "vacuum", &mut tables, true);
        let second = compute_batch(&[link], &mut solver, &cache, "vacuum", &mut tables, true);
        assert_eq!(cache.len(), 1);
        assert!((first[0].path_loss_db - second[0].path_loss_db).abs() < 1e-9);
    }

    #[test]
    fn interference_from_active_interferer_degrades_sinr_below_snr() {
        let tx = endpoint("a", "wlan0", (0.0, 0.0, 1.0));
        let rx = endpoint("b", "wlan0", (20.0, 0.0, 1.0));
        let interferer = endpoint("c", "wlan0", (5.0, 5.0, 1.0));
        let link = LinkSpec {
            tx,
            rx,
            interferers: vec![interferer],
        };

        let mut solver = FsplFallback::default();
        let cache = PathCache::new();
        let mut tables = HashMap::new();

        let results = compute_batch(&[link], &mut solver, &cache, "vacuum", &mut tables, true);
        let m = &results[0];
        assert!(m.sinr_db < m.snr_db, "sinr={} snr={}", m.sinr_db, m.snr_db);
    }

    #[test]
    fn inactive_interferer_is_excluded() {
        let tx = endpoint("a", "wlan0", (0.0, 0.0, 1.0));
        let rx = endpoint("b", "wlan0", (20.0, 0.0, 1.0));
        let mut interferer = endpoint("c", "wlan0", (5.0, 5.0, 1.0));
        interferer.is_active = false;
        let link = LinkSpec {
            tx,
            rx,
            interferers: vec![interferer],
        };

        let mut solver = FsplFallback::default();
        let cache = PathCache::new();
        let mut tables = HashMap::new();

        let results = compute_batch(&[link], &mut solver, &cache, "vacuum", &mut tables, true);
        let m = &results[0];
        assert!((m.sinr_db - m.snr_db).abs() < 1e-6);
    }

    #[test]
    fn pattern_antenna_uses_gains_embedded_path_loss() {
        let mut tx = endpoint("a", "wlan0", (0.0, 0.0, 1.0));
        tx.antenna = Antenna::Pattern(AntennaPattern::Dipole);
        let rx = endpoint("b", "wlan0", (20.0, 0.0, 1.0));
        let link = LinkSpec {
            tx,
            rx,
            interferers: vec![],
        };

        let mut solver = FsplFallback::default();
        let cache = PathCache::new();
        let mut tables = HashMap::new();

        let results = compute_batch(&[link], &mut solver, &cache, "vacuum", &mut tables, true);
        assert!(!results[0].degraded);
    }

    #[test]
    fn sinr_disabled_uses_snr_for_downstream_selection() {
        let tx = endpoint("a", "wlan0", (0.0, 0.0, 1.0));
        let rx = endpoint("b", "wlan0", (20.0, 0.0, 1.0));
        let interferer = endpoint("c", "wlan0", (5.0, 5.0, 1.0));
        let link = LinkSpec {
            tx,
            rx,
            interferers: vec![interferer],
        };

        let mut solver = FsplFallback::default();
        let cache = PathCache::new();
        let mut tables = HashMap::new();

        let results = compute_batch(&[link], &mut solver, &cache, "vacuum", &mut tables, false);
        let m = &results[0];
        assert!((m.sinr_db - m.snr_db).abs() < 1e-6);
    }
}
