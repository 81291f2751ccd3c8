//! MAC statistical models (C6): CSMA carrier-sense range and TDMA slot
//! ownership, reduced to the two operations every model exposes —
//! per-interferer transmission probability and a throughput multiplier.
//!
//! Grounded on `links_sinr_computer.py::estimate_communication_range` for
//! CSMA and `tdma_model.py::TDMAModel` for TDMA.

use manet_types::{CsmaParams, SlotMode, TdmaParams};
use std::collections::HashMap;

/// One candidate interferer as seen by a MAC model's transmission-
/// probability computation.
pub struct MacInterferer<'a> {
    pub node: &'a str,
    pub distance_to_tx_m: f64,
}

/// Solve the FSPL link budget for the distance at which SNR drops to
/// `min_snr_db`, then scale by `carrier_sense_multiplier` (§4.6 CSMA).
pub fn estimate_communication_range(
    tx_power_dbm: f64,
    tx_gain_dbi: f64,
    rx_gain_dbi: f64,
    frequency_hz: f64,
    bandwidth_hz: f64,
    noise_figure_db: f64,
    min_snr_db: f64,
) -> f64 {
    let noise_floor_dbm = -174.0 + 10.0 * bandwidth_hz.log10() + noise_figure_db;
    let min_rx_power_dbm = noise_floor_dbm + min_snr_db;
    let max_path_loss_db = tx_power_dbm + tx_gain_dbi + rx_gain_dbi - min_rx_power_dbm;

    // Invert FSPL: PL = 20*log10(d) + 20*log10(f) - 147.55.
    let log_distance = (max_path_loss_db - 20.0 * frequency_hz.log10() + 147.55) / 20.0;
    10f64.powf(log_distance)
}

/// Transmission probabilities for every named interferer (§4.6).
pub fn csma_tx_probabilities(
    params: &CsmaParams,
    communication_range_m: f64,
    interferers: &[MacInterferer<'_>],
) -> HashMap<String, f64> {
    let carrier_sense_range_m = communication_range_m * params.carrier_sense_multiplier;
    interferers
        .iter()
        .map(|i| {
            let p = if i.distance_to_tx_m <= carrier_sense_range_m {
                0.0
            } else {
                params.traffic_load
            };
            (i.node.to_string(), p)
        })
        .collect()
}

/// CSMA's shared medium is not time-slotted; throughput multiplier is
/// always 1 (§4.6).
pub fn csma_throughput_multiplier() -> f64 {
    1.0
}

/// Transmission probabilities for every named interferer under a TDMA
/// slot-assignment mode (§4.6).
pub fn tdma_tx_probabilities(
    params: &TdmaParams,
    tx_node: &str,
    interferer_nodes: &[&str],
) -> HashMap<String, f64> {
    interferer_nodes
        .iter()
        .map(|&interferer| {
            let p = match params.slot_mode {
                SlotMode::Fixed => tdma_fixed_collision_probability(params, tx_node, interferer),
                SlotMode::RoundRobin => 0.0,
                SlotMode::Random => params.slot_probability.unwrap_or(0.0),
                SlotMode::Distributed => params.slot_probability.unwrap_or(0.0) * 0.5,
            };
            (interferer.to_string(), p)
        })
        .collect()
}

fn tdma_fixed_collision_probability(params: &TdmaParams, tx_node: &str, interferer: &str) -> f64 {
    let map = params
        .fixed_slot_map
        .as_ref()
        .expect("fixed slot mode requires fixed_slot_map (validated at load time)");
    let empty = Vec::new();
    let tx_slots: std::collections::HashSet<u32> =
        map.get(tx_node).unwrap_or(&empty).iter().copied().collect();
    let interferer_slots: std::collections::HashSet<u32> = map
        .get(interferer)
        .unwrap_or(&empty)
        .iter()
        .copied()
        .collect();

    let collisions = tx_slots.intersection(&interferer_slots).count();
    if collisions == 0 {
        0.0
    } else {
        collisions as f64 / params.num_slots as f64
    }
}

/// Throughput multiplier for one node under a TDMA slot-assignment mode
/// (§4.6). `num_nodes` is required (and ignored) for modes other than
/// `round_robin`.
pub fn tdma_throughput_multiplier(params: &TdmaParams, node: &str, num_nodes: usize) -> f64 {
    match params.slot_mode {
        SlotMode::Fixed => {
            let map = params
                .fixed_slot_map
                .as_ref()
                .expect("fixed slot mode requires fixed_slot_map (validated at load time)");
            let owned = map.get(node).map(|v| v.len()).unwrap_or(0);
            owned as f64 / params.num_slots as f64
        }
        SlotMode::RoundRobin => {
            if num_nodes == 0 {
                0.0
            } else {
                1.0 / num_nodes as f64
            }
        }
        SlotMode::Random | SlotMode::Distributed => params.slot_probability.unwrap_or(0.0),
    }
}
