//! Interference aggregator (C4): per-victim sum of interferer powers under
//! the IEEE 802.11ax adjacent-channel spectral mask, with orthogonal-channel
//! filtering.
//!
//! Grounded on the pattern-aware variant named in §9's open question
//! (`interference_calculator.py`, not the gain-only `interference_engine.py`
//! duplicate).

use crate::linkbudget::{db_to_linear, linear_to_db};

/// Sentinel used in place of `-inf` so `InterferenceOutcome` stays
/// JSON-serialisable (§4.4 step 7).
pub const NO_INTERFERENCE_DBM: f64 = -200.0;

/// One interferer's contribution, already filtered and ACLR-derated.
#[derive(Debug, Clone, PartialEq)]
pub struct InterferenceTerm {
    pub source: String,
    pub power_dbm: f64,
    pub frequency_hz: f64,
    pub frequency_separation_hz: f64,
    pub aclr_db: f64,
}

/// Result of aggregating interference at one receiver.
#[derive(Debug, Clone, PartialEq)]
pub struct InterferenceOutcome {
    pub terms: Vec<InterferenceTerm>,
    pub total_interference_dbm: f64,
}

impl InterferenceOutcome {
    pub fn num_interferers(&self) -> usize {
        self.terms.len()
    }
}

/// One candidate interferer as seen by the aggregator.
pub struct Interferer<'a> {
    pub source: &'a str,
    pub tx_power_dbm: f64,
    pub tx_gain_dbi: f64,
    pub rx_gain_dbi: f64,
    pub frequency_hz: f64,
    pub bandwidth_hz: f64,
    pub path_loss_db: f64,
    pub gains_embedded: bool,
    /// Per-interferer transmission probability from the MAC model (§4.4
    /// step 6); `1.0` when there is no MAC model.
    pub tx_probability: f64,
}

/// ACLR (dB) per the IEEE 802.11ax spectral mask (§4.4 step 3), using the
/// interferer's own bandwidth for the mask thresholds (a transmitter
/// property) and `rx_bandwidth_hz` only as the caller-provided context (the
/// mask itself is TX-bandwidth-driven, matching the original).
pub fn aclr_db(freq_separation_hz: f64, tx_bandwidth_hz: f64, _rx_bandwidth_hz: f64) -> f64 {
    let freq_sep_mhz = freq_separation_hz.abs() / 1e6;
    let tx_bw_mhz = tx_bandwidth_hz / 1e6;
    let half_tx_bw = tx_bw_mhz / 2.0;

    if freq_sep_mhz < half_tx_bw {
        0.0
    } else if freq_sep_mhz < half_tx_bw + 40.0 {
        let excess = freq_sep_mhz - half_tx_bw;
        20.0 + (excess / 40.0) * 8.0
    } else if freq_sep_mhz < half_tx_bw + 80.0 {
        40.0
    } else {
        45.0
    }
}

/// True when `freq_separation_hz` exceeds the orthogonal threshold for
/// `tx_bandwidth_hz` and the interferer should be dropped before ACLR is
/// even computed (§4.4 step 2).
pub fn is_orthogonal(freq_separation_hz: f64, tx_bandwidth_hz: f64) -> bool {
    let half_tx_bw_hz = tx_bandwidth_hz / 2.0;
    let orthogonal_threshold_hz = half_tx_bw_hz + 80e6;
    freq_separation_hz.abs() > orthogonal_threshold_hz
}

/// Aggregate interference at one victim receiver (§4.4). `interferers`
/// should already have inactive and same-node entries filtered out by the
/// caller (§4.4 activity filter, §4.7 step c).
pub fn compute_interference(
    rx_freq_hz: f64,
    rx_bandwidth_hz: f64,
    interferers: &[Interferer<'_>],
) -> InterferenceOutcome {
    let mut terms = Vec::new();
    let mut total_linear = 0.0;

    for interferer in interferers {
        let freq_separation = (interferer.frequency_hz - rx_freq_hz).abs();
        if is_orthogonal(freq_separation, interferer.bandwidth_hz) {
            continue;
        }

        let aclr = aclr_db(freq_separation, interferer.bandwidth_hz, rx_bandwidth_hz);

        let interference_dbm = if interferer.gains_embedded {
            interferer.tx_power_dbm - interferer.path_loss_db - aclr
        } else {
            interferer.tx_power_dbm + interferer.tx_gain_dbi + interferer.rx_gain_dbi
                - interferer.path_loss_db
                - aclr
        };

        let weighted_linear = interferer.tx_probability * db_to_linear(interference_dbm);
        total_linear += weighted_linear;

        terms.push(InterferenceTerm {
            source: interferer.source.to_string(),
            power_dbm: interference_dbm,
            frequency_hz: interferer.frequency_hz,
            frequency_separation_hz: freq_separation,
            aclr_db: aclr,
        });
    }

    let total_interference_dbm = if terms.is_empty() {
        NO_INTERFERENCE_DBM
    } else {
        linear_to_db(total_linear)
    };

    InterferenceOutcome {
        terms,
        total_interference_dbm,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-6;

    #[test]
    fn aclr_co_channel_is_zero() {
        assert!((aclr_db(20e6, 80e6, 80e6) - 0.0).abs() < EPS);
    }

    #[test]
    fn aclr_transition_band() {
        assert!((aclr_db(60e6, 80e6, 80e6) - 24.0).abs() < EPS);
    }

    #[test]
    fn aclr_first_adjacent() {
        assert!((aclr_db(100e6, 80e6, 80e6) - 40.0).abs() < EPS);
    }

    #[test]
    fn aclr_orthogonal_band_value() {
        assert!((aclr_db(200e6, 80e6, 80e6) - 45.0).abs() < EPS);
    }

    #[test]
    fn orthogonal_interferer_is_filtered_out() {
        // §8 boundary: Δf=200MHz, bw=80MHz -> filtered.
        assert!(is_orthogonal(200e6, 80e6));
        assert!(!is_orthogonal(100e6, 80e6));
    }

    #[test]
    fn aclr_mask_is_monotone_non_decreasing() {
        let mut prev = 0.0;
        let mut f = 0e6;
        while f <= 200e6 {
            let v = aclr_db(f, 80e6, 80e6);
            assert!(v >= prev - 1e-9, "dipped at {f}: {v} < {prev}");
            prev = v;
            f += 1e6;
        }
    }

    #[test]
    fn aclr_continuous_across_transition_boundary() {
        let half_bw = 40.0; // MHz, for 80 MHz tx bandwidth
        let at_boundary = aclr_db(half_bw * 1e6, 80e6, 80e6);
        let just_inside = aclr_db((half_bw - 0.001) * 1e6, 80e6, 80e6);
        assert!((at_boundary - just_inside).abs() < 0.01);
    }

    fn interferer<'a>(
        source: &'a str,
        freq_hz: f64,
        bw_hz: f64,
        path_loss_db: f64,
        tx_probability: f64,
    ) -> Interferer<'a> {
        Interferer {
            source,
            tx_power_dbm: 20.0,
            tx_gain_dbi: 2.15,
            rx_gain_dbi: 2.15,
            frequency_hz: freq_hz,
            bandwidth_hz: bw_hz,
            path_loss_db,
            gains_embedded: false,
            tx_probability,
        }
    }

    #[test]
    fn no_surviving_terms_yields_sentinel() {
        let interferers = vec![interferer("far", 5.18e9 + 300e6, 80e6, 80.0, 1.0)];
        let outcome = compute_interference(5.18e9, 80e6, &interferers);
        assert_eq!(outcome.num_interferers(), 0);
        assert!((outcome.total_interference_dbm - NO_INTERFERENCE_DBM).abs() < EPS);
    }

    #[test]
    fn more_interferers_never_reduce_total_power() {
        let a = vec![interferer("i1", 5.18e9, 80e6, 90.0, 1.0)];
        let b = vec![
            interferer("i1", 5.18e9, 80e6, 90.0, 1.0),
            interferer("i2", 5.18e9, 80e6, 95.0, 1.0),
        ];
        let out_a = compute_interference(5.18e9, 80e6, &a);
        let out_b = compute_interference(5.18e9, 80e6, &b);
        assert!(out_b.total_interference_dbm >= out_a.total_interference_dbm - 1e-9);
    }

    #[test]
    fn gains_embedded_skips_explicit_gain_terms() {
        let mut i = interferer("i1", 5.18e9, 80e6, 72.75, 1.0);
        i.gains_embedded = true;
        let out_embedded = compute_interference(5.18e9, 80e6, &[i]);

        let i2 = interferer("i1", 5.18e9, 80e6, 72.75, 1.0);
        let out_explicit = compute_interference(5.18e9, 80e6, &[i2]);

        // embedded omits the +4.3 dB of gains the explicit path adds.
        assert!(out_explicit.total_interference_dbm > out_embedded.total_interference_dbm);
    }

    #[test]
    fn tx_probability_scales_linear_contribution() {
        let full = compute_interference(5.18e9, 80e6, &[interferer("i1", 5.18e9, 80e6, 80.0, 1.0)]);
        let half = compute_interference(5.18e9, 80e6, &[interferer("i1", 5.18e9, 80e6, 80.0, 0.5)]);
        assert!(half.total_interference_dbm < full.total_interference_dbm);
    }

    #[test]
    fn order_of_terms_does_not_affect_linear_sum() {
        let a = interferer("i1", 5.18e9, 80e6, 90.0, 1.0);
        let b = interferer("i2", 5.18e9 + 50e6, 80e6, 95.0, 0.7);
        let forward = compute_interference(5.18e9, 80e6, &[a, b]);
        let a2 = interferer("i1", 5.18e9, 80e6, 90.0, 1.0);
        let b2 = interferer("i2", 5.18e9 + 50e6, 80e6, 95.0, 0.7);
        let backward = compute_interference(5.18e9, 80e6, &[b2, a2]);
        assert!((forward.total_interference_dbm - backward.total_interference_dbm).abs() < 0.1);
    }
}
