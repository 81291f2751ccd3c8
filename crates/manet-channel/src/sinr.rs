//! SINR computation (C5): combines a link's noise floor with the aggregate
//! interference power from [`crate::interference`] and classifies the
//! resulting regime.
//!
//! Grounded on `sinr.py`'s sensitivity-floor check, regime thresholds, and
//! optional capture effect.

use crate::interference::NO_INTERFERENCE_DBM;
use crate::linkbudget::{db_to_linear, linear_to_db};
use serde::Serialize;

/// Which power source dominates at the receiver (§4.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Regime {
    NoiseLimited,
    InterferenceLimited,
    Mixed,
    /// `rx_power_dbm < rx_sensitivity_dbm`: the link is below the
    /// receiver's noise floor regardless of interference (§3, §4.5 step 1).
    Unusable,
}

impl Regime {
    pub fn as_str(&self) -> &'static str {
        match self {
            Regime::NoiseLimited => "noise-limited",
            Regime::InterferenceLimited => "interference-limited",
            Regime::Mixed => "mixed",
            Regime::Unusable => "unusable",
        }
    }
}

/// Inputs to one link's SINR computation.
#[derive(Debug, Clone, Copy)]
pub struct SinrInput {
    pub rx_power_dbm: f64,
    pub noise_dbm: f64,
    pub interference_dbm: f64,
    pub rx_sensitivity_dbm: f64,
    /// Capture effect: when the serving signal exceeds the strongest single
    /// interferer by at least `capture_threshold_db`, interference is
    /// dropped from the SINR denominator (§4.5, §9 open question — default
    /// off).
    pub capture_enabled: bool,
    pub capture_threshold_db: f64,
    pub strongest_interferer_dbm: f64,
}

/// Output of one link's SINR computation (§3).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SinrResult {
    pub snr_db: f64,
    pub sinr_db: f64,
    pub regime: Regime,
    /// `false` when `rx_power_dbm < rx_sensitivity_dbm` (§4.5 step 1): the
    /// link is below the receiver's noise floor and unusable regardless of
    /// interference.
    pub usable: bool,
}

const DEFAULT_CAPTURE_THRESHOLD_DB: f64 = 6.0;

impl SinrInput {
    pub fn without_capture(
        rx_power_dbm: f64,
        noise_dbm: f64,
        interference_dbm: f64,
        rx_sensitivity_dbm: f64,
    ) -> Self {
        SinrInput {
            rx_power_dbm,
            noise_dbm,
            interference_dbm,
            rx_sensitivity_dbm,
            capture_enabled: false,
            capture_threshold_db: DEFAULT_CAPTURE_THRESHOLD_DB,
            strongest_interferer_dbm: NO_INTERFERENCE_DBM,
        }
    }
}

/// Compute SNR, SINR, and the regime classification for one link (§4.5).
///
/// `sinr_db <= snr_db` always holds: interference can only ever reduce the
/// signal-to-interference-plus-noise ratio relative to the signal-to-noise
/// ratio.
pub fn compute_sinr(input: SinrInput) -> SinrResult {
    let snr_db = input.rx_power_dbm - input.noise_dbm;

    if input.rx_power_dbm < input.rx_sensitivity_dbm {
        return SinrResult {
            snr_db,
            sinr_db: f64::NEG_INFINITY,
            regime: Regime::Unusable,
            usable: false,
        };
    }

    let interference_is_present = input.interference_dbm > NO_INTERFERENCE_DBM + 1.0;

    let capture_fires = input.capture_enabled
        && interference_is_present
        && (input.rx_power_dbm - input.strongest_interferer_dbm) >= input.capture_threshold_db;

    if !interference_is_present || capture_fires {
        return SinrResult {
            snr_db,
            sinr_db: snr_db,
            regime: Regime::NoiseLimited,
            usable: true,
        };
    }

    let noise_linear = db_to_linear(input.noise_dbm);
    let interference_linear = db_to_linear(input.interference_dbm);
    let signal_linear = db_to_linear(input.rx_power_dbm);

    let sinr_db = linear_to_db(signal_linear) - linear_to_db(noise_linear + interference_linear);

    let i_over_n_db = input.interference_dbm - input.noise_dbm;
    let regime = if i_over_n_db < -10.0 {
        Regime::NoiseLimited
    } else if i_over_n_db > 10.0 {
        Regime::InterferenceLimited
    } else {
        Regime::Mixed
    };

    SinrResult {
        snr_db,
        sinr_db,
        regime,
        usable: true,
    }
}
