//! Link-budget math (C1). Pure functions, no state.

/// Free-space path loss in dB. Distance below 0.1 m is clipped to avoid a
/// log-of-zero; the clipped value is not physical but must never error.
pub fn fspl(distance_m: f64, freq_hz: f64) -> f64 {
    let d = distance_m.max(0.1);
    20.0 * d.log10() + 20.0 * freq_hz.log10() - 147.55
}

/// Thermal noise power in dBm over `bw_hz`, referenced to 290 K unless
/// `temperature_k` differs (the temperature term is exactly zero at 290 K).
pub fn thermal_noise(bw_hz: f64, temperature_k: f64, nf_db: f64) -> f64 {
    -174.0 + 10.0 * bw_hz.log10() + nf_db + 10.0 * (temperature_k / 290.0).log10()
}

/// `thermal_noise` at the default 290 K reference and 7 dB noise figure.
pub fn thermal_noise_default(bw_hz: f64) -> f64 {
    thermal_noise(bw_hz, 290.0, 7.0)
}

/// Received power in dBm. When the path solver embeds antenna gains in
/// `path_loss_db` (pattern-aware mode), `tx_gain`/`rx_gain` must not be
/// applied again; this distinction is load-bearing for C8 (§4.1, §4.7.b).
pub fn rx_power_dbm(
    tx_dbm: f64,
    tx_gain_dbi: f64,
    rx_gain_dbi: f64,
    path_loss_db: f64,
    gains_embedded: bool,
) -> f64 {
    if gains_embedded {
        tx_dbm - path_loss_db
    } else {
        tx_dbm + tx_gain_dbi + rx_gain_dbi - path_loss_db
    }
}

pub fn db_to_linear(db: f64) -> f64 {
    10f64.powf(db / 10.0)
}

pub fn linear_to_db(linear: f64) -> f64 {
    10.0 * linear.max(f64::MIN_POSITIVE).log10()
}

pub fn distance_3d(a: (f64, f64, f64), b: (f64, f64, f64)) -> f64 {
    let dx = a.0 - b.0;
    let dy = a.1 - b.1;
    let dz = a.2 - b.2;
    (dx * dx + dy * dy + dz * dz).sqrt()
}
