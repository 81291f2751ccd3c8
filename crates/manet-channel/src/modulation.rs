//! Modulation and coding formulas (C2): bits-per-symbol, theoretical BER in
//! AWGN, BLER with a FEC coding-gain offset, PER, effective PHY rate, and
//! the netem delay/jitter conversion from path timing.

use manet_types::{FecType, ModulationScheme};

/// Bits carried per symbol for each supported modulation.
pub fn bits_per_symbol(modulation: ModulationScheme) -> u32 {
    match modulation {
        ModulationScheme::Bpsk => 1,
        ModulationScheme::Qpsk => 2,
        ModulationScheme::Qam16 => 4,
        ModulationScheme::Qam64 => 6,
        ModulationScheme::Qam256 => 8,
        ModulationScheme::Qam1024 => 10,
    }
}

/// `spectral_efficiency = bits_per_symbol * code_rate` (§3 MCS table).
pub fn spectral_efficiency(modulation: ModulationScheme, code_rate: f64) -> f64 {
    bits_per_symbol(modulation) as f64 * code_rate
}

fn q_function(x: f64) -> f64 {
    0.5 * erfc(x / std::f64::consts::SQRT_2)
}

/// Complementary error function, Numerical-Recipes rational approximation
/// (fractional error < 1.2e-7 over the whole real line). `erfc` itself isn't
/// in `std`, and no example in this pack carries a special-functions crate
/// for it, so this is hand-rolled rather than adding a dependency for one
/// function.
fn erfc(x: f64) -> f64 {
    let z = x.abs();
    let t = 1.0 / (1.0 + 0.5 * z);
    let poly = -z * z - 1.26551223
        + t * (1.00002368
            + t * (0.37409196
                + t * (0.09678418
                    + t * (-0.18628806
                        + t * (0.27886807
                            + t * (-1.13520398 + t * (1.48851587 + t * (-0.82215223 + t * 0.17087277))))))));
    let ans = t * poly.exp();
    if x >= 0.0 {
        ans
    } else {
        2.0 - ans
    }
}

/// Theoretical uncoded BER at `snr_db` for `modulation`, clamped to
/// `[1e-12, 0.5]` (§4.2).
pub fn ber_awgn(modulation: ModulationScheme, snr_db: f64) -> f64 {
    let snr_linear = 10f64.powf(snr_db / 10.0);
    let bps = bits_per_symbol(modulation) as f64;

    let raw = match modulation {
        ModulationScheme::Bpsk | ModulationScheme::Qpsk => {
            let eb_n0 = snr_linear / bps;
            0.5 * erfc(eb_n0.sqrt())
        }
        _ => {
            let m = 2f64.powf(bps);
            let arg = (3.0 * snr_linear / (m - 1.0)).sqrt();
            let ps = 4.0 * (1.0 - 1.0 / m.sqrt()) * q_function(arg);
            ps / bps
        }
    };
    raw.clamp(1e-12, 0.5)
}

fn coding_gain_db(fec: FecType) -> f64 {
    match fec {
        FecType::None => 0.0,
        FecType::Ldpc => 8.0,
        FecType::Polar => 7.5,
        FecType::Turbo => 7.0,
    }
}

/// BLER with a FEC coding-gain offset (§4.2). `block_length_bits` is the
/// total coded block size (1024 in the original reference implementation);
/// `code_rate` determines how many of those bits are information bits.
pub fn bler(
    modulation: ModulationScheme,
    fec: FecType,
    code_rate: f64,
    snr_db: f64,
    block_length_bits: u32,
) -> f64 {
    if matches!(fec, FecType::None) {
        let ber = ber_awgn(modulation, snr_db);
        return block_error_rate(ber, block_length_bits);
    }

    let rate_factor = 1.0 - 0.5 * (code_rate - 0.5);
    let effective_gain = coding_gain_db(fec) * rate_factor;
    let effective_snr = snr_db + effective_gain;
    let ber = ber_awgn(modulation, effective_snr);

    let info_bits = (block_length_bits as f64 * code_rate) as u32;
    block_error_rate(ber, info_bits)
}

fn block_error_rate(ber: f64, bits: u32) -> f64 {
    let bler = if ber < 1e-10 {
        bits as f64 * ber
    } else {
        1.0 - (1.0 - ber).powi(bits as i32)
    };
    bler.clamp(1e-12, 1.0)
}

/// PER from BER and packet length in bits (§4.2), clamped to `[0, 1]` and
/// linearised for very small BER to avoid catastrophic cancellation in
/// `1 - (1 - ber)^n`.
pub fn per_from_ber(ber: f64, packet_bits: u32) -> f64 {
    let per = if ber < 1e-10 {
        packet_bits as f64 * ber
    } else {
        1.0 - (1.0 - ber).powi(packet_bits as i32)
    };
    per.clamp(0.0, 1.0)
}

/// PER expressed as a netem loss percentage.
pub fn per_to_loss_percent(per: f64) -> f64 {
    per * 100.0
}

/// Effective PHY rate in Mbps for a chosen `(bw_mhz, bits_per_symbol,
/// code_rate)` under `per`, floored at 0.1 Mbps (§4.2).
pub fn effective_rate_mbps(bw_mhz: f64, bits_per_symbol: u32, code_rate: f64, per: f64) -> f64 {
    let rate = bw_mhz * bits_per_symbol as f64 * code_rate * 0.8 * (1.0 - per);
    rate.max(0.1)
}

/// `delay_ms` from a path's minimum delay in nanoseconds.
pub fn netem_delay_ms(min_delay_ns: f64) -> f64 {
    min_delay_ns / 1e6
}

/// `jitter_ms` from a path's delay spread in nanoseconds.
pub fn netem_jitter_ms(delay_spread_ns: f64) -> f64 {
    delay_spread_ns / 1e6
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bits_per_symbol_table() {
        assert_eq!(bits_per_symbol(ModulationScheme::Bpsk), 1);
        assert_eq!(bits_per_symbol(ModulationScheme::Qpsk), 2);
        assert_eq!(bits_per_symbol(ModulationScheme::Qam16), 4);
        assert_eq!(bits_per_symbol(ModulationScheme::Qam64), 6);
        assert_eq!(bits_per_symbol(ModulationScheme::Qam256), 8);
        assert_eq!(bits_per_symbol(ModulationScheme::Qam1024), 10);
    }

    #[test]
    fn ber_bpsk_at_0db_is_in_expected_band() {
        // §8 boundary: BER at snr=0dB for BPSK ~= 0.079 (0.05-0.15).
        let ber = ber_awgn(ModulationScheme::Bpsk, 0.0);
        assert!((0.05..=0.15).contains(&ber), "got {ber}");
    }

    #[test]
    fn ber_qpsk_at_30db_is_tiny() {
        let ber = ber_awgn(ModulationScheme::Qpsk, 30.0);
        assert!(ber < 1e-6, "got {ber}");
    }

    #[test]
    fn ber_is_clamped() {
        let ber_hi = ber_awgn(ModulationScheme::Bpsk, -50.0);
        assert!(ber_hi <= 0.5);
        let ber_lo = ber_awgn(ModulationScheme::Qam1024, 80.0);
        assert!(ber_lo >= 1e-12);
    }

    #[test]
    fn vacuum_20m_scenario_bler_and_per_are_tiny_at_35db_snr() {
        // Scenario 1 (§8): 64-QAM, LDPC rate 0.5, SNR ~= 35 dB.
        let ber = ber_awgn(ModulationScheme::Qam64, 35.0);
        assert!(ber <= 1e-10, "got {ber}");
        let bler = bler(ModulationScheme::Qam64, FecType::Ldpc, 0.5, 35.0, 1024);
        assert!(bler <= 1e-6, "got {bler}");
        let per = per_from_ber(ber, 1500 * 8);
        assert!(per <= 1e-6, "got {per}");
    }

    #[test]
    fn per_round_trips_through_loss_percent() {
        let ber = 0.001;
        let per = per_from_ber(ber, 1500 * 8);
        let loss_percent = per_to_loss_percent(per);
        assert!((loss_percent / 100.0 - per).abs() < 1e-12);
    }

    #[test]
    fn effective_rate_is_floored() {
        let rate = effective_rate_mbps(80.0, 6, 0.5, 1.0);
        assert!((rate - 0.1).abs() < 1e-9);
    }

    #[test]
    fn vacuum_20m_rate_is_in_expected_band() {
        // Scenario 1 (§8): rate 178-192 Mbps at negligible PER.
        let rate = effective_rate_mbps(80.0, 6, 0.5, 0.0);
        assert!((178.0..=192.0).contains(&rate), "got {rate}");
    }

    #[test]
    fn netem_delay_matches_vacuum_scenario() {
        // Scenario 1 (§8): delay ~= 0.067 ms for a 20 m path.
        let distance_m = 20.0;
        let c = 299_792_458.0;
        let min_delay_ns = distance_m / c * 1e9;
        let delay_ms = netem_delay_ms(min_delay_ns);
        assert!((delay_ms - 0.0667).abs() < 0.01, "got {delay_ms}");
    }
}
