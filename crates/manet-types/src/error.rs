//! Error kinds shared across the channel, shaper, and control crates.
//!
//! Follows the §7 error table: `ConfigError` is fatal at load and surfaces
//! to the caller; `ChannelError` covers everything recoverable inside a
//! single link or interface and is always paired with a degraded fallback
//! by the caller, never raised to abort a batch.

use thiserror::Error;

/// Fatal at load: topology or MCS table failed validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("node '{0}' has no interfaces")]
    EmptyNode(String),

    #[error(
        "interface '{iface}' on node '{node}' must set exactly one of antenna_gain_dbi or antenna_pattern"
    )]
    AmbiguousAntenna { node: String, iface: String },

    #[error(
        "interface '{iface}' on node '{node}' must set exactly one of fixed modulation or an mcs_table reference"
    )]
    AmbiguousModulation { node: String, iface: String },

    #[error("noise figure {0} dB out of range [0, 20]")]
    NoiseFigureOutOfRange(f64),

    #[error("rx sensitivity {0} dBm out of range [-150, 0]")]
    SensitivityOutOfRange(f64),

    #[error("mcs table is empty")]
    EmptyMcsTable,

    #[error("mcs table entries are not sorted ascending by min_snr_db")]
    McsTableUnsorted,

    #[error("tdma fixed slot mode requires a non-empty fixed_slot_map")]
    MissingFixedSlotMap,

    #[error("mcs table load failed: {0}")]
    McsTableLoad(String),

    #[error("unknown modulation tag '{0}'")]
    UnknownModulation(String),

    #[error("unknown fec type '{0}'")]
    UnknownFec(String),

    #[error("enable_sinr is false but node '{0}' declares a MAC model; the model will be ignored")]
    MacModelWithoutSinr(String),
}

/// Recoverable error for a single link or interface. The caller always
/// degrades locally (§4.7 step 6, §4.8) rather than propagating this as a
/// batch failure.
#[derive(Debug, Error, Clone)]
pub enum ChannelError {
    #[error("path solver unavailable: {0}")]
    SolverUnavailable(String),

    #[error("path computation failed for this pair: {0}")]
    PathComputeFailed(String),

    #[error("unknown node or interface: {0}")]
    UnknownEntity(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("shaper command failed on {iface}: {source}")]
    Shaper { iface: String, source: String },

    #[error("timed out waiting on {0}")]
    Transient(String),
}
