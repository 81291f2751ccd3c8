//! Environment-variable configuration (§1 ambient stack).
//!
//! No YAML/TOML/CLI parsing lives here — the orchestrator is constructed
//! programmatically by its embedder from a `Topology` value, matching the
//! teacher's `main.rs` pattern of small `std::env::var(..).unwrap_or_else`
//! reads for process-level knobs rather than a config file format.

use manet_channel::ProcessMode;

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub listen_addr: String,
    pub mobility_poll_ms: u64,
    /// `FORCE_FALLBACK=1` pins the process to the FSPL fallback engine,
    /// rejecting explicit `solver` requests at `/engine` (§4.3).
    pub process_mode: ProcessModeConfig,
}

/// `Config`'s own copy of `manet_channel::ProcessMode`: `Config` must stay
/// `PartialEq`-derivable without leaning on `manet_channel` deriving it too.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessModeConfig {
    Normal,
    ForceFallback,
}

impl From<ProcessModeConfig> for ProcessMode {
    fn from(mode: ProcessModeConfig) -> Self {
        match mode {
            ProcessModeConfig::Normal => ProcessMode::Normal,
            ProcessModeConfig::ForceFallback => ProcessMode::ForceFallback,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let listen_addr = std::env::var("LISTEN_ADDR").unwrap_or_else(|_| {
            tracing::warn!("LISTEN_ADDR not set, defaulting to 0.0.0.0:3000");
            "0.0.0.0:3000".to_string()
        });
        let mobility_poll_ms = std::env::var("MOBILITY_POLL_MS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or_else(|| {
                tracing::warn!("MOBILITY_POLL_MS not set or invalid, defaulting to 100");
                100
            });
        let process_mode = match std::env::var("FORCE_FALLBACK").as_deref() {
            Ok("1") | Ok("true") => ProcessModeConfig::ForceFallback,
            _ => ProcessModeConfig::Normal,
        };
        Config {
            listen_addr,
            mobility_poll_ms,
            process_mode,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            listen_addr: "0.0.0.0:3000".to_string(),
            mobility_poll_ms: 100,
            process_mode: ProcessModeConfig::Normal,
        }
    }
}
