//! Shaping plan construction and application (C9, §4.8).
//!
//! Builds the ordered `tc` command sequence for one interface in either
//! operating mode, then applies it with replace-not-mutate semantics: the
//! existing root qdisc is deleted (errors ignored) and the full hierarchy
//! reinstalled. A failure on any `add` is recorded for that interface and
//! does not stop the rest of the batch (§4.8, mirroring §4.7 step 6's
//! per-link failure isolation).

use crate::command::{
    class_add_htb, filter_add_flower_dst_ip, qdisc_add_htb_root, qdisc_add_netem,
    qdisc_add_netem_root, qdisc_add_tbf_child, qdisc_del_root, TcCommand,
};
use crate::error::ShaperError;
use manet_channel::ChannelMetrics;
use tracing::{info, warn};

const DEFAULT_CLASSID_MINOR: u32 = 99;
const ROOT_CLASS_RATE_MBPS: f64 = 1000.0;
const MIN_RATE_MBPS: f64 = 0.1;
const MIN_DELAY_MS: f64 = 0.1;

/// Default netem delay-correlation percentage for point-to-point mode
/// (§6.3's `<corr>%`), matching the original's `NetemParams` default.
pub const DEFAULT_DELAY_CORRELATION_PERCENT: f64 = 25.0;

/// One peer's shaping parameters within a shared-bridge hierarchy.
#[derive(Debug, Clone, PartialEq)]
pub struct PeerShaping {
    pub dst_ip: String,
    pub delay_ms: f64,
    pub jitter_ms: f64,
    pub loss_percent: f64,
    pub rate_mbps: f64,
}

/// Default parameters for the broadcast/multicast class (§4.8 step 1).
#[derive(Debug, Clone, PartialEq)]
pub struct DefaultParams {
    pub delay_ms: f64,
}

impl Default for DefaultParams {
    fn default() -> Self {
        DefaultParams { delay_ms: 0.0 }
    }
}

impl PeerShaping {
    /// Build a peer's shaping parameters from a computed link's metrics
    /// (§4.7 output feeding §4.8 input).
    pub fn from_metrics(dst_ip: &str, metrics: &ChannelMetrics) -> Self {
        PeerShaping {
            dst_ip: dst_ip.to_string(),
            delay_ms: metrics.delay_ms,
            jitter_ms: metrics.jitter_ms,
            loss_percent: metrics.loss_percent,
            rate_mbps: metrics.rate_mbps,
        }
    }
}

fn clip_rate(rate_mbps: f64) -> f64 {
    rate_mbps.max(MIN_RATE_MBPS)
}

fn clip_delay(delay_ms: f64) -> f64 {
    delay_ms.max(MIN_DELAY_MS)
}

/// Build the full command sequence for per-destination shared-bridge mode
/// on interface `iface` (§4.8 step 1, §6.3).
pub fn build_shared_bridge_plan(
    iface: &str,
    peers: &[PeerShaping],
    default_params: &DefaultParams,
) -> Vec<TcCommand> {
    let mut plan = vec![
        qdisc_del_root(iface),
        qdisc_add_htb_root(iface, DEFAULT_CLASSID_MINOR),
        class_add_htb(iface, "1:1", "1:", ROOT_CLASS_RATE_MBPS),
        class_add_htb(
            iface,
            &format!("1:{DEFAULT_CLASSID_MINOR}"),
            "1:1",
            ROOT_CLASS_RATE_MBPS,
        ),
        qdisc_add_netem(
            iface,
            &format!("1:{DEFAULT_CLASSID_MINOR}"),
            &format!("{DEFAULT_CLASSID_MINOR}:"),
            clip_delay(default_params.delay_ms),
            0.0,
            0.0,
        ),
    ];

    for (k, peer) in peers.iter().enumerate() {
        let classid_minor = 10 + k as u32 * 10;
        let classid = format!("1:{classid_minor}");
        let handle = format!("{}:", k + 1);

        plan.push(class_add_htb(iface, &classid, "1:1", clip_rate(peer.rate_mbps)));
        plan.push(qdisc_add_netem(
            iface,
            &classid,
            &handle,
            clip_delay(peer.delay_ms),
            peer.jitter_ms.max(0.0),
            peer.loss_percent.clamp(0.0, 100.0),
        ));
        plan.push(filter_add_flower_dst_ip(iface, &peer.dst_ip, &classid));
    }

    plan
}

/// Build the full command sequence for point-to-point mode on interface
/// `iface` (§4.8 step 2, §6.3).
pub fn build_point_to_point_plan(
    iface: &str,
    delay_ms: f64,
    jitter_ms: f64,
    correlation_percent: f64,
    loss_percent: f64,
    rate_mbps: f64,
) -> Vec<TcCommand> {
    vec![
        qdisc_del_root(iface),
        qdisc_add_netem_root(
            iface,
            clip_delay(delay_ms),
            jitter_ms.max(0.0),
            correlation_percent.clamp(0.0, 100.0),
            loss_percent.clamp(0.0, 100.0),
        ),
        qdisc_add_tbf_child(iface, clip_rate(rate_mbps)),
    ]
}

/// Something that can execute one `tc` invocation in the correct network
/// namespace. Implemented by the orchestrator over its container backend;
/// this crate only emits commands (§6.3 preamble: "the core emits commands;
/// it does not implement queuing").
pub trait CommandExecutor {
    fn exec(&mut self, iface: &str, command: &TcCommand) -> Result<(), String>;
}

/// Apply a plan to `iface` via `executor`, with replace-not-mutate
/// semantics (§4.8): the first command (`qdisc del ... root`) is always a
/// delete and its error is ignored; every subsequent command's failure is
/// fatal for this interface and returned without running the rest of the
/// plan, but does not propagate further up (caller records it and moves on
/// to the next interface).
pub fn apply_plan(
    executor: &mut dyn CommandExecutor,
    iface: &str,
    plan: &[TcCommand],
) -> Result<(), ShaperError> {
    let mut commands = plan.iter();

    if let Some(del_cmd) = commands.next() {
        let _ = executor.exec(iface, del_cmd);
    }

    for command in commands {
        if let Err(detail) = executor.exec(iface, command) {
            warn!(iface, %command, %detail, "tc command failed");
            return Err(ShaperError::CommandFailed {
                iface: iface.to_string(),
                stage: "add",
                detail,
            });
        }
    }

    info!(iface, commands = plan.len(), "shaping plan applied");
    Ok(())
}
