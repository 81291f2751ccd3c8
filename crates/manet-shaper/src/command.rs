//! `tc` command construction (§6.3, §4.8): builds argument vectors the same
//! way `impairment.rs::apply_impairment` does — a flat `Vec<String>`, no
//! shell string, so the caller can exec without spawning a shell.

/// One `tc` invocation, argument vector only (`tc` itself is implied).
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct TcCommand {
    pub args: Vec<String>,
}

impl TcCommand {
    pub fn new(args: Vec<String>) -> Self {
        TcCommand { args }
    }

    pub fn as_str_args(&self) -> Vec<&str> {
        self.args.iter().map(|s| s.as_str()).collect()
    }
}

impl std::fmt::Display for TcCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "tc {}", self.args.join(" "))
    }
}

fn s(parts: &[&str]) -> Vec<String> {
    parts.iter().map(|p| p.to_string()).collect()
}

/// `tc qdisc del dev <if> root` — errors from this command are always
/// ignored by the caller (§4.8: "Errors during `del` are ignored").
pub fn qdisc_del_root(iface: &str) -> TcCommand {
    TcCommand::new(s(&["qdisc", "del", "dev", iface, "root"]))
}

/// Root HTB qdisc with a default class for unclassified (broadcast/
/// multicast) traffic (§6.3 shared-bridge mode).
pub fn qdisc_add_htb_root(iface: &str, default_classid_minor: u32) -> TcCommand {
    TcCommand::new(s(&[
        "qdisc",
        "add",
        "dev",
        iface,
        "root",
        "handle",
        "1:",
        "htb",
        "default",
        &default_classid_minor.to_string(),
    ]))
}

/// HTB parent class bounding total throughput on the interface.
pub fn class_add_htb(iface: &str, classid: &str, parent: &str, rate_mbit: f64) -> TcCommand {
    TcCommand::new(s(&[
        "class", "add", "dev", iface, "parent", parent, "classid", classid, "htb", "rate",
        &format!("{rate_mbit}mbit"),
    ]))
}

/// netem leaf under a class, with optional jitter and loss.
pub fn qdisc_add_netem(
    iface: &str,
    parent: &str,
    handle: &str,
    delay_ms: f64,
    jitter_ms: f64,
    loss_percent: f64,
) -> TcCommand {
    let mut args = vec![
        "qdisc".to_string(),
        "add".to_string(),
        "dev".to_string(),
        iface.to_string(),
        "parent".to_string(),
        parent.to_string(),
        "handle".to_string(),
        handle.to_string(),
        "netem".to_string(),
        "delay".to_string(),
        format!("{delay_ms}ms"),
    ];
    if jitter_ms > 0.0 {
        args.push(format!("{jitter_ms}ms"));
    }
    if loss_percent > 0.0 {
        args.push("loss".to_string());
        args.push(format!("{loss_percent}%"));
    }
    TcCommand::new(args)
}

/// `flower` classifier steering one peer's destination IP to its class
/// (§6.3: "O(1) hash-based IP match").
pub fn filter_add_flower_dst_ip(iface: &str, dst_ip: &str, flowid: &str) -> TcCommand {
    TcCommand::new(s(&[
        "filter", "add", "dev", iface, "protocol", "ip", "parent", "1:0", "prio", "1", "flower",
        "dst_ip", dst_ip, "action", "pass", "flowid", flowid,
    ]))
}

/// Root netem qdisc for point-to-point mode. `correlation_percent` is the
/// netem delay-correlation parameter (§6.3's `<corr>%`), only meaningful
/// alongside nonzero jitter.
pub fn qdisc_add_netem_root(
    iface: &str,
    delay_ms: f64,
    jitter_ms: f64,
    correlation_percent: f64,
    loss_percent: f64,
) -> TcCommand {
    let mut args = vec![
        "qdisc".to_string(),
        "add".to_string(),
        "dev".to_string(),
        iface.to_string(),
        "root".to_string(),
        "handle".to_string(),
        "1:".to_string(),
        "netem".to_string(),
        "delay".to_string(),
        format!("{delay_ms}ms"),
    ];
    if jitter_ms > 0.0 {
        args.push(format!("{jitter_ms}ms"));
        args.push(format!("{correlation_percent}%"));
    }
    if loss_percent > 0.0 {
        args.push("loss".to_string());
        args.push(format!("{loss_percent}%"));
    }
    TcCommand::new(args)
}

/// Token-bucket rate limiter child, with burst sized per §4.8: `max(32kbit,
/// rate_mbps*1000/250)`.
pub fn qdisc_add_tbf_child(iface: &str, rate_mbps: f64) -> TcCommand {
    let burst_kbit = (rate_mbps * 1000.0 / 250.0).max(32.0);
    TcCommand::new(s(&[
        "qdisc",
        "add",
        "dev",
        iface,
        "parent",
        "1:",
        "handle",
        "2:",
        "tbf",
        "rate",
        &format!("{rate_mbps}mbit"),
        "burst",
        &format!("{burst_kbit}kbit"),
        "latency",
        "50ms",
    ]))
}
