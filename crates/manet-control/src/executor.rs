//! `tc` command execution inside a node's network namespace.
//!
//! Grounded on `rist-network-sim::topology::Namespace::exec`: a plain
//! `Command::new(..).args(..).output()` call, errors surfaced as the
//! process's stderr rather than an opaque `io::Error`. This is the one
//! concrete `manet_shaper::CommandExecutor` the binary wires up; it does
//! not create or destroy the namespace itself (§9 open question — that is
//! the container driver's job, not this crate's).
//!
//! Each command runs on a worker thread so a hang in `tc`/`ip netns exec`
//! can't block the recompute path forever (§5): the caller waits at most
//! `timeout` via `recv_timeout`, the same idiom `rist-bonding-core::runtime`
//! uses for its worker loop, and a `ChannelError::Transient` is raised past
//! the deadline.

use manet_shaper::{CommandExecutor, TcCommand};
use manet_types::ChannelError;
use std::process::{Command, Output};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

/// Hard timeout on a single kernel command (§5): past this, the interface
/// is marked failed for this batch and the caller moves on.
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(5);

pub struct NamespaceCommandExecutor {
    namespace: String,
    timeout: Duration,
}

impl NamespaceCommandExecutor {
    pub fn new(namespace: impl Into<String>) -> Self {
        NamespaceCommandExecutor {
            namespace: namespace.into(),
            timeout: DEFAULT_COMMAND_TIMEOUT,
        }
    }

    pub fn with_timeout(namespace: impl Into<String>, timeout: Duration) -> Self {
        NamespaceCommandExecutor {
            namespace: namespace.into(),
            timeout,
        }
    }
}

/// Runs `command` on a worker thread and waits at most `timeout` for it to
/// finish. The worker outlives the wait on timeout; its result is simply
/// dropped when nobody is left to receive it.
fn run_with_timeout(mut command: Command, timeout: Duration, description: &str) -> Result<Output, String> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let _ = tx.send(command.output().map_err(|e| e.to_string()));
    });

    match rx.recv_timeout(timeout) {
        Ok(result) => result,
        Err(mpsc::RecvTimeoutError::Timeout) => Err(ChannelError::Transient(format!(
            "{description} timed out after {timeout:?}"
        ))
        .to_string()),
        Err(mpsc::RecvTimeoutError::Disconnected) => {
            Err(format!("{description}: worker thread terminated without a result"))
        }
    }
}

impl CommandExecutor for NamespaceCommandExecutor {
    fn exec(&mut self, iface: &str, command: &TcCommand) -> Result<(), String> {
        let mut cmd = Command::new("ip");
        cmd.args(["netns", "exec", &self.namespace, "tc"])
            .args(command.as_str_args());

        let output = run_with_timeout(cmd, self.timeout, &format!("tc command on {iface}"))?;

        if output.status.success() {
            Ok(())
        } else {
            Err(String::from_utf8_lossy(&output.stderr).into_owned())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn has_ip_netns() -> bool {
        Command::new("ip")
            .arg("netns")
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false)
    }

    #[test]
    fn run_with_timeout_returns_output_for_a_fast_command() {
        let cmd = Command::new("true");
        let output = run_with_timeout(cmd, Duration::from_secs(5), "true").unwrap();
        assert!(output.status.success());
    }

    #[test]
    fn run_with_timeout_reports_transient_error_past_the_deadline() {
        let mut cmd = Command::new("sleep");
        cmd.arg("2");
        let err = run_with_timeout(cmd, Duration::from_millis(50), "sleep").unwrap_err();
        assert!(err.contains("timed out"));
    }

    #[test]
    fn exec_surfaces_stderr_on_unknown_namespace() {
        if !has_ip_netns() {
            return;
        }
        let mut executor = NamespaceCommandExecutor::new("definitely-not-a-real-namespace");
        let command = TcCommand::new(vec!["qdisc".to_string(), "show".to_string()]);
        assert!(executor.exec("veth0", &command).is_err());
    }
}
