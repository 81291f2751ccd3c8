//! MANET channel emulation orchestrator.
//!
//! Single binary that loads a topology, computes and applies the initial
//! channel/shaping batch, then serves the control surface and ticks a
//! mobility-poll background task at a fixed cadence.

use std::collections::HashMap;
use std::net::SocketAddr;

use manet_channel::FsplFallback;
use manet_control::container::StaticContainerBackend;
use manet_control::{api, config::Config, state::AppState};
use manet_types::Topology;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── Logging ─────────────────────────────────────────────────
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // ── Configuration ───────────────────────────────────────────
    let config = Config::from_env();

    // ── Topology ────────────────────────────────────────────────
    let topology_path = std::env::var("TOPOLOGY_PATH").unwrap_or_else(|_| {
        tracing::warn!("TOPOLOGY_PATH not set, defaulting to ./topology.json");
        "./topology.json".to_string()
    });
    let topology_raw = std::fs::read_to_string(&topology_path)
        .map_err(|e| anyhow::anyhow!("failed to read topology at {topology_path}: {e}"))?;
    let topology: Topology = serde_json::from_str(&topology_raw)
        .map_err(|e| anyhow::anyhow!("failed to parse topology at {topology_path}: {e}"))?;

    // ── Shared state ────────────────────────────────────────────
    // No real container driver is wired up here: that integration is an
    // explicit external collaborator (§6.2), not this crate's job. The
    // empty `StaticContainerBackend` means shaping will report per-interface
    // failures until a real backend is substituted. Likewise no external
    // ray-tracing solver is registered; `solver_present: false` means
    // `/engine` can only ever resolve to the fallback (§4.3).
    let state = AppState::with_engine_mode(
        topology,
        Box::new(FsplFallback::default()),
        HashMap::new(),
        Box::new(StaticContainerBackend::new()),
        config.process_mode.into(),
        false,
    )?;

    // ── Mobility poll ───────────────────────────────────────────
    // Waypoint movers are out of scope (§9 Non-goals); this tick only
    // exists so the cadence itself is observable. Position changes arrive
    // instantaneously through the control surface, never through this loop.
    {
        let poll_state = state.clone();
        let interval_ms = config.mobility_poll_ms;
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(std::time::Duration::from_millis(interval_ms));
            loop {
                ticker.tick().await;
                let (running, degraded) = poll_state.health().await;
                tracing::debug!(running, degraded, "mobility poll tick");
            }
        });
    }

    // ── Router ──────────────────────────────────────────────────
    let app = api::router(state);

    // ── Listen ──────────────────────────────────────────────────
    let addr: SocketAddr = config.listen_addr.parse()?;
    tracing::info!("manet-control listening on {addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
