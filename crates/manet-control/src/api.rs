//! HTTP control surface (C11, §4.10).
//!
//! GET  /health                        — liveness/degraded status
//! POST /position                      — move a node's wireless interfaces
//! GET  /position/{node}                — current position
//! POST /interface                     — toggle an interface's activity
//! GET  /interface/{node}/{iface}       — current activity
//! POST /recompute                     — force a full batch recompute
//! GET  /nodes                         — every node's current position
//! POST /engine                        — request auto|solver|fallback (§4.3)
//!
//! Re-expressed from `original_source/src/sine/control/api.py`'s FastAPI
//! routes in `strata-control::api::destinations`'s axum idiom: one router
//! function, handlers grouped under a section comment per endpoint,
//! `State<AppState>` threaded through, errors surfaced via `ApiError`.

use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use manet_channel::EngineSelection;

use crate::error::ApiError;
use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/position", post(update_position))
        .route("/position/{node}", get(get_position))
        .route("/interface", post(update_interface))
        .route("/interface/{node}/{iface}", get(get_interface))
        .route("/recompute", post(recompute))
        .route("/nodes", get(list_nodes))
        .route("/engine", post(request_engine))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// ── Health ───────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    running: bool,
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let (running, degraded) = state.health().await;
    Json(HealthResponse {
        status: if degraded { "degraded" } else { "healthy" },
        running,
    })
}

// ── Position ─────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct PositionUpdateRequest {
    node: String,
    x: f64,
    y: f64,
    #[serde(default = "default_z")]
    z: f64,
}

fn default_z() -> f64 {
    1.0
}

#[derive(Debug, Serialize)]
struct PositionPoint {
    x: f64,
    y: f64,
    z: f64,
}

#[derive(Debug, Serialize)]
struct PositionResponse {
    status: &'static str,
    node: String,
    position: PositionPoint,
    message: String,
}

async fn update_position(
    State(state): State<AppState>,
    Json(body): Json<PositionUpdateRequest>,
) -> Result<Json<PositionResponse>, ApiError> {
    let (x, y, z) = state.update_position(&body.node, body.x, body.y, body.z).await?;
    Ok(Json(PositionResponse {
        status: "ok",
        node: body.node,
        position: PositionPoint { x, y, z },
        message: "position updated and channels recomputed".to_string(),
    }))
}

async fn get_position(
    State(state): State<AppState>,
    Path(node): Path<String>,
) -> Result<Json<PositionResponse>, ApiError> {
    let (x, y, z) = state.get_position(&node).await?;
    Ok(Json(PositionResponse {
        status: "ok",
        node,
        position: PositionPoint { x, y, z },
        message: String::new(),
    }))
}

// ── Interface activity ──────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct InterfaceUpdateRequest {
    node: String,
    interface: String,
    is_active: bool,
}

#[derive(Debug, Serialize)]
struct InterfaceStateResponse {
    status: &'static str,
    node: String,
    interface: String,
    is_active: bool,
    message: String,
}

async fn update_interface(
    State(state): State<AppState>,
    Json(body): Json<InterfaceUpdateRequest>,
) -> Result<Json<InterfaceStateResponse>, ApiError> {
    state
        .set_interface_active(&body.node, &body.interface, body.is_active)
        .await?;
    let verb = if body.is_active { "enabled" } else { "disabled" };
    Ok(Json(InterfaceStateResponse {
        status: "ok",
        node: body.node,
        interface: body.interface,
        is_active: body.is_active,
        message: format!("interface {verb} and channels recomputed"),
    }))
}

async fn get_interface(
    State(state): State<AppState>,
    Path((node, interface)): Path<(String, String)>,
) -> Result<Json<InterfaceStateResponse>, ApiError> {
    let is_active = state.get_interface_active(&node, &interface).await?;
    Ok(Json(InterfaceStateResponse {
        status: "ok",
        node,
        interface,
        is_active,
        message: String::new(),
    }))
}

// ── Recompute ────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct RecomputeResponse {
    status: &'static str,
    message: String,
    links_computed: usize,
    degraded_links: usize,
    shaping_failures: Vec<String>,
}

async fn recompute(State(state): State<AppState>) -> Json<RecomputeResponse> {
    let report = state.force_recompute().await;
    Json(RecomputeResponse {
        status: "ok",
        message: "recompute complete".to_string(),
        links_computed: report.links_computed,
        degraded_links: report.degraded_links,
        shaping_failures: report.shaping_failures,
    })
}

// ── Nodes ────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct NodeSummary {
    name: String,
    position: PositionPoint,
}

#[derive(Debug, Serialize)]
struct NodesResponse {
    status: &'static str,
    nodes: Vec<NodeSummary>,
}

async fn list_nodes(State(state): State<AppState>) -> Json<NodesResponse> {
    let nodes = state
        .list_nodes()
        .await
        .into_iter()
        .map(|(name, (x, y, z))| NodeSummary {
            name,
            position: PositionPoint { x, y, z },
        })
        .collect();
    Json(NodesResponse { status: "ok", nodes })
}

// ── Engine selection ─────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct EngineRequest {
    requested: String,
}

#[derive(Debug, Serialize)]
struct EngineResponse {
    status: &'static str,
    engine: &'static str,
}

fn parse_engine_selection(requested: &str) -> Result<EngineSelection, ApiError> {
    match requested {
        "auto" => Ok(EngineSelection::Auto),
        "solver" => Ok(EngineSelection::Solver),
        "fallback" => Ok(EngineSelection::Fallback),
        other => Err(ApiError::bad_request(format!(
            "unknown engine selection '{other}': expected auto, solver, or fallback"
        ))),
    }
}

async fn request_engine(
    State(state): State<AppState>,
    Json(body): Json<EngineRequest>,
) -> Result<Json<EngineResponse>, ApiError> {
    let selection = parse_engine_selection(&body.requested)?;
    let use_solver = state.request_engine(selection).await?;
    Ok(Json(EngineResponse {
        status: "ok",
        engine: if use_solver { "solver" } else { "fallback" },
    }))
}
