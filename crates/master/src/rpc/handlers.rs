//! HTTP request handlers for the master API.

use super::state::MasterState;
use super::types::*;
use crate::aggregate::aggregate;
use crate::outcome::WorkerOutcome;
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use multinet_types::{Command, TopologyParams, WorkerDescriptor};
use serde_json::json;
use tracing::{info, warn};

fn bad_request(error: String) -> Response {
    (StatusCode::BAD_REQUEST, Json(json!({ "error": error }))).into_response()
}

/// Resolve the worker list from the request body. Any malformed entry
/// rejects the whole request.
fn parse_workers(
    state: &MasterState,
    payload: Result<Json<Vec<String>>, JsonRejection>,
) -> Result<Vec<WorkerDescriptor>, Response> {
    let Json(entries) = payload.map_err(|rejection| bad_request(rejection.body_text()))?;
    WorkerDescriptor::parse_all(&entries, state.default_port).map_err(|e| {
        warn!(error = %e, "Rejected worker list");
        bad_request(e.to_string())
    })
}

fn respond(command: Command, outcomes: &[WorkerOutcome]) -> Response {
    let result = aggregate(outcomes);
    info!(
        %command,
        workers = outcomes.len(),
        failed = result.failed,
        status = ?result.status,
        "Broadcast complete"
    );
    let status =
        StatusCode::from_u16(result.status.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(result.bodies)).into_response()
}

async fn run_command(
    command: Command,
    state: MasterState,
    payload: Result<Json<Vec<String>>, JsonRejection>,
) -> Response {
    let workers = match parse_workers(&state, payload) {
        Ok(workers) => workers,
        Err(response) => return response,
    };
    let outcomes = state.broadcaster.broadcast(&workers, command).await;
    respond(command, &outcomes)
}

// ═══════════════════════════════════════════════════════════════════════════
// Health Handler
// ═══════════════════════════════════════════════════════════════════════════

/// Handler for `GET /health` - liveness check.
pub async fn health_handler() -> impl IntoResponse {
    Json(HealthResponse::default())
}

// ═══════════════════════════════════════════════════════════════════════════
// Command Handlers
// ═══════════════════════════════════════════════════════════════════════════

/// Handler for `POST /init/controller/.../hosts/{hosts}`.
///
/// The path parameters are forwarded to every worker unchanged; validation
/// happens on the workers.
pub async fn init_handler(
    State(state): State<MasterState>,
    Path(path): Path<InitPath>,
    payload: Result<Json<Vec<String>>, JsonRejection>,
) -> Response {
    let workers = match parse_workers(&state, payload) {
        Ok(workers) => workers,
        Err(response) => return response,
    };

    let params = TopologyParams {
        controller_ip_address: path.ip,
        controller_of_port: path.port,
        switch_type: path.switch_type,
        topo_type: path.topo,
        topo_size: path.size,
        group_size: path.group,
        group_delay: path.delay,
        hosts_per_switch: path.hosts,
    };

    let outcomes = state.broadcaster.broadcast_init(&workers, &params).await;
    respond(Command::Init, &outcomes)
}

/// Handler for `POST /start`.
pub async fn start_handler(
    State(state): State<MasterState>,
    payload: Result<Json<Vec<String>>, JsonRejection>,
) -> Response {
    run_command(Command::Start, state, payload).await
}

/// Handler for `POST /get_switches`.
pub async fn get_switches_handler(
    State(state): State<MasterState>,
    payload: Result<Json<Vec<String>>, JsonRejection>,
) -> Response {
    run_command(Command::GetSwitches, state, payload).await
}

/// Handler for `POST /stop`.
pub async fn stop_handler(
    State(state): State<MasterState>,
    payload: Result<Json<Vec<String>>, JsonRejection>,
) -> Response {
    run_command(Command::Stop, state, payload).await
}

/// Handler for `POST /ping_all`.
pub async fn ping_all_handler(
    State(state): State<MasterState>,
    payload: Result<Json<Vec<String>>, JsonRejection>,
) -> Response {
    run_command(Command::PingAll, state, payload).await
}

/// Handler for `POST /detect_hosts`.
pub async fn detect_hosts_handler(
    State(state): State<MasterState>,
    payload: Result<Json<Vec<String>>, JsonRejection>,
) -> Response {
    run_command(Command::DetectHosts, state, payload).await
}
