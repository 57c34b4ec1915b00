//! HTTP request handlers for the worker API.

use super::state::RpcState;
use super::types::*;
use crate::runner::WorkerError;
use crate::sequencer::SequencerError;
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use multinet_types::TopologyRequest;
use tracing::{debug, info, warn};

fn error_status(err: &WorkerError) -> StatusCode {
    match err {
        WorkerError::Sequencer(SequencerError::Config(_) | SequencerError::UnknownHost(_)) => {
            StatusCode::BAD_REQUEST
        }
        WorkerError::Sequencer(
            SequencerError::InvalidTransition { .. } | SequencerError::Cancelled,
        ) => StatusCode::CONFLICT,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn error_response(op: &str, err: WorkerError) -> Response {
    let status = error_status(&err);
    if status.is_server_error() {
        warn!(op, error = %err, "Request failed");
    } else {
        debug!(op, error = %err, status = status.as_u16(), "Request rejected");
    }
    (
        status,
        Json(ErrorResponse {
            error: err.to_string(),
        }),
    )
        .into_response()
}

fn empty_response(op: &str, result: Result<(), WorkerError>) -> Response {
    match result {
        Ok(()) => StatusCode::OK.into_response(),
        Err(e) => error_response(op, e),
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Health & Status Handlers
// ═══════════════════════════════════════════════════════════════════════════

/// Handler for `GET /health` - liveness check.
pub async fn health_handler() -> impl IntoResponse {
    Json(HealthResponse::default())
}

/// Handler for `GET /status` - phase and booted switches.
pub async fn status_handler(State(state): State<RpcState>) -> impl IntoResponse {
    Json(WorkerStatusResponse {
        phase: state.worker.phase(),
        booted_switches: state.worker.get_switches(),
        uptime_secs: state.start_time.elapsed().as_secs(),
    })
}

// ═══════════════════════════════════════════════════════════════════════════
// Lifecycle Handlers
// ═══════════════════════════════════════════════════════════════════════════

/// Handler for `POST /init` - build the requested topology.
pub async fn init_handler(
    State(state): State<RpcState>,
    payload: Result<Json<TopologyRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match payload {
        Ok(payload) => payload,
        Err(rejection) => {
            debug!(error = %rejection, "Malformed init body");
            return (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse {
                    error: rejection.body_text(),
                }),
            )
                .into_response();
        }
    };

    info!(
        topo_type = %request.params.topo_type,
        topo_size = request.params.topo_size,
        dpid_offset = request.dpid_offset,
        "Init requested"
    );
    empty_response("init", state.worker.init(request).await)
}

/// Handler for `POST /start` - run the rollout to completion.
pub async fn start_handler(State(state): State<RpcState>) -> Response {
    info!("Start requested");
    empty_response("start", state.worker.start().await)
}

/// Handler for `POST /stop` - tear the topology down.
pub async fn stop_handler(State(state): State<RpcState>) -> Response {
    info!("Stop requested");
    empty_response("stop", state.worker.stop().await)
}

// ═══════════════════════════════════════════════════════════════════════════
// Query Handlers
// ═══════════════════════════════════════════════════════════════════════════

/// Handler for `POST /get_switches` - booted switch count.
pub async fn get_switches_handler(State(state): State<RpcState>) -> impl IntoResponse {
    Json(state.worker.get_switches())
}

/// Handler for `POST /ping_all` - all-pairs packet loss.
pub async fn ping_all_handler(State(state): State<RpcState>) -> Response {
    match state.worker.ping_all().await {
        Ok(loss) => Json(loss).into_response(),
        Err(e) => error_response("ping_all", e),
    }
}

/// Handler for `POST /ping_line_pair/host1/{host1}/host2/{host2}`.
///
/// Succeeds when at least one ping got through.
pub async fn ping_pair_handler(
    State(state): State<RpcState>,
    Path((host1, host2)): Path<(String, String)>,
) -> Response {
    match state.worker.ping_pair(host1.as_str(), host2.as_str()).await {
        Ok(loss) if loss >= 100.0 => {
            debug!(%host1, %host2, "Pair unreachable");
            (StatusCode::INTERNAL_SERVER_ERROR, Json(loss)).into_response()
        }
        Ok(loss) => Json(loss).into_response(),
        Err(e) => error_response("ping_line_pair", e),
    }
}

/// Handler for `POST /detect_hosts` - ping the controller from every host.
pub async fn detect_hosts_handler(State(state): State<RpcState>) -> Response {
    match state.worker.detect_hosts().await {
        Ok(hosts) => {
            debug!(hosts, "Detection pings sent");
            StatusCode::OK.into_response()
        }
        Err(e) => error_response("detect_hosts", e),
    }
}
