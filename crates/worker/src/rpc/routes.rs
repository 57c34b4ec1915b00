//! Route configuration for the worker API.

use super::handlers::*;
use super::state::RpcState;
use axum::{
    routing::{get, post},
    Router,
};

/// Create the full router with all worker routes.
pub fn create_router(state: RpcState) -> Router {
    Router::new()
        // Health & status
        .route("/health", get(health_handler))
        .route("/status", get(status_handler))
        // Lifecycle
        .route("/init", post(init_handler))
        .route("/start", post(start_handler))
        .route("/stop", post(stop_handler))
        // Queries
        .route("/get_switches", post(get_switches_handler))
        .route("/ping_all", post(ping_all_handler))
        .route(
            "/ping_line_pair/host1/{host1}/host2/{host2}",
            post(ping_pair_handler),
        )
        .route("/detect_hosts", post(detect_hosts_handler))
        .with_state(state)
}
