//! HTTP API of a worker.
//!
//! # Lifecycle
//!
//! - `POST /init` - Build the topology described by the JSON body
//! - `POST /start` - Run the gradual rollout; returns when it completes
//! - `POST /stop` - Cancel any rollout and tear the topology down
//!
//! # Queries
//!
//! - `POST /get_switches` - Booted switch count as a bare JSON integer
//! - `POST /ping_all` - All-pairs packet loss percentage
//! - `POST /ping_line_pair/host1/{host1}/host2/{host2}` - Loss between two
//!   hosts addressed as `<switch>,<host>`; 500 when nothing gets through
//! - `POST /detect_hosts` - Make every host ping the controller
//!
//! # Health
//!
//! - `GET /health` - Liveness check
//! - `GET /status` - Phase and booted switches
//!
//! Failures carry a JSON `{"error": "..."}` body: 400 for a rejected
//! request, 409 when the worker is in the wrong phase, 500 for engine
//! failures.

mod handlers;
mod routes;
mod server;
mod state;
mod types;

pub use routes::create_router;
pub use server::{RpcServer, RpcServerConfig, RpcServerError, RpcServerHandle};
pub use state::RpcState;
pub use types::*;
