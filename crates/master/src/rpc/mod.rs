//! HTTP API of the master.
//!
//! Every command takes a JSON array of worker entries as its body and
//! answers with a JSON array holding one body per worker, in the same order.
//! The status is 200 when every worker succeeded and 500 otherwise. A
//! malformed worker entry is rejected with 400 before anything is sent.
//!
//! - `POST /init/controller/{ip}/port/{port}/switch/{switch_type}/topology/{topo}/size/{size}/group/{group}/delay/{delay}/hosts/{hosts}`
//! - `POST /start`, `/get_switches`, `/stop`, `/ping_all`, `/detect_hosts`
//! - `GET /health`

mod handlers;
mod routes;
mod server;
mod state;
mod types;

pub use routes::create_router;
pub use server::{RpcServer, RpcServerConfig, RpcServerError, RpcServerHandle, DEFAULT_MASTER_PORT};
pub use state::MasterState;
pub use types::*;
