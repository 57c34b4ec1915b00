//! Test fixtures for master e2e tests.
//!
//! Spins up real worker servers backed by the in-memory engine, plus a
//! deliberately slow endpoint, all on ephemeral localhost ports.

use axum::Router;
use futures::future::join_all;
use multinet_engine_memory::MemoryEngine;
use multinet_master::rpc::{MasterState, RpcServer as MasterServer, RpcServerConfig as MasterServerConfig};
use multinet_master::{BroadcastConfig, Broadcaster, MasterClient};
use multinet_types::DEFAULT_WORKER_PORT;
use multinet_worker::rpc::{RpcServer, RpcServerConfig, RpcServerHandle};
use multinet_worker::{SequencerConfig, WorkerRunner};
use std::net::SocketAddr;
use std::time::Duration;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

/// A worker server and a view onto its engine.
pub struct TestWorker {
    pub server: RpcServerHandle,
    pub engine: MemoryEngine,
}

impl TestWorker {
    /// Worker entry as an operator would list it.
    pub fn entry(&self) -> String {
        self.server.local_addr().to_string()
    }
}

impl Drop for TestWorker {
    fn drop(&mut self) {
        self.server.abort();
    }
}

pub async fn spawn_worker() -> TestWorker {
    let engine = MemoryEngine::new();
    let (runner, worker) = WorkerRunner::new(engine.clone(), SequencerConfig::default());
    runner.spawn();
    let server = RpcServer::new(
        RpcServerConfig {
            listen_addr: "127.0.0.1:0".parse().unwrap(),
        },
        worker,
    )
    .start()
    .await
    .unwrap();
    TestWorker { server, engine }
}

pub async fn spawn_workers(count: usize) -> Vec<TestWorker> {
    join_all((0..count).map(|_| spawn_worker())).await
}

/// An endpoint that answers every request with 200 after `delay`.
pub async fn spawn_slow_endpoint(delay: Duration) -> SocketAddr {
    let router = Router::new().fallback(move || async move {
        tokio::time::sleep(delay).await;
        "late"
    });
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, router).await;
    });
    addr
}

/// A master server and a client pointed at it.
pub struct TestMaster {
    pub server: multinet_master::rpc::RpcServerHandle,
    pub client: MasterClient,
}

impl Drop for TestMaster {
    fn drop(&mut self) {
        self.server.abort();
    }
}

pub async fn spawn_master(config: BroadcastConfig) -> TestMaster {
    let state = MasterState {
        broadcaster: Broadcaster::new(config).unwrap(),
        default_port: DEFAULT_WORKER_PORT,
    };
    let server = MasterServer::new(
        MasterServerConfig {
            listen_addr: "127.0.0.1:0".parse().unwrap(),
        },
        state,
    )
    .start()
    .await
    .unwrap();
    let client = MasterClient::new(
        format!("http://{}", server.local_addr()),
        Duration::from_secs(60),
    )
    .unwrap();
    TestMaster { server, client }
}
