// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
#![allow(dead_code, clippy::unwrap_used)]

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::Router;
use oplog_app_core::BridgeSettings;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

/// Install a test-writer subscriber once; `RUST_LOG` picks the level.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Default settings with `max_in_flight` overridden.
pub fn settings_with_parallelism(max_in_flight: usize) -> BridgeSettings {
    BridgeSettings {
        max_in_flight,
        ..BridgeSettings::default()
    }
}

type Blocks = Arc<BTreeMap<String, Vec<u8>>>;

async fn serve_block(
    State(blocks): State<Blocks>,
    Path(cid): Path<String>,
) -> Result<Vec<u8>, StatusCode> {
    blocks.get(&cid).cloned().ok_or(StatusCode::NOT_FOUND)
}

async fn serve_slowly(State(blocks): State<Blocks>, Path(cid): Path<String>) -> Vec<u8> {
    tokio::time::sleep(Duration::from_secs(5)).await;
    blocks.get(&cid).cloned().unwrap_or_default()
}

async fn serve_garbage(Path(_cid): Path<String>) -> Vec<u8> {
    b"not the block you asked for".to_vec()
}

async fn spawn(router: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, router).await;
    });
    format!("http://{addr}/ipfs")
}

/// Gateway serving `blocks` keyed by remote CID text.
pub async fn spawn_gateway(blocks: BTreeMap<String, Vec<u8>>) -> String {
    let router = Router::new()
        .route("/ipfs/{cid}", get(serve_block))
        .with_state(Arc::new(blocks));
    spawn(router).await
}

/// Gateway that holds every response for five seconds.
pub async fn spawn_slow_gateway(blocks: BTreeMap<String, Vec<u8>>) -> String {
    let router = Router::new()
        .route("/ipfs/{cid}", get(serve_slowly))
        .with_state(Arc::new(blocks));
    spawn(router).await
}

/// Gateway that answers 200 with bytes that hash to something else.
pub async fn spawn_lying_gateway() -> String {
    spawn(Router::new().route("/ipfs/{cid}", get(serve_garbage))).await
}

/// Base URL of a port nothing listens on.
pub async fn dead_gateway() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr: SocketAddr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}/ipfs")
}
