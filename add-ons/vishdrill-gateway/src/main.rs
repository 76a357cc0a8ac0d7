//! Gateway entry point: config from `.env`, tracing to stdout, a background
//! sweep reclaiming expired store entries, and the axum server.

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;
use vishdrill_core::{
    ConversationEngine, Detector, EngineConfig, ScenarioCatalog, SessionStore,
};
use vishdrill_gateway::{build_router, transport, AppState, GATEWAY_VERSION};

const SWEEP_INTERVAL_SECS: u64 = 60;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = EngineConfig::from_env();
    info!(target: "vishdrill::gateway", version = GATEWAY_VERSION, base_url = %config.base_url, "starting");

    let store = Arc::new(SessionStore::new());
    let engine = Arc::new(ConversationEngine::new(
        Arc::new(ScenarioCatalog::builtin()),
        Arc::clone(&store),
        transport::create_transport(),
        Detector,
        config,
    ));

    // Expired keys are already invisible to reads; this reclaims their memory.
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(SWEEP_INTERVAL_SECS));
        loop {
            interval.tick().await;
            let evicted = store.sweep();
            if evicted > 0 {
                debug!(target: "vishdrill::gateway", evicted, "store sweep");
            }
        }
    });

    let port: u16 = std::env::var("VISHDRILL_PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(8000);
    let addr = format!("0.0.0.0:{port}");
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .unwrap_or_else(|e| panic!("bind {addr}: {e}"));
    info!(target: "vishdrill::gateway", %addr, "listening");

    axum::serve(listener, build_router(AppState::new(engine)))
        .await
        .expect("server error");
}
