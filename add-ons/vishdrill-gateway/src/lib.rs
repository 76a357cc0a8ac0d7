//! Axum gateway for the vishdrill call core: exposes the call-placement
//! trigger, the provider's webhook endpoints, and the read-only audit
//! surface. All state is dependency-injected through [`AppState`]; the
//! binary wires the real transport, tests substitute mocks.

pub mod handlers;
pub mod transport;
pub mod twiml;

use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use vishdrill_core::ConversationEngine;

/// Gateway version from Cargo.toml.
pub const GATEWAY_VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<ConversationEngine>,
}

impl AppState {
    pub fn new(engine: Arc<ConversationEngine>) -> Self {
        Self { engine }
    }
}

async fn root() -> Json<serde_json::Value> {
    Json(json!({
        "name": "vishdrill",
        "version": GATEWAY_VERSION,
        "status": "running",
    }))
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "healthy" }))
}

/// The full gateway router.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/api/call/initiate", post(handlers::calls::initiate_call))
        .route("/api/call/webhook/start", post(handlers::calls::webhook_call_start))
        .route("/api/call/webhook/gather", post(handlers::calls::webhook_gather_speech))
        .route("/api/call/webhook/status", post(handlers::calls::webhook_status_update))
        .route("/api/call/audit/list", get(handlers::audit::list_calls))
        .route("/api/call/audit/:call_sid", get(handlers::audit::call_audit))
        .route("/api/call/:call_sid/status", get(handlers::audit::call_status))
        .route("/api/call/:call_sid/events", get(handlers::audit::call_events))
        .route("/api/call/:call_sid/transcript", get(handlers::audit::call_transcript))
        .route("/api/audio/cache", post(handlers::audit::cache_audio))
        .route("/api/audio/:scenario_id/:turn", get(handlers::audit::cached_audio))
        .route("/api/scenarios", get(handlers::scenarios::list_scenarios))
        .route("/api/scenarios/:scenario_id", get(handlers::scenarios::get_scenario))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
