//! Read-only query surface for the audit UI: sessions, event logs,
//! transcripts, and the audio-URL cache.

use crate::AppState;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::json;
use vishdrill_core::EventType;

#[derive(Debug, Deserialize)]
pub struct AuditListQuery {
    pub phone_number: Option<String>,
}

/// All calls, or a single person's calls when filtered by phone number.
pub async fn list_calls(
    State(state): State<AppState>,
    Query(query): Query<AuditListQuery>,
) -> Json<serde_json::Value> {
    let calls = state
        .engine
        .store()
        .list_sessions(query.phone_number.as_deref());
    Json(json!({ "calls": calls }))
}

/// Full audit record for one call: session, transcript, events, and the
/// disclosure events pulled out as `vulnerabilities`.
pub async fn call_audit(State(state): State<AppState>, Path(call_sid): Path<String>) -> Response {
    let Some(session) = state.engine.store().get_session(&call_sid) else {
        return not_found("Call not found");
    };
    let transcript = state.engine.store().list_transcript(&call_sid);
    let events = state.engine.store().list_events(&call_sid);
    let vulnerabilities: Vec<_> = events
        .iter()
        .filter(|e| e.event_type == EventType::SensitiveDataDetected)
        .cloned()
        .collect();
    Json(json!({
        "call_sid": call_sid,
        "session": session,
        "transcript": transcript,
        "events": events,
        "vulnerabilities": vulnerabilities,
    }))
    .into_response()
}

pub async fn call_status(State(state): State<AppState>, Path(call_sid): Path<String>) -> Response {
    match state.engine.store().get_session(&call_sid) {
        Some(session) => Json(session).into_response(),
        None => not_found("Call not found"),
    }
}

pub async fn call_events(
    State(state): State<AppState>,
    Path(call_sid): Path<String>,
) -> Json<serde_json::Value> {
    let events = state.engine.store().list_events(&call_sid);
    Json(json!({ "call_sid": call_sid, "events": events }))
}

pub async fn call_transcript(
    State(state): State<AppState>,
    Path(call_sid): Path<String>,
) -> Json<serde_json::Value> {
    let transcript = state.engine.store().list_transcript(&call_sid);
    Json(json!({ "call_sid": call_sid, "transcript": transcript }))
}

/// Cached audio URL for a scenario line. A null URL is not an error; it
/// means the line will be spoken as text.
pub async fn cached_audio(
    State(state): State<AppState>,
    Path((scenario_id, turn)): Path<(String, u32)>,
) -> Json<serde_json::Value> {
    let audio_url = state.engine.store().cached_audio_url(&scenario_id, turn);
    Json(json!({
        "scenario_id": scenario_id,
        "turn": turn,
        "audio_url": audio_url,
    }))
}

#[derive(Debug, Deserialize)]
pub struct CacheAudioRequest {
    pub scenario_id: String,
    pub turn: u32,
    pub audio_url: String,
}

/// Synthesis tooling registers generated audio here ahead of calls.
pub async fn cache_audio(
    State(state): State<AppState>,
    Json(request): Json<CacheAudioRequest>,
) -> Json<serde_json::Value> {
    state
        .engine
        .store()
        .cache_audio_url(&request.scenario_id, request.turn, &request.audio_url);
    Json(json!({ "status": "ok" }))
}

fn not_found(detail: &str) -> Response {
    (StatusCode::NOT_FOUND, Json(json!({ "detail": detail }))).into_response()
}
