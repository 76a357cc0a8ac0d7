//! Call placement and the three provider webhooks.
//!
//! The webhook handlers answer synchronously with TwiML. Whatever goes wrong
//! mid-call, the response is always a complete document that either ends the
//! call or continues it; the provider is never left with an open-ended call.

use crate::{twiml, AppState};
use axum::extract::{Form, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::json;
use vishdrill_core::{CoreError, PlaceCallRequest};

/// Trigger an outbound training call.
pub async fn initiate_call(
    State(state): State<AppState>,
    Json(request): Json<PlaceCallRequest>,
) -> Response {
    match state.engine.place_call(&request).await {
        Ok(response) => Json(response).into_response(),
        Err(err @ (CoreError::ScenarioNotFound(_) | CoreError::InvalidPhoneNumber(_))) => (
            StatusCode::BAD_REQUEST,
            Json(json!({ "detail": err.to_string() })),
        )
            .into_response(),
        Err(err) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "detail": format!("Failed to initiate call: {err}") })),
        )
            .into_response(),
    }
}

/// Form body of the call-answered webhook.
#[derive(Debug, Deserialize)]
pub struct StartWebhookForm {
    #[serde(rename = "CallSid")]
    pub call_sid: String,
    #[serde(rename = "To", default)]
    pub to: Option<String>,
}

/// Call answered: play the opening line and start gathering.
pub async fn webhook_call_start(
    State(state): State<AppState>,
    Form(form): Form<StartWebhookForm>,
) -> Response {
    let directive = state
        .engine
        .on_call_answered(&form.call_sid, form.to.as_deref());
    xml_response(twiml::render(&directive))
}

/// Form body of the speech-gathered webhook. `SpeechResult` is absent or
/// empty when the gather timed out.
#[derive(Debug, Deserialize)]
pub struct GatherWebhookForm {
    #[serde(rename = "CallSid")]
    pub call_sid: String,
    #[serde(rename = "To", default)]
    pub to: Option<String>,
    #[serde(rename = "SpeechResult", default)]
    pub speech_result: String,
}

/// Speech gathered (or gather timed out): advance the script.
pub async fn webhook_gather_speech(
    State(state): State<AppState>,
    Form(form): Form<GatherWebhookForm>,
) -> Response {
    let directive =
        state
            .engine
            .on_speech_gathered(&form.call_sid, form.to.as_deref(), &form.speech_result);
    xml_response(twiml::render(&directive))
}

/// Form body of the status callback. Twilio sends numbers as strings.
#[derive(Debug, Deserialize)]
pub struct StatusWebhookForm {
    #[serde(rename = "CallSid")]
    pub call_sid: String,
    #[serde(rename = "CallStatus", default)]
    pub call_status: String,
    #[serde(rename = "CallDuration", default)]
    pub call_duration: Option<String>,
}

/// Provider status transition: acknowledgement only.
pub async fn webhook_status_update(
    State(state): State<AppState>,
    Form(form): Form<StatusWebhookForm>,
) -> Json<serde_json::Value> {
    let duration = form.call_duration.as_deref().and_then(|d| d.parse().ok());
    state
        .engine
        .on_status_changed(&form.call_sid, &form.call_status, duration);
    Json(json!({ "status": "ok" }))
}

fn xml_response(body: String) -> Response {
    ([(header::CONTENT_TYPE, "application/xml")], body).into_response()
}
