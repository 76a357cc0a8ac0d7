//! Scenario listing for the training UI.

use crate::AppState;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

pub async fn list_scenarios(State(state): State<AppState>) -> Response {
    Json(state.engine.catalog().list()).into_response()
}

pub async fn get_scenario(
    State(state): State<AppState>,
    Path(scenario_id): Path<String>,
) -> Response {
    match state.engine.catalog().get(&scenario_id) {
        Ok(scenario) => Json(scenario).into_response(),
        Err(err) => (
            StatusCode::NOT_FOUND,
            Json(json!({ "detail": err.to_string() })),
        )
            .into_response(),
    }
}
