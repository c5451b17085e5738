/*
 * Responsibility
 * - GET /health (liveness + whether any role rules are loaded)
 * - Public: bypasses authentication / authz
 */
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde_json::json;

use crate::state::AppState;

pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(json!({
            "status": "ok",
            "rules_loaded": state.registry.has_rules(),
        })),
    )
}
