/*
 * Responsibility
 * - GET /info: what the current role rule snapshot looks like
 */
use axum::{Json, extract::State};

use crate::api::dto::info::InfoResponse;
use crate::state::AppState;

pub async fn info(State(state): State<AppState>) -> Json<InfoResponse> {
    let snapshot = state.registry.snapshot();
    Json(InfoResponse::new(state.registry.sources(), &snapshot))
}
