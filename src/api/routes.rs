/*
 * Responsibility
 * - URL layout of the gateway's own endpoints
 * - Everything here is merged outside the auth layers
 */
use axum::{Router, routing::get};

use crate::api::handlers::{health::health, info::info};
use crate::state::AppState;

pub fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/info", get(info))
}
