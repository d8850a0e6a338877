//! Route table for the lab server.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers;
use crate::state::AppState;

/// Build the full route tree.
///
/// ```text
/// /                               comparison UI
/// /api/config                     session bootstrap (token + experiment id)
/// /api/experiments/{id}           experiment metadata
/// /api/experiments/{id}/submit    rating submission (token required)
/// /assets/video                   gatekeeper-checked byte streaming
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::ui::index))
        .route("/api/config", get(handlers::config::get_config))
        .route("/api/experiments/{id}", get(handlers::experiments::get_experiment))
        .route(
            "/api/experiments/{id}/submit",
            post(handlers::experiments::submit),
        )
        .route("/assets/video", get(handlers::assets::stream_asset))
}
