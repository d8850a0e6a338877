//! Handler for the `/api/config` bootstrap endpoint.

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigResponse {
    pub token: String,
    pub experiment_id: String,
}

/// GET /api/config
///
/// Hands the session token (and the experiment id the UI should load) to
/// the browser client. Requires no token itself -- the bootstrap endpoint
/// cannot -- which is safe because the server only ever binds to loopback.
pub async fn get_config(State(state): State<AppState>) -> Json<ConfigResponse> {
    let experiment = state.registry.current();
    Json(ConfigResponse {
        token: state.token.reveal().to_string(),
        experiment_id: experiment.experiment_id.clone(),
    })
}
