//! Handlers for the `/api/experiments` resource.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::Json;
use chrono::Utc;
use serde::Serialize;

use clipmill_core::error::CoreError;
use clipmill_core::experiment::{Experiment, VariantLabel};
use clipmill_core::feedback::{build_entries, validate_submission, SubmissionRequest};

use crate::auth::RequireToken;
use crate::error::{AppError, AppResult};
use crate::idempotency::Outcome;
use crate::state::AppState;

/// Header carrying the client's idempotency key on retryable requests.
pub const REQUEST_ID_HEADER: &str = "x-cm-lab-request-id";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VariantSummary {
    pub variant_id: String,
    pub label: VariantLabel,
    pub run_id: String,
    pub video_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExperimentResponse {
    pub experiment_id: String,
    pub variants: Vec<VariantSummary>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitResponse {
    pub feedback_ids: Vec<String>,
}

fn lookup(state: &AppState, experiment_id: &str) -> AppResult<Arc<Experiment>> {
    state.registry.get(experiment_id).ok_or_else(|| {
        AppError::Core(CoreError::NotFound {
            entity: "Experiment",
            id: experiment_id.to_string(),
        })
    })
}

/// GET /api/experiments/{id}
///
/// Experiment metadata for the comparison client. Unauthenticated by
/// design: loopback-only, read-only, the operator's own data.
pub async fn get_experiment(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<ExperimentResponse>> {
    let experiment = lookup(&state, &id)?;

    let variants = experiment
        .variants
        .iter()
        .map(|v| VariantSummary {
            variant_id: v.variant_id.clone(),
            label: v.label,
            run_id: v.run.run_id.clone(),
            video_path: v.run.video_path.display().to_string(),
            topic: v.run.topic.clone(),
        })
        .collect();

    Ok(Json(ExperimentResponse {
        experiment_id: experiment.experiment_id.clone(),
        variants,
    }))
}

/// POST /api/experiments/{id}/submit
///
/// Token-gated. An `X-CM-LAB-REQUEST-ID` header makes retries safe: a
/// replay returns the originally recorded feedback ids without appending
/// again. All entries of one submission are appended as one group.
pub async fn submit(
    _token: RequireToken,
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(submission): Json<SubmissionRequest>,
) -> AppResult<Json<SubmitResponse>> {
    let experiment = lookup(&state, &id)?;
    validate_submission(&experiment, &submission)?;

    let request_id = headers
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty());

    let store = Arc::clone(&state.store);
    let target = Arc::clone(&experiment);
    let outcome = state
        .ledger
        .execute(request_id, || async move {
            let entries = build_entries(&target, &submission, Utc::now());
            let feedback_ids = store.append(&entries).await?;
            Ok::<_, AppError>(SubmitResponse { feedback_ids })
        })
        .await?;

    let response = match outcome {
        Outcome::Executed(response) => {
            tracing::info!(
                experiment_id = %experiment.experiment_id,
                entries = response.feedback_ids.len(),
                "Feedback recorded",
            );
            response
        }
        Outcome::Replayed(response) => {
            tracing::info!(
                experiment_id = %experiment.experiment_id,
                "Duplicate request replayed without side effects",
            );
            response
        }
    };

    state.submitted.fire();

    Ok(Json(response))
}
