//! Feedback records and submission validation.
//!
//! A submission is validated against the experiment it targets before any
//! entry exists; a valid submission then expands into one [`FeedbackEntry`]
//! per rated run, in submission order. Entries are append-only once written.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::CoreError;
use crate::experiment::Experiment;
use crate::ratings::{validate_ratings, Ratings};

/// One rated run within a submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerRunRating {
    pub run_id: String,
    pub variant_id: String,
    pub ratings: Ratings,
}

/// Incoming submission body. Transient: validated on arrival, expanded into
/// entries, never stored verbatim.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionRequest {
    pub winner_variant_id: String,
    #[serde(default)]
    pub reason: Option<String>,
    pub per_run: Vec<PerRunRating>,
}

/// One appended line in the feedback log.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackEntry {
    pub feedback_id: String,
    pub experiment_id: String,
    pub run_id: String,
    pub variant_id: String,
    pub ratings: Ratings,
    pub winner_variant_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub recorded_at: DateTime<Utc>,
}

/// Validate a submission against the experiment it targets.
///
/// Rejects before any entry is created: empty `perRun`, a winner that is
/// not a variant of the experiment, `(runId, variantId)` pairs that do not
/// name a variant, and out-of-range ratings.
pub fn validate_submission(
    experiment: &Experiment,
    submission: &SubmissionRequest,
) -> Result<(), CoreError> {
    if submission.per_run.is_empty() {
        return Err(CoreError::Validation("perRun must not be empty".into()));
    }
    if experiment.variant(&submission.winner_variant_id).is_none() {
        return Err(CoreError::Validation(format!(
            "unknown winner variant '{}'",
            submission.winner_variant_id
        )));
    }
    for item in &submission.per_run {
        if !experiment.matches_pair(&item.run_id, &item.variant_id) {
            return Err(CoreError::Validation(format!(
                "run '{}' does not belong to variant '{}' in this experiment",
                item.run_id, item.variant_id
            )));
        }
        validate_ratings(&item.ratings)?;
    }
    Ok(())
}

/// Expand a validated submission into feedback entries, one per `perRun`
/// item, preserving order.
pub fn build_entries(
    experiment: &Experiment,
    submission: &SubmissionRequest,
    recorded_at: DateTime<Utc>,
) -> Vec<FeedbackEntry> {
    submission
        .per_run
        .iter()
        .map(|item| FeedbackEntry {
            feedback_id: Uuid::new_v4().to_string(),
            experiment_id: experiment.experiment_id.clone(),
            run_id: item.run_id.clone(),
            variant_id: item.variant_id.clone(),
            ratings: item.ratings.clone(),
            winner_variant_id: submission.winner_variant_id.clone(),
            reason: submission.reason.clone(),
            recorded_at,
        })
        .collect()
}
