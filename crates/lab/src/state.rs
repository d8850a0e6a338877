use std::sync::Arc;

use clipmill_core::experiment::ExperimentRegistry;
use clipmill_core::paths::AllowedRoots;

use crate::auth::SessionToken;
use crate::handlers::experiments::SubmitResponse;
use crate::idempotency::IdempotencyLedger;
use crate::lifecycle::SubmissionSignal;
use crate::store::FeedbackStore;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Built once at startup and cheaply cloneable; everything mutable lives
/// inside the ledger, the store's write lock, and the submission signal.
#[derive(Clone)]
pub struct AppState {
    /// The single experiment for this process.
    pub registry: Arc<ExperimentRegistry>,
    /// Per-process session token required on mutating requests.
    pub token: Arc<SessionToken>,
    /// Allow-list every served file must resolve under.
    pub gatekeeper: Arc<AllowedRoots>,
    /// Single-flight deduplication for submissions.
    pub ledger: Arc<IdempotencyLedger<SubmitResponse>>,
    /// Append-only feedback log.
    pub store: Arc<FeedbackStore>,
    /// Fired on the first successful submission (one-shot mode).
    pub submitted: Arc<SubmissionSignal>,
}
