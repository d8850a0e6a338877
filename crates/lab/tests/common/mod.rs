#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{HeaderName, Request, Response, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use tower::ServiceExt;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

use clipmill_core::experiment::ExperimentRegistry;
use clipmill_core::paths::AllowedRoots;
use clipmill_core::run::Run;

use clipmill_lab::auth::{SessionToken, TOKEN_HEADER};
use clipmill_lab::handlers::experiments::REQUEST_ID_HEADER;
use clipmill_lab::idempotency::IdempotencyLedger;
use clipmill_lab::lifecycle::SubmissionSignal;
use clipmill_lab::routes;
use clipmill_lab::state::AppState;
use clipmill_lab::store::FeedbackStore;

/// Recognizable video bytes so range assertions can check exact slices.
pub const BASELINE_VIDEO: &[u8] = b"baseline-video-bytes-0123456789";
pub const VARIANT_VIDEO: &[u8] = b"variant-video-bytes-abcdefghij";

/// A fully wired lab server over temp directories, plus the handles tests
/// need to talk to it.
pub struct TestLab {
    pub app: Router,
    pub token: String,
    pub experiment_id: String,
    pub baseline_run_id: String,
    pub variant_run_id: String,
    pub baseline_video: PathBuf,
    pub variant_video: PathBuf,
    pub feedback_path: PathBuf,
    pub submitted: Arc<SubmissionSignal>,
    // Kept alive so the run directories and the escape target survive the test.
    pub root: tempfile::TempDir,
    pub outside: tempfile::TempDir,
}

/// Build the lab application over two freshly generated run directories.
///
/// Mirrors the router construction in `main.rs` so integration tests
/// exercise the same middleware stack (request ID, timeout, tracing, panic
/// recovery) that production uses.
pub fn build_lab() -> TestLab {
    build_lab_inner(false)
}

/// Like [`build_lab`], but a directory squats on the feedback path so every
/// append fails with a storage error.
pub fn build_lab_with_unwritable_store() -> TestLab {
    build_lab_inner(true)
}

fn build_lab_inner(unwritable_store: bool) -> TestLab {
    let root = tempfile::tempdir().unwrap();
    let outside = tempfile::tempdir().unwrap();
    std::fs::write(outside.path().join("secret.txt"), b"top secret").unwrap();

    let baseline_dir = root.path().join("run-a");
    let variant_dir = root.path().join("run-b");
    std::fs::create_dir(&baseline_dir).unwrap();
    std::fs::create_dir(&variant_dir).unwrap();
    std::fs::write(baseline_dir.join("video.mp4"), BASELINE_VIDEO).unwrap();
    std::fs::write(variant_dir.join("video.mp4"), VARIANT_VIDEO).unwrap();
    std::fs::write(
        baseline_dir.join("script.json"),
        br#"{"topic": "volcanoes"}"#,
    )
    .unwrap();

    let baseline = Run::from_directory(&baseline_dir).unwrap();
    let variant = Run::from_directory(&variant_dir).unwrap();
    let baseline_video = baseline.video_path.clone();
    let variant_video = variant.video_path.clone();

    let gatekeeper =
        AllowedRoots::new([baseline.directory.clone(), variant.directory.clone()]).unwrap();
    let registry = ExperimentRegistry::create(baseline, variant);
    let experiment = registry.current();

    let token = SessionToken::generate();
    let token_value = token.reveal().to_string();
    let feedback_path = root.path().join("feedback.jsonl");
    if unwritable_store {
        std::fs::create_dir(&feedback_path).unwrap();
    }
    let submitted = Arc::new(SubmissionSignal::default());

    let state = AppState {
        registry: Arc::new(registry),
        token: Arc::new(token),
        gatekeeper: Arc::new(gatekeeper),
        ledger: Arc::new(IdempotencyLedger::new()),
        store: Arc::new(FeedbackStore::new(&feedback_path)),
        submitted: Arc::clone(&submitted),
    };

    let request_id_header = HeaderName::from_static("x-request-id");

    let app = routes::router()
        .layer(CatchPanicLayer::new())
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(30),
        ))
        .layer(PropagateRequestIdLayer::new(request_id_header.clone()))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(SetRequestIdLayer::new(request_id_header, MakeRequestUuid))
        .with_state(state);

    TestLab {
        app,
        token: token_value,
        experiment_id: experiment.experiment_id.clone(),
        baseline_run_id: experiment.baseline().run.run_id.clone(),
        variant_run_id: experiment.candidate().run.run_id.clone(),
        baseline_video,
        variant_video,
        feedback_path,
        submitted,
        root,
        outside,
    }
}

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn get_with_range(app: Router, uri: &str, range: &str) -> Response<Body> {
    let request = Request::builder()
        .uri(uri)
        .header("range", range)
        .body(Body::empty())
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    response
        .into_body()
        .collect()
        .await
        .unwrap()
        .to_bytes()
        .to_vec()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = body_bytes(response).await;
    serde_json::from_slice(&bytes).unwrap()
}

/// A valid submission body rating both runs.
pub fn valid_submission(lab: &TestLab) -> serde_json::Value {
    serde_json::json!({
        "winnerVariantId": "variant",
        "reason": "tighter pacing",
        "perRun": [
            {
                "runId": lab.baseline_run_id,
                "variantId": "baseline",
                "ratings": {"overall": 70}
            },
            {
                "runId": lab.variant_run_id,
                "variantId": "variant",
                "ratings": {"overall": 80}
            }
        ]
    })
}

/// POST a submission, optionally with a token and idempotency key.
pub async fn post_submit(
    lab: &TestLab,
    token: Option<&str>,
    request_id: Option<&str>,
    body: &serde_json::Value,
) -> Response<Body> {
    let uri = format!("/api/experiments/{}/submit", lab.experiment_id);
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(token) = token {
        builder = builder.header(TOKEN_HEADER, token);
    }
    if let Some(request_id) = request_id {
        builder = builder.header(REQUEST_ID_HEADER, request_id);
    }
    let request = builder
        .body(Body::from(serde_json::to_vec(body).unwrap()))
        .unwrap();
    lab.app.clone().oneshot(request).await.unwrap()
}

/// Entries currently in the feedback log; empty when the file was never
/// written.
pub fn stored_entries(lab: &TestLab) -> Vec<clipmill_core::feedback::FeedbackEntry> {
    if !lab.feedback_path.exists() {
        return Vec::new();
    }
    clipmill_lab::store::read_all(&lab.feedback_path)
        .unwrap()
        .collect()
}
