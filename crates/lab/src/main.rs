use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::http::{HeaderName, StatusCode};
use clap::Parser;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use clipmill_core::experiment::ExperimentRegistry;
use clipmill_core::paths::AllowedRoots;
use clipmill_core::run::Run;

use clipmill_lab::auth::SessionToken;
use clipmill_lab::config::LabConfig;
use clipmill_lab::idempotency::IdempotencyLedger;
use clipmill_lab::lifecycle::{
    self, BrowserOpener, NoBrowser, StartupEnvelope, SubmissionSignal, SystemBrowser,
};
use clipmill_lab::routes;
use clipmill_lab::state::AppState;
use clipmill_lab::store::FeedbackStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    // Logs go to stderr; stdout carries only the startup envelope.
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "clipmill_lab=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    // --- Configuration ---
    let config = LabConfig::parse();

    // --- Runs + experiment ---
    let baseline = Run::from_directory(&config.baseline_dir).context("baseline run")?;
    let variant = Run::from_directory(&config.variant_dir).context("variant run")?;
    tracing::info!(
        baseline = %baseline.directory.display(),
        variant = %variant.directory.display(),
        "Runs resolved",
    );

    // --- Allowed roots ---
    // The two run directories are always servable; extra roots come from
    // configuration. Missing roots abort here, before any listener exists.
    let mut roots = vec![baseline.directory.clone(), variant.directory.clone()];
    roots.extend(config.allow_roots.iter().cloned());
    let gatekeeper = AllowedRoots::new(roots).context("allowed roots")?;

    let registry = ExperimentRegistry::create(baseline, variant);
    let experiment = registry.current();

    // --- App state ---
    let state = AppState {
        registry: Arc::new(registry),
        token: Arc::new(SessionToken::generate()),
        gatekeeper: Arc::new(gatekeeper),
        ledger: Arc::new(IdempotencyLedger::new()),
        store: Arc::new(FeedbackStore::new(&config.feedback_file)),
        submitted: Arc::new(SubmissionSignal::default()),
    };
    let submitted = Arc::clone(&state.submitted);

    // --- Request ID header name ---
    let request_id_header = HeaderName::from_static("x-request-id");

    // --- Router ---
    let app = routes::router()
        // -- Middleware stack (applied bottom-up) --
        // Panic recovery: catch panics and return 500.
        .layer(CatchPanicLayer::new())
        // Request timeout.
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(config.request_timeout_secs),
        ))
        // Propagate request ID to response.
        .layer(PropagateRequestIdLayer::new(request_id_header.clone()))
        // Structured request/response tracing.
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        // Set request ID on incoming requests.
        .layer(SetRequestIdLayer::new(request_id_header, MakeRequestUuid))
        // Shared state.
        .with_state(state);

    // --- Bind ---
    // Loopback only; the session token is the auth boundary on top of that.
    let addr = SocketAddr::from(([127, 0, 0, 1], config.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    let local_addr = listener.local_addr().context("resolve local address")?;
    let url = format!("http://{local_addr}");
    tracing::info!(%url, one_shot = config.one_shot, "Lab server listening");

    // --- Startup envelope (stdout, one line) ---
    let envelope = StartupEnvelope {
        url: url.clone(),
        experiment_id: experiment.experiment_id.clone(),
        baseline_run_id: experiment.baseline().run.run_id.clone(),
        variant_run_id: experiment.candidate().run.run_id.clone(),
    };
    println!(
        "{}",
        serde_json::to_string(&envelope).context("serialize startup envelope")?
    );

    // --- Browser ---
    let opener: Box<dyn BrowserOpener> = if config.no_open {
        Box::new(NoBrowser)
    } else {
        Box::new(SystemBrowser)
    };
    if let Err(err) = opener.open(&url) {
        tracing::warn!(%err, "Could not open a browser, continuing headless");
    }

    // --- Serve ---
    // Graceful shutdown drains in-flight requests, so a submission that is
    // mid-append finishes before the process exits. The drain is capped at
    // SHUTDOWN_GRACE so a stalled client cannot hold the process open.
    let (drained_tx, drained_rx) = tokio::sync::oneshot::channel();
    let server = axum::serve(listener, app).with_graceful_shutdown(async move {
        lifecycle::shutdown_trigger(config.one_shot, submitted).await;
        let _ = drained_tx.send(());
    });

    tokio::select! {
        result = server => result.context("server error")?,
        () = lifecycle::drain_deadline(drained_rx, lifecycle::SHUTDOWN_GRACE) => {
            tracing::warn!("Shutdown grace period elapsed with requests still in flight");
        }
    }

    tracing::info!("Lab server stopped");
    Ok(())
}
