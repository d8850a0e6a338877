//! Process lifecycle: startup envelope, browser launch, shutdown triggers.
//!
//! OS-level side effects (spawning a browser, waiting on signals) live here
//! behind small seams so the experiment and feedback logic stays testable
//! without a display or a real signal handler.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{oneshot, Notify};

/// Bound on how long graceful shutdown waits for in-flight requests.
pub const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

/// Machine-readable startup envelope printed to stdout for the invoking
/// command. Logs go to stderr so this stays the only stdout line.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StartupEnvelope {
    pub url: String,
    pub experiment_id: String,
    pub baseline_run_id: String,
    pub variant_run_id: String,
}

/// Signals the first successful submission to the lifecycle controller.
///
/// `fire` is idempotent; only the first call wakes the waiter, and a fire
/// that happens before anyone waits is not lost.
#[derive(Default)]
pub struct SubmissionSignal {
    notify: Notify,
    fired: AtomicBool,
}

impl SubmissionSignal {
    pub fn fire(&self) {
        if !self.fired.swap(true, Ordering::SeqCst) {
            self.notify.notify_one();
        }
    }

    pub fn fired(&self) -> bool {
        self.fired.load(Ordering::SeqCst)
    }

    pub async fn wait(&self) {
        if self.fired() {
            return;
        }
        self.notify.notified().await;
    }
}

/// Opens a URL in the operator's browser.
pub trait BrowserOpener: Send + Sync {
    fn open(&self, url: &str) -> std::io::Result<()>;
}

/// Spawns the platform opener without waiting for it to exit.
pub struct SystemBrowser;

impl BrowserOpener for SystemBrowser {
    #[cfg(target_os = "macos")]
    fn open(&self, url: &str) -> std::io::Result<()> {
        std::process::Command::new("open").arg(url).spawn().map(|_| ())
    }

    #[cfg(target_os = "windows")]
    fn open(&self, url: &str) -> std::io::Result<()> {
        std::process::Command::new("cmd")
            .args(["/C", "start", "", url])
            .spawn()
            .map(|_| ())
    }

    #[cfg(all(unix, not(target_os = "macos")))]
    fn open(&self, url: &str) -> std::io::Result<()> {
        std::process::Command::new("xdg-open")
            .arg(url)
            .spawn()
            .map(|_| ())
    }
}

/// No-op opener for `--no-open` and tests.
pub struct NoBrowser;

impl BrowserOpener for NoBrowser {
    fn open(&self, _url: &str) -> std::io::Result<()> {
        Ok(())
    }
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix) so the server shuts
/// down cleanly whether stopped interactively or by a process manager.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}

/// The future that ends the serve loop: a termination signal always, and
/// in one-shot mode the first successful submission as well.
pub async fn shutdown_trigger(one_shot: bool, submitted: Arc<SubmissionSignal>) {
    if one_shot {
        tokio::select! {
            () = shutdown_signal() => {}
            () = submitted.wait() => {
                tracing::info!("First submission recorded, shutting down (one-shot mode)");
            }
        }
    } else {
        shutdown_signal().await;
    }
}

/// Caps the drain of in-flight requests after shutdown has been triggered.
///
/// Resolves `grace` after the trigger reports in. Pends forever while the
/// trigger is still armed, and also when the serve loop finishes first and
/// drops the sender, so racing this against the serve future never cuts a
/// normal shutdown short.
pub async fn drain_deadline(triggered: oneshot::Receiver<()>, grace: Duration) {
    if triggered.await.is_ok() {
        tokio::time::sleep(grace).await;
    } else {
        std::future::pending::<()>().await;
    }
}
