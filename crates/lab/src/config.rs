//! Lab server configuration.
//!
//! Parsed from CLI flags with environment fallbacks (`CM_LAB_*`), so both
//! interactive use and the invoking pipeline command can configure the
//! server the same way.

use std::path::PathBuf;

use clap::Parser;

/// Blind A/B comparison server for two generated video runs.
#[derive(Debug, Clone, Parser)]
#[command(name = "clipmill-lab", about = "Compare two generated video runs side by side")]
pub struct LabConfig {
    /// Directory of the baseline run.
    pub baseline_dir: PathBuf,

    /// Directory of the candidate run.
    pub variant_dir: PathBuf,

    /// Listen port; 0 picks an ephemeral port.
    #[arg(long, env = "CM_LAB_PORT", default_value_t = 0)]
    pub port: u16,

    /// Feedback log path (JSONL, append-only).
    #[arg(long, env = "CM_LAB_FEEDBACK_FILE", default_value = "lab-feedback.jsonl")]
    pub feedback_file: PathBuf,

    /// Additional directories assets may be served from. The two run
    /// directories are always allowed.
    #[arg(long = "allow-root")]
    pub allow_roots: Vec<PathBuf>,

    /// Do not open a browser at startup.
    #[arg(long, env = "CM_LAB_NO_OPEN")]
    pub no_open: bool,

    /// Exit with code 0 after the first successful submission.
    #[arg(long)]
    pub one_shot: bool,

    /// HTTP request timeout in seconds.
    #[arg(long, env = "CM_LAB_REQUEST_TIMEOUT_SECS", default_value_t = 30)]
    pub request_timeout_secs: u64,
}
