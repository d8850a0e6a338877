//! Run discovery.
//!
//! A run is one previously generated pipeline output: a directory holding
//! the rendered video and, optionally, the script metadata the generation
//! step wrote next to it. Runs are built once at startup and are immutable
//! for the process lifetime.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use uuid::Uuid;

use crate::error::CoreError;

/// File extensions considered video material, matching what the render
/// step can produce.
const VIDEO_EXTENSIONS: [&str; 4] = ["mp4", "mov", "avi", "webm"];

/// Script metadata file written by the generation pipeline.
const SCRIPT_FILE: &str = "script.json";

#[derive(Debug, Clone)]
pub struct Run {
    pub run_id: String,
    pub directory: PathBuf,
    pub video_path: PathBuf,
    pub script_path: Option<PathBuf>,
    pub topic: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ScriptMeta {
    topic: Option<String>,
}

impl Run {
    /// Build a run from a generated output directory.
    ///
    /// The directory must exist and contain at least one video file; when
    /// several are present the lexicographically first wins. `script.json`
    /// is optional and tolerated if malformed (the topic is then absent).
    pub fn from_directory(dir: &Path) -> Result<Self, CoreError> {
        let directory = std::fs::canonicalize(dir).map_err(|err| {
            CoreError::Validation(format!("run directory {}: {err}", dir.display()))
        })?;

        let video_path = find_video(&directory)?;

        let script_candidate = directory.join(SCRIPT_FILE);
        let script_path = script_candidate.is_file().then_some(script_candidate);
        let topic = script_path.as_deref().and_then(read_topic);

        Ok(Self {
            run_id: Uuid::new_v4().to_string(),
            directory,
            video_path,
            script_path,
            topic,
        })
    }
}

fn find_video(dir: &Path) -> Result<PathBuf, CoreError> {
    let entries = std::fs::read_dir(dir)
        .map_err(|err| CoreError::Validation(format!("read {}: {err}", dir.display())))?;

    let mut videos: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.is_file()
                && path
                    .extension()
                    .and_then(|ext| ext.to_str())
                    .is_some_and(|ext| {
                        VIDEO_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str())
                    })
        })
        .collect();
    videos.sort();

    videos.into_iter().next().ok_or_else(|| {
        CoreError::Validation(format!("no video file found in {}", dir.display()))
    })
}

fn read_topic(path: &Path) -> Option<String> {
    let raw = std::fs::read_to_string(path).ok()?;
    match serde_json::from_str::<ScriptMeta>(&raw) {
        Ok(meta) => meta.topic,
        Err(err) => {
            tracing::debug!(script = %path.display(), %err, "script metadata is not valid JSON, ignoring");
            None
        }
    }
}
