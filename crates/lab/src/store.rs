//! Append-only JSONL feedback store.
//!
//! Strict writer: one submission's entries are serialized into a single
//! buffer and appended under the store's write lock with one write + flush,
//! so concurrent appends never interleave within a group and a reader never
//! observes a partial group. Tolerant reader: [`read_all`] skips malformed
//! lines with a warning instead of aborting the scan.

use std::io::BufRead;
use std::path::{Path, PathBuf};

use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use clipmill_core::error::CoreError;
use clipmill_core::feedback::FeedbackEntry;

pub struct FeedbackStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FeedbackStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one submission's entries as a group.
    ///
    /// Returns the feedback ids in entry order. A write failure surfaces as
    /// [`CoreError::Storage`]; the store never retries on its own.
    pub async fn append(&self, entries: &[FeedbackEntry]) -> Result<Vec<String>, CoreError> {
        let mut buf = String::new();
        for entry in entries {
            let line = serde_json::to_string(entry)
                .map_err(|err| CoreError::Storage(format!("serialize feedback entry: {err}")))?;
            buf.push_str(&line);
            buf.push('\n');
        }

        let _guard = self.write_lock.lock().await;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await.map_err(|err| {
                    CoreError::Storage(format!("create feedback directory: {err}"))
                })?;
            }
        }

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|err| CoreError::Storage(format!("open feedback log: {err}")))?;

        file.write_all(buf.as_bytes())
            .await
            .map_err(|err| CoreError::Storage(format!("append feedback: {err}")))?;
        file.flush()
            .await
            .map_err(|err| CoreError::Storage(format!("flush feedback: {err}")))?;

        Ok(entries.iter().map(|e| e.feedback_id.clone()).collect())
    }
}

/// Scan a feedback log, yielding parsed entries lazily in file order.
///
/// Malformed or unreadable lines are skipped with a warning.
pub fn read_all(path: &Path) -> Result<impl Iterator<Item = FeedbackEntry>, CoreError> {
    let file = std::fs::File::open(path)
        .map_err(|err| CoreError::Storage(format!("open feedback log: {err}")))?;
    let reader = std::io::BufReader::new(file);

    Ok(reader.lines().filter_map(|line| {
        let line = match line {
            Ok(line) => line,
            Err(err) => {
                tracing::warn!(%err, "unreadable feedback line, skipping");
                return None;
            }
        };
        if line.trim().is_empty() {
            return None;
        }
        match serde_json::from_str(&line) {
            Ok(entry) => Some(entry),
            Err(err) => {
                tracing::warn!(%err, "malformed feedback line, skipping");
                None
            }
        }
    }))
}
