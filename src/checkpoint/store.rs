//! File-backed checkpoint persistence
//!
//! Writes go to a sibling temp file which is synced and then renamed over
//! the checkpoint, so a reader never sees a half-written document.

use crate::checkpoint::{CheckpointError, CrawlCheckpoint, PaginationMeta, CHECKPOINT_VERSION};
use chrono::Utc;
use std::ffi::OsString;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Loads and saves the crawl checkpoint at a single well-known path
#[derive(Debug, Clone)]
pub struct CheckpointStore {
    path: PathBuf,
}

impl CheckpointStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the last persisted checkpoint
    ///
    /// A missing file means no prior state. An unreadable, unparsable or
    /// unknown-version file is logged and treated the same way.
    pub fn load(&self) -> Option<CrawlCheckpoint> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("No checkpoint at {}", self.path.display());
                return None;
            }
            Err(e) => {
                tracing::warn!(
                    "Failed to read checkpoint {}: {}; starting without one",
                    self.path.display(),
                    e
                );
                return None;
            }
        };

        let checkpoint: CrawlCheckpoint = match serde_json::from_str(&content) {
            Ok(checkpoint) => checkpoint,
            Err(e) => {
                tracing::warn!(
                    "Corrupt checkpoint {}: {}; starting without one",
                    self.path.display(),
                    e
                );
                return None;
            }
        };

        if checkpoint.version != CHECKPOINT_VERSION {
            tracing::warn!(
                "Checkpoint {} has unsupported version {}; starting without one",
                self.path.display(),
                checkpoint.version
            );
            return None;
        }

        Some(checkpoint)
    }

    /// Replaces the persisted checkpoint
    ///
    /// With `finished` set, the current time is stamped and the queue and
    /// counters are dropped; otherwise both are stored as given.
    pub fn save(
        &self,
        pending_urls: Vec<String>,
        meta: PaginationMeta,
        finished: bool,
    ) -> Result<(), CheckpointError> {
        let checkpoint = if finished {
            CrawlCheckpoint::finished_at(Utc::now())
        } else {
            CrawlCheckpoint::in_progress(pending_urls, meta)
        };
        self.write(&checkpoint)
    }

    /// Atomically writes `checkpoint` to disk
    pub fn write(&self, checkpoint: &CrawlCheckpoint) -> Result<(), CheckpointError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).map_err(|e| self.io_error(e))?;
            }
        }

        let serialized = serde_json::to_string_pretty(checkpoint)?;
        let temp_path = self.temp_path();

        let result = File::create(&temp_path)
            .and_then(|mut file| {
                file.write_all(serialized.as_bytes())?;
                file.sync_all()
            })
            .and_then(|()| fs::rename(&temp_path, &self.path));

        if let Err(e) = result {
            let _ = fs::remove_file(&temp_path);
            return Err(self.io_error(e));
        }

        tracing::trace!(
            "Saved checkpoint ({} pending, finished: {})",
            checkpoint.pending_urls().len(),
            checkpoint.is_finished()
        );
        Ok(())
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = OsString::from(self.path.as_os_str());
        name.push(".tmp");
        PathBuf::from(name)
    }

    fn io_error(&self, source: std::io::Error) -> CheckpointError {
        CheckpointError::Io {
            path: self.path.display().to_string(),
            source,
        }
    }
}
