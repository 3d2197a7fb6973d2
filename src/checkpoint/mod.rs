//! Checkpoint module for resumable crawls
//!
//! A checkpoint records which catalog pages are still pending, the last
//! pagination counters seen, and when the last complete crawl finished.
//! It is stored as a small versioned JSON document that is replaced
//! wholesale on every save.

mod store;

pub use store::CheckpointStore;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::catalog::ResponseMeta;

/// Current on-disk format version
pub const CHECKPOINT_VERSION: u32 = 1;

/// Errors that can occur while writing a checkpoint
#[derive(Debug, Error)]
pub enum CheckpointError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Pagination counters reported by the catalog
///
/// Every field is `-1` until the catalog has reported it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginationMeta {
    pub total: i64,
    pub offset: i64,
    pub limit: i64,
}

impl PaginationMeta {
    /// Counters for a crawl that has not seen any page yet
    pub fn unknown() -> Self {
        Self {
            total: -1,
            offset: -1,
            limit: -1,
        }
    }

    /// Returns true once an offset has been recorded
    pub fn has_offset(&self) -> bool {
        self.offset >= 0
    }

    /// Overwrites every counter the response carries, leaving the rest
    pub fn merge(&mut self, response: &ResponseMeta) {
        if let Some(total) = response.total {
            self.total = total;
        }
        if let Some(offset) = response.offset {
            self.offset = offset;
        }
        if let Some(limit) = response.limit {
            self.limit = limit;
        }
    }
}

impl Default for PaginationMeta {
    fn default() -> Self {
        Self::unknown()
    }
}

/// Persisted crawl progress
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrawlCheckpoint {
    pub version: u32,

    /// When the last complete crawl finished; absent while a crawl is in progress
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<PaginationMeta>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_urls: Option<Vec<String>>,
}

impl CrawlCheckpoint {
    /// Checkpoint for a crawl that is still in progress
    pub fn in_progress(pending_urls: Vec<String>, meta: PaginationMeta) -> Self {
        Self {
            version: CHECKPOINT_VERSION,
            finished: None,
            meta: Some(meta),
            next_urls: Some(pending_urls),
        }
    }

    /// Checkpoint for a crawl that ran to completion at `at`
    pub fn finished_at(at: DateTime<Utc>) -> Self {
        Self {
            version: CHECKPOINT_VERSION,
            finished: Some(at),
            meta: None,
            next_urls: None,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.finished.is_some()
    }

    /// URLs still waiting to be fetched, in queue order
    pub fn pending_urls(&self) -> &[String] {
        self.next_urls.as_deref().unwrap_or(&[])
    }

    /// Earliest time a new crawl may start, if the last one finished
    ///
    /// A cooldown reaching past the representable range saturates, so the
    /// crawl is never due again rather than overflowing.
    pub fn next_crawl_at(&self, cooldown: Duration) -> Option<DateTime<Utc>> {
        self.finished.map(|finished| {
            finished
                .checked_add_signed(cooldown)
                .unwrap_or(DateTime::<Utc>::MAX_UTC)
        })
    }
}
