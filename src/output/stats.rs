//! Statistics about the local parts mirror
//!
//! This module provides functionality for extracting and displaying
//! mirror and validation statistics from the storage layer and checkpoint.

use crate::checkpoint::CheckpointStore;
use crate::storage::Storage;
use crate::ValidatorError;
use chrono::{DateTime, Utc};

/// Crawl progress as recorded in the checkpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckpointStatus {
    /// No usable checkpoint exists
    None,

    /// A crawl was interrupted and can be resumed
    InProgress {
        pending_urls: usize,
        offset: i64,
        total: i64,
    },

    /// The last crawl ran to completion
    Finished { at: DateTime<Utc> },
}

impl std::fmt::Display for CheckpointStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::None => write!(f, "no crawl recorded"),
            Self::InProgress {
                pending_urls,
                offset,
                total,
            } => {
                write!(f, "in progress, {} pending page(s)", pending_urls)?;
                if *offset >= 0 && *total >= 0 {
                    write!(f, ", offset {} of {}", offset, total)?;
                }
                Ok(())
            }
            Self::Finished { at } => write!(f, "finished at {}", at.to_rfc3339()),
        }
    }
}

/// Mirror statistics summary
#[derive(Debug, Clone)]
pub struct MirrorStatistics {
    /// Number of mirrored parts
    pub total_parts: u64,

    /// Number of extracted items
    pub total_items: u64,

    /// Number of items linked to a part
    pub linked_items: u64,

    pub checkpoint: CheckpointStatus,
}

impl MirrorStatistics {
    /// Share of items linked to a part, in percent
    pub fn match_rate(&self) -> f64 {
        if self.total_items > 0 {
            (self.linked_items as f64 / self.total_items as f64) * 100.0
        } else {
            0.0
        }
    }
}

/// Loads statistics from storage and the checkpoint file
pub fn load_statistics(
    storage: &dyn Storage,
    checkpoints: &CheckpointStore,
) -> Result<MirrorStatistics, ValidatorError> {
    let checkpoint = match checkpoints.load() {
        None => CheckpointStatus::None,
        Some(cp) => match cp.finished {
            Some(at) => CheckpointStatus::Finished { at },
            None => {
                let meta = cp.meta.unwrap_or_default();
                CheckpointStatus::InProgress {
                    pending_urls: cp.pending_urls().len(),
                    offset: meta.offset,
                    total: meta.total,
                }
            }
        },
    };

    Ok(MirrorStatistics {
        total_parts: storage.count_parts()?,
        total_items: storage.count_items()?,
        linked_items: storage.count_linked_items()?,
        checkpoint,
    })
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &MirrorStatistics) {
    println!("=== Parts Mirror Statistics ===\n");

    println!("Mirror:");
    println!("  Parts stored: {}", stats.total_parts);
    println!("  Crawl: {}", stats.checkpoint);
    println!();

    println!("Validation:");
    println!("  Items: {}", stats.total_items);
    println!(
        "  Linked: {} ({:.1}%)",
        stats.linked_items,
        stats.match_rate()
    );
}
