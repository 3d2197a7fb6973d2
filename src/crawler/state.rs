//! Crawl state definitions
//!
//! A crawl starts `Idle`, enters `Running` once the cooldown guard lets it
//! through, and ends in exactly one of the terminal states.

use std::fmt;

/// Represents the current state of a crawl run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CrawlState {
    /// Nothing has happened yet
    Idle,

    /// Pages are being fetched
    Running,

    // ===== Terminal States =====
    /// The queue drained, or the last crawl is still within its cooldown
    Completed,

    /// Stopped on request; the checkpoint holds the remaining queue
    Interrupted,

    /// Stopped on a fatal error
    Failed,
}

impl CrawlState {
    /// Returns true if the run can make no further progress
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Interrupted | Self::Failed)
    }

    /// Returns true for outcomes that are not errors
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Completed | Self::Interrupted)
    }
}

impl fmt::Display for CrawlState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Interrupted => "interrupted",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}
