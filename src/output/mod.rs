//! Output module for progress reporting and statistics
//!
//! This module handles:
//! - Progress bars for the crawl and validation passes
//! - Loading and printing mirror statistics

pub mod progress;
pub mod stats;

pub use progress::create_progress_bar;
pub use stats::{load_statistics, print_statistics, CheckpointStatus, MirrorStatistics};
