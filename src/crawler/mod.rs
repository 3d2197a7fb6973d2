//! Crawler module for mirroring the parts catalog
//!
//! This module contains the crawl state machine, including:
//! - Cooldown between complete crawls
//! - Resumption from the last checkpoint
//! - Loop detection on misbehaving pagination
//! - Request pacing and cooperative cancellation

mod coordinator;
mod state;

pub use coordinator::{CrawlReport, CrawlSettings, Crawler};
pub use state::CrawlState;

use crate::config::Config;
use crate::storage::Storage;
use crate::ValidatorError;
use tokio_util::sync::CancellationToken;

/// Runs a complete crawl operation
///
/// This is the main entry point for mirroring the catalog. It will:
/// 1. Load the checkpoint and decide whether a crawl is due
/// 2. Fetch pages one at a time, upserting their parts
/// 3. Checkpoint after every page
/// 4. Stop when the catalog has no further pages or `cancel` fires
///
/// # Returns
///
/// * `Ok(CrawlReport)` - Crawl completed, was not due, or was interrupted
/// * `Err(ValidatorError)` - Crawl failed
pub async fn crawl<S>(
    config: &Config,
    storage: &mut S,
    cancel: CancellationToken,
    show_progress: bool,
) -> Result<CrawlReport, ValidatorError>
where
    S: Storage + ?Sized,
{
    let mut crawler = Crawler::from_config(config, storage, cancel)?.with_progress(show_progress);
    crawler.run().await
}
