//! Crawler coordinator - main crawl orchestration logic
//!
//! This module contains the crawl loop that mirrors the catalog:
//! - Deciding whether a crawl is due, or resuming an interrupted one
//! - Fetching pages one at a time and detecting pagination loops
//! - Upserting page contents into storage
//! - Checkpointing after every page and pacing requests
//! - Stopping cleanly on cancellation

use crate::catalog::{CatalogClient, Credentials, PageResult};
use crate::checkpoint::{CheckpointStore, PaginationMeta};
use crate::config::{CatalogConfig, Config};
use crate::crawler::state::CrawlState;
use crate::output::progress::create_progress_bar;
use crate::storage::Storage;
use crate::{ConfigError, LoopKind, ValidatorError};
use chrono::{DateTime, Utc};
use indicatif::ProgressBar;
use std::collections::VecDeque;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use url::Url;

/// Tunables of a crawl run
#[derive(Debug, Clone)]
pub struct CrawlSettings {
    /// First page of the catalog listing
    pub start_url: String,

    /// Pause after each page while more pages are queued
    pub request_delay: Duration,

    /// Minimum time between two complete crawls
    pub cooldown: chrono::Duration,

    /// Draw a progress bar on the terminal
    pub show_progress: bool,
}

impl CrawlSettings {
    /// Derives settings from catalog configuration
    ///
    /// The start URL is normalized so it compares equal to the same URL
    /// coming back from the catalog as a next link.
    pub fn from_config(config: &CatalogConfig) -> Result<Self, ConfigError> {
        let start_url = Url::parse(&config.parts_url)
            .map_err(|e| ConfigError::InvalidUrl(format!("{}: {}", config.parts_url, e)))?;

        Ok(Self {
            start_url: start_url.to_string(),
            request_delay: Duration::from_secs(config.request_delay_secs),
            cooldown: chrono::Duration::days(i64::from(config.recrawl_cooldown_days)),
            show_progress: false,
        })
    }
}

/// Summary of a crawl run that did not fail
#[derive(Debug, Clone)]
pub struct CrawlReport {
    /// `Completed` or `Interrupted`
    pub state: CrawlState,

    /// Pages fetched during this run
    pub pages_fetched: usize,

    /// Parts inserted or updated during this run
    pub records_written: usize,

    /// Pages left for the next run
    pub pending_urls: Vec<String>,

    /// Set when the run was skipped because the last crawl is too recent
    pub next_crawl_at: Option<DateTime<Utc>>,
}

impl CrawlReport {
    fn up_to_date(next_crawl_at: DateTime<Utc>) -> Self {
        Self {
            state: CrawlState::Completed,
            pages_fetched: 0,
            records_written: 0,
            pending_urls: Vec::new(),
            next_crawl_at: Some(next_crawl_at),
        }
    }

    /// Returns true if the cooldown guard skipped the crawl
    pub fn was_skipped(&self) -> bool {
        self.next_crawl_at.is_some()
    }
}

/// Drives the paginated crawl of the catalog into storage
pub struct Crawler<'a, S: Storage + ?Sized> {
    client: CatalogClient,
    storage: &'a mut S,
    checkpoints: CheckpointStore,
    settings: CrawlSettings,
    cancel: CancellationToken,
    state: CrawlState,
    pages_fetched: usize,
    records_written: usize,
}

impl<'a, S: Storage + ?Sized> Crawler<'a, S> {
    pub fn new(
        client: CatalogClient,
        storage: &'a mut S,
        checkpoints: CheckpointStore,
        settings: CrawlSettings,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            client,
            storage,
            checkpoints,
            settings,
            cancel,
            state: CrawlState::Idle,
            pages_fetched: 0,
            records_written: 0,
        }
    }

    /// Creates a crawler with the client, checkpoint location and settings
    /// taken from `config`
    pub fn from_config(
        config: &Config,
        storage: &'a mut S,
        cancel: CancellationToken,
    ) -> Result<Self, ValidatorError> {
        let client = CatalogClient::new(&Credentials::from(&config.catalog))?;
        let checkpoints = CheckpointStore::new(&config.storage.checkpoint_path);
        let settings = CrawlSettings::from_config(&config.catalog)?;
        Ok(Self::new(client, storage, checkpoints, settings, cancel))
    }

    /// Shows or hides the terminal progress bar
    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.settings.show_progress = show_progress;
        self
    }

    pub fn state(&self) -> CrawlState {
        self.state
    }

    /// Runs the crawl until the queue drains, cancellation, or a fatal error
    ///
    /// On error the crawler ends in `Failed` and the checkpoint still
    /// describes the last fully processed page.
    pub async fn run(&mut self) -> Result<CrawlReport, ValidatorError> {
        match self.crawl().await {
            Ok(report) => {
                self.state = report.state;
                Ok(report)
            }
            Err(e) => {
                self.state = CrawlState::Failed;
                tracing::error!("Crawl failed: {}", e);
                Err(e)
            }
        }
    }

    async fn crawl(&mut self) -> Result<CrawlReport, ValidatorError> {
        let (mut queue, mut meta) = match self.checkpoints.load() {
            Some(checkpoint) if checkpoint.is_finished() => {
                if let Some(next_crawl_at) = checkpoint.next_crawl_at(self.settings.cooldown) {
                    if next_crawl_at > Utc::now() {
                        tracing::info!(
                            "Parts database is up to date; next crawl allowed after {}",
                            next_crawl_at
                        );
                        return Ok(CrawlReport::up_to_date(next_crawl_at));
                    }
                }
                tracing::info!("Cooldown elapsed, starting a new crawl");
                (self.seed_queue(), PaginationMeta::unknown())
            }
            Some(checkpoint) => {
                let meta = checkpoint.meta.unwrap_or_default();
                let queue = match checkpoint.next_urls {
                    Some(urls) => VecDeque::from(urls),
                    None => self.seed_queue(),
                };
                tracing::info!("Resuming crawl with {} pending page(s)", queue.len());
                (queue, meta)
            }
            None => {
                tracing::info!(
                    "No previous crawl found, starting from {}",
                    self.settings.start_url
                );
                (self.seed_queue(), PaginationMeta::unknown())
            }
        };

        self.state = CrawlState::Running;

        let progress = create_progress_bar(0, "Parts downloaded", self.settings.show_progress);
        if meta.total >= 0 {
            progress.set_length(meta.total as u64);
        }
        if meta.has_offset() {
            progress.set_position(meta.offset as u64);
        }

        let mut interrupted = false;
        while !queue.is_empty() {
            if self.cancel.is_cancelled() {
                interrupted = true;
                break;
            }

            let Some(url) = queue.pop_front() else {
                break;
            };

            self.process_page(&url, &mut queue, &mut meta, &progress).await?;

            if !queue.is_empty() {
                self.pace().await;
            }
        }

        progress.finish_and_clear();

        if interrupted {
            let pending_urls: Vec<String> = queue.into_iter().collect();
            self.checkpoints.save(pending_urls.clone(), meta, false)?;
            tracing::info!(
                "Crawl interrupted after {} page(s); {} page(s) left for the next run",
                self.pages_fetched,
                pending_urls.len()
            );
            return Ok(CrawlReport {
                state: CrawlState::Interrupted,
                pages_fetched: self.pages_fetched,
                records_written: self.records_written,
                pending_urls,
                next_crawl_at: None,
            });
        }

        self.checkpoints.save(Vec::new(), meta, true)?;
        tracing::info!(
            "Crawl completed: {} page(s), {} part(s) written",
            self.pages_fetched,
            self.records_written
        );

        Ok(CrawlReport {
            state: CrawlState::Completed,
            pages_fetched: self.pages_fetched,
            records_written: self.records_written,
            pending_urls: Vec::new(),
            next_crawl_at: None,
        })
    }

    fn seed_queue(&self) -> VecDeque<String> {
        VecDeque::from(vec![self.settings.start_url.clone()])
    }

    /// Fetches one page, stores its parts, queues its successor and
    /// checkpoints the result
    async fn process_page(
        &mut self,
        url: &str,
        queue: &mut VecDeque<String>,
        meta: &mut PaginationMeta,
        progress: &ProgressBar,
    ) -> Result<(), ValidatorError> {
        tracing::info!("Fetching: {}", url);
        let page = self.client.fetch(url).await?;
        self.pages_fetched += 1;

        check_offset(url, &page, meta)?;
        if let Some(response_meta) = &page.meta {
            meta.merge(response_meta);
            if meta.total >= 0 {
                progress.set_length(meta.total as u64);
            }
        }

        let written = self.storage.upsert_parts(&page.items)?;
        self.records_written += written;
        progress.inc(page.items.len() as u64);
        tracing::debug!(
            "Stored {} of {} part(s) from {}",
            written,
            page.items.len(),
            url
        );

        if let Some(next_url) = page.next_url {
            if next_url == url {
                return Err(ValidatorError::LoopDetected {
                    url: url.to_string(),
                    kind: LoopKind::SelfReferentialNext,
                });
            }
            queue.push_back(next_url);
        }

        self.checkpoints
            .save(queue.iter().cloned().collect(), *meta, false)?;

        Ok(())
    }

    /// Waits out the request delay, returning early on cancellation
    async fn pace(&self) {
        let delay = self.settings.request_delay;
        if delay.is_zero() {
            return;
        }

        tracing::debug!("Sleeping for {:?} until continuation", delay);
        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = self.cancel.cancelled() => {
                tracing::debug!("Pacing cut short by cancellation");
            }
        }
    }
}

/// Rejects a page whose offset does not move past the recorded one
fn check_offset(url: &str, page: &PageResult, meta: &PaginationMeta) -> Result<(), ValidatorError> {
    let Some(received) = page.meta.and_then(|m| m.offset) else {
        return Ok(());
    };

    if received <= meta.offset {
        return Err(ValidatorError::LoopDetected {
            url: url.to_string(),
            kind: LoopKind::OffsetNotAdvancing {
                previous: meta.offset,
                received,
            },
        });
    }

    Ok(())
}
