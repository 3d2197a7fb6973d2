//! Parts-Validator main entry point
//!
//! This is the command-line interface for mirroring the parts catalog and
//! validating extracted component values against it.

use clap::Parser;
use parts_validator::config::{default_config_path, load_config_with_hash, Config};
use parts_validator::crawler::{crawl, CrawlState};
use parts_validator::storage::{open_storage, SqliteStorage};
use parts_validator::validator::validate_items;
use parts_validator::ValidatorError;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// Parts-Validator: mirror a parts catalog and validate component values
///
/// By default the catalog is crawled into the local database (resuming an
/// interrupted crawl, or skipping it if the last one is recent enough) and
/// every extracted item is then matched against the mirrored parts.
#[derive(Parser, Debug)]
#[command(name = "parts-validator")]
#[command(version)]
#[command(about = "Crawler for the parts database and validator of found parts", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(short, long, value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Skip the catalog crawl and validate only
    #[arg(long)]
    validate_only: bool,

    /// Show statistics from the database and exit
    #[arg(long, conflicts_with = "validate_only")]
    stats: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{}", e);
            ExitCode::from(e.exit_code())
        }
    }
}

async fn run(cli: Cli) -> Result<(), ValidatorError> {
    let config_path = cli.config.unwrap_or_else(default_config_path);

    tracing::info!("Loading configuration from: {}", config_path.display());
    let (config, hash) = load_config_with_hash(&config_path)?;
    tracing::info!("Configuration loaded successfully (hash: {})", hash);

    let mut storage = open_storage(Path::new(&config.storage.database_path))?;
    let show_progress = !cli.quiet;

    if cli.stats {
        return handle_stats(&config, &storage);
    }

    if !cli.validate_only {
        handle_crawl(&config, &mut storage, show_progress).await?;
    }

    handle_validate(&mut storage, show_progress)
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("parts_validator=info,warn"),
            1 => EnvFilter::new("parts_validator=debug,info"),
            2 => EnvFilter::new("parts_validator=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --stats mode: shows statistics from the database
fn handle_stats(config: &Config, storage: &SqliteStorage) -> Result<(), ValidatorError> {
    use parts_validator::checkpoint::CheckpointStore;
    use parts_validator::output::{load_statistics, print_statistics};

    println!("Database: {}", config.storage.database_path);
    println!("Checkpoint: {}\n", config.storage.checkpoint_path);

    let checkpoints = CheckpointStore::new(&config.storage.checkpoint_path);
    let stats = load_statistics(storage, &checkpoints)?;
    print_statistics(&stats);

    Ok(())
}

/// Handles the catalog crawl, stopping gracefully on SIGINT/SIGTERM
async fn handle_crawl(
    config: &Config,
    storage: &mut SqliteStorage,
    show_progress: bool,
) -> Result<(), ValidatorError> {
    tracing::info!("Building parts database from {}", config.catalog.parts_url);

    let cancel = CancellationToken::new();
    let crawl_done = CancellationToken::new();
    spawn_shutdown_listener(cancel.clone(), crawl_done.clone());

    let result = crawl(config, storage, cancel, show_progress).await;
    crawl_done.cancel();
    let report = result?;

    match report.state {
        CrawlState::Completed if report.was_skipped() => {}
        CrawlState::Completed => tracing::info!(
            "Parts database built: {} page(s), {} part(s) written",
            report.pages_fetched,
            report.records_written
        ),
        CrawlState::Interrupted => tracing::info!(
            "Crawl paused gracefully; {} page(s) will be resumed on the next run",
            report.pending_urls.len()
        ),
        other => tracing::debug!("Crawl ended in state {}", other),
    }

    Ok(())
}

/// Handles the validation pass over all extracted items
fn handle_validate(storage: &mut SqliteStorage, show_progress: bool) -> Result<(), ValidatorError> {
    tracing::info!("Validating parts against local database...");
    let summary = validate_items(storage, show_progress)?;

    tracing::info!(
        "{} item(s) checked: {} matched a part, {} had no candidates",
        summary.items,
        summary.matched,
        summary.without_candidates
    );

    Ok(())
}

/// Installs the process-wide stop signal handling
///
/// Once the tokio handlers are registered the default SIGINT behavior is
/// gone for good, so the listener stays alive and exits the process itself.
fn spawn_shutdown_listener(cancel: CancellationToken, crawl_done: CancellationToken) {
    tokio::spawn(async move {
        route_stop_signals(wait_for_stop_signal, cancel, crawl_done).await;
        tracing::warn!("Received stop signal, exiting immediately");
        std::process::exit(130);
    });
}

/// Returns once a stop signal should terminate the process
///
/// While the crawl runs, the first signal cancels it at the next page
/// boundary and the second one terminates. After `crawl_done` fires, the
/// first signal terminates.
async fn route_stop_signals<F, Fut>(
    mut next_signal: F,
    cancel: CancellationToken,
    crawl_done: CancellationToken,
) where
    F: FnMut() -> Fut,
    Fut: Future<Output = ()>,
{
    tokio::select! {
        biased;
        _ = crawl_done.cancelled() => {}
        _ = next_signal() => {
            tracing::warn!("Received stop signal, gracefully aborting after the current page");
            cancel.cancel();
        }
    }

    next_signal().await;
}

async fn wait_for_stop_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut terminate) => {
                tokio::select! {
                    result = tokio::signal::ctrl_c() => {
                        if let Err(e) = result {
                            tracing::warn!("Failed to listen for Ctrl-C: {}", e);
                            std::future::pending::<()>().await;
                        }
                    }
                    _ = terminate.recv() => {}
                }
                return;
            }
            Err(e) => tracing::warn!("Failed to listen for SIGTERM: {}", e),
        }
    }

    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
}
