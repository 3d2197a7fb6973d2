//! Parts-Validator: a local mirror of a component catalog and a fuzzy validator
//!
//! This crate mirrors a paginated parts catalog into SQLite with a resumable,
//! checkpointed crawler, then matches free-text component values extracted
//! from design files against the mirrored manufacturer part numbers.

pub mod catalog;
pub mod checkpoint;
pub mod config;
pub mod crawler;
pub mod output;
pub mod storage;
pub mod validator;

use thiserror::Error;

/// Process exit codes, one per fatal error category
pub mod exit_codes {
    pub const SUCCESS: u8 = 0;
    pub const IO: u8 = 1;
    pub const CONFIG: u8 = 3;
    pub const TRANSPORT: u8 = 5;
    pub const NEXT_URL_LOOP: u8 = 6;
    pub const PERSISTENCE: u8 = 7;
    pub const CHECKPOINT: u8 = 8;
    pub const OFFSET_LOOP: u8 = 10;
}

/// The two ways a pagination loop shows up in catalog responses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopKind {
    /// The reported offset did not advance past the previous page
    OffsetNotAdvancing { previous: i64, received: i64 },

    /// The page links to itself as the next page
    SelfReferentialNext,
}

impl std::fmt::Display for LoopKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::OffsetNotAdvancing { previous, received } => write!(
                f,
                "offset {} is not greater than previous offset {}",
                received, previous
            ),
            Self::SelfReferentialNext => write!(f, "next link points at the same page"),
        }
    }
}

/// Main error type for Parts-Validator operations
#[derive(Debug, Error)]
pub enum ValidatorError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Catalog error: {0}")]
    Catalog(#[from] catalog::CatalogError),

    #[error("Loop detected at {url}: {kind}")]
    LoopDetected { url: String, kind: LoopKind },

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("Checkpoint error: {0}")]
    Checkpoint(#[from] checkpoint::CheckpointError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ValidatorError {
    /// Maps the error to the process exit status for its category
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Config(_) => exit_codes::CONFIG,
            Self::Catalog(_) => exit_codes::TRANSPORT,
            Self::LoopDetected {
                kind: LoopKind::OffsetNotAdvancing { .. },
                ..
            } => exit_codes::OFFSET_LOOP,
            Self::LoopDetected {
                kind: LoopKind::SelfReferentialNext,
                ..
            } => exit_codes::NEXT_URL_LOOP,
            Self::Storage(_) => exit_codes::PERSISTENCE,
            Self::Checkpoint(_) => exit_codes::CHECKPOINT,
            Self::Io(_) => exit_codes::IO,
        }
    }
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid credential header: {0}")]
    InvalidCredential(String),
}

/// Result type alias for Parts-Validator operations
pub type Result<T> = std::result::Result<T, ValidatorError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use checkpoint::{CheckpointStore, CrawlCheckpoint, PaginationMeta};
pub use config::Config;
pub use crawler::{CrawlReport, CrawlState, Crawler};
pub use validator::{best_match, MatchResult};
