//! Configuration module for Parts-Validator
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use parts_validator::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("config/validator.toml")).unwrap();
//! println!("Crawling from: {}", config.catalog.parts_url);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{CatalogConfig, Config, StorageConfig};

// Re-export parser functions
pub use parser::{
    apply_env_overrides, compute_config_hash, default_config_path, load_config,
    load_config_with_hash, AUTH_TOKEN_ENV, CLIENT_ID_ENV,
};
