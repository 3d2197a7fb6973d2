use crate::config::types::Config;
use crate::config::validation::validate;
use crate::ConfigError;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

/// Environment variable overriding `catalog.client-id`
pub const CLIENT_ID_ENV: &str = "CATALOG_CLIENT_ID";

/// Environment variable overriding `catalog.authorization`
pub const AUTH_TOKEN_ENV: &str = "CATALOG_AUTH_TOKEN";

const LOCAL_CONFIG_PATH: &str = "config/validator.toml";
const DEFAULT_CONFIG_PATH: &str = "config/default_validator.toml";

/// Picks the configuration file used when none is given on the command line
///
/// A local `config/validator.toml` wins over the checked-in
/// `config/default_validator.toml`.
pub fn default_config_path() -> PathBuf {
    let local = PathBuf::from(LOCAL_CONFIG_PATH);
    if local.exists() {
        local
    } else {
        PathBuf::from(DEFAULT_CONFIG_PATH)
    }
}

/// Loads and parses a configuration file from the given path
///
/// Credentials from the environment replace the ones in the file before
/// validation runs.
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
///
/// # Returns
///
/// * `Ok(Config)` - Successfully loaded and validated configuration
/// * `Err(ConfigError)` - Failed to load, parse, or validate the configuration
///
/// # Example
///
/// ```no_run
/// use std::path::Path;
/// use parts_validator::config::load_config;
///
/// let config = load_config(Path::new("config/validator.toml")).unwrap();
/// println!("Database: {}", config.storage.database_path);
/// ```
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;

    let mut config: Config = toml::from_str(&content)?;

    apply_env_overrides(&mut config, |key| std::env::var(key).ok());

    validate(&config)?;

    Ok(config)
}

/// Replaces catalog credentials with values found through `lookup`
///
/// Empty values are ignored so an exported-but-blank variable does not wipe
/// a credential from the file.
pub fn apply_env_overrides<F>(config: &mut Config, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(client_id) = lookup(CLIENT_ID_ENV).filter(|v| !v.is_empty()) {
        tracing::debug!("Using client id from {}", CLIENT_ID_ENV);
        config.catalog.client_id = client_id;
    }

    if let Some(token) = lookup(AUTH_TOKEN_ENV).filter(|v| !v.is_empty()) {
        tracing::debug!("Using authorization from {}", AUTH_TOKEN_ENV);
        config.catalog.authorization = token;
    }
}

/// Computes a SHA-256 hash of the configuration file content
///
/// # Returns
///
/// * `Ok(String)` - Hex-encoded SHA-256 hash of the file content
/// * `Err(ConfigError)` - Failed to read the file
pub fn compute_config_hash(path: &Path) -> Result<String, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    let result = hasher.finalize();
    Ok(hex::encode(result))
}

/// Loads a configuration and returns both the config and its hash
pub fn load_config_with_hash(path: &Path) -> Result<(Config, String), ConfigError> {
    let config = load_config(path)?;
    let hash = compute_config_hash(path)?;
    Ok((config, hash))
}
