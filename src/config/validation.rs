use crate::config::types::{CatalogConfig, Config, StorageConfig};
use crate::ConfigError;
use url::Url;

/// Longest accepted pause between two complete crawls (ten years)
pub const MAX_RECRAWL_COOLDOWN_DAYS: u32 = 3650;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_catalog_config(&config.catalog)?;
    validate_storage_config(&config.storage)?;
    Ok(())
}

/// Validates catalog configuration
fn validate_catalog_config(config: &CatalogConfig) -> Result<(), ConfigError> {
    validate_parts_url(&config.parts_url)?;

    if config.client_id.trim().is_empty() {
        return Err(ConfigError::Validation(format!(
            "client-id cannot be empty (set it in the config or via {})",
            crate::config::CLIENT_ID_ENV
        )));
    }

    if config.authorization.trim().is_empty() {
        return Err(ConfigError::Validation(format!(
            "authorization cannot be empty (set it in the config or via {})",
            crate::config::AUTH_TOKEN_ENV
        )));
    }

    // The upstream rate limit forbids back-to-back requests
    if config.request_delay_secs < 1 {
        return Err(ConfigError::Validation(format!(
            "request-delay-secs must be >= 1, got {}",
            config.request_delay_secs
        )));
    }

    if !(1..=MAX_RECRAWL_COOLDOWN_DAYS).contains(&config.recrawl_cooldown_days) {
        return Err(ConfigError::Validation(format!(
            "recrawl-cooldown-days must be between 1 and {}, got {}",
            MAX_RECRAWL_COOLDOWN_DAYS, config.recrawl_cooldown_days
        )));
    }

    Ok(())
}

fn validate_parts_url(parts_url: &str) -> Result<(), ConfigError> {
    let url = Url::parse(parts_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid parts-url '{}': {}", parts_url, e)))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidUrl(format!(
            "parts-url '{}' must use http or https",
            parts_url
        )));
    }

    Ok(())
}

/// Validates storage configuration
fn validate_storage_config(config: &StorageConfig) -> Result<(), ConfigError> {
    if config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database-path cannot be empty".to_string(),
        ));
    }

    if config.checkpoint_path.is_empty() {
        return Err(ConfigError::Validation(
            "checkpoint-path cannot be empty".to_string(),
        ));
    }

    Ok(())
}
