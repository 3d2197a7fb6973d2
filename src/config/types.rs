use serde::Deserialize;

/// Main configuration structure for Parts-Validator
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub catalog: CatalogConfig,
    pub storage: StorageConfig,
}

/// Upstream parts catalog configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CatalogConfig {
    /// First page of the paginated parts listing
    #[serde(rename = "parts-url")]
    pub parts_url: String,

    /// Value sent in the `Client-ID` header
    #[serde(rename = "client-id", default)]
    pub client_id: String,

    /// Value sent in the `Authorization` header
    #[serde(default)]
    pub authorization: String,

    /// Pause between two page requests (seconds)
    #[serde(rename = "request-delay-secs", default = "default_request_delay_secs")]
    pub request_delay_secs: u64,

    /// Minimum time between two complete crawls (days)
    #[serde(
        rename = "recrawl-cooldown-days",
        default = "default_recrawl_cooldown_days"
    )]
    pub recrawl_cooldown_days: u32,
}

/// Local storage configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: String,

    /// Path to the crawl checkpoint file
    #[serde(rename = "checkpoint-path", default = "default_checkpoint_path")]
    pub checkpoint_path: String,
}

fn default_request_delay_secs() -> u64 {
    20
}

fn default_recrawl_cooldown_days() -> u32 {
    7
}

fn default_checkpoint_path() -> String {
    "./validator_status.json".to_string()
}
