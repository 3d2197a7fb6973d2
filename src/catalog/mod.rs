//! Catalog module for talking to the upstream parts API
//!
//! The catalog serves parts as JSON pages. Each page may carry:
//! - `meta` with `offset`, `total` and `limit` counters
//! - `data`, an array of part payloads
//! - `links.next`, the URL of the following page
//!
//! None of these is guaranteed to be present on every page.

mod client;

pub use client::{build_http_client, parse_page, CatalogClient};

use crate::config::CatalogConfig;
use serde_json::Value;
use thiserror::Error;

/// Header carrying the client identifier (`Client-ID`)
pub const CLIENT_ID_HEADER: &str = "client-id";

/// Errors raised while fetching a catalog page
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("HTTP error for {url}: {source}")]
    Request { url: String, source: reqwest::Error },

    #[error("Unexpected status {status} for {url}: {body}")]
    Status {
        url: String,
        status: u16,
        body: String,
    },

    #[error("Response from {url} is not JSON: {source}")]
    Decode {
        url: String,
        source: serde_json::Error,
    },

    #[error("Invalid URL {url}: {message}")]
    InvalidUrl { url: String, message: String },

    #[error("Failed to build HTTP client: {0}")]
    Client(reqwest::Error),
}

/// Credentials sent with every catalog request
#[derive(Clone)]
pub struct Credentials {
    pub client_id: String,
    pub authorization: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("client_id", &self.client_id)
            .field("authorization", &"<redacted>")
            .finish()
    }
}

impl From<&CatalogConfig> for Credentials {
    fn from(config: &CatalogConfig) -> Self {
        Self {
            client_id: config.client_id.clone(),
            authorization: config.authorization.clone(),
        }
    }
}

/// Pagination counters as reported by a single response
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResponseMeta {
    pub total: Option<i64>,
    pub offset: Option<i64>,
    pub limit: Option<i64>,
}

/// Parsed content of one catalog page
#[derive(Debug, Clone, Default)]
pub struct PageResult {
    /// Raw part payloads from `data`
    pub items: Vec<Value>,

    /// Counters from `meta`, if the page had any
    pub meta: Option<ResponseMeta>,

    /// Absolute URL of the next page
    pub next_url: Option<String>,
}
