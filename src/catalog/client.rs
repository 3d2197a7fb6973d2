//! HTTP client for the parts catalog
//!
//! This module handles all requests to the catalog, including:
//! - Building an HTTP client with credential headers attached
//! - Fetching a single page
//! - Extracting items, counters and the next link from the body
//! - Error classification

use crate::catalog::{CatalogError, Credentials, PageResult, ResponseMeta, CLIENT_ID_HEADER};
use crate::{ConfigError, ValidatorError};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION};
use reqwest::Client;
use serde_json::Value;
use url::Url;

/// Builds an HTTP client that sends the catalog credentials on every request
///
/// No request timeout is set: a stalled request stalls the crawl, which is
/// resumable from its last checkpoint.
///
/// # Example
///
/// ```no_run
/// use parts_validator::catalog::{build_http_client, Credentials};
///
/// let credentials = Credentials {
///     client_id: "my-client".to_string(),
///     authorization: "Bearer token".to_string(),
/// };
///
/// let client = build_http_client(&credentials).unwrap();
/// ```
pub fn build_http_client(credentials: &Credentials) -> Result<Client, ValidatorError> {
    let mut headers = HeaderMap::new();

    let mut client_id = HeaderValue::from_str(&credentials.client_id).map_err(|e| {
        ConfigError::InvalidCredential(format!("Client-ID header: {}", e))
    })?;
    client_id.set_sensitive(true);
    headers.insert(HeaderName::from_static(CLIENT_ID_HEADER), client_id);

    let mut authorization = HeaderValue::from_str(&credentials.authorization)
        .map_err(|e| ConfigError::InvalidCredential(format!("Authorization header: {}", e)))?;
    authorization.set_sensitive(true);
    headers.insert(AUTHORIZATION, authorization);

    let user_agent = format!("{}/{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));

    let client = Client::builder()
        .user_agent(user_agent)
        .default_headers(headers)
        .gzip(true)
        .brotli(true)
        .build()
        .map_err(CatalogError::Client)?;

    Ok(client)
}

/// Fetches catalog pages one at a time
#[derive(Debug, Clone)]
pub struct CatalogClient {
    client: Client,
}

impl CatalogClient {
    pub fn new(credentials: &Credentials) -> Result<Self, ValidatorError> {
        Ok(Self {
            client: build_http_client(credentials)?,
        })
    }

    /// Fetches and parses one page
    ///
    /// Network failures, non-success statuses and non-JSON bodies are
    /// errors. A JSON body missing any of the expected sections is not.
    pub async fn fetch(&self, url: &str) -> Result<PageResult, CatalogError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|source| CatalogError::Request {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            tracing::error!(
                "Catalog returned {} for {} (headers: {:?})",
                status,
                url,
                response.headers()
            );
            let body = response.text().await.unwrap_or_default();
            return Err(CatalogError::Status {
                url: url.to_string(),
                status: status.as_u16(),
                body,
            });
        }

        let body = response
            .text()
            .await
            .map_err(|source| CatalogError::Request {
                url: url.to_string(),
                source,
            })?;

        parse_page(url, &body)
    }
}

/// Extracts a page from a response body fetched from `url`
///
/// A relative `links.next` is resolved against `url`.
pub fn parse_page(url: &str, body: &str) -> Result<PageResult, CatalogError> {
    let json: Value = serde_json::from_str(body).map_err(|source| CatalogError::Decode {
        url: url.to_string(),
        source,
    })?;

    let meta = json.get("meta").filter(|m| m.is_object()).map(|m| ResponseMeta {
        total: m.get("total").and_then(Value::as_i64),
        offset: m.get("offset").and_then(Value::as_i64),
        limit: m.get("limit").and_then(Value::as_i64),
    });

    let items = match json.get("data") {
        Some(Value::Array(items)) => items.clone(),
        Some(Value::Null) | None => Vec::new(),
        Some(other) => {
            tracing::warn!("Ignoring non-array data section from {}: {}", url, other);
            Vec::new()
        }
    };

    let next_url = match json
        .get("links")
        .and_then(|links| links.get("next"))
        .and_then(Value::as_str)
    {
        Some(next) => Some(resolve_next(url, next)?),
        None => None,
    };

    Ok(PageResult {
        items,
        meta,
        next_url,
    })
}

fn resolve_next(base: &str, next: &str) -> Result<String, CatalogError> {
    let base_url = Url::parse(base).map_err(|e| CatalogError::InvalidUrl {
        url: base.to_string(),
        message: e.to_string(),
    })?;

    let resolved = base_url.join(next).map_err(|e| CatalogError::InvalidUrl {
        url: next.to_string(),
        message: e.to_string(),
    })?;

    Ok(resolved.to_string())
}
