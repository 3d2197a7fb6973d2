//! Storage module for the local parts mirror
//!
//! This module handles all database operations, including:
//! - SQLite database initialization and schema management
//! - Upserting catalog parts keyed by their external id
//! - Substring lookup of candidate parts
//! - Item records and their resolved part links

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteStorage;
pub use traits::{Storage, StorageError, StorageResult};

use crate::ValidatorError;
use serde_json::Value;
use std::path::Path;

/// Initializes or opens a storage database
pub fn open_storage(path: &Path) -> Result<SqliteStorage, ValidatorError> {
    SqliteStorage::new(path)
}

/// A part as delivered by the catalog, before it is stored
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogPart {
    pub external_id: String,
    pub mpn: String,
    pub manufacturer: String,
    pub description: String,
    pub datasheet: String,
}

impl CatalogPart {
    /// Extracts the canonical fields from a raw catalog payload
    ///
    /// The payload must carry an `id` (string or number) and an
    /// `attributes.mpn` string. The remaining attributes default to an
    /// empty string when missing or null.
    pub fn from_payload(payload: &Value) -> StorageResult<Self> {
        let external_id = match payload.get("id") {
            Some(Value::String(id)) => id.clone(),
            Some(Value::Number(id)) => id.to_string(),
            _ => {
                return Err(StorageError::MalformedPayload(format!(
                    "missing id in {}",
                    payload
                )))
            }
        };

        let attributes = payload
            .get("attributes")
            .filter(|a| a.is_object())
            .ok_or_else(|| {
                StorageError::MalformedPayload(format!(
                    "missing attributes for part {}",
                    external_id
                ))
            })?;

        let mpn = attributes
            .get("mpn")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                StorageError::MalformedPayload(format!("missing mpn for part {}", external_id))
            })?
            .to_string();

        let text = |key: &str| {
            attributes
                .get(key)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string()
        };

        Ok(Self {
            external_id,
            mpn,
            manufacturer: text("manufacturer"),
            description: text("description"),
            datasheet: text("datasheet"),
        })
    }
}

/// Represents a part in the database
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartRecord {
    pub id: i64,
    pub external_id: String,
    pub mpn: String,
    pub manufacturer: String,
    pub description: String,
    pub datasheet: String,
    pub updated_at: String,
}

/// Represents an extracted component value in the database
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemRecord {
    pub id: i64,
    pub value: String,
    pub source_file: Option<String>,
    pub part_id: Option<i64>,
}

/// What an upsert did to the store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    Updated,
    /// A concurrent insert won the race for the same external id
    AlreadyPresent,
}

impl UpsertOutcome {
    /// Returns true if this call wrote the record
    pub fn is_write(&self) -> bool {
        matches!(self, Self::Inserted | Self::Updated)
    }
}
