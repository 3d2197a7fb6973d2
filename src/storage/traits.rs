//! Storage traits and error types
//!
//! This module defines the trait interface for storage backends and
//! associated error types.

use crate::storage::{CatalogPart, ItemRecord, PartRecord, UpsertOutcome};
use serde_json::Value;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Malformed part payload: {0}")]
    MalformedPayload(String),

    #[error("Item not found: {0}")]
    ItemNotFound(i64),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for storage backend implementations
///
/// This trait defines the record repository used by the crawler and the
/// item lookups used by the validation pass.
pub trait Storage {
    // ===== Part Management =====

    /// Inserts a part or replaces every field of the part with the same
    /// external id
    fn upsert_part(&mut self, part: &CatalogPart) -> StorageResult<UpsertOutcome>;

    /// Upserts a page of raw catalog payloads
    ///
    /// # Returns
    ///
    /// The number of parts inserted or updated. Parts that were found
    /// already present by a concurrent insert are not counted.
    fn upsert_parts(&mut self, payloads: &[Value]) -> StorageResult<usize> {
        let mut written = 0;
        for payload in payloads {
            let part = CatalogPart::from_payload(payload)?;
            if self.upsert_part(&part)?.is_write() {
                written += 1;
            }
        }
        Ok(written)
    }

    /// Gets a part by its catalog identifier
    fn get_part_by_external_id(&self, external_id: &str) -> StorageResult<Option<PartRecord>>;

    /// Gets every part whose MPN contains `query`, ignoring ASCII case
    fn find_candidates(&self, query: &str) -> StorageResult<Vec<PartRecord>>;

    /// Counts stored parts
    fn count_parts(&self) -> StorageResult<u64>;

    // ===== Item Management =====

    /// Records a component value extracted from a design file
    fn insert_item(&mut self, value: &str, source_file: Option<&str>) -> StorageResult<i64>;

    /// Gets all items in insertion order
    fn get_items(&self) -> StorageResult<Vec<ItemRecord>>;

    /// Links an item to the part it was resolved to
    fn link_item(&mut self, item_id: i64, part_id: i64) -> StorageResult<()>;

    /// Counts all items
    fn count_items(&self) -> StorageResult<u64>;

    /// Counts items linked to a part
    fn count_linked_items(&self) -> StorageResult<u64>;
}
