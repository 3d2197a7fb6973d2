//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the Storage trait.

use crate::storage::schema::initialize_schema;
use crate::storage::traits::{Storage, StorageError, StorageResult};
use crate::storage::{CatalogPart, ItemRecord, PartRecord, UpsertOutcome};
use crate::ValidatorError;
use chrono::Utc;
use rusqlite::{params, Connection, ErrorCode, OptionalExtension, Row};
use std::path::Path;

const PART_COLUMNS: &str =
    "id, external_id, mpn, manufacturer, description, datasheet, updated_at";

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Opens or creates the database at `path` and ensures the schema exists
    pub fn new(path: &Path) -> Result<Self, ValidatorError> {
        let conn = Connection::open(path).map_err(StorageError::from)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA temp_store = MEMORY;
        ",
        )
        .map_err(StorageError::from)?;

        initialize_schema(&conn).map_err(StorageError::from)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database (for testing)
    #[cfg(test)]
    pub fn new_in_memory() -> Result<Self, ValidatorError> {
        let conn = Connection::open_in_memory().map_err(StorageError::from)?;
        conn.execute_batch("PRAGMA foreign_keys = ON;").map_err(StorageError::from)?;
        initialize_schema(&conn).map_err(StorageError::from)?;
        Ok(Self { conn })
    }
}

fn part_from_row(row: &Row<'_>) -> rusqlite::Result<PartRecord> {
    Ok(PartRecord {
        id: row.get(0)?,
        external_id: row.get(1)?,
        mpn: row.get(2)?,
        manufacturer: row.get(3)?,
        description: row.get(4)?,
        datasheet: row.get(5)?,
        updated_at: row.get(6)?,
    })
}

/// Returns true if `err` is a UNIQUE constraint failure
fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.code == ErrorCode::ConstraintViolation
                && e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}

/// Escapes LIKE wildcards so `query` is matched literally
fn escape_like(query: &str) -> String {
    let mut escaped = String::with_capacity(query.len());
    for c in query.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

impl Storage for SqliteStorage {
    // ===== Part Management =====

    fn upsert_part(&mut self, part: &CatalogPart) -> StorageResult<UpsertOutcome> {
        let now = Utc::now().to_rfc3339();
        let tx = self.conn.transaction()?;

        let existing: Option<i64> = tx
            .query_row(
                "SELECT id FROM parts WHERE external_id = ?1",
                params![part.external_id],
                |row| row.get(0),
            )
            .optional()?;

        let outcome = match existing {
            Some(id) => {
                tx.execute(
                    "UPDATE parts SET mpn = ?1, manufacturer = ?2, description = ?3,
                     datasheet = ?4, updated_at = ?5 WHERE id = ?6",
                    params![
                        part.mpn,
                        part.manufacturer,
                        part.description,
                        part.datasheet,
                        now,
                        id
                    ],
                )?;
                UpsertOutcome::Updated
            }
            None => {
                let inserted = tx.execute(
                    "INSERT INTO parts
                     (external_id, mpn, manufacturer, description, datasheet, updated_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                    params![
                        part.external_id,
                        part.mpn,
                        part.manufacturer,
                        part.description,
                        part.datasheet,
                        now
                    ],
                );

                match inserted {
                    Ok(_) => UpsertOutcome::Inserted,
                    Err(e) if is_unique_violation(&e) => {
                        tracing::debug!("Part {} already in database", part.external_id);
                        return Ok(UpsertOutcome::AlreadyPresent);
                    }
                    Err(e) => return Err(e.into()),
                }
            }
        };

        tx.commit()?;
        Ok(outcome)
    }

    fn get_part_by_external_id(&self, external_id: &str) -> StorageResult<Option<PartRecord>> {
        let part = self
            .conn
            .query_row(
                &format!("SELECT {} FROM parts WHERE external_id = ?1", PART_COLUMNS),
                params![external_id],
                part_from_row,
            )
            .optional()?;

        Ok(part)
    }

    fn find_candidates(&self, query: &str) -> StorageResult<Vec<PartRecord>> {
        let pattern = format!("%{}%", escape_like(query));
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM parts WHERE mpn LIKE ?1 ESCAPE '\\' ORDER BY id",
            PART_COLUMNS
        ))?;

        let parts = stmt
            .query_map(params![pattern], part_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(parts)
    }

    fn count_parts(&self) -> StorageResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM parts", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    // ===== Item Management =====

    fn insert_item(&mut self, value: &str, source_file: Option<&str>) -> StorageResult<i64> {
        self.conn.execute(
            "INSERT INTO items (value, source_file) VALUES (?1, ?2)",
            params![value, source_file],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn get_items(&self) -> StorageResult<Vec<ItemRecord>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, value, source_file, part_id FROM items ORDER BY id")?;

        let items = stmt
            .query_map([], |row| {
                Ok(ItemRecord {
                    id: row.get(0)?,
                    value: row.get(1)?,
                    source_file: row.get(2)?,
                    part_id: row.get(3)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(items)
    }

    fn link_item(&mut self, item_id: i64, part_id: i64) -> StorageResult<()> {
        let updated = self.conn.execute(
            "UPDATE items SET part_id = ?1 WHERE id = ?2",
            params![part_id, item_id],
        )?;

        if updated == 0 {
            return Err(StorageError::ItemNotFound(item_id));
        }
        Ok(())
    }

    fn count_items(&self) -> StorageResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM items", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    fn count_linked_items(&self) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM items WHERE part_id IS NOT NULL",
            [],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }
}
