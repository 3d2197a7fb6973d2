//! Database schema definitions
//!
//! This module contains all SQL schema definitions for the Parts-Validator database.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- Mirrored catalog parts
CREATE TABLE IF NOT EXISTS parts (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    external_id TEXT NOT NULL UNIQUE,
    mpn TEXT NOT NULL,
    manufacturer TEXT NOT NULL,
    description TEXT NOT NULL,
    datasheet TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_parts_mpn ON parts(mpn);

-- Component values extracted from design files
CREATE TABLE IF NOT EXISTS items (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    value TEXT NOT NULL,
    source_file TEXT,
    part_id INTEGER REFERENCES parts(id)
);

CREATE INDEX IF NOT EXISTS idx_items_part ON items(part_id);
"#;

/// Initializes the database schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
