//! `SQLite` schema for the observation store.
//!
//! The store keeps a single key-value table; each value is an opaque text
//! blob owned by whoever wrote the key.

use rusqlite::Connection;

use crate::error::Result;

/// SQL statement to create the key-value table.
pub const CREATE_KV_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS kv (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL,
    written_at TEXT NOT NULL DEFAULT (datetime('now'))
)
";

/// All schema creation statements in order.
pub const SCHEMA_STATEMENTS: &[&str] = &[CREATE_KV_TABLE];

/// Create the tables if they don't exist.
///
/// # Errors
///
/// Returns an error if a statement fails.
pub fn initialize_schema(conn: &Connection) -> Result<()> {
    for statement in SCHEMA_STATEMENTS {
        conn.execute(statement, [])
            .map_err(|e| crate::Error::internal(format!("schema creation failed: {e}")))?;
    }
    Ok(())
}
