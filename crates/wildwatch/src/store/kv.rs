//! Key-value persistence underneath the observation store.
//!
//! The repository only needs three operations on named text blobs, so the
//! backing engine sits behind [`KeyValueStore`]. [`SqliteKv`] is the
//! production implementation.

use std::path::{Path, PathBuf};

use rusqlite::{Connection, OptionalExtension};
use tracing::{debug, info};

use crate::error::{Error, Result};

use super::schema;

/// A store of named text blobs.
///
/// Reads fail with [`Error::StorageRead`]; writes and removals fail with
/// [`Error::StorageWrite`] and leave the previous value in place.
pub trait KeyValueStore: Send {
    /// Get the value stored under `key`, or `None` if absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store cannot be read.
    fn get_item(&self, key: &str) -> Result<Option<String>>;

    /// Store `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    fn set_item(&mut self, key: &str, value: &str) -> Result<()>;

    /// Remove `key`. Removing an absent key is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the removal fails.
    fn remove_item(&mut self, key: &str) -> Result<()>;

    /// Bytes the store occupies on disk; 0 when unknown or in memory.
    fn size_bytes(&self) -> u64 {
        0
    }
}

/// `SQLite`-backed [`KeyValueStore`].
#[derive(Debug)]
pub struct SqliteKv {
    /// Path to the database file.
    path: PathBuf,
    /// Database connection.
    conn: Connection,
}

impl SqliteKv {
    /// Open or create a database at the given path.
    ///
    /// Creates the parent directories and database file if they don't exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or the schema cannot
    /// be created.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|source| Error::DirectoryCreate {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }

        debug!("Opening database at {}", path.display());
        let conn = Connection::open(&path).map_err(|source| Error::StorageOpen {
            path: path.clone(),
            source,
        })?;

        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")
            .map_err(|source| Error::StorageOpen {
                path: path.clone(),
                source,
            })?;

        schema::initialize_schema(&conn)?;

        info!("Database opened successfully at {}", path.display());
        Ok(Self { path, conn })
    }

    /// Create an in-memory database, mostly for tests.
    ///
    /// # Errors
    ///
    /// Returns an error if the in-memory database cannot be created.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|source| Error::StorageOpen {
            path: PathBuf::from(":memory:"),
            source,
        })?;

        schema::initialize_schema(&conn)?;

        Ok(Self {
            path: PathBuf::from(":memory:"),
            conn,
        })
    }

    /// Get the path to the database file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl KeyValueStore for SqliteKv {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        self.conn
            .query_row("SELECT value FROM kv WHERE key = ?1", [key], |row| {
                row.get(0)
            })
            .optional()
            .map_err(|e| Error::storage_read(format!("reading key {key}: {e}")))
    }

    fn set_item(&mut self, key: &str, value: &str) -> Result<()> {
        self.conn
            .execute(
                r"
                INSERT INTO kv (key, value, written_at) VALUES (?1, ?2, datetime('now'))
                ON CONFLICT(key) DO UPDATE SET value = excluded.value, written_at = excluded.written_at
                ",
                (key, value),
            )
            .map_err(|e| Error::storage_write(format!("writing key {key}: {e}")))?;
        debug!("Wrote {} bytes under {}", value.len(), key);
        Ok(())
    }

    fn remove_item(&mut self, key: &str) -> Result<()> {
        let affected = self
            .conn
            .execute("DELETE FROM kv WHERE key = ?1", [key])
            .map_err(|e| Error::storage_write(format!("removing key {key}: {e}")))?;
        debug!("Removed {} (existed: {})", key, affected > 0);
        Ok(())
    }

    fn size_bytes(&self) -> u64 {
        if self.path.to_string_lossy() == ":memory:" {
            0
        } else {
            std::fs::metadata(&self.path).map(|m| m.len()).unwrap_or(0)
        }
    }
}
