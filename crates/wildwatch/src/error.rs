//! Error types for wildwatch.
//!
//! This module defines the error type shared by the store, configuration and
//! location layers. Identification failures have their own type in
//! [`crate::identify::IdentifyError`] because they never reach callers.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for wildwatch operations.
#[derive(Error, Debug)]
pub enum Error {
    // === Storage Errors ===
    /// Failed to open or create the backing database.
    #[error("failed to open observation store at {path}: {source}")]
    StorageOpen {
        /// Path to the database file.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: rusqlite::Error,
    },

    /// The persisted collection could not be read or decoded.
    #[error("failed to read observations: {message}")]
    StorageRead {
        /// Description of what went wrong.
        message: String,
    },

    /// The collection could not be serialized or written back.
    #[error("failed to write observations: {message}")]
    StorageWrite {
        /// Description of what went wrong.
        message: String,
    },

    /// The store worker has shut down and no longer accepts commands.
    #[error("observation store is closed")]
    StoreClosed,

    // === Record Errors ===
    /// No observation with the given id exists.
    #[error("observation not found: {id}")]
    ObservationNotFound {
        /// The id that was looked up.
        id: String,
    },

    /// An observation with the same id is already stored.
    #[error("observation already exists: {id}")]
    DuplicateObservation {
        /// The conflicting id.
        id: String,
    },

    /// An observation failed validation.
    #[error("invalid observation: {message}")]
    InvalidObservation {
        /// Description of the validation failure.
        message: String,
    },

    // === Configuration Errors ===
    /// Failed to load configuration.
    #[error("failed to load configuration: {0}")]
    ConfigLoad(Box<figment::Error>),

    /// Configuration validation failed.
    #[error("invalid configuration: {message}")]
    ConfigValidation {
        /// Description of the validation failure.
        message: String,
    },

    /// Identification was requested but no API key is configured.
    #[error("image identification is not configured: set WILDWATCH_IDENTIFICATION__API_KEY or GEMINI_API_KEY")]
    IdentificationNotConfigured,

    // === Location Errors ===
    /// The user refused location access.
    #[error("location permission denied")]
    PermissionDenied,

    /// The location provider failed to produce a position.
    #[error("location error: {0}")]
    Location(String),

    // === I/O Errors ===
    /// File system operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to create a required directory.
    #[error("failed to create directory {path}: {source}")]
    DirectoryCreate {
        /// Path that couldn't be created.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    // === Generic Errors ===
    /// An internal error occurred (bug).
    #[error("internal error: {0}")]
    Internal(String),
}

/// A specialized Result type for wildwatch operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(Box::new(err))
    }
}

impl Error {
    /// Create a storage read error.
    #[must_use]
    pub fn storage_read(message: impl Into<String>) -> Self {
        Self::StorageRead {
            message: message.into(),
        }
    }

    /// Create a storage write error.
    #[must_use]
    pub fn storage_write(message: impl Into<String>) -> Self {
        Self::StorageWrite {
            message: message.into(),
        }
    }

    /// Create a not-found error for the given id.
    #[must_use]
    pub fn not_found(id: impl Into<String>) -> Self {
        Self::ObservationNotFound { id: id.into() }
    }

    /// Create a validation error for an observation.
    #[must_use]
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidObservation {
            message: message.into(),
        }
    }

    /// Create a location error.
    #[must_use]
    pub fn location(message: impl Into<String>) -> Self {
        Self::Location(message.into())
    }

    /// Create a new internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Check if this error means the requested observation does not exist.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::ObservationNotFound { .. })
    }

    /// Check if this error is a failed write the user should retry.
    #[must_use]
    pub fn is_write_failure(&self) -> bool {
        matches!(self, Self::StorageWrite { .. } | Self::StoreClosed)
    }

    /// Check if this error is a location permission refusal.
    #[must_use]
    pub fn is_permission_denied(&self) -> bool {
        matches!(self, Self::PermissionDenied)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::StoreClosed;
        assert_eq!(err.to_string(), "observation store is closed");

        let err = Error::not_found("1700000000000");
        assert_eq!(err.to_string(), "observation not found: 1700000000000");
    }

    #[test]
    fn test_is_not_found() {
        assert!(Error::not_found("x").is_not_found());
        assert!(!Error::StoreClosed.is_not_found());
    }

    #[test]
    fn test_is_write_failure() {
        assert!(Error::storage_write("disk full").is_write_failure());
        assert!(Error::StoreClosed.is_write_failure());
        assert!(!Error::storage_read("bad json").is_write_failure());
    }

    #[test]
    fn test_is_permission_denied() {
        assert!(Error::PermissionDenied.is_permission_denied());
        assert!(!Error::location("timeout").is_permission_denied());
    }

    #[test]
    fn test_invalid_observation_display() {
        let err = Error::invalid("name must not be empty");
        assert!(err.to_string().contains("name must not be empty"));
    }

    #[test]
    fn test_duplicate_display() {
        let err = Error::DuplicateObservation {
            id: "42".to_string(),
        };
        assert!(err.to_string().contains("42"));
    }

    #[test]
    fn test_not_configured_mentions_env_var() {
        let msg = Error::IdentificationNotConfigured.to_string();
        assert!(msg.contains("GEMINI_API_KEY"));
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(err.to_string().contains("file not found"));
    }

    #[test]
    fn test_storage_open_error_display() {
        let result = rusqlite::Connection::open_with_flags(
            "/nonexistent/path/observations.db",
            rusqlite::OpenFlags::SQLITE_OPEN_READ_ONLY,
        );
        if let Err(sqlite_err) = result {
            let err = Error::StorageOpen {
                path: PathBuf::from("/nonexistent/path/observations.db"),
                source: sqlite_err,
            };
            assert!(err.to_string().contains("/nonexistent/path/observations.db"));
        }
    }

    #[test]
    fn test_directory_create_error_display() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "access denied");
        let err = Error::DirectoryCreate {
            path: PathBuf::from("/root/forbidden"),
            source: io_err,
        };
        assert!(err.to_string().contains("/root/forbidden"));
    }
}
