//! Error types for the arcade core
//!
//! Two families live here. `ArcadeError` covers the conditions the core cannot
//! recover from (storage and configuration). `ErrorKind` classifies the domain
//! refusals that each engine reports through its own error enum.

use thiserror::Error;

/// Root error type for unrecoverable arcade failures
#[derive(Debug, Error)]
pub enum ArcadeError {
    /// Configuration related errors
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    /// Persistence substrate errors
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Configuration and validation errors
#[derive(Debug, Clone, Error)]
pub enum ConfigurationError {
    #[error("Validation failed: {0}")]
    ValidationFailed(String),
    #[error("Missing required field: {0}")]
    MissingRequired(String),
    #[error("Invalid value for {field}: '{value}' ({reason})")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },
    #[error("Failed to load configuration: {0}")]
    LoadFailed(String),
    #[error("Failed to save configuration: {0}")]
    SaveFailed(String),
}

/// Storage system errors
#[derive(Debug, Clone, Error)]
pub enum StorageError {
    #[error("Database open failed: {0}")]
    DatabaseOpenFailed(String),
    #[error("Read failed: {0}")]
    ReadFailed(String),
    #[error("Write failed: {0}")]
    WriteFailed(String),
    #[error("Corrupted data: {0}")]
    CorruptedData(String),
    #[error("Permission denied: {0}")]
    PermissionDenied(String),
}

impl From<rocksdb::Error> for StorageError {
    fn from(e: rocksdb::Error) -> Self {
        StorageError::WriteFailed(e.to_string())
    }
}

impl From<std::io::Error> for StorageError {
    fn from(e: std::io::Error) -> Self {
        match e.kind() {
            std::io::ErrorKind::PermissionDenied => StorageError::PermissionDenied(e.to_string()),
            _ => StorageError::ReadFailed(e.to_string()),
        }
    }
}

impl From<rocksdb::Error> for ArcadeError {
    fn from(e: rocksdb::Error) -> Self {
        ArcadeError::Storage(e.into())
    }
}

impl From<std::io::Error> for ArcadeError {
    fn from(e: std::io::Error) -> Self {
        ArcadeError::Storage(e.into())
    }
}

// Convenience type alias for Results
pub type ArcadeResult<T> = Result<T, ArcadeError>;

/// Classification of every refusal the engines can report.
///
/// Everything except `Persistence` means "operation refused, nothing
/// changed"; the caller re-prompts the user. `Persistence` means the ledger
/// could not make its change durable and the operation was abandoned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Malformed input: bad move text, out-of-range guess, zero amount
    Validation,
    /// Caller is not allowed to act: wrong turn, not the creator, not seated
    Authorization,
    /// Funds do not line up: insufficient balance, stake mismatch
    Economic,
    /// The referenced game or escrow never existed
    NotFound,
    /// The referenced game or escrow exists but is in the wrong or a terminal state
    Ended,
    /// The core could not complete the request, e.g. no free game id; nothing changed
    Internal,
    /// Durable storage failed
    Persistence,
}

impl ErrorKind {
    /// Whether the failure is fatal to the operation rather than a plain refusal
    pub fn is_fatal(self) -> bool {
        matches!(self, ErrorKind::Persistence)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_error_display() {
        let config_error = ConfigurationError::ValidationFailed("test".to_string());
        let arcade_error = ArcadeError::Configuration(config_error);

        assert!(arcade_error.to_string().contains("Configuration error"));
        assert!(arcade_error.to_string().contains("test"));
    }

    #[test]
    fn test_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "locked");
        let arcade_error: ArcadeError = io.into();

        match arcade_error {
            ArcadeError::Storage(StorageError::PermissionDenied(_)) => {}
            other => panic!("Expected permission error, got {other:?}"),
        }
    }

    #[test]
    fn test_error_source() {
        let arcade_error = ArcadeError::Storage(StorageError::WriteFailed("disk".to_string()));
        assert!(arcade_error.source().is_some());
    }

    #[test]
    fn test_only_persistence_is_fatal() {
        assert!(ErrorKind::Persistence.is_fatal());
        assert!(!ErrorKind::Economic.is_fatal());
        assert!(!ErrorKind::NotFound.is_fatal());
        assert!(!ErrorKind::Internal.is_fatal());
    }
}
