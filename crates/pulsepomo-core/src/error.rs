//! Core error types for pulsepomo-core.
//!
//! Each concern gets its own `thiserror` enum; `CoreError` wraps them for
//! callers that only want one error type.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for pulsepomo-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Session store errors
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Biometric provider errors
    #[error("Biometric error: {0}")]
    Biometric(#[from] BiometricError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Generic errors with context
    #[error("{0}")]
    Custom(String),
}

/// Persistence errors raised by blob stores and the session store.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Failed to open the backing database
    #[error("Failed to open database at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// A record could not be encoded; the append is aborted.
    #[error("Failed to encode session record: {0}")]
    Encode(#[source] serde_json::Error),

    /// The stored history list itself is unreadable.
    #[error("Stored history under '{key}' is corrupt: {source}")]
    CorruptHistory {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    /// The underlying store rejected a read.
    #[error("Storage read failed: {0}")]
    ReadFailed(String),

    /// The underlying store rejected a write.
    #[error("Storage write failed: {0}")]
    WriteFailed(String),

    /// A previous writer panicked while holding the store lock.
    #[error("Session store lock poisoned")]
    LockPoisoned,
}

/// Biometric provider errors.
///
/// None of these are fatal: the aggregator turns every one of them into an
/// absent reading.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BiometricError {
    /// The provider refused access to the requested metric.
    #[error("Access to {metric} samples was denied")]
    AuthorizationDenied { metric: String },

    /// The provider failed to answer the query.
    #[error("Sample query for {metric} failed: {message}")]
    QueryFailed { metric: String, message: String },

    /// The provider did not answer within the configured timeout.
    #[error("Sample query for {metric} timed out after {timeout_secs}s")]
    Timeout { metric: String, timeout_secs: u64 },
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Unknown configuration key
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),

    /// Data directory could not be determined or created
    #[error("Failed to access data directory: {0}")]
    DataDir(String),
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(e, _msg)
                if e.code == rusqlite::ErrorCode::DatabaseLocked
                    || e.code == rusqlite::ErrorCode::DatabaseBusy =>
            {
                StoreError::WriteFailed("database is locked".to_string())
            }
            _ => StoreError::ReadFailed(err.to_string()),
        }
    }
}

impl<T> From<std::sync::PoisonError<T>> for StoreError {
    fn from(_: std::sync::PoisonError<T>) -> Self {
        StoreError::LockPoisoned
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
