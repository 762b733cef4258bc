//! StorageMeter - sequential write scaling benchmark
//!
//! Writes a calibrated in-memory block to disk from an increasing number of
//! threads and stops once aggregate throughput has regressed twice in a row.

use std::path::PathBuf;

use thiserror::Error;

pub mod bench;
pub mod cli;
pub mod config;
pub mod io;
pub mod models;
pub mod util;

// Common error types
#[derive(Debug, Error)]
pub enum StorageMeterError {
    /// I/O operation failed outside of a benchmark write
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
    /// The data block could not be reserved
    #[error("Allocation failure: cannot reserve {size} bytes for the data block")]
    AllocationFailure { size: usize },
    /// A writer could not create or open its target file
    #[error("Failed to create file {}: {source}", path.display())]
    FileOpenFailure {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// A write transferred fewer bytes than requested
    #[error("Failed to write portion {portion} to file {}: {source}", path.display())]
    ShortWriteFailure {
        path: PathBuf,
        portion: u32,
        #[source]
        source: std::io::Error,
    },
    /// Configuration validation or parsing error
    #[error("Configuration error: {0}")]
    ConfigError(String),
    /// Results persistence error
    #[error("Results persistence error: {0}")]
    PersistenceError(String),
    /// Writer thread management error
    #[error("Worker error: {0}")]
    WorkerError(String),
}

impl From<serde_json::Error> for StorageMeterError {
    fn from(err: serde_json::Error) -> Self {
        StorageMeterError::PersistenceError(format!("JSON serialization error: {}", err))
    }
}

impl From<toml::de::Error> for StorageMeterError {
    fn from(err: toml::de::Error) -> Self {
        StorageMeterError::ConfigError(format!("TOML parsing error: {}", err))
    }
}

impl From<toml::ser::Error> for StorageMeterError {
    fn from(err: toml::ser::Error) -> Self {
        StorageMeterError::ConfigError(format!("TOML serialization error: {}", err))
    }
}

/// Result type alias for StorageMeter operations
pub type Result<T> = std::result::Result<T, StorageMeterError>;

/// Error handling utilities
pub mod error {
    use super::StorageMeterError;
    use std::io::ErrorKind;

    fn io_kind(error: &StorageMeterError) -> Option<ErrorKind> {
        match error {
            StorageMeterError::IoError(err) => Some(err.kind()),
            StorageMeterError::FileOpenFailure { source, .. }
            | StorageMeterError::ShortWriteFailure { source, .. } => Some(source.kind()),
            _ => None,
        }
    }

    /// Convert error to user-friendly message with suggestions
    pub fn user_friendly_message(error: &StorageMeterError) -> String {
        match io_kind(error) {
            Some(ErrorKind::PermissionDenied) => {
                return format!(
                    "{}. Permission denied: choose a writable directory or check its permissions.",
                    error
                );
            }
            Some(ErrorKind::StorageFull) => {
                return format!(
                    "{}. The volume is full: free up space or lower the block size.",
                    error
                );
            }
            _ => {}
        }

        match error {
            StorageMeterError::AllocationFailure { .. } => {
                format!("{}. Try a smaller --block-size.", error)
            }
            StorageMeterError::ConfigError(msg) => {
                format!("Configuration error: {}. Check your settings.", msg)
            }
            StorageMeterError::PersistenceError(_) => {
                "Failed to save results. Check disk space and permissions.".to_string()
            }
            _ => error.to_string(),
        }
    }
}

// Common types and constants
pub const APP_NAME: &str = "storagemeter";
pub const CONFIG_FILE: &str = "storagemeter.toml";
pub const RESULTS_FILE: &str = "results.json";
pub const MAX_RESULTS_HISTORY: usize = 100;
