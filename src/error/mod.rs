//! # Error Module
//!
//! Error taxonomy for the duplicate detection engine.
//!
//! ## Recovery Rules
//! - `DecodeError` and `InferenceError` are **per-file**: recorded against the
//!   record, the scan continues
//! - `IndexError` is **recoverable**: the index is rebuilt from the store
//! - `StoreError` is **fatal** for the current operation
//! - "Already processed" is a normal skip, never an error

use std::path::PathBuf;
use thiserror::Error;

/// Top-level application error
#[derive(Error, Debug)]
pub enum DedupError {
    #[error("Scanning error: {0}")]
    Scan(#[from] ScanError),

    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    #[error("Hashing error: {0}")]
    Hash(#[from] HashError),

    #[error("Inference error: {0}")]
    Inference(#[from] InferenceError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Index error: {0}")]
    Index(#[from] IndexError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Errors that occur while walking directories
#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Directory not found: {path}")]
    DirectoryNotFound { path: PathBuf },

    #[error("Permission denied accessing: {path}")]
    PermissionDenied { path: PathBuf },

    #[error("Failed to read {path}: {source}")]
    ReadDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Symbolic link cycle skipped at {path}")]
    SymlinkLoop { path: PathBuf },

    #[error("Scan was cancelled")]
    Cancelled,
}

/// Errors from the image decode collaborator.
///
/// Every variant carries the offending path.
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("Failed to open image file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to decode image {path}: {reason}")]
    Corrupt { path: PathBuf, reason: String },

    #[error("Image is empty: {path}")]
    EmptyImage { path: PathBuf },
}

impl DecodeError {
    /// Path of the file that failed to decode
    pub fn path(&self) -> &PathBuf {
        match self {
            DecodeError::Io { path, .. }
            | DecodeError::Corrupt { path, .. }
            | DecodeError::EmptyImage { path } => path,
        }
    }
}

/// Errors computing a perceptual hash from a decoded image
#[derive(Error, Debug)]
pub enum HashError {
    #[error("Cannot hash an image with zero width or height")]
    EmptyImage,

    #[error("Hash computation failed: {0}")]
    ComputationFailed(String),
}

/// Errors from the model inference collaborator
#[derive(Error, Debug)]
pub enum InferenceError {
    #[error("Model {model} is unavailable: {reason}")]
    ModelUnavailable { model: String, reason: String },

    #[error("Inference failed: {0}")]
    Failed(String),

    #[error("Model returned {found} dimensions, expected {expected}")]
    DimensionMismatch { expected: usize, found: usize },

    #[error("Model returned a degenerate vector (zero or non-finite norm)")]
    Degenerate,

    #[error("Batch returned {found} vectors for {expected} images")]
    BatchSizeMismatch { expected: usize, found: usize },
}

/// Errors from the record store
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Failed to open store at {path}: {reason}")]
    OpenFailed { path: PathBuf, reason: String },

    #[error("Store query failed: {0}")]
    QueryFailed(String),

    #[error("Store corruption detected at {path}. Delete this file and rescan.")]
    Corrupted { path: PathBuf },

    #[error("Store at {path} has schema version {found}, this build supports up to {supported}")]
    UnsupportedSchema {
        path: PathBuf,
        found: u32,
        supported: u32,
    },
}

impl From<rusqlite::Error> for StoreError {
    fn from(error: rusqlite::Error) -> Self {
        StoreError::QueryFailed(error.to_string())
    }
}

/// Errors from the nearest-neighbor index
#[derive(Error, Debug)]
pub enum IndexError {
    #[error("Vector has {found} dimensions, index expects {expected}")]
    DimensionMismatch { expected: usize, found: usize },

    #[error("Index structure is corrupted: {0}")]
    Corrupted(String),
}

/// Errors in configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {reason}")]
    Unreadable { path: PathBuf, reason: String },

    #[error("Failed to write config file {path}: {reason}")]
    Unwritable { path: PathBuf, reason: String },

    #[error("Invalid {name}: {reason}")]
    InvalidValue { name: &'static str, reason: String },
}

/// Convenience Result type alias
pub type Result<T> = std::result::Result<T, DedupError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scan_error_includes_path() {
        let error = ScanError::DirectoryNotFound {
            path: PathBuf::from("/photos/vacation"),
        };
        assert!(error.to_string().contains("/photos/vacation"));
    }

    #[test]
    fn decode_error_includes_path_and_reason() {
        let error = DecodeError::Corrupt {
            path: PathBuf::from("/photos/broken.jpg"),
            reason: "invalid JPEG".to_string(),
        };
        let message = error.to_string();
        assert!(message.contains("/photos/broken.jpg"));
        assert!(message.contains("invalid JPEG"));
        assert_eq!(error.path(), &PathBuf::from("/photos/broken.jpg"));
    }

    #[test]
    fn store_corruption_suggests_recovery() {
        let error = StoreError::Corrupted {
            path: PathBuf::from("/data/library.db"),
        };
        assert!(error.to_string().contains("Delete this file"));
    }

    #[test]
    fn store_errors_convert_into_top_level() {
        let error: DedupError = StoreError::QueryFailed("disk full".to_string()).into();
        assert!(matches!(error, DedupError::Store(_)));
        assert!(error.to_string().contains("disk full"));
    }
}
