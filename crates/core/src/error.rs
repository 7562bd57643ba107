//! Error types for scan runs and image reads.
//!
//! Only binary-level preconditions are fatal (`ScanError`). Per-address
//! failures (`MemoryError`) are absorbed by the scanner as "not a vtable here".

use std::path::PathBuf;

use thiserror::Error;

/// Fatal errors that abort a scan run before any output is produced.
#[derive(Debug, Error)]
pub enum ScanError {
    /// Word size or container format the scanner does not handle.
    #[error("Unsupported target: {0}")]
    UnsupportedTarget(String),

    /// Invalid or incomplete scan configuration.
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Binary not found at {0}")]
    MissingBinary(PathBuf),

    #[error("Failed to parse binary: {0}")]
    Parse(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Failed to parse config JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience result type for scan operations.
pub type ScanResult<T> = Result<T, ScanError>;

/// A read from the binary image that could not be satisfied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum MemoryError {
    /// No segment covers the requested range.
    #[error("address 0x{address:x} is not mapped")]
    Unmapped { address: u64 },

    /// The segment exists but has no file-backed bytes at this range.
    #[error("{width} bytes at 0x{address:x} are not initialized")]
    Uninitialized { address: u64, width: usize },
}

impl From<goblin::error::Error> for ScanError {
    fn from(err: goblin::error::Error) -> Self {
        ScanError::Parse(err.to_string())
    }
}
