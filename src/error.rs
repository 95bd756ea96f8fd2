//! Error types for ConstKV
//!
//! Provides a unified error type for all operations.

use thiserror::Error;

/// Result type alias using Error
pub type Result<T> = std::result::Result<T, Error>;

/// Unified error type for ConstKV operations
#[derive(Debug, Error)]
pub enum Error {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Format Errors
    // -------------------------------------------------------------------------
    #[error("Invalid database format: {0}")]
    Format(String),

    #[error("Truncated data: needed {needed} bytes at offset {offset}")]
    Truncated { offset: u64, needed: u64 },

    // -------------------------------------------------------------------------
    // Writer Errors
    // -------------------------------------------------------------------------
    #[error("Database size limit exceeded: offset {attempted} is past limit {limit}")]
    CapacityExceeded { attempted: u64, limit: u64 },

    #[error("Writer already finalized")]
    Finalized,

    #[error("Writer is unusable after an earlier failure")]
    Poisoned,

    // -------------------------------------------------------------------------
    // Storage Errors
    // -------------------------------------------------------------------------
    #[error("Storage cannot be reopened for random-access reads")]
    UnsupportedStorage,

    #[error("Reader is closed")]
    Closed,
}
