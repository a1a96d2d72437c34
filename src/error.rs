//! Error types for BearDB
//!
//! Provides a unified error type for all operations.

use thiserror::Error;

/// Result type alias using BearError
pub type Result<T> = std::result::Result<T, BearError>;

/// Unified error type for BearDB operations
#[derive(Debug, Error)]
pub enum BearError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    /// Backend read/write/resize failure. Bytes already written stay written.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Record Layout Errors
    // -------------------------------------------------------------------------
    #[error("Capacity exceeded: need {needed} bytes, {available} available")]
    CapacityExceeded { needed: u64, available: u64 },

    #[error("Data corruption detected: {0}")]
    DataCorruption(String),

    #[error("Invalid record id: {0}")]
    InvalidId(u64),

    #[error("Record {0} has been deleted")]
    RecordDeleted(u64),

    #[error("Invalid file format: {0}")]
    Format(String),

    // -------------------------------------------------------------------------
    // Serialization Errors
    // -------------------------------------------------------------------------
    #[error("Encoding error: {0}")]
    Encoding(String),

    #[error("Decoding error: {0}")]
    Decoding(String),

    #[error("Keys are not persisted in this store")]
    KeysNotPersisted,

    // -------------------------------------------------------------------------
    // Mode / Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Operation not supported on an append-only store: {0}")]
    ReadOnly(&'static str),

    #[error("Configuration error: {0}")]
    Config(String),
}
