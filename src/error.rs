//! Error types for vdisk
//!
//! Provides a unified error type for all device, directory and sort operations.

use thiserror::Error;

use crate::store::Pool;

/// Result type alias using DiskError
pub type Result<T> = std::result::Result<T, DiskError>;

/// Unified error type for vdisk operations
#[derive(Debug, Error)]
pub enum DiskError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Byte range falls outside the extent it addresses
    #[error("Out of range: {len} bytes at offset {offset} exceeds extent capacity {capacity}")]
    OutOfRange { offset: u64, len: u64, capacity: u64 },

    // -------------------------------------------------------------------------
    // Directory Errors
    // -------------------------------------------------------------------------
    #[error("File '{0}' not found")]
    NotFound(String),

    #[error("File '{0}' already exists")]
    NameCollision(String),

    #[error("Directory full: maximum of {max} files reached")]
    DirectoryFull { max: usize },

    #[error("Invalid range: [{start}, {end}] for a file of {len} elements")]
    InvalidRange { start: u64, end: u64, len: u64 },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    // -------------------------------------------------------------------------
    // Allocation Errors
    // -------------------------------------------------------------------------
    #[error("Insufficient space in {pool} pool: no run of {blocks} contiguous free blocks")]
    InsufficientSpace { pool: Pool, blocks: u64 },

    #[error("Scratch buffer unavailable: {0}")]
    ScratchBufferUnavailable(String),

    // -------------------------------------------------------------------------
    // Sort Errors
    // -------------------------------------------------------------------------
    #[error("Sort integrity error: expected {expected} elements, final run holds {actual}")]
    SortIntegrity { expected: u64, actual: u64 },

    // -------------------------------------------------------------------------
    // Catalog / Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Catalog error: {0}")]
    Catalog(String),

    #[error("Configuration error: {0}")]
    Config(String),
}
