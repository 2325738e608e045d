//! Directory Module
//!
//! Flat, ordered table of named extents.
//!
//! ## Responsibilities
//! - Unique names up to `name_max` bytes
//! - Bounded entry count (`max_files`)
//! - Stable order: deletion compacts without reordering survivors

mod table;

pub use table::Directory;

use serde::{Deserialize, Serialize};

use crate::store::{Extent, ELEMENT_BYTES};

/// One file: a name bound to a user-pool extent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    /// Unique file name
    pub name: String,

    /// Payload size in bytes (always a multiple of the element width)
    pub size_bytes: u64,

    /// Blocks holding the payload, `ceil(size_bytes / block_bytes)` long
    pub extent: Extent,
}

impl FileEntry {
    /// Number of 32-bit elements in the payload
    pub fn element_count(&self) -> u64 {
        self.size_bytes / ELEMENT_BYTES
    }
}
