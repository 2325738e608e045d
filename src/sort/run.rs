//! Sorted runs
//!
//! A run lives in the swap pool only for the duration of one sort call and
//! never appears in the directory.

use crate::store::{Extent, ELEMENT_BYTES};

/// A sorted sequence persisted in a swap extent
#[derive(Debug, PartialEq, Eq)]
pub struct Run {
    /// Swap-pool blocks holding the run
    pub extent: Extent,

    /// Elements stored at the start of the extent
    pub element_count: u64,
}

impl Run {
    /// Payload size in bytes
    pub fn size_bytes(&self) -> u64 {
        self.element_count * ELEMENT_BYTES
    }
}
