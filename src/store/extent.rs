//! Extents, pools and device geometry

use std::fmt;
use std::ops::Range;

use serde::{Deserialize, Serialize};

use crate::config::Config;

/// Contiguous run of blocks `[start_block, start_block + block_count)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Extent {
    pub start_block: u64,
    pub block_count: u64,
}

impl Extent {
    pub fn new(start_block: u64, block_count: u64) -> Self {
        Self {
            start_block,
            block_count,
        }
    }

    /// One past the last block
    pub fn end_block(&self) -> u64 {
        self.start_block + self.block_count
    }

    pub fn is_empty(&self) -> bool {
        self.block_count == 0
    }

    /// Block indices covered by this extent
    pub fn blocks(&self) -> Range<u64> {
        self.start_block..self.end_block()
    }

    /// True if both extents share at least one block
    pub fn overlaps(&self, other: &Extent) -> bool {
        !self.is_empty()
            && !other.is_empty()
            && self.start_block < other.end_block()
            && other.start_block < self.end_block()
    }
}

/// Allocation pool selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Pool {
    /// Blocks below the swap boundary, owned by directory entries
    User,
    /// Reserved high blocks, owned by in-flight sort runs
    Swap,
}

impl fmt::Display for Pool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Pool::User => write!(f, "user"),
            Pool::Swap => write!(f, "swap"),
        }
    }
}

/// Shape of the block universe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Geometry {
    pub block_bytes: u64,
    pub total_blocks: u64,
    pub swap_blocks: u64,
}

impl Geometry {
    /// Derive geometry from a validated config
    pub fn from_config(config: &Config) -> Self {
        Self {
            block_bytes: config.block_bytes,
            total_blocks: config.device_bytes / config.block_bytes,
            swap_blocks: config.swap_bytes / config.block_bytes,
        }
    }

    /// First block of the swap pool
    pub fn swap_start(&self) -> u64 {
        self.total_blocks - self.swap_blocks
    }

    /// Block range a pool may allocate from
    pub fn pool_range(&self, pool: Pool) -> Range<u64> {
        match pool {
            Pool::User => 0..self.swap_start(),
            Pool::Swap => self.swap_start()..self.total_blocks,
        }
    }

    /// Pool a block belongs to
    pub fn pool_of(&self, block: u64) -> Pool {
        if block < self.swap_start() {
            Pool::User
        } else {
            Pool::Swap
        }
    }

    pub fn block_to_byte_offset(&self, block: u64) -> u64 {
        block * self.block_bytes
    }

    /// Number of blocks needed to hold `bytes`
    pub fn blocks_for_bytes(&self, bytes: u64) -> u64 {
        bytes.div_ceil(self.block_bytes)
    }

    /// Byte capacity of an extent
    pub fn extent_bytes(&self, extent: &Extent) -> u64 {
        extent.block_count * self.block_bytes
    }

    pub fn device_bytes(&self) -> u64 {
        self.total_blocks * self.block_bytes
    }

    /// Bytes addressable by user files
    pub fn user_bytes(&self) -> u64 {
        self.swap_start() * self.block_bytes
    }

    pub fn swap_bytes(&self) -> u64 {
        self.swap_blocks * self.block_bytes
    }
}
