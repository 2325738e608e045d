//! Free map
//!
//! One flag per block, `true` = occupied.

use std::ops::Range;

use super::Extent;

/// Occupancy map over the whole block universe
#[derive(Debug, Clone)]
pub struct FreeMap {
    occupied: Vec<bool>,
}

impl FreeMap {
    /// Create a map with every block free
    pub fn new(total_blocks: u64) -> Self {
        Self {
            occupied: vec![false; total_blocks as usize],
        }
    }

    pub fn len(&self) -> u64 {
        self.occupied.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.occupied.is_empty()
    }

    pub fn is_occupied(&self, block: u64) -> bool {
        self.occupied.get(block as usize).copied().unwrap_or(false)
    }

    /// Lowest start of `count` contiguous free blocks inside `range`
    pub fn find_contiguous(&self, range: Range<u64>, count: u64) -> Option<u64> {
        if count == 0 {
            return Some(range.start);
        }

        let mut run_start = range.start;
        let mut run_len = 0u64;

        for block in range {
            if self.occupied[block as usize] {
                run_start = block + 1;
                run_len = 0;
            } else {
                run_len += 1;
                if run_len == count {
                    return Some(run_start);
                }
            }
        }
        None
    }

    /// True if every block of `extent` is free
    pub fn is_free(&self, extent: &Extent) -> bool {
        extent.blocks().all(|block| !self.is_occupied(block))
    }

    /// Mark an extent occupied
    pub fn mark(&mut self, extent: &Extent) {
        for block in extent.blocks() {
            self.occupied[block as usize] = true;
        }
    }

    /// Mark an extent free, returning how many blocks were already free
    pub fn clear(&mut self, extent: &Extent) -> u64 {
        let mut already_free = 0;
        for block in extent.blocks() {
            let slot = &mut self.occupied[block as usize];
            if !*slot {
                already_free += 1;
            }
            *slot = false;
        }
        already_free
    }

    /// Free blocks inside `range`
    pub fn count_free(&self, range: Range<u64>) -> u64 {
        self.occupied[range.start as usize..range.end as usize]
            .iter()
            .filter(|&&occupied| !occupied)
            .count() as u64
    }
}
