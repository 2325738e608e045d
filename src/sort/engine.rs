//! Sort Engine
//!
//! Drives one sort of one file extent.

use std::time::Instant;

use crate::error::{DiskError, Result};
use crate::scratch::ScratchBuffer;
use crate::store::{BlockStore, Extent, Pool, ELEMENT_BYTES};

use super::{Merge, Run, SortReport, SortStrategy};

/// Sorts a file extent in place using a bounded scratch buffer
///
/// ## Ownership:
/// - Every swap extent the engine allocates is tracked in `live` until it is
///   released; whatever is still live when the engine is dropped is freed, so
///   no exit path leaks swap blocks
/// - The file extent is only written by the in-memory pass or by the final
///   writeback, which runs after the element count check
///
/// ## Swap Demand:
/// Every run is written before merging starts, and a merge allocates its
/// output before freeing its inputs. First-fit placement leaves holes between
/// rounds that later, larger outputs cannot use. If the runs take `F` swap
/// blocks, the worst layouts need close to `4 * F` blocks rather than the
/// `2 * F` the live data suggests. Four one-block runs fail with 9 swap blocks.
pub struct SortEngine<'a> {
    store: &'a mut BlockStore,
    scratch: &'a mut ScratchBuffer,
    live: Vec<Extent>,
}

impl<'a> SortEngine<'a> {
    pub fn new(store: &'a mut BlockStore, scratch: &'a mut ScratchBuffer) -> Self {
        Self {
            store,
            scratch,
            live: Vec::new(),
        }
    }

    /// Sort the first `element_count` elements of `extent`
    pub fn sort(mut self, extent: Extent, element_count: u64) -> Result<SortReport> {
        let started = Instant::now();

        let strategy = if element_count <= self.scratch.capacity() as u64 {
            self.sort_in_memory(&extent, element_count)?;
            SortStrategy::InMemory
        } else {
            self.sort_external(&extent, element_count)?
        };

        Ok(SortReport {
            elements: element_count,
            strategy,
            elapsed: started.elapsed(),
        })
    }

    // =========================================================================
    // In-Memory Path
    // =========================================================================

    fn sort_in_memory(&mut self, extent: &Extent, element_count: u64) -> Result<()> {
        self.scratch.clear();
        self.store.read_elements(extent, 0, element_count, self.scratch)?;
        self.scratch.sort_unstable();
        self.store.write_elements(extent, 0, &self.scratch[..])
    }

    // =========================================================================
    // External Path
    // =========================================================================

    fn sort_external(&mut self, extent: &Extent, element_count: u64) -> Result<SortStrategy> {
        let mut runs = self.generate_runs(extent, element_count)?;
        let generated = runs.len();

        let mut merge_rounds = 0;
        while runs.len() > 1 {
            runs = self.merge_round(runs)?;
            merge_rounds += 1;
            tracing::debug!(round = merge_rounds, runs = runs.len(), "Merge round complete");
        }

        let final_run = runs.pop().ok_or(DiskError::SortIntegrity {
            expected: element_count,
            actual: 0,
        })?;
        self.write_back(extent, final_run, element_count)?;

        Ok(SortStrategy::External {
            runs: generated,
            merge_rounds,
        })
    }

    /// Split the file into K-element chunks and persist each, sorted, as a run
    fn generate_runs(&mut self, extent: &Extent, element_count: u64) -> Result<Vec<Run>> {
        let capacity = self.scratch.capacity() as u64;
        let run_count = element_count.div_ceil(capacity);
        let mut runs = Vec::with_capacity(run_count as usize);

        for index in 0..run_count {
            let start = index * capacity;
            let len = capacity.min(element_count - start);

            self.scratch.clear();
            self.store.read_elements(extent, start, len, self.scratch)?;
            self.scratch.sort_unstable();

            let run_extent = self.allocate_swap(len)?;
            self.store.write_elements(&run_extent, 0, &self.scratch[..])?;

            runs.push(Run {
                extent: run_extent,
                element_count: len,
            });
        }

        tracing::debug!(runs = runs.len(), capacity, "Generated sorted runs");
        Ok(runs)
    }

    /// Merge runs two at a time, left to right; an odd run passes through
    fn merge_round(&mut self, runs: Vec<Run>) -> Result<Vec<Run>> {
        let mut merged = Vec::with_capacity(runs.len().div_ceil(2));
        let mut pending = runs.into_iter();

        while let Some(left) = pending.next() {
            match pending.next() {
                Some(right) => merged.push(self.merge_pair(left, right)?),
                None => merged.push(left),
            }
        }
        Ok(merged)
    }

    /// Merge two runs into a fresh swap extent and release the inputs
    ///
    /// Both inputs are loaded into host memory; the scratch buffer only
    /// stages output until it fills.
    fn merge_pair(&mut self, left: Run, right: Run) -> Result<Run> {
        let mut left_values = Vec::with_capacity(left.element_count as usize);
        self.store
            .read_elements(&left.extent, 0, left.element_count, &mut left_values)?;
        let mut right_values = Vec::with_capacity(right.element_count as usize);
        self.store
            .read_elements(&right.extent, 0, right.element_count, &mut right_values)?;

        let expected = left.element_count + right.element_count;
        let output = self.allocate_swap(expected)?;

        self.scratch.clear();
        let mut written = 0u64;
        for value in Merge::new(&left_values, &right_values) {
            self.scratch.push(value);
            if self.scratch.is_full() {
                written = self.flush_staging(&output, written)?;
            }
        }
        written = self.flush_staging(&output, written)?;

        if written != expected {
            return Err(DiskError::SortIntegrity {
                expected,
                actual: written,
            });
        }

        tracing::trace!(
            left_bytes = left.size_bytes(),
            right_bytes = right.size_bytes(),
            "Merged run pair"
        );
        self.release(left.extent);
        self.release(right.extent);

        Ok(Run {
            extent: output,
            element_count: written,
        })
    }

    /// Write staged elements at element offset `written`, returning the new offset
    fn flush_staging(&mut self, output: &Extent, written: u64) -> Result<u64> {
        if self.scratch.is_empty() {
            return Ok(written);
        }
        self.store.write_elements(output, written, &self.scratch[..])?;
        let flushed = self.scratch.len() as u64;
        self.scratch.clear();
        Ok(written + flushed)
    }

    /// Copy the final run over the file extent, after checking its size
    fn write_back(&mut self, extent: &Extent, run: Run, element_count: u64) -> Result<()> {
        if run.element_count != element_count {
            return Err(DiskError::SortIntegrity {
                expected: element_count,
                actual: run.element_count,
            });
        }

        let capacity = self.scratch.capacity() as u64;
        let mut copied = 0u64;
        while copied < element_count {
            let len = capacity.min(element_count - copied);
            self.scratch.clear();
            self.store.read_elements(&run.extent, copied, len, self.scratch)?;
            self.store.write_elements(extent, copied, &self.scratch[..])?;
            copied += len;
        }

        self.release(run.extent);
        Ok(())
    }

    // =========================================================================
    // Swap Ledger
    // =========================================================================

    fn allocate_swap(&mut self, elements: u64) -> Result<Extent> {
        let blocks = self
            .store
            .geometry()
            .blocks_for_bytes(elements * ELEMENT_BYTES);
        let extent = self.store.allocate_contiguous(Pool::Swap, blocks)?;
        self.live.push(extent);
        Ok(extent)
    }

    fn release(&mut self, extent: Extent) {
        if let Some(index) = self.live.iter().position(|live| *live == extent) {
            self.live.swap_remove(index);
        }
        self.store.free(extent);
    }
}

impl Drop for SortEngine<'_> {
    fn drop(&mut self) {
        if self.live.is_empty() {
            return;
        }
        tracing::debug!(extents = self.live.len(), "Releasing swap extents of aborted sort");
        for extent in self.live.drain(..) {
            self.store.free(extent);
        }
    }
}
