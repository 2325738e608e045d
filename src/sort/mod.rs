//! Sort Module
//!
//! Hybrid in-place sort of a file's 32-bit payload.
//!
//! ## Strategy
//! - `n <= K`: one pass through the scratch buffer, written back in place
//! - `n > K`: external merge sort through the swap pool
//!
//! ## External Sort Flow
//! ```text
//!   file extent (user pool)
//!   ┌────────┬────────┬────────┬────┐
//!   │ chunk0 │ chunk1 │ chunk2 │ c3 │   read K elements, sort in scratch
//!   └───┬────┴───┬────┴───┬────┴─┬──┘
//!       ▼        ▼        ▼      ▼
//!     run0     run1     run2   run3      swap pool extents
//!       └──┬─────┘        └──┬───┘
//!          ▼                 ▼           round 1: pairwise merge
//!        run01             run23
//!          └───────┬─────────┘
//!                  ▼                     round 2
//!               run0123  ──────────────► copied back over the file extent
//! ```
//!
//! ## Ordering
//! Elements compare as signed 32-bit integers, whatever the generator
//! produced. Merges are stable: on equal values the left run goes first.

mod engine;
mod merge;
mod run;

pub use engine::SortEngine;
pub use merge::Merge;
pub use run::Run;

use std::time::Duration;

/// Which path a sort took
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortStrategy {
    /// Whole file fit in the scratch buffer
    InMemory,

    /// Run generation followed by pairwise merge rounds
    External { runs: usize, merge_rounds: usize },
}

/// Outcome of one sort invocation
#[derive(Debug, Clone)]
pub struct SortReport {
    /// Elements in the file
    pub elements: u64,

    /// Path taken
    pub strategy: SortStrategy,

    /// Wall time spent sorting
    pub elapsed: Duration,
}
