//! Storage Module
//!
//! Fixed block universe over a byte device, with a free map and two
//! disjoint allocation pools.
//!
//! ## Responsibilities
//! - Contiguous first-fit extent allocation per pool
//! - Extent-relative, bounds-checked block I/O
//! - Element encoding (4-byte little-endian words)
//!
//! ## Block Layout
//! ```text
//! block 0                         swap_start                total_blocks
//! ┌──────────────────────────────┬──────────────────────────┐
//! │ User pool                    │ Swap pool                │
//! │ (file extents)               │ (sort runs only)         │
//! └──────────────────────────────┴──────────────────────────┘
//! ```

mod block_store;
mod element;
mod extent;
mod free_map;

pub use block_store::BlockStore;
pub use element::{decode_i32_into, decode_u32, encode_i32, ELEMENT_BYTES};
pub use extent::{Extent, Geometry, Pool};
pub use free_map::FreeMap;
