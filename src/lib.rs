//! # vdisk
//!
//! A block-device emulator over a fixed-size image file with:
//! - Contiguous first-fit extent allocation over a block free map
//! - A flat, ordered directory of named integer files
//! - In-place sorting that falls back to an external merge sort when a
//!   file exceeds the bounded scratch buffer
//! - A reserved swap pool that holds sort runs
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    VirtualDisk / SharedDisk                  │
//! │        create · delete · list · sort · read · concat         │
//! └──────────┬──────────────────────┬────────────────────┬──────┘
//!            │                      │                    │
//!            ▼                      ▼                    ▼
//!   ┌─────────────────┐   ┌──────────────────┐   ┌───────────────┐
//!   │    Directory    │   │    SortEngine    │◄──│ ScratchBuffer │
//!   │ (name → extent) │   │ (runs + merges)  │   │  (K elements) │
//!   └─────────────────┘   └────────┬─────────┘   └───────────────┘
//!                                  │
//!                                  ▼
//!                    ┌──────────────────────────┐
//!                    │        BlockStore        │
//!                    │ user pool │  swap pool   │
//!                    └────────────┬─────────────┘
//!                                 ▼
//!                    ┌──────────────────────────┐
//!                    │  BlockDevice (image file) │
//!                    └──────────────────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod device;
pub mod store;
pub mod directory;
pub mod scratch;
pub mod sort;
pub mod catalog;
pub mod disk;
pub mod shared;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{DiskError, Result};
pub use config::Config;
pub use directory::FileEntry;
pub use disk::{ListEntry, ListReport, VirtualDisk};
pub use shared::SharedDisk;
pub use sort::{SortReport, SortStrategy};
pub use store::{Extent, Pool};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of vdisk
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
