//! Device Module
//!
//! Byte-addressed backing storage for the block store.
//!
//! ## Responsibilities
//! - Fixed-offset reads and writes (pread/pwrite semantics)
//! - Create and size the host image file
//! - In-memory devices for small synthetic tests

mod file;
mod memory;

pub use file::FileDevice;
pub use memory::MemDevice;

use crate::error::Result;

/// Byte-addressed device the block store sits on
pub trait BlockDevice: Send {
    /// Total length in bytes
    fn len_bytes(&self) -> u64;

    /// Read exactly `buf.len()` bytes starting at `offset`
    fn read_exact_at(&mut self, offset: u64, buf: &mut [u8]) -> Result<()>;

    /// Write all of `buf` starting at `offset`
    fn write_all_at(&mut self, offset: u64, buf: &[u8]) -> Result<()>;

    /// Flush pending writes to stable storage
    fn sync(&mut self) -> Result<()>;
}
