//! Block Store
//!
//! Owns the device and the free map; hands out contiguous extents from the
//! user or swap pool and performs extent-relative I/O.

use bytes::{Bytes, BytesMut};

use crate::device::BlockDevice;
use crate::error::{DiskError, Result};

use super::{decode_i32_into, encode_i32, Extent, FreeMap, Geometry, Pool, ELEMENT_BYTES};

/// Block universe with first-fit contiguous allocation
///
/// ## Ownership:
/// - Every occupied block belongs to exactly one live extent
/// - `free()` trusts the caller to own the extent it releases; freeing an
///   already free block is logged, not rejected
pub struct BlockStore {
    geometry: Geometry,
    free_map: FreeMap,
    device: Box<dyn BlockDevice>,
}

impl BlockStore {
    /// Wrap a device with an all-free map
    pub fn new(geometry: Geometry, device: Box<dyn BlockDevice>) -> Result<Self> {
        if device.len_bytes() < geometry.device_bytes() {
            return Err(DiskError::Config(format!(
                "device holds {} bytes, geometry needs {}",
                device.len_bytes(),
                geometry.device_bytes()
            )));
        }

        Ok(Self {
            free_map: FreeMap::new(geometry.total_blocks),
            geometry,
            device,
        })
    }

    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    // =========================================================================
    // Allocation
    // =========================================================================

    /// Allocate `block_count` contiguous blocks from `pool`
    ///
    /// First fit, lowest address first. A zero-block request succeeds with an
    /// empty extent at the pool start and marks nothing.
    pub fn allocate_contiguous(&mut self, pool: Pool, block_count: u64) -> Result<Extent> {
        let range = self.geometry.pool_range(pool);
        let start = self
            .free_map
            .find_contiguous(range, block_count)
            .ok_or(DiskError::InsufficientSpace {
                pool,
                blocks: block_count,
            })?;

        let extent = Extent::new(start, block_count);
        self.free_map.mark(&extent);

        tracing::debug!(
            %pool,
            start = extent.start_block,
            blocks = extent.block_count,
            "Allocated extent"
        );
        Ok(extent)
    }

    /// Claim a specific extent inside `pool` (used when rebuilding from a catalog)
    pub fn reserve(&mut self, pool: Pool, extent: Extent) -> Result<()> {
        let range = self.geometry.pool_range(pool);
        if !extent.is_empty()
            && (extent.start_block < range.start || extent.end_block() > range.end)
        {
            return Err(DiskError::InvalidArgument(format!(
                "extent {:?} lies outside the {} pool",
                extent, pool
            )));
        }
        if !self.free_map.is_free(&extent) {
            return Err(DiskError::InvalidArgument(format!(
                "extent {:?} overlaps an occupied block",
                extent
            )));
        }
        self.free_map.mark(&extent);
        Ok(())
    }

    /// Release an extent
    pub fn free(&mut self, extent: Extent) {
        debug_assert!(extent.end_block() <= self.geometry.total_blocks);

        let already_free = self.free_map.clear(&extent);
        if already_free > 0 {
            tracing::warn!(
                start = extent.start_block,
                blocks = extent.block_count,
                already_free,
                "Double-free detected"
            );
        }
    }

    /// Free blocks remaining in `pool`
    pub fn free_blocks(&self, pool: Pool) -> u64 {
        self.free_map.count_free(self.geometry.pool_range(pool))
    }

    pub fn is_occupied(&self, block: u64) -> bool {
        self.free_map.is_occupied(block)
    }

    // =========================================================================
    // Extent I/O
    // =========================================================================

    /// Read `len` bytes at `byte_offset` inside `extent`
    pub fn read_blocks(&mut self, extent: &Extent, byte_offset: u64, len: u64) -> Result<Bytes> {
        let mut buf = BytesMut::zeroed(len as usize);
        self.read_into(extent, byte_offset, &mut buf)?;
        Ok(buf.freeze())
    }

    /// Fill `buf` from `byte_offset` inside `extent`
    pub fn read_into(&mut self, extent: &Extent, byte_offset: u64, buf: &mut [u8]) -> Result<()> {
        let addr = self.translate(extent, byte_offset, buf.len() as u64)?;
        self.device.read_exact_at(addr, buf)
    }

    /// Write `bytes` at `byte_offset` inside `extent`
    pub fn write_blocks(&mut self, extent: &Extent, byte_offset: u64, bytes: &[u8]) -> Result<()> {
        let addr = self.translate(extent, byte_offset, bytes.len() as u64)?;
        self.device.write_all_at(addr, bytes)
    }

    /// Append `count` signed elements starting at element `index` to `out`
    pub fn read_elements(
        &mut self,
        extent: &Extent,
        index: u64,
        count: u64,
        out: &mut Vec<i32>,
    ) -> Result<()> {
        let bytes = self.read_blocks(extent, index * ELEMENT_BYTES, count * ELEMENT_BYTES)?;
        decode_i32_into(&bytes, out);
        Ok(())
    }

    /// Write signed elements starting at element `index`
    pub fn write_elements(&mut self, extent: &Extent, index: u64, values: &[i32]) -> Result<()> {
        let bytes = encode_i32(values);
        self.write_blocks(extent, index * ELEMENT_BYTES, &bytes)
    }

    pub fn sync(&mut self) -> Result<()> {
        self.device.sync()
    }

    /// Device address of `byte_offset` inside `extent`, after bounds checking
    fn translate(&self, extent: &Extent, byte_offset: u64, len: u64) -> Result<u64> {
        let capacity = self.geometry.extent_bytes(extent);
        match byte_offset.checked_add(len) {
            Some(end) if end <= capacity => {}
            _ => {
                return Err(DiskError::OutOfRange {
                    offset: byte_offset,
                    len,
                    capacity,
                })
            }
        }
        Ok(self.geometry.block_to_byte_offset(extent.start_block) + byte_offset)
    }
}
