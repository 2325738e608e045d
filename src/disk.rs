//! Virtual Disk Module
//!
//! The owning handle that ties the block store, the directory and the sort
//! engine together.
//!
//! ## Responsibilities
//! - Resolve names to extents
//! - Keep directory and free map consistent across create/delete/concat
//! - Lease the scratch buffer for the duration of one sort
//! - Load and save the catalog at open/close

use bytes::BytesMut;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::catalog::CatalogSnapshot;
use crate::config::Config;
use crate::device::{BlockDevice, FileDevice, MemDevice};
use crate::directory::{Directory, FileEntry};
use crate::error::{DiskError, Result};
use crate::scratch::{ScratchPool, ScratchProvider};
use crate::sort::{SortEngine, SortReport, SortStrategy};
use crate::store::{decode_u32, BlockStore, Extent, Geometry, Pool, ELEMENT_BYTES};

/// Elements generated per device write when filling a new file
const FILL_CHUNK: u64 = 64 * 1024;

/// One line of a directory listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListEntry {
    pub name: String,
    pub size_bytes: u64,
}

/// Directory listing plus space summary
///
/// `total_bytes` is the user pool only; the swap reservation is reported
/// separately. `free_bytes` comes from the free map, so it accounts for
/// block rounding and `used_bytes + free_bytes` may be less than
/// `total_bytes`.
#[derive(Debug, Clone)]
pub struct ListReport {
    pub entries: Vec<ListEntry>,
    pub total_bytes: u64,
    pub used_bytes: u64,
    pub free_bytes: u64,
    pub swap_bytes: u64,
}

/// A block device with a flat directory of integer files
///
/// ## Concurrency Model
/// Every operation takes `&mut self` and runs to completion before the next
/// one starts. Use [`crate::SharedDisk`] to share a disk across threads.
pub struct VirtualDisk {
    config: Config,
    store: BlockStore,
    directory: Directory,
    scratch: Box<dyn ScratchProvider>,
    rng: StdRng,
}

impl VirtualDisk {
    /// Open or create the image named by `config`
    ///
    /// On startup:
    /// 1. Validate the geometry
    /// 2. Open/extend the backing file
    /// 3. Reload the catalog if one exists (and persistence is on)
    pub fn open(config: Config) -> Result<Self> {
        config.validate()?;

        let device = FileDevice::open(&config.image_path, config.device_bytes)?;
        let mut disk = Self::with_device(config, Box::new(device))?;

        if disk.config.persist_catalog {
            if let Some(snapshot) = CatalogSnapshot::load(&disk.config.catalog_path())? {
                disk.restore(snapshot)?;
            }
        }

        tracing::info!(
            image = %disk.config.image_path.display(),
            files = disk.directory.len(),
            "Virtual disk opened"
        );
        Ok(disk)
    }

    /// Create a disk held entirely in memory; nothing is persisted
    pub fn in_memory(mut config: Config) -> Result<Self> {
        config.validate()?;
        config.persist_catalog = false;
        let device = MemDevice::new(config.device_bytes);
        Self::with_device(config, Box::new(device))
    }

    /// Build an empty disk on top of any device
    pub fn with_device(config: Config, device: Box<dyn BlockDevice>) -> Result<Self> {
        config.validate()?;

        let geometry = Geometry::from_config(&config);
        let store = BlockStore::new(geometry, device)?;
        let directory = Directory::new(config.max_files, config.name_max);
        let scratch = Box::new(ScratchPool::new(config.scratch_capacity, 1));
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Ok(Self {
            config,
            store,
            directory,
            scratch,
            rng,
        })
    }

    /// Replace the scratch buffer provider
    pub fn with_scratch_provider(mut self, provider: Box<dyn ScratchProvider>) -> Self {
        self.scratch = provider;
        self
    }

    // =========================================================================
    // File Operations
    // =========================================================================

    /// Create `name` holding `element_count` pseudorandom 32-bit values
    pub fn create(&mut self, name: &str, element_count: u64) -> Result<FileEntry> {
        self.directory.check_insert(name)?;

        let size_bytes = element_count.checked_mul(ELEMENT_BYTES).ok_or_else(|| {
            DiskError::InvalidArgument(format!("{} elements overflow the size field", element_count))
        })?;
        let blocks = self.store.geometry().blocks_for_bytes(size_bytes);
        let extent = self.store.allocate_contiguous(Pool::User, blocks)?;

        if let Err(e) = self.fill_random(&extent, element_count) {
            self.store.free(extent);
            return Err(e);
        }

        let entry = FileEntry {
            name: name.to_string(),
            size_bytes,
            extent,
        };
        if let Err(e) = self.directory.insert(entry.clone()) {
            self.store.free(extent);
            return Err(e);
        }

        tracing::info!(
            name,
            elements = element_count,
            start = extent.start_block,
            blocks = extent.block_count,
            "File created"
        );
        Ok(entry)
    }

    /// Delete `name` and release its blocks
    pub fn delete(&mut self, name: &str) -> Result<()> {
        let entry = self.directory.remove(name)?;
        self.store.free(entry.extent);

        tracing::info!(name, bytes = entry.size_bytes, "File deleted");
        Ok(())
    }

    /// List files and the space summary
    pub fn list(&self) -> ListReport {
        let geometry = self.store.geometry();
        ListReport {
            entries: self
                .directory
                .entries()
                .iter()
                .map(|entry| ListEntry {
                    name: entry.name.clone(),
                    size_bytes: entry.size_bytes,
                })
                .collect(),
            total_bytes: geometry.user_bytes(),
            used_bytes: self.directory.used_bytes(),
            free_bytes: self.store.free_blocks(Pool::User) * geometry.block_bytes,
            swap_bytes: geometry.swap_bytes(),
        }
    }

    /// Sort the payload of `name` in place, in signed numeric order
    pub fn sort(&mut self, name: &str) -> Result<SortReport> {
        let entry = self.directory.get(name)?.clone();

        // Released when it goes out of scope, whichever way this returns
        let mut scratch = self.scratch.acquire()?;

        let report = SortEngine::new(&mut self.store, &mut scratch)
            .sort(entry.extent, entry.element_count())?;

        match report.strategy {
            SortStrategy::InMemory => tracing::info!(
                name,
                elements = report.elements,
                elapsed_ms = report.elapsed.as_secs_f64() * 1000.0,
                "File sorted in memory"
            ),
            SortStrategy::External { runs, merge_rounds } => tracing::info!(
                name,
                elements = report.elements,
                runs,
                merge_rounds,
                elapsed_ms = report.elapsed.as_secs_f64() * 1000.0,
                "File sorted externally"
            ),
        }
        Ok(report)
    }

    /// Read elements `start..=end` of `name`
    pub fn read(&mut self, name: &str, start: u64, end: u64) -> Result<Vec<u32>> {
        let entry = self.directory.get(name)?;
        let len = entry.element_count();
        if start > end || end >= len {
            return Err(DiskError::InvalidRange { start, end, len });
        }
        let extent = entry.extent;

        let bytes = self.store.read_blocks(
            &extent,
            start * ELEMENT_BYTES,
            (end - start + 1) * ELEMENT_BYTES,
        )?;
        Ok(decode_u32(&bytes))
    }

    /// Replace `name1` and `name2` with one file named `name1` holding
    /// `name1`'s elements followed by `name2`'s
    pub fn concat(&mut self, name1: &str, name2: &str) -> Result<FileEntry> {
        if name1 == name2 {
            return Err(DiskError::InvalidArgument(format!(
                "cannot concatenate '{}' with itself",
                name1
            )));
        }
        let first = self.directory.get(name1)?.clone();
        let second = self.directory.get(name2)?.clone();
        let size_bytes = first.size_bytes + second.size_bytes;

        let mut payload = BytesMut::with_capacity(size_bytes as usize);
        payload.extend_from_slice(&self.store.read_blocks(&first.extent, 0, first.size_bytes)?);
        payload.extend_from_slice(&self.store.read_blocks(&second.extent, 0, second.size_bytes)?);

        let blocks = self.store.geometry().blocks_for_bytes(size_bytes);
        let extent = self.store.allocate_contiguous(Pool::User, blocks)?;
        if let Err(e) = self.store.write_blocks(&extent, 0, &payload) {
            self.store.free(extent);
            return Err(e);
        }

        // Nothing below can fail for names that were just resolved
        self.store.free(first.extent);
        self.store.free(second.extent);
        self.directory.remove(name1)?;
        self.directory.remove(name2)?;

        let entry = FileEntry {
            name: name1.to_string(),
            size_bytes,
            extent,
        };
        self.directory.insert(entry.clone())?;

        tracing::info!(first = name1, second = name2, bytes = size_bytes, "Files concatenated");
        Ok(entry)
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Sync the device and write the catalog
    pub fn flush(&mut self) -> Result<()> {
        self.store.sync()?;
        if self.config.persist_catalog {
            let snapshot = CatalogSnapshot {
                geometry: *self.store.geometry(),
                entries: self.directory.entries().to_vec(),
            };
            snapshot.save(&self.config.catalog_path())?;
        }
        Ok(())
    }

    /// Flush and release the device
    pub fn close(mut self) -> Result<()> {
        self.flush()?;
        tracing::info!(image = %self.config.image_path.display(), "Virtual disk closed");
        Ok(())
    }

    // =========================================================================
    // Accessors (for testing and debugging)
    // =========================================================================

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn geometry(&self) -> &Geometry {
        self.store.geometry()
    }

    /// Live entries in directory order
    pub fn entries(&self) -> &[FileEntry] {
        self.directory.entries()
    }

    pub fn lookup(&self, name: &str) -> Option<&FileEntry> {
        self.directory.lookup(name)
    }

    /// Free blocks in a pool
    pub fn free_blocks(&self, pool: Pool) -> u64 {
        self.store.free_blocks(pool)
    }

    pub fn is_block_occupied(&self, block: u64) -> bool {
        self.store.is_occupied(block)
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    fn fill_random(&mut self, extent: &Extent, element_count: u64) -> Result<()> {
        let mut chunk = Vec::with_capacity(FILL_CHUNK.min(element_count) as usize);
        let mut written = 0u64;

        while written < element_count {
            let len = FILL_CHUNK.min(element_count - written);
            chunk.clear();
            chunk.extend((0..len).map(|_| self.rng.gen::<u32>() as i32));
            self.store.write_elements(extent, written, &chunk)?;
            written += len;
        }
        Ok(())
    }

    /// Rebuild the directory and free map from a catalog
    fn restore(&mut self, snapshot: CatalogSnapshot) -> Result<()> {
        let geometry = *self.store.geometry();
        if snapshot.geometry != geometry {
            return Err(DiskError::Catalog(format!(
                "catalog geometry {:?} does not match device geometry {:?}",
                snapshot.geometry, geometry
            )));
        }

        for entry in &snapshot.entries {
            if entry.size_bytes % ELEMENT_BYTES != 0
                || entry.extent.block_count != geometry.blocks_for_bytes(entry.size_bytes)
            {
                return Err(DiskError::Catalog(format!(
                    "entry '{}' has inconsistent size {} for {} blocks",
                    entry.name, entry.size_bytes, entry.extent.block_count
                )));
            }
            self.store
                .reserve(Pool::User, entry.extent)
                .map_err(|e| DiskError::Catalog(format!("entry '{}': {}", entry.name, e)))?;
        }

        self.directory =
            Directory::from_entries(snapshot.entries, self.config.max_files, self.config.name_max)
                .map_err(|e| DiskError::Catalog(e.to_string()))?;
        Ok(())
    }
}
