//! Shared Disk Handle
//!
//! Thread-safe wrapper around [`VirtualDisk`].
//!
//! ## Concurrency Model
//! One mutex guards the whole disk. Each operation holds it from lookup to
//! the last allocate/free, so operations from different threads never
//! interleave and the free map is only touched under the lock.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::directory::FileEntry;
use crate::disk::{ListReport, VirtualDisk};
use crate::error::Result;
use crate::sort::SortReport;
use crate::store::Pool;

/// Cloneable handle to one disk
#[derive(Clone)]
pub struct SharedDisk {
    inner: Arc<Mutex<VirtualDisk>>,
}

impl SharedDisk {
    pub fn new(disk: VirtualDisk) -> Self {
        Self {
            inner: Arc::new(Mutex::new(disk)),
        }
    }

    pub fn create(&self, name: &str, element_count: u64) -> Result<FileEntry> {
        self.inner.lock().create(name, element_count)
    }

    pub fn delete(&self, name: &str) -> Result<()> {
        self.inner.lock().delete(name)
    }

    pub fn list(&self) -> ListReport {
        self.inner.lock().list()
    }

    pub fn sort(&self, name: &str) -> Result<SortReport> {
        self.inner.lock().sort(name)
    }

    pub fn read(&self, name: &str, start: u64, end: u64) -> Result<Vec<u32>> {
        self.inner.lock().read(name, start, end)
    }

    pub fn concat(&self, name1: &str, name2: &str) -> Result<FileEntry> {
        self.inner.lock().concat(name1, name2)
    }

    pub fn flush(&self) -> Result<()> {
        self.inner.lock().flush()
    }

    /// Snapshot of the live entries
    pub fn entries(&self) -> Vec<FileEntry> {
        self.inner.lock().entries().to_vec()
    }

    pub fn free_blocks(&self, pool: Pool) -> u64 {
        self.inner.lock().free_blocks(pool)
    }

    /// Run `f` with exclusive access to the disk
    pub fn with<R>(&self, f: impl FnOnce(&mut VirtualDisk) -> R) -> R {
        f(&mut self.inner.lock())
    }
}
