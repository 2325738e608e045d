//! Configuration for vdisk
//!
//! Centralized configuration with sensible defaults. All device geometry is
//! decided here at construction time, so tests can run against small
//! synthetic devices.

use std::path::PathBuf;

use crate::error::{DiskError, Result};
use crate::store::ELEMENT_BYTES;

/// Main configuration for a vdisk instance
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Device Configuration
    // -------------------------------------------------------------------------
    /// Host file backing the device. The directory catalog lives next to it
    /// as `{image_path}.catalog`.
    pub image_path: PathBuf,

    /// Total device size in bytes (user pool + swap pool)
    pub device_bytes: u64,

    /// Size of one block in bytes
    pub block_bytes: u64,

    /// Bytes reserved at the high end of the device for sort runs
    pub swap_bytes: u64,

    // -------------------------------------------------------------------------
    // Directory Configuration
    // -------------------------------------------------------------------------
    /// Maximum number of live files
    pub max_files: usize,

    /// Maximum file name length in bytes
    pub name_max: usize,

    /// Write the directory to the catalog on close/flush and reload it on open
    pub persist_catalog: bool,

    // -------------------------------------------------------------------------
    // Sort Configuration
    // -------------------------------------------------------------------------
    /// Scratch buffer capacity in elements (K)
    pub scratch_capacity: usize,

    /// Seed for payload generation; `None` seeds from the OS
    pub seed: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            image_path: PathBuf::from("./disco_virtual.img"),
            device_bytes: 1024 * 1024 * 1024, // 1 GiB
            block_bytes: 4096,
            swap_bytes: 100 * 1024 * 1024, // 100 MiB
            max_files: 1024,
            name_max: 31,
            persist_catalog: true,
            scratch_capacity: (2 * 1024 * 1024) / ELEMENT_BYTES as usize, // one 2 MiB huge page
            seed: None,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Path of the directory catalog sidecar
    pub fn catalog_path(&self) -> PathBuf {
        let mut path = self.image_path.clone().into_os_string();
        path.push(".catalog");
        PathBuf::from(path)
    }

    /// Check that the geometry is usable
    pub fn validate(&self) -> Result<()> {
        if self.block_bytes == 0 || self.block_bytes % ELEMENT_BYTES != 0 {
            return Err(DiskError::Config(format!(
                "block size {} must be a non-zero multiple of {}",
                self.block_bytes, ELEMENT_BYTES
            )));
        }
        if self.device_bytes == 0 || self.device_bytes % self.block_bytes != 0 {
            return Err(DiskError::Config(format!(
                "device size {} must be a non-zero multiple of the block size {}",
                self.device_bytes, self.block_bytes
            )));
        }
        if self.swap_bytes % self.block_bytes != 0 {
            return Err(DiskError::Config(format!(
                "swap size {} must be a multiple of the block size {}",
                self.swap_bytes, self.block_bytes
            )));
        }
        if self.swap_bytes >= self.device_bytes {
            return Err(DiskError::Config(format!(
                "swap size {} leaves no user space on a {} byte device",
                self.swap_bytes, self.device_bytes
            )));
        }
        if self.scratch_capacity == 0 {
            return Err(DiskError::Config("scratch capacity must be non-zero".to_string()));
        }

        // A merge holds both input runs and its output in swap at once, so the
        // smallest useful swap pool fits two full runs plus their merged run
        let run_bytes = (self.scratch_capacity as u64)
            .saturating_mul(ELEMENT_BYTES)
            .div_ceil(self.block_bytes)
            .saturating_mul(self.block_bytes);
        if self.swap_bytes < run_bytes.saturating_mul(4) {
            return Err(DiskError::Config(format!(
                "swap size {} cannot hold two runs of {} bytes and their merged output",
                self.swap_bytes, run_bytes
            )));
        }
        if self.max_files == 0 || self.name_max == 0 {
            return Err(DiskError::Config(
                "max_files and name_max must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the backing image path
    pub fn image_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.image_path = path.into();
        self
    }

    /// Set the total device size (in bytes)
    pub fn device_bytes(mut self, bytes: u64) -> Self {
        self.config.device_bytes = bytes;
        self
    }

    /// Set the block size (in bytes)
    pub fn block_bytes(mut self, bytes: u64) -> Self {
        self.config.block_bytes = bytes;
        self
    }

    /// Set the swap reservation (in bytes)
    pub fn swap_bytes(mut self, bytes: u64) -> Self {
        self.config.swap_bytes = bytes;
        self
    }

    /// Set the maximum number of files
    pub fn max_files(mut self, count: usize) -> Self {
        self.config.max_files = count;
        self
    }

    /// Set the maximum name length (in bytes)
    pub fn name_max(mut self, len: usize) -> Self {
        self.config.name_max = len;
        self
    }

    /// Enable or disable catalog persistence
    pub fn persist_catalog(mut self, persist: bool) -> Self {
        self.config.persist_catalog = persist;
        self
    }

    /// Set the scratch buffer capacity (in elements)
    pub fn scratch_capacity(mut self, elements: usize) -> Self {
        self.config.scratch_capacity = elements;
        self
    }

    /// Seed the payload generator
    pub fn seed(mut self, seed: u64) -> Self {
        self.config.seed = Some(seed);
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
