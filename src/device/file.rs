//! File-backed device
//!
//! The host image file. Opened read/write, created if missing and extended
//! to the configured size.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use crate::error::{DiskError, Result};

use super::BlockDevice;

/// Device backed by a fixed-size host file
pub struct FileDevice {
    file: File,
    len: u64,
}

impl FileDevice {
    /// Open or create the image at `path`, sized to at least `len` bytes
    ///
    /// A new or short image is extended with zeros; an existing larger image
    /// is left as is and only its first `len` bytes are addressed.
    pub fn open(path: &Path, len: u64) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;

        let current = file.metadata()?.len();
        if current < len {
            tracing::info!(
                path = %path.display(),
                bytes = len,
                "Initializing virtual disk image"
            );
            file.set_len(len)?;
        }

        Ok(Self { file, len })
    }

    fn check_bounds(&self, offset: u64, len: usize) -> Result<()> {
        let end = offset.checked_add(len as u64);
        match end {
            Some(end) if end <= self.len => Ok(()),
            _ => Err(DiskError::OutOfRange {
                offset,
                len: len as u64,
                capacity: self.len,
            }),
        }
    }
}

impl BlockDevice for FileDevice {
    fn len_bytes(&self) -> u64 {
        self.len
    }

    fn read_exact_at(&mut self, offset: u64, buf: &mut [u8]) -> Result<()> {
        self.check_bounds(offset, buf.len())?;
        self.file.seek(SeekFrom::Start(offset))?;
        self.file.read_exact(buf)?;
        Ok(())
    }

    fn write_all_at(&mut self, offset: u64, buf: &[u8]) -> Result<()> {
        self.check_bounds(offset, buf.len())?;
        self.file.seek(SeekFrom::Start(offset))?;
        self.file.write_all(buf)?;
        Ok(())
    }

    fn sync(&mut self) -> Result<()> {
        self.file.sync_all()?;
        Ok(())
    }
}
