//! Catalog Module
//!
//! Persists the directory next to the image so a later open sees the same
//! files. Written whole on close/flush; there is no journal.
//!
//! ## File Format
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │ Header (14 bytes)                                       │
//! │   Magic: "VDCT" (4) | Version: u16 (2)                  │
//! │   PayloadLen: u32 (4) | PayloadCRC: u32 (4)             │
//! ├─────────────────────────────────────────────────────────┤
//! │ Payload (bincode)                                       │
//! │   Geometry | Vec<FileEntry>                             │
//! └─────────────────────────────────────────────────────────┘
//! ```

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::directory::FileEntry;
use crate::error::{DiskError, Result};
use crate::store::Geometry;

/// Magic bytes identifying a vdisk catalog
pub const MAGIC: &[u8; 4] = b"VDCT";

/// Current catalog format version
pub const VERSION: u16 = 1;

/// Header size: Magic (4) + Version (2) + PayloadLen (4) + CRC (4) = 14 bytes
pub const HEADER_SIZE: usize = 14;

/// Everything needed to rebuild the directory and free map
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogSnapshot {
    pub geometry: Geometry,
    pub entries: Vec<FileEntry>,
}

impl CatalogSnapshot {
    /// Serialize to the on-disk format
    pub fn encode(&self) -> Result<Vec<u8>> {
        let payload =
            bincode::serialize(self).map_err(|e| DiskError::Catalog(e.to_string()))?;
        let crc = crc32fast::hash(&payload);

        let mut bytes = Vec::with_capacity(HEADER_SIZE + payload.len());
        bytes.extend_from_slice(MAGIC);
        bytes.extend_from_slice(&VERSION.to_le_bytes());
        bytes.extend_from_slice(&(payload.len() as u32).to_le_bytes());
        bytes.extend_from_slice(&crc.to_le_bytes());
        bytes.extend_from_slice(&payload);
        Ok(bytes)
    }

    /// Parse and verify the on-disk format
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_SIZE {
            return Err(DiskError::Catalog(format!(
                "truncated header: {} bytes",
                bytes.len()
            )));
        }
        if &bytes[0..4] != MAGIC {
            return Err(DiskError::Catalog(format!(
                "invalid magic: expected VDCT, got {:?}",
                &bytes[0..4]
            )));
        }

        let version = u16::from_le_bytes([bytes[4], bytes[5]]);
        if version != VERSION {
            return Err(DiskError::Catalog(format!(
                "unsupported catalog version: {}",
                version
            )));
        }

        let payload_len = u32::from_le_bytes([bytes[6], bytes[7], bytes[8], bytes[9]]) as usize;
        let stored_crc = u32::from_le_bytes([bytes[10], bytes[11], bytes[12], bytes[13]]);

        let payload = bytes
            .get(HEADER_SIZE..HEADER_SIZE + payload_len)
            .ok_or_else(|| {
                DiskError::Catalog(format!(
                    "truncated payload: expected {} bytes, got {}",
                    payload_len,
                    bytes.len() - HEADER_SIZE
                ))
            })?;

        let crc = crc32fast::hash(payload);
        if crc != stored_crc {
            return Err(DiskError::Catalog(format!(
                "CRC mismatch: stored {:#010x}, computed {:#010x}",
                stored_crc, crc
            )));
        }

        bincode::deserialize(payload).map_err(|e| DiskError::Catalog(e.to_string()))
    }

    /// Write the snapshot, replacing any previous catalog
    ///
    /// Written to a temporary sibling and renamed into place.
    pub fn save(&self, path: &Path) -> Result<()> {
        let bytes = self.encode()?;

        let mut tmp_path = path.as_os_str().to_owned();
        tmp_path.push(".tmp");
        let tmp_path = std::path::PathBuf::from(tmp_path);

        {
            let mut file = OpenOptions::new()
                .create(true)
                .write(true)
                .truncate(true)
                .open(&tmp_path)?;
            file.write_all(&bytes)?;
            file.sync_all()?;
        }
        fs::rename(&tmp_path, path)?;

        tracing::debug!(
            path = %path.display(),
            entries = self.entries.len(),
            "Catalog saved"
        );
        Ok(())
    }

    /// Load a snapshot; `Ok(None)` if no catalog exists
    pub fn load(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }
        let bytes = fs::read(path)?;
        Self::decode(&bytes).map(Some)
    }
}
