//! Directory table implementation
//!
//! Vec-backed so iteration order is creation order.

use crate::error::{DiskError, Result};

use super::FileEntry;

/// Ordered set of file entries
#[derive(Debug, Clone)]
pub struct Directory {
    entries: Vec<FileEntry>,
    max_files: usize,
    name_max: usize,
}

impl Directory {
    /// Create an empty directory
    pub fn new(max_files: usize, name_max: usize) -> Self {
        Self {
            entries: Vec::new(),
            max_files,
            name_max,
        }
    }

    /// Rebuild a directory from persisted entries, re-checking every name
    pub fn from_entries(entries: Vec<FileEntry>, max_files: usize, name_max: usize) -> Result<Self> {
        let mut directory = Self::new(max_files, name_max);
        for entry in entries {
            directory.insert(entry)?;
        }
        Ok(directory)
    }

    /// Reject empty names, names over `name_max` bytes and embedded NULs
    pub fn validate_name(&self, name: &str) -> Result<()> {
        if name.is_empty() {
            return Err(DiskError::InvalidArgument("file name is empty".to_string()));
        }
        if name.len() > self.name_max {
            return Err(DiskError::InvalidArgument(format!(
                "file name '{}' is {} bytes, maximum is {}",
                name,
                name.len(),
                self.name_max
            )));
        }
        if name.contains('\0') {
            return Err(DiskError::InvalidArgument(
                "file name contains a NUL byte".to_string(),
            ));
        }
        Ok(())
    }

    /// Check that `name` could be inserted right now
    pub fn check_insert(&self, name: &str) -> Result<()> {
        self.validate_name(name)?;
        if self.entries.len() >= self.max_files {
            return Err(DiskError::DirectoryFull {
                max: self.max_files,
            });
        }
        if self.lookup(name).is_some() {
            return Err(DiskError::NameCollision(name.to_string()));
        }
        Ok(())
    }

    /// Append an entry
    pub fn insert(&mut self, entry: FileEntry) -> Result<()> {
        self.check_insert(&entry.name)?;
        self.entries.push(entry);
        Ok(())
    }

    /// Remove an entry by name, preserving the order of the rest
    pub fn remove(&mut self, name: &str) -> Result<FileEntry> {
        let index = self
            .position(name)
            .ok_or_else(|| DiskError::NotFound(name.to_string()))?;
        Ok(self.entries.remove(index))
    }

    pub fn lookup(&self, name: &str) -> Option<&FileEntry> {
        self.entries.iter().find(|entry| entry.name == name)
    }

    /// Look up an entry or fail with `NotFound`
    pub fn get(&self, name: &str) -> Result<&FileEntry> {
        self.lookup(name)
            .ok_or_else(|| DiskError::NotFound(name.to_string()))
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.entries.iter().position(|entry| entry.name == name)
    }

    pub fn entries(&self) -> &[FileEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sum of live payload sizes
    pub fn used_bytes(&self) -> u64 {
        self.entries.iter().map(|entry| entry.size_bytes).sum()
    }
}
