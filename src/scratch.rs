//! Scratch Buffer Module
//!
//! Bounded working memory for sorting, supplied by the host.
//!
//! ## Responsibilities
//! - Hand out buffers of exactly `capacity` elements, or fail
//! - Return the lease when the buffer is dropped, on every exit path
//!
//! `ScratchPool` models a finite set of huge pages: each slot is one
//! buffer, and acquiring with every slot leased out fails.

use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::{DiskError, Result};

/// Source of bounded scratch buffers
pub trait ScratchProvider: Send {
    /// Elements every buffer from this provider holds (K)
    fn capacity(&self) -> usize;

    /// Lease one buffer
    fn acquire(&self) -> Result<ScratchBuffer>;
}

/// A leased buffer of at most `capacity` elements
///
/// Dereferences to the element vector. The lease is released on drop.
pub struct ScratchBuffer {
    data: Vec<i32>,
    capacity: usize,
    lease: Arc<Mutex<usize>>,
}

impl ScratchBuffer {
    /// Maximum number of elements the buffer may hold
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Room left before the buffer reaches capacity
    pub fn remaining(&self) -> usize {
        self.capacity.saturating_sub(self.data.len())
    }

    pub fn is_full(&self) -> bool {
        self.data.len() >= self.capacity
    }
}

impl Deref for ScratchBuffer {
    type Target = Vec<i32>;

    fn deref(&self) -> &Self::Target {
        &self.data
    }
}

impl DerefMut for ScratchBuffer {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.data
    }
}

impl Drop for ScratchBuffer {
    fn drop(&mut self) {
        *self.lease.lock() += 1;
        tracing::trace!("Scratch buffer released");
    }
}

/// Fixed number of heap-backed scratch slots
pub struct ScratchPool {
    capacity: usize,
    slots: usize,
    available: Arc<Mutex<usize>>,
}

impl ScratchPool {
    /// Create a pool of `slots` buffers of `capacity` elements each
    pub fn new(capacity: usize, slots: usize) -> Self {
        Self {
            capacity,
            slots,
            available: Arc::new(Mutex::new(slots)),
        }
    }

    /// Slots not currently leased
    pub fn available(&self) -> usize {
        *self.available.lock()
    }

    /// Handle sharing this pool's lease counter
    pub fn handle(&self) -> ScratchPool {
        ScratchPool {
            capacity: self.capacity,
            slots: self.slots,
            available: Arc::clone(&self.available),
        }
    }
}

impl ScratchProvider for ScratchPool {
    fn capacity(&self) -> usize {
        self.capacity
    }

    fn acquire(&self) -> Result<ScratchBuffer> {
        {
            let mut available = self.available.lock();
            if *available == 0 {
                return Err(DiskError::ScratchBufferUnavailable(format!(
                    "all {} scratch slots are leased",
                    self.slots
                )));
            }
            *available -= 1;
        }

        let mut data = Vec::new();
        if let Err(e) = data.try_reserve_exact(self.capacity) {
            *self.available.lock() += 1;
            return Err(DiskError::ScratchBufferUnavailable(format!(
                "cannot reserve {} elements: {}",
                self.capacity, e
            )));
        }

        Ok(ScratchBuffer {
            data,
            capacity: self.capacity,
            lease: Arc::clone(&self.available),
        })
    }
}
