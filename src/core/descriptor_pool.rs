//! # Descriptor Pool Module
//!
//! Fixed-capacity arena of scatter-gather transfer descriptors. The pool is carved
//! out of a single allocation when the accelerator context is initialized and is
//! reused by every scale request until the session ends.
//!
//! ## Overview
//!
//! - **One allocation**: exactly `capacity` slots, never grown or moved
//! - **Aligned by type**: `TransferDescriptor` carries the engine's alignment, so
//!   every slot of the allocation starts on a `DESCRIPTOR_ALIGN` boundary
//! - **Index-addressed**: descriptors link to their successor by slot index, and
//!   every access is bounds-checked against the capacity
//!
//! ## Layout
//!
//! ```text
//! allocation:  [slot 0][slot 1] ... [slot capacity-1]
//!               ^ every slot boundary is a multiple of DESCRIPTOR_ALIGN
//! ```
//!
//! ## Example
//!
//! ```rust
//! use hybrid_scaler::core::descriptor_pool::{DescriptorPool, TransferDescriptor};
//!
//! let mut pool = DescriptorPool::new(4).unwrap();
//! pool.set(0, TransferDescriptor::line(0x1000, 16, 1)).unwrap();
//! pool.set(1, TransferDescriptor::STOP).unwrap();
//! assert_eq!(pool.get(0).unwrap().length, 16);
//! assert!(pool.set(4, TransferDescriptor::STOP).is_err());
//! ```

use crate::error::HwError;

/// Size in bytes of one hardware descriptor record.
pub const DESCRIPTOR_SIZE: usize = 32;

/// Alignment the engine requires for descriptor records.
pub const DESCRIPTOR_ALIGN: usize = DESCRIPTOR_SIZE;

/// Descriptor is owned by the engine and describes a live segment.
pub const CONTROL_OWNED_BY_HW: u32 = 1 << 7;

/// One contiguous line transfer.
///
/// `addr` is the read address for memory-to-stream channels and the write address
/// for stream-to-memory channels. A descriptor whose `control` is zero terminates
/// the chain.
#[repr(C, align(32))]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransferDescriptor {
    pub addr: u64,
    /// Slot index of the successor descriptor.
    pub next: u32,
    /// Segment length in elements (one byte per element).
    pub length: u32,
    pub control: u32,
    /// Written back by the engine.
    pub status: u32,
}

const _: () = assert!(std::mem::size_of::<TransferDescriptor>() == DESCRIPTOR_SIZE);

impl TransferDescriptor {
    /// Chain terminator.
    pub const STOP: TransferDescriptor = TransferDescriptor {
        addr: 0,
        next: 0,
        length: 0,
        control: 0,
        status: 0,
    };

    /// Data descriptor for `length` elements at `addr`, linked to slot `next`.
    pub fn line(addr: u64, length: u32, next: u32) -> Self {
        Self {
            addr,
            next,
            length,
            control: CONTROL_OWNED_BY_HW,
            status: 0,
        }
    }

    pub fn is_stop(&self) -> bool {
        self.control == 0
    }
}

/// Fixed-capacity descriptor arena owned by the accelerator context.
#[derive(Debug)]
pub struct DescriptorPool {
    /// Backing allocation, exactly `capacity` slots long
    slots: Vec<TransferDescriptor>,
}

impl DescriptorPool {
    /// Allocates a pool with room for exactly `capacity` descriptors.
    ///
    /// The allocator honours the alignment of [`TransferDescriptor`], so slot 0
    /// is aligned without any slack.
    ///
    /// # Errors
    ///
    /// Returns [`HwError::Alloc`] if the allocation cannot be satisfied.
    pub fn new(capacity: usize) -> Result<Self, HwError> {
        let mut slots = Vec::new();
        slots
            .try_reserve_exact(capacity)
            .map_err(|_| HwError::Alloc { descriptors: capacity })?;
        slots.resize(capacity, TransferDescriptor::default());

        log::debug!(
            "descriptor pool: {} slots at {:#x}",
            capacity,
            slots.as_ptr() as usize
        );

        Ok(Self { slots })
    }

    /// Number of usable descriptor slots.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn get(&self, index: usize) -> Option<&TransferDescriptor> {
        self.slots.get(index)
    }

    /// Stores `descriptor` in slot `index`.
    ///
    /// # Errors
    ///
    /// Returns [`HwError::BufferTooSmall`] when `index` is beyond the capacity.
    pub fn set(&mut self, index: usize, descriptor: TransferDescriptor) -> Result<(), HwError> {
        let capacity = self.capacity();
        let slot = self.slots.get_mut(index).ok_or(HwError::BufferTooSmall {
            buffer: "descriptor pool",
            needed: index + 1,
            actual: capacity,
        })?;
        *slot = descriptor;
        Ok(())
    }

    /// Usable slots in index order.
    pub fn descriptors(&self) -> &[TransferDescriptor] {
        &self.slots
    }

    /// Host address of slot `index`, as handed to an engine.
    pub fn slot_address(&self, index: usize) -> Option<u64> {
        self.get(index)
            .map(|d| d as *const TransferDescriptor as usize as u64)
    }

    /// Follows the chain starting at `head` and returns its data descriptors.
    ///
    /// Stops at the first stop marker. A chain that runs off the pool or revisits
    /// more slots than the pool holds is truncated at that point, so a corrupt
    /// chain cannot loop forever.
    pub fn walk(&self, head: usize) -> Vec<TransferDescriptor> {
        let mut segments = Vec::new();
        let mut index = head;
        for _ in 0..self.capacity() {
            match self.get(index) {
                Some(d) if !d.is_stop() => {
                    segments.push(*d);
                    index = d.next as usize;
                }
                _ => break,
            }
        }
        segments
    }
}
