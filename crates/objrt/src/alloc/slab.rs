// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Lock-free slab allocator for object storage.
//!
//! Fixed size-class pools, one 64-bit occupancy bitmap each. A request is
//! served from the smallest class that fits and falls back to larger
//! classes when that one is full. Every slot is aligned to [`SLAB_ALIGN`].

use super::{AllocError, Allocator};
use std::alloc::Layout;
use std::ptr::NonNull;
use std::sync::atomic::{AtomicU64, Ordering};

/// Alignment of every slot.
pub const SLAB_ALIGN: usize = 16;

/// Largest slot size a custom class may request.
pub const MAX_SLOT_SIZE: usize = 1 << 20;

/// Default size classes: (slot_size, slot_count)
const SIZE_CLASSES: &[(usize, usize)] = &[
    (32, 64),   // 32B x 64 slots = 2 KB
    (64, 64),   // 64B x 64 slots = 4 KB
    (128, 64),  // 128B x 64 slots = 8 KB
    (256, 64),  // 256B x 64 slots = 16 KB
    (512, 32),  // 512B x 32 slots = 16 KB
    (1024, 32), // 1KB x 32 slots = 32 KB
    (2048, 16), // 2KB x 16 slots = 32 KB
    (4096, 16), // 4KB x 16 slots = 64 KB
];

/// Per-pool state with atomic bitmap for free slot tracking
struct Pool {
    base: NonNull<u8>,
    backing: Layout,
    bitmap: AtomicU64,
    slot_size: usize,
    slot_count: usize,
}

// SAFETY: the backing block is owned by the pool; the bitmap CAS hands each
// slot to exactly one owner at a time.
unsafe impl Send for Pool {}
unsafe impl Sync for Pool {}

impl Pool {
    fn new(slot_size: usize, slot_count: usize) -> Self {
        let slot_size = slot_size.clamp(1, MAX_SLOT_SIZE).next_multiple_of(SLAB_ALIGN);
        let slot_count = slot_count.clamp(1, 64);
        let backing = Layout::from_size_align(slot_size * slot_count, SLAB_ALIGN)
            .unwrap_or_else(|_| unreachable!("clamped pool size fits a Layout"));

        // SAFETY: backing has non-zero size.
        let ptr = unsafe { std::alloc::alloc_zeroed(backing) };
        let Some(base) = NonNull::new(ptr) else {
            std::alloc::handle_alloc_error(backing)
        };

        Self {
            base,
            backing,
            // All slots free (bit=0 means free)
            bitmap: AtomicU64::new(0),
            slot_size,
            slot_count,
        }
    }

    /// Claim the first free slot, `None` if the pool is full.
    fn try_reserve(&self) -> Option<usize> {
        loop {
            let bitmap = self.bitmap.load(Ordering::Acquire);

            let slot_index = (!bitmap).trailing_zeros() as usize;
            if slot_index >= self.slot_count {
                return None; // Pool full
            }

            let new_bitmap = bitmap | (1u64 << slot_index);
            if self
                .bitmap
                .compare_exchange(bitmap, new_bitmap, Ordering::AcqRel, Ordering::Relaxed)
                .is_ok()
            {
                return Some(slot_index);
            }
            // CAS failed, retry
        }
    }

    fn release_slot(&self, slot_index: usize) {
        debug_assert!(slot_index < self.slot_count, "Invalid slot index");

        let slot_mask = 1u64 << slot_index;
        let previous = self.bitmap.fetch_and(!slot_mask, Ordering::AcqRel);
        if previous & slot_mask == 0 {
            log::error!(
                "[objrt] slab slot {} of {}B pool released twice",
                slot_index,
                self.slot_size
            );
        }
    }

    fn slot_ptr(&self, slot_index: usize) -> NonNull<u8> {
        // SAFETY: slot_index < slot_count keeps the offset inside the backing block.
        unsafe { self.base.add(slot_index * self.slot_size) }
    }

    /// Slot index of `ptr` if it lies inside this pool.
    fn slot_of(&self, ptr: NonNull<u8>) -> Option<usize> {
        let start = self.base.as_ptr() as usize;
        let addr = ptr.as_ptr() as usize;
        let offset = addr.checked_sub(start)?;
        if offset >= self.backing.size() {
            return None;
        }
        debug_assert_eq!(offset % self.slot_size, 0, "pointer is not a slot start");
        Some(offset / self.slot_size)
    }

    fn in_use(&self) -> usize {
        self.bitmap.load(Ordering::Acquire).count_ones() as usize
    }
}

impl Drop for Pool {
    fn drop(&mut self) {
        // SAFETY: base was allocated in Pool::new with `backing`.
        unsafe { std::alloc::dealloc(self.base.as_ptr(), self.backing) };
    }
}

/// Slab-backed [`Allocator`].
///
/// Requests larger than the biggest class or aligned above
/// [`SLAB_ALIGN`] fail with [`AllocError`].
pub struct SlabAllocator {
    pools: Vec<Pool>,
}

impl SlabAllocator {
    pub fn new() -> Self {
        Self::with_size_classes(SIZE_CLASSES)
    }

    /// Build pools from `(slot_size, slot_count)` pairs.
    ///
    /// Sizes are clamped to [`MAX_SLOT_SIZE`] and rounded up to a multiple of
    /// [`SLAB_ALIGN`]; counts are clamped to `1..=64`. Classes are sorted by
    /// slot size.
    ///
    /// # Panics
    ///
    /// Aborts through `handle_alloc_error` if a pool's backing block cannot
    /// be allocated.
    pub fn with_size_classes(classes: &[(usize, usize)]) -> Self {
        let mut pools: Vec<Pool> = classes
            .iter()
            .map(|&(size, count)| Pool::new(size, count))
            .collect();
        pools.sort_by_key(|pool| pool.slot_size);
        Self { pools }
    }

    /// Total number of slots across all pools.
    pub fn capacity(&self) -> usize {
        self.pools.iter().map(|pool| pool.slot_count).sum()
    }

    /// Slots currently handed out.
    pub fn in_use(&self) -> usize {
        self.pools.iter().map(Pool::in_use).sum()
    }

    /// Slot size that would serve a request of `len` bytes, ignoring occupancy.
    pub fn class_for(&self, len: usize) -> Option<usize> {
        self.pools
            .iter()
            .find(|pool| pool.slot_size >= len)
            .map(|pool| pool.slot_size)
    }
}

impl Default for SlabAllocator {
    fn default() -> Self {
        Self::new()
    }
}

impl Allocator for SlabAllocator {
    fn allocate(&self, layout: Layout) -> Result<NonNull<u8>, AllocError> {
        if layout.size() == 0 || layout.align() > SLAB_ALIGN {
            return Err(AllocError::for_layout(layout));
        }

        // Find first size class >= len, then fall back to larger ones.
        let start = self
            .pools
            .iter()
            .position(|pool| pool.slot_size >= layout.size())
            .ok_or_else(|| AllocError::for_layout(layout))?;

        for pool in &self.pools[start..] {
            if let Some(slot_index) = pool.try_reserve() {
                return Ok(pool.slot_ptr(slot_index));
            }
        }

        log::debug!("[objrt] slab pools exhausted for {} bytes", layout.size());
        Err(AllocError::for_layout(layout))
    }

    unsafe fn free(&self, ptr: NonNull<u8>, _layout: Layout) {
        for pool in &self.pools {
            if let Some(slot_index) = pool.slot_of(ptr) {
                pool.release_slot(slot_index);
                return;
            }
        }
        log::error!("[objrt] slab free of foreign pointer {:p}", ptr);
    }
}
