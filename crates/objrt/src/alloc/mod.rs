// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Allocator collaborators.
//!
//! The runtime never calls the global allocator directly: object storage
//! comes from an [`Allocator`] chosen at build time.
//!
//! - [`SystemAllocator`]: `std::alloc`, the default
//! - [`TrackingAllocator`]: counts allocations, catches unknown frees, optional byte limit
//! - [`SlabAllocator`]: fixed size-class pools with atomic bitmaps

mod slab;
mod tracking;

pub use slab::SlabAllocator;
pub use tracking::{AllocStats, TrackingAllocator};

use std::alloc::Layout;
use std::ptr::NonNull;
use thiserror::Error;

/// The allocator could not satisfy a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("cannot allocate {size} bytes (align {align})")]
pub struct AllocError {
    pub size: usize,
    pub align: usize,
}

impl AllocError {
    pub fn for_layout(layout: Layout) -> Self {
        Self {
            size: layout.size(),
            align: layout.align(),
        }
    }
}

/// Source of object storage.
pub trait Allocator: Send + Sync {
    /// Allocate `layout.size()` bytes aligned to `layout.align()`.
    ///
    /// Contents of the returned block are unspecified.
    fn allocate(&self, layout: Layout) -> Result<NonNull<u8>, AllocError>;

    /// Return a block to the allocator.
    ///
    /// # Safety
    ///
    /// `ptr` must have been returned by `allocate` on this allocator with the
    /// same `layout` and not freed since.
    unsafe fn free(&self, ptr: NonNull<u8>, layout: Layout);
}

/// Allocator backed by `std::alloc`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemAllocator;

impl Allocator for SystemAllocator {
    fn allocate(&self, layout: Layout) -> Result<NonNull<u8>, AllocError> {
        if layout.size() == 0 {
            return Err(AllocError::for_layout(layout));
        }
        // SAFETY: layout has non-zero size.
        let ptr = unsafe { std::alloc::alloc(layout) };
        NonNull::new(ptr).ok_or_else(|| AllocError::for_layout(layout))
    }

    unsafe fn free(&self, ptr: NonNull<u8>, layout: Layout) {
        // SAFETY: caller guarantees ptr came from `allocate` with this layout.
        unsafe { std::alloc::dealloc(ptr.as_ptr(), layout) };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_allocate_free() {
        let layout = Layout::from_size_align(48, 16).expect("valid layout");
        let ptr = SystemAllocator
            .allocate(layout)
            .expect("system allocation should succeed");
        assert_eq!(ptr.as_ptr() as usize % 16, 0);
        // SAFETY: allocated above with the same layout.
        unsafe { SystemAllocator.free(ptr, layout) };
    }

    #[test]
    fn test_system_rejects_zero_size() {
        let layout = Layout::from_size_align(0, 1).expect("valid layout");
        assert_eq!(
            SystemAllocator.allocate(layout),
            Err(AllocError { size: 0, align: 1 })
        );
    }
}
