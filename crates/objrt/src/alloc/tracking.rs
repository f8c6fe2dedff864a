// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Accounting allocator for tests and leak hunting.

use super::{AllocError, Allocator, SystemAllocator};
use parking_lot::Mutex;
use std::alloc::Layout;
use std::collections::HashMap;
use std::ptr::NonNull;

/// Snapshot of a [`TrackingAllocator`]'s counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AllocStats {
    pub allocations: u64,
    pub frees: u64,
    /// Requests refused because of the byte limit or the system allocator.
    pub failures: u64,
    /// Frees of pointers this allocator does not own (double frees included).
    pub invalid_frees: u64,
    pub live_blocks: usize,
    pub live_bytes: usize,
    pub peak_bytes: usize,
}

#[derive(Default)]
struct TrackingState {
    live: HashMap<usize, Layout>,
    stats: AllocStats,
    limit: Option<usize>,
}

/// Wraps [`SystemAllocator`] and records every block it hands out.
///
/// Freed pointers are checked against the live set: unknown or repeated
/// frees are counted and logged instead of reaching the system allocator.
#[derive(Default)]
pub struct TrackingAllocator {
    state: Mutex<TrackingState>,
}

impl TrackingAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Refuse requests that would push live bytes above `limit`.
    pub fn with_limit(limit: usize) -> Self {
        let tracker = Self::new();
        tracker.set_limit(Some(limit));
        tracker
    }

    pub fn set_limit(&self, limit: Option<usize>) {
        self.state.lock().limit = limit;
    }

    pub fn stats(&self) -> AllocStats {
        let state = self.state.lock();
        AllocStats {
            live_blocks: state.live.len(),
            ..state.stats
        }
    }

    /// Every allocation has been freed exactly once.
    pub fn is_balanced(&self) -> bool {
        let state = self.state.lock();
        state.live.is_empty()
            && state.stats.invalid_frees == 0
            && state.stats.allocations == state.stats.frees
    }
}

impl Allocator for TrackingAllocator {
    fn allocate(&self, layout: Layout) -> Result<NonNull<u8>, AllocError> {
        let mut state = self.state.lock();

        if let Some(limit) = state.limit {
            if state.stats.live_bytes.saturating_add(layout.size()) > limit {
                state.stats.failures += 1;
                log::debug!(
                    "[objrt] tracking allocator refused {} bytes (live {}, limit {})",
                    layout.size(),
                    state.stats.live_bytes,
                    limit
                );
                return Err(AllocError::for_layout(layout));
            }
        }

        let ptr = match SystemAllocator.allocate(layout) {
            Ok(ptr) => ptr,
            Err(err) => {
                state.stats.failures += 1;
                return Err(err);
            }
        };

        state.live.insert(ptr.as_ptr() as usize, layout);
        state.stats.allocations += 1;
        state.stats.live_bytes += layout.size();
        state.stats.peak_bytes = state.stats.peak_bytes.max(state.stats.live_bytes);
        Ok(ptr)
    }

    unsafe fn free(&self, ptr: NonNull<u8>, layout: Layout) {
        let mut state = self.state.lock();

        let Some(recorded) = state.live.remove(&(ptr.as_ptr() as usize)) else {
            state.stats.invalid_frees += 1;
            log::error!(
                "[objrt] free of unknown block {:p} ({} bytes)",
                ptr,
                layout.size()
            );
            return;
        };
        if recorded != layout {
            log::warn!(
                "[objrt] block {:p} freed with layout {:?}, allocated with {:?}",
                ptr,
                layout,
                recorded
            );
        }

        state.stats.frees += 1;
        state.stats.live_bytes -= recorded.size();
        // SAFETY: ptr was handed out by SystemAllocator with `recorded`.
        unsafe { SystemAllocator.free(ptr, recorded) };
    }
}

impl Drop for TrackingAllocator {
    fn drop(&mut self) {
        let state = self.state.get_mut();
        if state.live.is_empty() {
            return;
        }
        log::warn!(
            "[objrt] tracking allocator dropped with {} live blocks ({} bytes)",
            state.live.len(),
            state.stats.live_bytes
        );
        for (addr, layout) in state.live.drain() {
            if let Some(ptr) = NonNull::new(addr as *mut u8) {
                // SAFETY: every live entry came from SystemAllocator with this layout.
                unsafe { SystemAllocator.free(ptr, layout) };
            }
        }
    }
}
