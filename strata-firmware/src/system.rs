//! Heap statistics and clock for the upload manager

use embassy_time::Instant;
use strata_core::traits::{Clock, MemoryStats};

use crate::HEAP;

/// Free-space view of the global heap
///
/// The allocator cannot report its largest free block, so admission
/// falls back to the free total for that check.
#[derive(Clone, Copy, Default)]
pub struct HeapStats;

impl MemoryStats for HeapStats {
    fn free_bytes(&self) -> usize {
        HEAP.free()
    }
}

/// Milliseconds since boot, wrapping
#[derive(Clone, Copy, Default)]
pub struct UptimeClock;

impl Clock for UptimeClock {
    fn now_ms(&self) -> u32 {
        Instant::now().as_millis() as u32
    }
}
