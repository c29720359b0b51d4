//! System services the upload pipeline consults

/// Heap statistics used for upload admission
pub trait MemoryStats {
    /// Total free heap bytes
    fn free_bytes(&self) -> usize;

    /// Largest single allocation that could currently succeed.
    ///
    /// Allocators that cannot report this return the free total.
    fn largest_free_block(&self) -> usize {
        self.free_bytes()
    }
}

/// Monotonic millisecond clock; wraps after ~49 days
pub trait Clock {
    fn now_ms(&self) -> u32;
}

impl<T: MemoryStats + ?Sized> MemoryStats for &T {
    fn free_bytes(&self) -> usize {
        (**self).free_bytes()
    }

    fn largest_free_block(&self) -> usize {
        (**self).largest_free_block()
    }
}

impl<T: Clock + ?Sized> Clock for &T {
    fn now_ms(&self) -> u32 {
        (**self).now_ms()
    }
}
