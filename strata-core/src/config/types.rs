//! Upload pipeline configuration

use crate::color::ColorOrder;

/// Lower bound for fragmentation-aware headroom
pub const MIN_ADAPTIVE_HEADROOM: usize = 24 * 1024;

/// Headroom cap when the heap is barely fragmented (<= 45 %)
pub const LOW_FRAGMENTATION_CAP: usize = 32 * 1024;

/// Headroom cap when the heap is moderately fragmented (<= 60 %)
pub const MID_FRAGMENTATION_CAP: usize = 40 * 1024;

/// How much free heap must remain beyond an upload for decoding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HeadroomPolicy {
    /// Always reserve `decode_headroom_bytes`
    #[default]
    Fixed,
    /// Shrink the reserve when the heap is unfragmented (boards without PSRAM)
    FragmentationAware,
}

/// Upload admission and display timeout settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct UploadConfig {
    /// Largest accepted upload (whole image or single strip)
    pub max_image_bytes: usize,
    /// Heap that must stay free after the upload buffer is reserved
    pub decode_headroom_bytes: usize,
    pub headroom_policy: HeadroomPolicy,
    /// Display timeout when the request does not specify one
    pub default_timeout_ms: u32,
    /// Upper bound for requested timeouts
    pub max_timeout_ms: u32,
    /// Drop a receiving upload after this long without a chunk
    pub stale_upload_ms: u32,
    /// Packing used when converting decoded pixels
    pub color_order: ColorOrder,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_image_bytes: 128 * 1024,
            decode_headroom_bytes: 48 * 1024,
            headroom_policy: HeadroomPolicy::Fixed,
            default_timeout_ms: 10_000,
            max_timeout_ms: 3_600_000,
            stale_upload_ms: 30_000,
            color_order: ColorOrder::Rgb565,
        }
    }
}

impl UploadConfig {
    /// Headroom to require given the current heap state
    pub fn effective_headroom(&self, free: usize, largest_block: usize) -> usize {
        let base = self.decode_headroom_bytes;
        match self.headroom_policy {
            HeadroomPolicy::Fixed => base,
            HeadroomPolicy::FragmentationAware => {
                if free == 0 {
                    return base.max(MIN_ADAPTIVE_HEADROOM);
                }
                let largest = largest_block.min(free);
                let fragmentation = 100 - (largest as u64 * 100 / free as u64) as usize;
                let capped = if fragmentation <= 45 {
                    base.min(LOW_FRAGMENTATION_CAP)
                } else if fragmentation <= 60 {
                    base.min(MID_FRAGMENTATION_CAP)
                } else {
                    base
                };
                capped.max(MIN_ADAPTIVE_HEADROOM)
            }
        }
    }

    /// Display timeout for a request: clamped to the maximum, default when absent
    pub fn resolve_timeout(&self, timeout_s: Option<u32>) -> u32 {
        match timeout_s {
            None => self.default_timeout_ms,
            Some(s) => s.saturating_mul(1000).min(self.max_timeout_ms),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn adaptive(base: usize) -> UploadConfig {
        UploadConfig {
            decode_headroom_bytes: base,
            headroom_policy: HeadroomPolicy::FragmentationAware,
            ..UploadConfig::default()
        }
    }

    #[test]
    fn test_fixed_headroom_ignores_heap_state() {
        let cfg = UploadConfig::default();
        assert_eq!(cfg.effective_headroom(100_000, 10), 48 * 1024);
    }

    #[test]
    fn test_adaptive_headroom_bands() {
        let cfg = adaptive(64 * 1024);
        // 0 % fragmentation
        assert_eq!(cfg.effective_headroom(100_000, 100_000), LOW_FRAGMENTATION_CAP);
        // 50 %
        assert_eq!(cfg.effective_headroom(100_000, 50_000), MID_FRAGMENTATION_CAP);
        // 80 %
        assert_eq!(cfg.effective_headroom(100_000, 20_000), 64 * 1024);
    }

    #[test]
    fn test_adaptive_headroom_floor() {
        let cfg = adaptive(8 * 1024);
        assert_eq!(cfg.effective_headroom(100_000, 100_000), MIN_ADAPTIVE_HEADROOM);
        assert_eq!(cfg.effective_headroom(0, 0), MIN_ADAPTIVE_HEADROOM);
    }

    #[test]
    fn test_resolve_timeout() {
        let cfg = UploadConfig::default();
        assert_eq!(cfg.resolve_timeout(None), 10_000);
        assert_eq!(cfg.resolve_timeout(Some(0)), 0);
        assert_eq!(cfg.resolve_timeout(Some(30)), 30_000);
        assert_eq!(cfg.resolve_timeout(Some(u32::MAX)), 3_600_000);
    }
}
