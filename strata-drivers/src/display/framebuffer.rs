//! Portrait framebuffer with dirty-row tracking
//!
//! Stored in the panel's native (rotation 0) orientation so a present is a
//! single linear transfer from the origin. Writers address it in logical
//! coordinates; [`to_physical`] maps them through the rotation.

use alloc::vec::Vec;

use strata_core::traits::{Rotation, Size};

/// Physical pixel for logical `(lx, ly)` on a `native` portrait panel
#[inline]
pub fn to_physical(rotation: Rotation, native: Size, lx: u16, ly: u16) -> (u16, u16) {
    let w = native.width;
    let h = native.height;
    match rotation {
        Rotation::Deg0 => (lx, ly),
        Rotation::Deg90 => (ly, h.wrapping_sub(1).wrapping_sub(lx)),
        Rotation::Deg180 => (w.wrapping_sub(1).wrapping_sub(lx), h.wrapping_sub(1).wrapping_sub(ly)),
        Rotation::Deg270 => (w.wrapping_sub(1).wrapping_sub(ly), lx),
    }
}

/// Full-panel RGB565 framebuffer
pub struct Framebuffer {
    size: Size,
    pixels: Vec<u16>,
    max_dirty_row: Option<u16>,
}

impl Framebuffer {
    /// Allocate a black framebuffer; `None` if the heap cannot hold it
    pub fn try_new(size: Size) -> Option<Self> {
        let len = size.width as usize * size.height as usize;
        let mut pixels = Vec::new();
        pixels.try_reserve_exact(len).ok()?;
        pixels.resize(len, 0);
        Some(Self {
            size,
            pixels,
            max_dirty_row: None,
        })
    }

    pub fn size(&self) -> Size {
        self.size
    }

    /// Store one pixel at physical coordinates; out-of-range writes are dropped
    #[inline]
    pub fn set(&mut self, px: u16, py: u16, color: u16) {
        if px >= self.size.width || py >= self.size.height {
            return;
        }
        self.pixels[py as usize * self.size.width as usize + px as usize] = color;
        self.mark_dirty(py);
    }

    #[cfg(test)]
    pub(crate) fn get(&self, px: u16, py: u16) -> Option<u16> {
        if px >= self.size.width || py >= self.size.height {
            return None;
        }
        Some(self.pixels[py as usize * self.size.width as usize + px as usize])
    }

    /// Fill everything and mark all rows dirty
    pub fn fill(&mut self, color: u16) {
        self.pixels.fill(color);
        self.mark_dirty(self.size.height.saturating_sub(1));
    }

    #[inline]
    pub fn mark_dirty(&mut self, row: u16) {
        self.max_dirty_row = Some(self.max_dirty_row.map_or(row, |r| r.max(row)));
    }

    pub fn max_dirty_row(&self) -> Option<u16> {
        self.max_dirty_row
    }

    pub fn clear_dirty(&mut self) {
        self.max_dirty_row = None;
    }

    /// Rows `0..=last` as one contiguous slice
    pub fn rows_through(&self, last: u16) -> &[u16] {
        let rows = (last as usize + 1).min(self.size.height as usize);
        &self.pixels[..rows * self.size.width as usize]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NATIVE: Size = Size::new(4, 6);

    #[test]
    fn test_rotation_mapping_corners() {
        // Logical origin lands on a different physical corner per rotation
        assert_eq!(to_physical(Rotation::Deg0, NATIVE, 0, 0), (0, 0));
        assert_eq!(to_physical(Rotation::Deg90, NATIVE, 0, 0), (0, 5));
        assert_eq!(to_physical(Rotation::Deg180, NATIVE, 0, 0), (3, 5));
        assert_eq!(to_physical(Rotation::Deg270, NATIVE, 0, 0), (3, 0));
        // Far logical corner: rotation 90 is 6 wide, 4 tall
        assert_eq!(to_physical(Rotation::Deg90, NATIVE, 5, 3), (3, 0));
        assert_eq!(to_physical(Rotation::Deg270, NATIVE, 5, 3), (0, 5));
    }

    #[test]
    fn test_dirty_watermark() {
        let mut fb = Framebuffer::try_new(NATIVE).unwrap();
        assert_eq!(fb.max_dirty_row(), None);
        fb.set(1, 3, 0xFFFF);
        fb.set(0, 1, 0xFFFF);
        assert_eq!(fb.max_dirty_row(), Some(3));
        assert_eq!(fb.rows_through(3).len(), 16);
        fb.set(9, 9, 0xFFFF);
        assert_eq!(fb.max_dirty_row(), Some(3));
        fb.clear_dirty();
        assert_eq!(fb.max_dirty_row(), None);
        assert_eq!(fb.get(1, 3), Some(0xFFFF));
    }

    #[test]
    fn test_fill_marks_everything() {
        let mut fb = Framebuffer::try_new(NATIVE).unwrap();
        fb.fill(0x1234);
        assert_eq!(fb.max_dirty_row(), Some(5));
        assert!(fb.rows_through(5).iter().all(|&p| p == 0x1234));
    }
}
