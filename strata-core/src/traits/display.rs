//! Display driver trait
//!
//! A driver exposes an address-window pixel interface in logical
//! (post-rotation) coordinates. How pixels reach the glass depends on the
//! declared [`RenderMode`]:
//!
//! - `Direct`: every `push_colors` goes straight to the panel.
//! - `Buffered`: pushes land in a RAM framebuffer and only reach the panel
//!   on [`DisplayDriver::present`]. Used for panels that lose their address
//!   window between bus transactions.

use crate::color::BLACK;

/// Errors reported by display drivers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DisplayError {
    /// Bus transfer failed
    Bus,
    /// Panel did not accept the init sequence
    InitFailed,
    /// Framebuffer could not be allocated
    OutOfMemory,
    /// Driver is not initialized (or init failed)
    NotReady,
}

/// How pixels pushed through the driver reach the panel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RenderMode {
    /// Pixels are written to the panel immediately
    Direct,
    /// Pixels are staged in a framebuffer until `present()`
    Buffered,
}

/// Panel rotation in quarter turns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Rotation {
    #[default]
    Deg0,
    Deg90,
    Deg180,
    Deg270,
}

impl Rotation {
    /// From quarter turns (0-3); larger values wrap
    pub fn from_quarter_turns(turns: u8) -> Self {
        match turns & 3 {
            0 => Rotation::Deg0,
            1 => Rotation::Deg90,
            2 => Rotation::Deg180,
            _ => Rotation::Deg270,
        }
    }

    pub fn quarter_turns(self) -> u8 {
        self as u8
    }

    /// True for 90 and 270 degrees, where logical width and height swap
    pub fn is_portrait_swap(self) -> bool {
        matches!(self, Rotation::Deg90 | Rotation::Deg270)
    }
}

/// Width and height in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Size {
    pub width: u16,
    pub height: u16,
}

impl Size {
    pub const fn new(width: u16, height: u16) -> Self {
        Self { width, height }
    }

    /// Swap axes when `rotation` turns the panel sideways
    pub fn rotated(self, rotation: Rotation) -> Self {
        if rotation.is_portrait_swap() {
            Self::new(self.height, self.width)
        } else {
            self
        }
    }
}

/// Pixel-level display driver
///
/// Drivers whose `init` failed stay non-functional: every drawing call is
/// a no-op and `is_ready` returns false.
pub trait DisplayDriver {
    /// Run the panel init sequence and allocate any driver buffers
    fn init(&mut self) -> Result<(), DisplayError>;

    /// Whether `init` succeeded
    fn is_ready(&self) -> bool;

    fn set_rotation(&mut self, rotation: Rotation);

    fn rotation(&self) -> Rotation;

    /// Logical width for the current rotation
    fn width(&self) -> u16;

    /// Logical height for the current rotation
    fn height(&self) -> u16;

    /// Switch the backlight fully on or off
    fn set_backlight(&mut self, on: bool);

    /// Brightness in percent (0-100); a no-op without backlight control
    fn set_backlight_brightness(&mut self, percent: u8);

    fn backlight_brightness(&self) -> u8;

    fn has_backlight_control(&self) -> bool;

    /// Begin a burst of window/pixel calls
    fn start_write(&mut self);

    /// End a burst started with `start_write`
    fn end_write(&mut self);

    /// Target rectangle for the following `push_colors` calls
    fn set_addr_window(&mut self, x: u16, y: u16, w: u16, h: u16);

    /// Write pixels into the current window, row-major.
    ///
    /// `swap_bytes` sends each pixel most significant byte first on the wire.
    fn push_colors(&mut self, pixels: &[u16], swap_bytes: bool);

    fn render_mode(&self) -> RenderMode {
        RenderMode::Direct
    }

    /// Buffered drivers: staged pixels are waiting for `present`
    fn needs_present(&self) -> bool {
        false
    }

    /// Buffered drivers: transfer staged rows to the panel
    fn present(&mut self) -> Result<(), DisplayError> {
        Ok(())
    }

    /// Fill the whole logical surface with one color, row by row
    fn fill_screen(&mut self, color: u16) {
        let width = self.width();
        let height = self.height();
        if width == 0 || height == 0 {
            return;
        }
        let row = [color; 64];
        self.start_write();
        self.set_addr_window(0, 0, width, height);
        for _ in 0..height {
            let mut left = width as usize;
            while left > 0 {
                let n = left.min(row.len());
                self.push_colors(&row[..n], true);
                left -= n;
            }
        }
        self.end_write();
    }

    /// Blank the panel to black
    fn clear(&mut self) {
        self.fill_screen(BLACK);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rotation_wraps() {
        assert_eq!(Rotation::from_quarter_turns(0), Rotation::Deg0);
        assert_eq!(Rotation::from_quarter_turns(3), Rotation::Deg270);
        assert_eq!(Rotation::from_quarter_turns(5), Rotation::Deg90);
        assert_eq!(Rotation::Deg180.quarter_turns(), 2);
    }

    #[test]
    fn test_size_rotation() {
        let s = Size::new(320, 480);
        assert_eq!(s.rotated(Rotation::Deg0), s);
        assert_eq!(s.rotated(Rotation::Deg90), Size::new(480, 320));
        assert_eq!(s.rotated(Rotation::Deg180), s);
        assert_eq!(s.rotated(Rotation::Deg270), Size::new(480, 320));
    }
}
