//! 16-bit pixel packing
//!
//! Conversion from RGB888 truncates: the low 3/2/3 bits of red, green and
//! blue are dropped, never rounded.

/// Channel order of the packed 16-bit pixel expected by the panel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ColorOrder {
    /// Red in the high five bits
    #[default]
    Rgb565,
    /// Blue in the high five bits
    Bgr565,
}

impl ColorOrder {
    /// Pack one RGB888 pixel
    #[inline]
    pub fn pack(self, r: u8, g: u8, b: u8) -> u16 {
        match self {
            ColorOrder::Rgb565 => pack_rgb565(r, g, b),
            ColorOrder::Bgr565 => pack_bgr565(r, g, b),
        }
    }
}

#[inline]
pub const fn pack_rgb565(r: u8, g: u8, b: u8) -> u16 {
    ((r as u16 & 0xF8) << 8) | ((g as u16 & 0xFC) << 3) | (b as u16 >> 3)
}

#[inline]
pub const fn pack_bgr565(r: u8, g: u8, b: u8) -> u16 {
    ((b as u16 & 0xF8) << 8) | ((g as u16 & 0xFC) << 3) | (r as u16 >> 3)
}

/// Black in either order
pub const BLACK: u16 = 0x0000;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_primaries() {
        assert_eq!(pack_rgb565(255, 0, 0), 0xF800);
        assert_eq!(pack_rgb565(0, 255, 0), 0x07E0);
        assert_eq!(pack_rgb565(0, 0, 255), 0x001F);
        assert_eq!(pack_bgr565(255, 0, 0), 0x001F);
        assert_eq!(pack_bgr565(0, 0, 255), 0xF800);
    }

    #[test]
    fn test_truncates_low_bits() {
        // 0x07 red, 0x03 green, 0x07 blue all vanish
        assert_eq!(pack_rgb565(7, 3, 7), 0);
        assert_eq!(pack_rgb565(8, 4, 8), 0x0821);
        assert_eq!(ColorOrder::Rgb565.pack(200, 200, 200), 0xCE59);
    }
}
