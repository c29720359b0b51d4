//! Display hardware configuration

use crate::traits::display::{Rotation, Size};

/// Which panel driver the firmware instantiates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DriverKind {
    /// ST7789 over 4-wire SPI (direct)
    #[default]
    St7789,
    /// ILI9341 over 4-wire SPI (direct)
    Ili9341,
    /// AXS15231B (buffered; loses its address window between transactions)
    Axs15231b,
}

impl DriverKind {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "st7789" => Some(DriverKind::St7789),
            "ili9341" => Some(DriverKind::Ili9341),
            "axs15231b" => Some(DriverKind::Axs15231b),
            _ => None,
        }
    }
}

/// Panel geometry and controller settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DisplayHwConfig {
    pub driver: DriverKind,
    /// Native (rotation 0) width
    pub width: u16,
    /// Native (rotation 0) height
    pub height: u16,
    pub rotation: Rotation,
    /// Controller RAM offset of the visible area
    pub x_offset: u16,
    pub y_offset: u16,
    /// Panel needs display inversion on (most IPS ST7789 modules)
    pub invert: bool,
    /// Panel wires blue to the high bits
    pub bgr: bool,
    /// SPI clock in Hz
    pub spi_hz: u32,
}

impl Default for DisplayHwConfig {
    fn default() -> Self {
        Self {
            driver: DriverKind::St7789,
            width: 240,
            height: 320,
            rotation: Rotation::Deg0,
            x_offset: 0,
            y_offset: 0,
            invert: true,
            bgr: false,
            spi_hz: 62_500_000,
        }
    }
}

impl DisplayHwConfig {
    /// Native panel size
    pub fn native_size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    /// Visible size after rotation
    pub fn visible_size(&self) -> Size {
        self.native_size().rotated(self.rotation)
    }
}

/// Backlight control settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BacklightConfig {
    /// Dim with PWM; otherwise plain on/off
    pub pwm: bool,
    pub active_low: bool,
    /// PWM duty (0-255) at 1 % brightness
    pub duty_min: u8,
    /// PWM duty (0-255) at 99 % brightness
    pub duty_max: u8,
    /// Brightness applied at boot, percent
    pub brightness: u8,
}

impl Default for BacklightConfig {
    fn default() -> Self {
        Self {
            pwm: true,
            active_low: false,
            duty_min: 10,
            duty_max: 255,
            brightness: 100,
        }
    }
}
