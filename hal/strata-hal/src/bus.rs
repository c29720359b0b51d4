//! Display controller bus
//!
//! MIPI-DCS style controllers take a command byte followed by parameter
//! or pixel data. The bus hides whether that is 4-wire SPI with a D/C
//! line or a quad-SPI framing.

/// Bus transfer failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BusError {
    /// The peripheral reported a transfer error
    Transfer,
    /// A control line could not be driven
    Pin,
}

/// Command/data bus to a display controller
pub trait PanelBus {
    /// Error type for bus operations
    type Error: Into<BusError>;

    /// Assert chip select for a sequence of writes
    fn begin_transaction(&mut self);

    /// Release chip select
    fn end_transaction(&mut self);

    /// Send a command byte followed by its parameter bytes
    fn write_command(&mut self, cmd: u8, params: &[u8]) -> Result<(), Self::Error>;

    /// Send RGB565 pixels as data.
    ///
    /// With `swap_bytes` each pixel goes out high byte first (the order
    /// panels expect); without it the caller has already swapped and the
    /// low byte goes first.
    fn write_pixels(&mut self, pixels: &[u16], swap_bytes: bool) -> Result<(), Self::Error>;
}

impl<T: PanelBus + ?Sized> PanelBus for &mut T {
    type Error = T::Error;

    fn begin_transaction(&mut self) {
        (**self).begin_transaction()
    }

    fn end_transaction(&mut self) {
        (**self).end_transaction()
    }

    fn write_command(&mut self, cmd: u8, params: &[u8]) -> Result<(), Self::Error> {
        (**self).write_command(cmd, params)
    }

    fn write_pixels(&mut self, pixels: &[u16], swap_bytes: bool) -> Result<(), Self::Error> {
        (**self).write_pixels(pixels, swap_bytes)
    }
}

/// Byte order of one pixel on the wire
#[inline]
pub fn pixel_bytes(pixel: u16, swap_bytes: bool) -> [u8; 2] {
    if swap_bytes {
        pixel.to_be_bytes()
    } else {
        pixel.to_le_bytes()
    }
}
