//! 4-wire SPI panel bus
//!
//! Commands go out with D/C low, parameters and pixels with D/C high.
//! Chip select is held low for a whole transaction so a window setup and
//! its pixel data reach the controller as one unit.

use embassy_rp::gpio::Output;
use embassy_rp::spi::{Blocking, Instance, Spi};
use strata_hal::bus::pixel_bytes;
use strata_hal::{BusError, PanelBus};

/// Pixels staged per SPI write
const PIXEL_CHUNK: usize = 64;

pub struct SpiPanelBus<'d, T: Instance> {
    spi: Spi<'d, T, Blocking>,
    dc: Output<'d>,
    cs: Output<'d>,
}

impl<'d, T: Instance> SpiPanelBus<'d, T> {
    /// `dc` and `cs` should start high (data, deselected)
    pub fn new(spi: Spi<'d, T, Blocking>, dc: Output<'d>, cs: Output<'d>) -> Self {
        Self { spi, dc, cs }
    }

    fn write(&mut self, bytes: &[u8]) -> Result<(), BusError> {
        self.spi.blocking_write(bytes).map_err(|_| BusError::Transfer)
    }
}

impl<T: Instance> PanelBus for SpiPanelBus<'_, T> {
    type Error = BusError;

    fn begin_transaction(&mut self) {
        self.cs.set_low();
    }

    fn end_transaction(&mut self) {
        self.cs.set_high();
    }

    fn write_command(&mut self, cmd: u8, params: &[u8]) -> Result<(), BusError> {
        self.dc.set_low();
        let sent = self.write(&[cmd]);
        self.dc.set_high();
        sent?;
        if params.is_empty() {
            return Ok(());
        }
        self.write(params)
    }

    fn write_pixels(&mut self, pixels: &[u16], swap_bytes: bool) -> Result<(), BusError> {
        self.dc.set_high();
        let mut buf = [0u8; PIXEL_CHUNK * 2];
        for chunk in pixels.chunks(PIXEL_CHUNK) {
            for (dst, &pixel) in buf.chunks_exact_mut(2).zip(chunk) {
                dst.copy_from_slice(&pixel_bytes(pixel, swap_bytes));
            }
            self.write(&buf[..chunk.len() * 2])?;
        }
        Ok(())
    }
}
