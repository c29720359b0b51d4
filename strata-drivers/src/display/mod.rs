//! Display panel drivers
//!
//! - [`MipiDcsPanel`]: ST7789 / ILI9341 class controllers that keep their
//!   address window; pixels stream straight to the bus (`Direct`).
//! - [`Axs15231b`]: controller that forgets the address window between
//!   bus transactions; pixels are staged in a [`Framebuffer`] and sent
//!   from the origin on `present` (`Buffered`).

pub mod axs15231b;
pub mod framebuffer;
pub mod mipi_dcs;

pub use axs15231b::Axs15231b;
pub use framebuffer::Framebuffer;
pub use mipi_dcs::MipiDcsPanel;

use strata_hal::{BusError, OutputPin, PanelBus};

/// MIPI DCS command set shared by the supported controllers
pub mod dcs {
    pub const SWRESET: u8 = 0x01;
    pub const SLPOUT: u8 = 0x11;
    pub const NORON: u8 = 0x13;
    pub const INVOFF: u8 = 0x20;
    pub const INVON: u8 = 0x21;
    pub const DISPON: u8 = 0x29;
    pub const CASET: u8 = 0x2A;
    pub const RASET: u8 = 0x2B;
    pub const RAMWR: u8 = 0x2C;
    pub const MADCTL: u8 = 0x36;
    pub const COLMOD: u8 = 0x3A;

    /// COLMOD parameter for 16 bits per pixel
    pub const PIXEL_FORMAT_16BIT: u8 = 0x55;

    pub const MADCTL_MY: u8 = 0x80;
    pub const MADCTL_MX: u8 = 0x40;
    pub const MADCTL_MV: u8 = 0x20;
    pub const MADCTL_BGR: u8 = 0x08;
}

/// Start/end coordinates as a CASET/RASET parameter block
#[inline]
pub(crate) fn range_params(start: u16, end: u16) -> [u8; 4] {
    let [s0, s1] = start.to_be_bytes();
    let [e0, e1] = end.to_be_bytes();
    [s0, s1, e0, e1]
}

/// Latched bus fault reporting: only the first failure is logged
#[derive(Debug, Default)]
pub(crate) struct FaultLatch {
    logged: bool,
}

impl FaultLatch {
    pub(crate) fn check<T, E: Into<BusError>>(&mut self, result: Result<T, E>) -> Option<T> {
        match result {
            Ok(v) => Some(v),
            Err(e) => {
                let _err: BusError = e.into();
                if !self.logged {
                    self.logged = true;
                    #[cfg(feature = "defmt")]
                    defmt::warn!("display bus error: {}", _err);
                }
                None
            }
        }
    }
}

/// Pulse the reset line: high, low, high with settle delays
pub(crate) fn hardware_reset<R: OutputPin, D: embedded_hal::delay::DelayNs>(reset: &mut R, delay: &mut D) {
    reset.set_high();
    delay.delay_ms(5);
    reset.set_low();
    delay.delay_ms(20);
    reset.set_high();
    delay.delay_ms(150);
}

/// Send a list of `(command, params, delay_ms)` steps
pub(crate) fn send_sequence<B: PanelBus, D: embedded_hal::delay::DelayNs>(
    bus: &mut B,
    delay: &mut D,
    steps: &[(u8, &[u8], u32)],
) -> Result<(), BusError> {
    bus.begin_transaction();
    for &(cmd, params, wait_ms) in steps {
        if let Err(e) = bus.write_command(cmd, params) {
            bus.end_transaction();
            return Err(e.into());
        }
        if wait_ms > 0 {
            delay.delay_ms(wait_ms);
        }
    }
    bus.end_transaction();
    Ok(())
}
