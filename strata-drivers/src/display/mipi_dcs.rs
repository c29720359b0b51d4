//! ST7789 / ILI9341 class panels over a command/data bus
//!
//! These controllers keep their address window across transactions, so
//! every `push_colors` streams straight to the panel RAM.

use embedded_hal::delay::DelayNs;
use strata_core::config::{DisplayHwConfig, DriverKind};
use strata_core::traits::{DisplayDriver, DisplayError, RenderMode, Rotation, Size};
use strata_hal::{OutputPin, PanelBus};

use super::{dcs, hardware_reset, range_params, send_sequence, FaultLatch};
use crate::backlight::Backlight;

/// Controller family; selects init sequence and MADCTL rotation table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Controller {
    St7789,
    Ili9341,
}

impl Controller {
    /// MADCTL value (without the BGR bit) for a rotation
    pub fn madctl(self, rotation: Rotation) -> u8 {
        use super::dcs::{MADCTL_MV as MV, MADCTL_MX as MX, MADCTL_MY as MY};
        match (self, rotation) {
            (Controller::St7789, Rotation::Deg0) => 0,
            (Controller::St7789, Rotation::Deg90) => MX | MV,
            (Controller::St7789, Rotation::Deg180) => MX | MY,
            (Controller::St7789, Rotation::Deg270) => MV | MY,
            (Controller::Ili9341, Rotation::Deg0) => MX,
            (Controller::Ili9341, Rotation::Deg90) => MV,
            (Controller::Ili9341, Rotation::Deg180) => MY,
            (Controller::Ili9341, Rotation::Deg270) => MX | MY | MV,
        }
    }
}

/// Direct-mode panel driver
pub struct MipiDcsPanel<B: PanelBus, R: OutputPin, L: Backlight, D: DelayNs> {
    bus: B,
    reset: R,
    backlight: L,
    delay: D,
    controller: Controller,
    native: Size,
    x_offset: u16,
    y_offset: u16,
    invert: bool,
    bgr: bool,
    rotation: Rotation,
    ready: bool,
    write_depth: u8,
    faults: FaultLatch,
}

impl<B: PanelBus, R: OutputPin, L: Backlight, D: DelayNs> MipiDcsPanel<B, R, L, D> {
    /// Create the driver; nothing is sent until [`DisplayDriver::init`]
    pub fn new(bus: B, reset: R, backlight: L, delay: D, config: &DisplayHwConfig) -> Self {
        let controller = match config.driver {
            DriverKind::Ili9341 => Controller::Ili9341,
            _ => Controller::St7789,
        };
        Self {
            bus,
            reset,
            backlight,
            delay,
            controller,
            native: config.native_size(),
            x_offset: config.x_offset,
            y_offset: config.y_offset,
            invert: config.invert,
            bgr: config.bgr,
            rotation: config.rotation,
            ready: false,
            write_depth: 0,
            faults: FaultLatch::default(),
        }
    }

    pub fn controller(&self) -> Controller {
        self.controller
    }

    pub fn bus(&self) -> &B {
        &self.bus
    }

    pub fn backlight(&self) -> &L {
        &self.backlight
    }

    fn madctl(&self) -> u8 {
        let bgr = if self.bgr { dcs::MADCTL_BGR } else { 0 };
        self.controller.madctl(self.rotation) | bgr
    }

    /// RAM offset of the visible area in the current orientation
    fn offsets(&self) -> (u16, u16) {
        if self.rotation.is_portrait_swap() {
            (self.y_offset, self.x_offset)
        } else {
            (self.x_offset, self.y_offset)
        }
    }

    fn init_sequence(&mut self) -> Result<(), strata_hal::BusError> {
        let madctl = [self.madctl()];
        let inversion = if self.invert { dcs::INVON } else { dcs::INVOFF };
        send_sequence(
            &mut self.bus,
            &mut self.delay,
            &[
                (dcs::SWRESET, &[], 150),
                (dcs::SLPOUT, &[], 120),
                (dcs::COLMOD, &[dcs::PIXEL_FORMAT_16BIT], 10),
                (dcs::MADCTL, &madctl, 0),
            ],
        )?;
        if self.controller == Controller::Ili9341 {
            send_sequence(
                &mut self.bus,
                &mut self.delay,
                &[
                    // Power control 1/2, VCOM, frame rate, gamma curve 1
                    (0xC0, &[0x23], 0),
                    (0xC1, &[0x10], 0),
                    (0xC5, &[0x3E, 0x28], 0),
                    (0xC7, &[0x86], 0),
                    (0xB1, &[0x00, 0x18], 0),
                    (0x26, &[0x01], 0),
                ],
            )?;
        }
        send_sequence(
            &mut self.bus,
            &mut self.delay,
            &[(inversion, &[], 0), (dcs::NORON, &[], 10), (dcs::DISPON, &[], 20)],
        )
    }

    /// Run `f` inside a transaction unless the caller already opened one
    fn in_transaction(&mut self, f: impl FnOnce(&mut Self)) {
        let standalone = self.write_depth == 0;
        if standalone {
            self.bus.begin_transaction();
        }
        f(self);
        if standalone {
            self.bus.end_transaction();
        }
    }
}

impl<B: PanelBus, R: OutputPin, L: Backlight, D: DelayNs> DisplayDriver for MipiDcsPanel<B, R, L, D> {
    fn init(&mut self) -> Result<(), DisplayError> {
        hardware_reset(&mut self.reset, &mut self.delay);
        match self.init_sequence() {
            Ok(()) => {
                self.ready = true;
                Ok(())
            }
            Err(_e) => {
                self.ready = false;
                #[cfg(feature = "defmt")]
                defmt::error!("{} init failed: {}", self.controller, _e);
                Err(DisplayError::InitFailed)
            }
        }
    }

    fn is_ready(&self) -> bool {
        self.ready
    }

    fn set_rotation(&mut self, rotation: Rotation) {
        self.rotation = rotation;
        if !self.ready {
            return;
        }
        let madctl = [self.madctl()];
        self.in_transaction(|panel| {
            let result = panel.bus.write_command(dcs::MADCTL, &madctl);
            panel.faults.check(result);
        });
    }

    fn rotation(&self) -> Rotation {
        self.rotation
    }

    fn width(&self) -> u16 {
        self.native.rotated(self.rotation).width
    }

    fn height(&self) -> u16 {
        self.native.rotated(self.rotation).height
    }

    fn set_backlight(&mut self, on: bool) {
        self.backlight.set_on(on);
    }

    fn set_backlight_brightness(&mut self, percent: u8) {
        self.backlight.set_brightness(percent);
    }

    fn backlight_brightness(&self) -> u8 {
        self.backlight.brightness()
    }

    fn has_backlight_control(&self) -> bool {
        self.backlight.is_controllable()
    }

    fn start_write(&mut self) {
        if !self.ready {
            return;
        }
        if self.write_depth == 0 {
            self.bus.begin_transaction();
        }
        self.write_depth = self.write_depth.saturating_add(1);
    }

    fn end_write(&mut self) {
        if !self.ready || self.write_depth == 0 {
            return;
        }
        self.write_depth -= 1;
        if self.write_depth == 0 {
            self.bus.end_transaction();
        }
    }

    fn set_addr_window(&mut self, x: u16, y: u16, w: u16, h: u16) {
        if !self.ready || w == 0 || h == 0 {
            return;
        }
        let (xo, yo) = self.offsets();
        let x0 = x.saturating_add(xo);
        let y0 = y.saturating_add(yo);
        let cols = range_params(x0, x0.saturating_add(w - 1));
        let rows = range_params(y0, y0.saturating_add(h - 1));
        self.in_transaction(|panel| {
            let result = panel
                .bus
                .write_command(dcs::CASET, &cols)
                .and_then(|_| panel.bus.write_command(dcs::RASET, &rows))
                .and_then(|_| panel.bus.write_command(dcs::RAMWR, &[]));
            panel.faults.check(result);
        });
    }

    fn push_colors(&mut self, pixels: &[u16], swap_bytes: bool) {
        if !self.ready || pixels.is_empty() {
            return;
        }
        self.in_transaction(|panel| {
            let result = panel.bus.write_pixels(pixels, swap_bytes);
            panel.faults.check(result);
        });
    }

    fn render_mode(&self) -> RenderMode {
        RenderMode::Direct
    }
}
