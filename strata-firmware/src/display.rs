//! Display selection and construction
//!
//! The driver is picked from the board configuration at boot. Both kinds
//! share one bus, reset line and backlight type so the render task works
//! with a single concrete [`AnyDisplay`].

use defmt::*;
use embassy_rp::gpio::{Level, Output};
use embassy_rp::peripherals::SPI0;
use embassy_rp::pwm::{self, Pwm};
use embassy_rp::spi::{self, Spi};
use embassy_time::Delay;

use strata_core::config::{BoardConfig, DriverKind};
use strata_core::traits::{DisplayDriver, DisplayError, RenderMode, Rotation};
use strata_drivers::backlight::{Backlight, PwmBacklight, SwitchedBacklight};
use strata_drivers::display::{Axs15231b, MipiDcsPanel};
use strata_hal_rp2040::{RpOutput, RpPwm, SpiPanelBus};

use crate::boards::DisplayPins;

type Bus = SpiPanelBus<'static, SPI0>;
type Reset = RpOutput<'static>;

/// PWM-dimmed or plain switched backlight, per board config
pub enum BoardBacklight {
    Pwm(PwmBacklight<RpPwm<'static>>),
    Switched(SwitchedBacklight<RpOutput<'static>>),
}

impl Backlight for BoardBacklight {
    fn set_on(&mut self, on: bool) {
        match self {
            BoardBacklight::Pwm(b) => b.set_on(on),
            BoardBacklight::Switched(b) => b.set_on(on),
        }
    }

    fn set_brightness(&mut self, percent: u8) {
        match self {
            BoardBacklight::Pwm(b) => b.set_brightness(percent),
            BoardBacklight::Switched(b) => b.set_brightness(percent),
        }
    }

    fn brightness(&self) -> u8 {
        match self {
            BoardBacklight::Pwm(b) => b.brightness(),
            BoardBacklight::Switched(b) => b.brightness(),
        }
    }

    fn is_controllable(&self) -> bool {
        match self {
            BoardBacklight::Pwm(b) => b.is_controllable(),
            BoardBacklight::Switched(b) => b.is_controllable(),
        }
    }
}

/// Every panel driver this firmware can run
pub enum AnyDisplay {
    /// ST7789 / ILI9341 (direct)
    Mipi(MipiDcsPanel<Bus, Reset, BoardBacklight, Delay>),
    /// AXS15231B (buffered)
    Axs(Axs15231b<Bus, Reset, BoardBacklight, Delay>),
}

macro_rules! delegate {
    ($self:ident, $d:ident => $e:expr) => {
        match $self {
            AnyDisplay::Mipi($d) => $e,
            AnyDisplay::Axs($d) => $e,
        }
    };
}

impl DisplayDriver for AnyDisplay {
    fn init(&mut self) -> Result<(), DisplayError> {
        delegate!(self, d => d.init())
    }

    fn is_ready(&self) -> bool {
        delegate!(self, d => d.is_ready())
    }

    fn set_rotation(&mut self, rotation: Rotation) {
        delegate!(self, d => d.set_rotation(rotation))
    }

    fn rotation(&self) -> Rotation {
        delegate!(self, d => d.rotation())
    }

    fn width(&self) -> u16 {
        delegate!(self, d => d.width())
    }

    fn height(&self) -> u16 {
        delegate!(self, d => d.height())
    }

    fn set_backlight(&mut self, on: bool) {
        delegate!(self, d => d.set_backlight(on))
    }

    fn set_backlight_brightness(&mut self, percent: u8) {
        delegate!(self, d => d.set_backlight_brightness(percent))
    }

    fn backlight_brightness(&self) -> u8 {
        delegate!(self, d => d.backlight_brightness())
    }

    fn has_backlight_control(&self) -> bool {
        delegate!(self, d => d.has_backlight_control())
    }

    fn start_write(&mut self) {
        delegate!(self, d => d.start_write())
    }

    fn end_write(&mut self) {
        delegate!(self, d => d.end_write())
    }

    fn set_addr_window(&mut self, x: u16, y: u16, w: u16, h: u16) {
        delegate!(self, d => d.set_addr_window(x, y, w, h))
    }

    fn push_colors(&mut self, pixels: &[u16], swap_bytes: bool) {
        delegate!(self, d => d.push_colors(pixels, swap_bytes))
    }

    fn render_mode(&self) -> RenderMode {
        delegate!(self, d => d.render_mode())
    }

    fn needs_present(&self) -> bool {
        delegate!(self, d => d.needs_present())
    }

    fn present(&mut self) -> Result<(), DisplayError> {
        delegate!(self, d => d.present())
    }

    fn fill_screen(&mut self, color: u16) {
        delegate!(self, d => d.fill_screen(color))
    }
}

/// Wire up the configured panel; `init` is left to the render task
pub fn build_display(pins: DisplayPins, config: &BoardConfig) -> AnyDisplay {
    let hw = &config.display;

    let mut spi_config = spi::Config::default();
    spi_config.frequency = hw.spi_hz;
    let spi = Spi::new_blocking_txonly(pins.spi, pins.sck, pins.mosi, spi_config);
    let dc = Output::new(pins.dc, Level::High);
    let cs = Output::new(pins.cs, Level::High);
    let bus = SpiPanelBus::new(spi, dc, cs);

    let reset = RpOutput::new(Output::new(pins.reset, Level::High));

    let backlight = if config.backlight.pwm {
        let pwm = Pwm::new_output_a(pins.backlight_pwm, pins.backlight, pwm::Config::default());
        BoardBacklight::Pwm(PwmBacklight::new(RpPwm::new(pwm), &config.backlight))
    } else {
        let level = if config.backlight.active_low { Level::High } else { Level::Low };
        let pin = RpOutput::new(Output::new(pins.backlight, level));
        BoardBacklight::Switched(SwitchedBacklight::new(pin, config.backlight.active_low))
    };

    info!("Display driver: {:?} at {} Hz", hw.driver, hw.spi_hz);
    match hw.driver {
        DriverKind::St7789 | DriverKind::Ili9341 => {
            AnyDisplay::Mipi(MipiDcsPanel::new(bus, reset, backlight, Delay, hw))
        }
        DriverKind::Axs15231b => AnyDisplay::Axs(Axs15231b::new(bus, reset, backlight, Delay, hw)),
    }
}
