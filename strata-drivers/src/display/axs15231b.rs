//! AXS15231B buffered driver
//!
//! The controller drops its column/row address between bus transactions,
//! so partial-window writes land in the wrong place. Pixels are staged in
//! a native-orientation framebuffer instead and `present` sends every row
//! from the origin down to the highest dirty one in a single transaction.

use embedded_hal::delay::DelayNs;
use strata_core::config::DisplayHwConfig;
use strata_core::traits::{DisplayDriver, DisplayError, RenderMode, Rotation, Size};
use strata_hal::{OutputPin, PanelBus};

use super::framebuffer::{to_physical, Framebuffer};
use super::{dcs, hardware_reset, range_params, send_sequence, FaultLatch};
use crate::backlight::Backlight;

#[derive(Debug, Clone, Copy, Default)]
struct Window {
    x: u16,
    y: u16,
    w: u16,
    h: u16,
}

impl Window {
    fn area(&self) -> u32 {
        self.w as u32 * self.h as u32
    }
}

/// Buffered-mode panel driver
pub struct Axs15231b<B: PanelBus, R: OutputPin, L: Backlight, D: DelayNs> {
    bus: B,
    reset: R,
    backlight: L,
    delay: D,
    native: Size,
    invert: bool,
    rotation: Rotation,
    framebuffer: Option<Framebuffer>,
    ready: bool,
    window: Window,
    /// Pixels already written into `window`
    cursor: u32,
    faults: FaultLatch,
}

impl<B: PanelBus, R: OutputPin, L: Backlight, D: DelayNs> Axs15231b<B, R, L, D> {
    /// Create the driver; the framebuffer is allocated by [`DisplayDriver::init`]
    pub fn new(bus: B, reset: R, backlight: L, delay: D, config: &DisplayHwConfig) -> Self {
        Self {
            bus,
            reset,
            backlight,
            delay,
            native: config.native_size(),
            invert: config.invert,
            rotation: config.rotation,
            framebuffer: None,
            ready: false,
            window: Window::default(),
            cursor: 0,
            faults: FaultLatch::default(),
        }
    }

    pub fn bus(&self) -> &B {
        &self.bus
    }

    pub fn framebuffer(&self) -> Option<&Framebuffer> {
        self.framebuffer.as_ref()
    }

    fn init_sequence(&mut self) -> Result<(), strata_hal::BusError> {
        let inversion = if self.invert { dcs::INVON } else { dcs::INVOFF };
        send_sequence(
            &mut self.bus,
            &mut self.delay,
            &[
                (dcs::SLPOUT, &[], 120),
                (dcs::COLMOD, &[dcs::PIXEL_FORMAT_16BIT], 0),
                // Rotation is done in the framebuffer; the panel stays native
                (dcs::MADCTL, &[0x00], 0),
                (inversion, &[], 0),
                (dcs::DISPON, &[], 20),
            ],
        )
    }

    fn logical(&self) -> Size {
        self.native.rotated(self.rotation)
    }
}

impl<B: PanelBus, R: OutputPin, L: Backlight, D: DelayNs> DisplayDriver for Axs15231b<B, R, L, D> {
    fn init(&mut self) -> Result<(), DisplayError> {
        self.ready = false;
        hardware_reset(&mut self.reset, &mut self.delay);
        if let Err(_e) = self.init_sequence() {
            #[cfg(feature = "defmt")]
            defmt::error!("AXS15231B init failed: {}", _e);
            return Err(DisplayError::InitFailed);
        }
        if self.framebuffer.is_none() {
            self.framebuffer = Framebuffer::try_new(self.native);
        }
        if self.framebuffer.is_none() {
            #[cfg(feature = "defmt")]
            defmt::error!(
                "AXS15231B framebuffer ({}x{}) allocation failed",
                self.native.width,
                self.native.height
            );
            return Err(DisplayError::OutOfMemory);
        }
        self.ready = true;
        Ok(())
    }

    fn is_ready(&self) -> bool {
        self.ready
    }

    fn set_rotation(&mut self, rotation: Rotation) {
        self.rotation = rotation;
        self.window = Window::default();
        self.cursor = 0;
    }

    fn rotation(&self) -> Rotation {
        self.rotation
    }

    fn width(&self) -> u16 {
        self.logical().width
    }

    fn height(&self) -> u16 {
        self.logical().height
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

    /// Nothing reaches the bus before `present`
    fn start_write(&mut self) {}

    fn end_write(&mut self) {}

    fn set_addr_window(&mut self, x: u16, y: u16, w: u16, h: u16) {
        self.window = Window { x, y, w, h };
        self.cursor = 0;
    }

    /// Stage pixels row-major into the window; the write position carries
    /// over to the next call until the window is full.
    fn push_colors(&mut self, pixels: &[u16], swap_bytes: bool) {
        if !self.ready {
            return;
        }
        let logical = self.logical();
        let native = self.native;
        let rotation = self.rotation;
        let window = self.window;
        let area = window.area();
        let Some(fb) = self.framebuffer.as_mut() else {
            return;
        };

        for &pixel in pixels {
            if self.cursor >= area {
                break;
            }
            let lx = window.x as u32 + self.cursor % window.w as u32;
            let ly = window.y as u32 + self.cursor / window.w as u32;
            self.cursor += 1;
            if lx >= logical.width as u32 || ly >= logical.height as u32 {
                continue;
            }
            let color = if swap_bytes { pixel } else { pixel.swap_bytes() };
            let (px, py) = to_physical(rotation, native, lx as u16, ly as u16);
            fb.set(px, py, color);
        }
    }

    fn render_mode(&self) -> RenderMode {
        RenderMode::Buffered
    }

    fn needs_present(&self) -> bool {
        self.framebuffer
            .as_ref()
            .is_some_and(|fb| fb.max_dirty_row().is_some())
    }

    fn present(&mut self) -> Result<(), DisplayError> {
        if !self.ready {
            return Err(DisplayError::NotReady);
        }
        let Some(fb) = self.framebuffer.as_mut() else {
            return Err(DisplayError::NotReady);
        };
        let Some(last_row) = fb.max_dirty_row() else {
            return Ok(());
        };

        let cols = range_params(0, self.native.width.saturating_sub(1));
        let rows = range_params(0, last_row);
        self.bus.begin_transaction();
        let result = self
            .bus
            .write_command(dcs::CASET, &cols)
            .and_then(|_| self.bus.write_command(dcs::RASET, &rows))
            .and_then(|_| self.bus.write_command(dcs::RAMWR, &[]))
            .and_then(|_| self.bus.write_pixels(fb.rows_through(last_row), true));
        self.bus.end_transaction();

        match self.faults.check(result) {
            Some(()) => {
                fb.clear_dirty();
                Ok(())
            }
            None => Err(DisplayError::Bus),
        }
    }

    /// Fill the framebuffer directly instead of pushing row by row
    fn fill_screen(&mut self, color: u16) {
        if !self.ready {
            return;
        }
        if let Some(fb) = self.framebuffer.as_mut() {
            fb.fill(color);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backlight::NoBacklight;
    use crate::display::testing::{BusOp, FakePin, NoopDelay, RecordingBus};
    use std::vec::Vec;

    type Driver = Axs15231b<RecordingBus, FakePin, NoBacklight, NoopDelay>;

    fn driver(width: u16, height: u16) -> Driver {
        let config = DisplayHwConfig {
            width,
            height,
            ..Default::default()
        };
        let mut d = Axs15231b::new(RecordingBus::default(), FakePin::default(), NoBacklight, NoopDelay, &config);
        d.init().unwrap();
        d.bus.ops.clear();
        d
    }

    fn fill_rows(d: &mut Driver, first: u16, last: u16, color: u16) {
        let w = d.width();
        let rows = last - first + 1;
        d.start_write();
        d.set_addr_window(0, first, w, rows);
        let line: Vec<u16> = std::vec![color; w as usize];
        for _ in 0..rows {
            d.push_colors(&line, true);
        }
        d.end_write();
    }

    #[test]
    fn test_buffered_mode() {
        let d = driver(16, 80);
        assert_eq!(d.render_mode(), RenderMode::Buffered);
        assert!(d.is_ready());
        assert!(!d.needs_present());
    }

    #[test]
    fn test_pushes_stay_off_the_bus() {
        let mut d = driver(16, 80);
        fill_rows(&mut d, 10, 40, 0xFFFF);
        assert!(d.bus().ops.is_empty());
        assert!(d.needs_present());
    }

    #[test]
    fn test_present_sends_from_origin_to_highest_dirty_row() {
        let mut d = driver(16, 80);
        fill_rows(&mut d, 10, 40, 0x1111);
        fill_rows(&mut d, 5, 15, 0x2222);
        fill_rows(&mut d, 60, 70, 0x3333);

        d.present().unwrap();

        let writes = d.bus().pixel_writes();
        assert_eq!(writes.len(), 1);
        assert_eq!(writes[0].len(), 71 * 16);
        assert_eq!(d.bus().params_of(dcs::CASET), [std::vec![0, 0, 0, 15]]);
        assert_eq!(d.bus().params_of(dcs::RASET), [std::vec![0, 0, 0, 70]]);
        assert_eq!(d.bus().ops.first(), Some(&BusOp::Begin));
        assert_eq!(d.bus().ops.last(), Some(&BusOp::End));

        // Rows keep what was written last
        assert_eq!(writes[0][12 * 16], 0x2222);
        assert_eq!(writes[0][20 * 16], 0x1111);
        assert_eq!(writes[0][50 * 16], 0x0000);
        assert_eq!(writes[0][70 * 16 + 15], 0x3333);

        assert!(!d.needs_present());
        d.bus.ops.clear();
        d.present().unwrap();
        assert!(d.bus().ops.is_empty());
    }

    #[test]
    fn test_cursor_continues_across_pushes() {
        let mut d = driver(4, 4);
        d.set_addr_window(1, 1, 2, 2);
        d.push_colors(&[1, 2], true);
        d.push_colors(&[3, 4, 5], true);
        let fb = d.framebuffer().unwrap();
        assert_eq!(fb.get(1, 1), Some(1));
        assert_eq!(fb.get(2, 1), Some(2));
        assert_eq!(fb.get(1, 2), Some(3));
        assert_eq!(fb.get(2, 2), Some(4));
        // Fifth pixel overflowed the window
        assert_eq!(fb.get(1, 3), Some(0));
    }

    #[test]
    fn test_unswapped_pixels_are_normalized() {
        let mut d = driver(4, 4);
        d.set_addr_window(0, 0, 1, 1);
        d.push_colors(&[0x3412], false);
        assert_eq!(d.framebuffer().unwrap().get(0, 0), Some(0x1234));
    }

    #[test]
    fn test_rotation_maps_into_native_buffer() {
        let mut d = driver(4, 6);
        d.set_rotation(Rotation::Deg90);
        assert_eq!((d.width(), d.height()), (6, 4));
        d.set_addr_window(0, 0, 1, 1);
        d.push_colors(&[0xABCD], true);
        let fb = d.framebuffer().unwrap();
        assert_eq!(fb.get(0, 5), Some(0xABCD));
        assert_eq!(fb.max_dirty_row(), Some(5));
    }

    #[test]
    fn test_out_of_surface_pixels_dropped() {
        let mut d = driver(4, 4);
        d.set_addr_window(3, 3, 2, 2);
        d.push_colors(&[1, 2, 3, 4], true);
        let fb = d.framebuffer().unwrap();
        assert_eq!(fb.get(3, 3), Some(1));
        assert_eq!(fb.max_dirty_row(), Some(3));
    }

    #[test]
    fn test_window_at_coordinate_limit() {
        let mut d = driver(4, 4);
        d.set_addr_window(u16::MAX - 1, u16::MAX - 1, u16::MAX, u16::MAX);
        d.push_colors(&[1, 2, 3, 4], true);
        assert_eq!(d.framebuffer().unwrap().max_dirty_row(), None);
        assert!(!d.needs_present());
    }

    #[test]
    fn test_fill_screen_marks_all_rows() {
        let mut d = driver(8, 10);
        d.clear();
        d.present().unwrap();
        assert_eq!(d.bus().params_of(dcs::RASET), [std::vec![0, 0, 0, 9]]);
        assert_eq!(d.bus().pixel_writes()[0].len(), 80);
    }

    #[test]
    fn test_failed_init_is_inert() {
        let mut d = Axs15231b::new(
            RecordingBus::failing(),
            FakePin::default(),
            NoBacklight,
            NoopDelay,
            &DisplayHwConfig::default(),
        );
        assert_eq!(d.init(), Err(DisplayError::InitFailed));
        assert!(d.framebuffer().is_none());
        d.set_addr_window(0, 0, 1, 1);
        d.push_colors(&[1], true);
        assert!(!d.needs_present());
        assert_eq!(d.present(), Err(DisplayError::NotReady));
    }

    #[test]
    fn test_present_bus_failure_keeps_rows_dirty() {
        let mut d = driver(4, 4);
        d.set_addr_window(0, 0, 1, 1);
        d.push_colors(&[1], true);
        d.bus.fail = true;
        assert_eq!(d.present(), Err(DisplayError::Bus));
        assert!(d.needs_present());
    }
}
