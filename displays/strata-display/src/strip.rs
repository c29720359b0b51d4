//! Streaming strip decoder
//!
//! Decodes one JPEG strip at a time straight to the panel. Each MCU is
//! converted to 16-bit pixels one scanline at a time and pushed through
//! its own one-row address window, so memory use is the decoder work area
//! plus a single line of the image width. Strips stack vertically: every
//! successful decode advances the session's Y cursor by the strip height.

use alloc::vec::Vec;

use strata_core::color::ColorOrder;
use strata_core::traits::{DisplayDriver, StripError};
use strata_jpeg::{Decoder, McuRect, SliceReader, Workspace};

/// Vertical cursor and bounds of one strip session
#[derive(Debug, Default)]
pub struct StripDecoder {
    image_width: u16,
    lcd_width: u16,
    lcd_height: u16,
    current_y: u16,
    active: bool,
}

impl StripDecoder {
    pub const fn new() -> Self {
        Self {
            image_width: 0,
            lcd_width: 0,
            lcd_height: 0,
            current_y: 0,
            active: false,
        }
    }

    /// Start a session for an image `image_width` wide on an
    /// `lcd_width` x `lcd_height` surface
    pub fn begin(&mut self, image_width: u16, lcd_width: u16, lcd_height: u16) {
        self.image_width = image_width;
        self.lcd_width = lcd_width;
        self.lcd_height = lcd_height;
        self.current_y = 0;
        self.active = true;
    }

    /// End the session; calling it again is harmless
    pub fn end(&mut self) {
        #[cfg(feature = "defmt")]
        if self.active {
            defmt::debug!("strip session complete at y={}", self.current_y);
        }
        *self = Self::new();
    }

    #[cfg(test)]
    fn is_active(&self) -> bool {
        self.active
    }

    /// Row where the next strip starts
    pub fn current_y(&self) -> u16 {
        self.current_y
    }

    /// Decode `data` at the current Y cursor.
    ///
    /// Returns the strip height. Pixels pushed before a failure stay on
    /// the panel; the caller decides whether to hide.
    pub async fn decode_strip<D: DisplayDriver>(
        &mut self,
        driver: &mut D,
        data: &[u8],
        strip_index: u16,
        order: ColorOrder,
    ) -> Result<u16, StripError> {
        if !self.active {
            return Err(StripError::NoSession);
        }

        let mut workspace = alloc_workspace()?;
        let line = alloc_line(self.image_width)?;
        let decoder = Decoder::new(SliceReader::new(data), &mut workspace[0])?;

        #[cfg(feature = "defmt")]
        defmt::trace!(
            "strip {}: {}x{} at y={}",
            strip_index,
            decoder.width(),
            decoder.height(),
            self.current_y
        );
        #[cfg(not(feature = "defmt"))]
        let _ = strip_index;

        let mut session = JpegDecodeSession {
            decoder,
            driver,
            line,
            strip_y: self.current_y,
            lcd_width: self.lcd_width,
            lcd_height: self.lcd_height,
            order,
        };
        let rows = session.run().await?;

        self.current_y = self.current_y.saturating_add(rows);
        Ok(rows)
    }
}

/// Decoder work area on the heap, reserved fallibly
fn alloc_workspace() -> Result<Vec<Workspace>, StripError> {
    let mut workspace = Vec::new();
    workspace
        .try_reserve_exact(1)
        .map_err(|_| StripError::OutOfMemory)?;
    workspace.push(Workspace::new());
    Ok(workspace)
}

fn alloc_line(width: u16) -> Result<Vec<u16>, StripError> {
    let mut line = Vec::new();
    line.try_reserve_exact(width as usize)
        .map_err(|_| StripError::OutOfMemory)?;
    line.resize(width as usize, 0);
    Ok(line)
}

/// One decode call: compressed input cursor plus the pixel output context
struct JpegDecodeSession<'a, 'w, D: DisplayDriver> {
    decoder: Decoder<'w, SliceReader<'a>>,
    driver: &'a mut D,
    line: Vec<u16>,
    strip_y: u16,
    lcd_width: u16,
    lcd_height: u16,
    order: ColorOrder,
}

impl<D: DisplayDriver> JpegDecodeSession<'_, '_, D> {
    async fn run(&mut self) -> Result<u16, StripError> {
        while let Some(rect) = self.decoder.next_mcu()? {
            self.write_mcu(rect).await?;
        }
        Ok(self.decoder.height())
    }

    async fn write_mcu(&mut self, rect: McuRect) -> Result<(), StripError> {
        let width = rect.width as usize;
        if width > self.line.len() {
            return Err(StripError::LineTooWide {
                width: rect.width,
                max: self.line.len() as u16,
            });
        }

        let pixels = self.decoder.pixels();
        for (row, src) in pixels.chunks_exact(width * 3).take(rect.height as usize).enumerate() {
            for (dst, rgb) in self.line[..width].iter_mut().zip(src.chunks_exact(3)) {
                *dst = self.order.pack(rgb[0], rgb[1], rgb[2]);
            }

            let lcd_x = rect.left;
            let lcd_y = self.strip_y as u32 + rect.top as u32 + row as u32;
            if lcd_x as u32 + rect.width as u32 > self.lcd_width as u32 || lcd_y >= self.lcd_height as u32 {
                #[cfg(feature = "defmt")]
                defmt::warn!(
                    "strip pixels outside LCD: x={} y={} w={} (LCD {}x{})",
                    lcd_x,
                    lcd_y,
                    rect.width,
                    self.lcd_width,
                    self.lcd_height
                );
                return Err(StripError::OutOfBounds {
                    x: lcd_x,
                    y: lcd_y.min(u16::MAX as u32) as u16,
                });
            }
            let lcd_y = lcd_y as u16;

            self.driver.start_write();
            self.driver.set_addr_window(lcd_x, lcd_y, rect.width, 1);
            self.driver.push_colors(&self.line[..width], true);
            self.driver.end_write();

            if lcd_y & 0x03 == 0 {
                embassy_futures::yield_now().await;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use embassy_futures::block_on;
    use std::vec::Vec;
    use strata_core::color::pack_rgb565;
    use strata_core::traits::{DisplayError, Rotation};
    use strata_jpeg::testutil::JpegBuilder;
    use strata_jpeg::{ycc_to_rgb, JpegError};

    /// One pushed scanline: window origin, width and pixels
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct Line {
        pub x: u16,
        pub y: u16,
        pub w: u16,
        pub pixels: Vec<u16>,
    }

    pub struct RecordingDriver {
        pub width: u16,
        pub height: u16,
        pub ready: bool,
        pub window: (u16, u16, u16, u16),
        pub lines: Vec<Line>,
        pub fills: Vec<u16>,
        pub depth: i32,
    }

    impl RecordingDriver {
        pub fn new(width: u16, height: u16) -> Self {
            Self {
                width,
                height,
                ready: true,
                window: (0, 0, 0, 0),
                lines: Vec::new(),
                fills: Vec::new(),
                depth: 0,
            }
        }
    }

    impl DisplayDriver for RecordingDriver {
        fn init(&mut self) -> Result<(), DisplayError> {
            Ok(())
        }

        fn is_ready(&self) -> bool {
            self.ready
        }

        fn set_rotation(&mut self, _rotation: Rotation) {}

        fn rotation(&self) -> Rotation {
            Rotation::Deg0
        }

        fn width(&self) -> u16 {
            self.width
        }

        fn height(&self) -> u16 {
            self.height
        }

        fn set_backlight(&mut self, _on: bool) {}

        fn set_backlight_brightness(&mut self, _percent: u8) {}

        fn backlight_brightness(&self) -> u8 {
            100
        }

        fn has_backlight_control(&self) -> bool {
            false
        }

        fn start_write(&mut self) {
            self.depth += 1;
        }

        fn end_write(&mut self) {
            self.depth -= 1;
        }

        fn set_addr_window(&mut self, x: u16, y: u16, w: u16, h: u16) {
            self.window = (x, y, w, h);
        }

        fn push_colors(&mut self, pixels: &[u16], swap_bytes: bool) {
            assert!(swap_bytes);
            assert_eq!(self.depth, 1);
            let (x, y, w, h) = self.window;
            assert_eq!(h, 1);
            self.lines.push(Line {
                x,
                y,
                w,
                pixels: pixels.to_vec(),
            });
        }

        fn fill_screen(&mut self, color: u16) {
            self.fills.push(color);
        }
    }

    fn gray(width: u16, height: u16, y: u8) -> Vec<u8> {
        JpegBuilder::grayscale(width, height).build(|_, _| (y, 128, 128))
    }

    #[test]
    fn test_single_strip_scanlines() {
        let mut driver = RecordingDriver::new(240, 320);
        let mut decoder = StripDecoder::new();
        decoder.begin(16, 240, 320);

        let rows = block_on(decoder.decode_strip(&mut driver, &gray(16, 8, 200), 0, ColorOrder::Rgb565)).unwrap();
        assert_eq!(rows, 8);
        assert_eq!(decoder.current_y(), 8);

        // Two 8x8 MCUs, one window per MCU scanline
        assert_eq!(driver.lines.len(), 16);
        assert!(driver.lines.iter().all(|l| l.w == 8 && l.pixels.len() == 8));
        assert!(driver.lines.iter().all(|l| l.pixels.iter().all(|&p| p == 0xCE59)));
        assert_eq!(driver.lines[0].x, 0);
        assert_eq!(driver.lines[8].x, 8);
        assert_eq!(driver.lines[7].y, 7);
    }

    #[test]
    fn test_strips_stack_vertically() {
        let mut driver = RecordingDriver::new(240, 320);
        let mut decoder = StripDecoder::new();
        decoder.begin(8, 240, 320);

        for (index, height) in [(0u16, 8u16), (1, 16)] {
            let jpeg = gray(8, height, 100);
            block_on(decoder.decode_strip(&mut driver, &jpeg, index, ColorOrder::Rgb565)).unwrap();
        }
        assert_eq!(decoder.current_y(), 24);
        let ys: Vec<u16> = driver.lines.iter().map(|l| l.y).collect();
        assert_eq!(ys, (0..24).collect::<Vec<u16>>());
    }

    #[test]
    fn test_truncating_pack_and_order() {
        let mut driver = RecordingDriver::new(240, 320);
        let mut decoder = StripDecoder::new();
        decoder.begin(8, 240, 320);
        let jpeg = JpegBuilder::ycbcr(8, 8, 1, 1).build(|_, _| (120, 90, 200));
        let (r, g, b) = ycc_to_rgb(120, 90, 200);

        block_on(decoder.decode_strip(&mut driver, &jpeg, 0, ColorOrder::Bgr565)).unwrap();
        let expected = ColorOrder::Bgr565.pack(r, g, b);
        assert!(driver.lines.iter().all(|l| l.pixels.iter().all(|&p| p == expected)));
        assert_ne!(expected, pack_rgb565(r, g, b));
    }

    #[test]
    fn test_requires_session() {
        let mut driver = RecordingDriver::new(240, 320);
        let mut decoder = StripDecoder::new();
        let result = block_on(decoder.decode_strip(&mut driver, &gray(8, 8, 0), 0, ColorOrder::Rgb565));
        assert_eq!(result, Err(StripError::NoSession));
    }

    #[test]
    fn test_strip_past_bottom_rejected() {
        let mut driver = RecordingDriver::new(240, 8);
        let mut decoder = StripDecoder::new();
        decoder.begin(8, 240, 8);
        let jpeg = gray(8, 8, 50);

        block_on(decoder.decode_strip(&mut driver, &jpeg, 0, ColorOrder::Rgb565)).unwrap();
        let result = block_on(decoder.decode_strip(&mut driver, &jpeg, 1, ColorOrder::Rgb565));
        assert_eq!(result, Err(StripError::OutOfBounds { x: 0, y: 8 }));
        assert_eq!(decoder.current_y(), 8);
    }

    #[test]
    fn test_mcu_wider_than_line_rejected() {
        let mut driver = RecordingDriver::new(240, 320);
        let mut decoder = StripDecoder::new();
        decoder.begin(8, 240, 320);
        let jpeg = JpegBuilder::ycbcr(16, 16, 2, 2).build(|_, _| (128, 128, 128));
        let result = block_on(decoder.decode_strip(&mut driver, &jpeg, 0, ColorOrder::Rgb565));
        assert_eq!(result, Err(StripError::LineTooWide { width: 16, max: 8 }));
        assert!(driver.lines.is_empty());
    }

    #[test]
    fn test_corrupt_input() {
        let mut driver = RecordingDriver::new(240, 320);
        let mut decoder = StripDecoder::new();
        decoder.begin(16, 240, 320);

        let result = block_on(decoder.decode_strip(&mut driver, b"not a jpeg", 0, ColorOrder::Rgb565));
        assert_eq!(result, Err(StripError::Decode(JpegError::NotJpeg)));

        let jpeg = gray(16, 16, 10);
        let cut = &jpeg[..jpeg.len() - 6];
        let result = block_on(decoder.decode_strip(&mut driver, cut, 0, ColorOrder::Rgb565));
        assert!(matches!(result, Err(StripError::Decode(_))));
        assert_eq!(decoder.current_y(), 0);
    }

    #[test]
    fn test_end_is_idempotent() {
        let mut decoder = StripDecoder::new();
        decoder.begin(8, 240, 320);
        assert!(decoder.is_active());
        decoder.end();
        decoder.end();
        assert!(!decoder.is_active());
        assert_eq!(decoder.current_y(), 0);
        let mut driver = RecordingDriver::new(240, 320);
        let result = block_on(decoder.decode_strip(&mut driver, &gray(8, 8, 0), 0, ColorOrder::Rgb565));
        assert_eq!(result, Err(StripError::NoSession));
    }
}
