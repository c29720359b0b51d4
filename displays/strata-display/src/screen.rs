//! Image screen that decodes strips straight onto a display driver

use strata_core::color::{ColorOrder, BLACK};
use strata_core::traits::{DisplayDriver, ImageScreen, Size, StripError};

use crate::strip::StripDecoder;

/// Direct-to-panel image screen
///
/// Owns the display driver and one [`StripDecoder`]. The screen takes the
/// panel over with a black fill the first time it is shown and hands it
/// back cleared when hidden.
pub struct DirectImageScreen<D: DisplayDriver> {
    driver: D,
    decoder: StripDecoder,
    session_active: bool,
    visible: bool,
    timeout_ms: u32,
    start_ms: u32,
}

impl<D: DisplayDriver> DirectImageScreen<D> {
    pub fn new(driver: D) -> Self {
        Self {
            driver,
            decoder: StripDecoder::new(),
            session_active: false,
            visible: false,
            timeout_ms: 0,
            start_ms: 0,
        }
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    pub fn driver_mut(&mut self) -> &mut D {
        &mut self.driver
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn is_session_active(&self) -> bool {
        self.session_active
    }

    /// Bring the screen up, blanking the panel if it was not already shown
    pub fn show(&mut self) {
        if !self.visible {
            self.driver.clear();
            self.visible = true;
        }
    }

    /// Hide the image once its display timeout has run out.
    ///
    /// Returns true when the image was hidden by this call.
    pub fn poll_timeout(&mut self, now_ms: u32) -> bool {
        if !self.visible || self.timeout_ms == 0 {
            return false;
        }
        if now_ms.wrapping_sub(self.start_ms) < self.timeout_ms {
            return false;
        }
        #[cfg(feature = "defmt")]
        defmt::info!("image timeout after {} ms", self.timeout_ms);
        self.hide_current_image();
        true
    }
}

impl<D: DisplayDriver> ImageScreen for DirectImageScreen<D> {
    fn begin_strip_session(
        &mut self,
        width: u16,
        height: u16,
        timeout_ms: u32,
        start_ms: u32,
    ) -> Result<(), StripError> {
        if !self.driver.is_ready() {
            return Err(StripError::DisplayUnavailable);
        }

        self.show();
        self.decoder
            .begin(width, self.driver.width(), self.driver.height());
        self.session_active = true;
        self.timeout_ms = timeout_ms;
        self.start_ms = start_ms;

        #[cfg(feature = "defmt")]
        defmt::debug!("strip session {}x{} timeout={}ms", width, height, timeout_ms);
        Ok(())
    }

    async fn decode_strip(
        &mut self,
        data: &[u8],
        strip_index: u16,
        order: ColorOrder,
    ) -> Result<u16, StripError> {
        if !self.session_active {
            return Err(StripError::NoSession);
        }
        self.decoder
            .decode_strip(&mut self.driver, data, strip_index, order)
            .await
    }

    fn hide_current_image(&mut self) {
        self.decoder.end();
        self.session_active = false;
        self.start_ms = 0;
        if self.visible {
            self.visible = false;
            self.driver.fill_screen(BLACK);
        }
    }

    fn surface_size(&self) -> Size {
        Size::new(self.driver.width(), self.driver.height())
    }
}
