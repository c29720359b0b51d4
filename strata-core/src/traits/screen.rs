//! Image screen surface
//!
//! The minimal screen interface the dispatcher renders through: start a
//! strip session, decode strips into it, hide it again.

use strata_jpeg::JpegError;

use crate::color::ColorOrder;
use crate::traits::display::Size;

/// Errors from starting a session or rendering a strip
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StripError {
    /// Display driver failed to initialize
    DisplayUnavailable,
    /// `decode_strip` without an active session
    NoSession,
    /// Compressed data could not be decoded
    Decode(JpegError),
    /// Decoded scanline wider than the line buffer
    LineTooWide { width: u16, max: u16 },
    /// Pixel rectangle falls outside the panel
    OutOfBounds { x: u16, y: u16 },
    /// Decoder work area or line buffer could not be allocated
    OutOfMemory,
}

impl From<JpegError> for StripError {
    fn from(value: JpegError) -> Self {
        StripError::Decode(value)
    }
}

/// Screen that shows uploaded images strip by strip
pub trait ImageScreen {
    /// Show the image screen and reset the vertical cursor.
    ///
    /// `timeout_ms == 0` keeps the image until it is dismissed.
    fn begin_strip_session(
        &mut self,
        width: u16,
        height: u16,
        timeout_ms: u32,
        start_ms: u32,
    ) -> Result<(), StripError>;

    /// Decode one strip at the session's current vertical offset.
    ///
    /// Returns the number of rows the strip covered.
    async fn decode_strip(
        &mut self,
        data: &[u8],
        strip_index: u16,
        order: ColorOrder,
    ) -> Result<u16, StripError>;

    /// End the session and take the image off the panel
    fn hide_current_image(&mut self);

    /// Full visible surface for the current rotation
    fn surface_size(&self) -> Size;
}
