//! Header-only admission checks
//!
//! Walks the marker segments up to the frame header without touching the
//! entropy-coded data, so an upload can be rejected with a descriptive
//! reason before it is queued for rendering.

use core::fmt;

use crate::error::{JpegError, Unsupported};
use crate::markers::{self, expect_soi, next_marker, read_frame_header, segment_len, FrameInfo, FrameKind};
use crate::reader::{ByteSource, SliceReader};

/// JPEG files start with SOI followed by the first marker's 0xFF
const JPEG_MAGIC: [u8; 3] = [0xFF, 0xD8, 0xFF];

/// Why an image was refused before decoding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PreflightError {
    /// Header could not be parsed or uses an unsupported coding process
    Invalid(JpegError),
    /// Zero width
    EmptyImage,
    /// Wider than the target surface
    TooWide { width: u16, max: u16 },
    /// Taller than the target surface
    TooTall { height: u16, max: u16 },
    /// Strip width differs from the declared image width
    WidthMismatch { width: u16, expected: u16 },
}

impl From<JpegError> for PreflightError {
    fn from(value: JpegError) -> Self {
        PreflightError::Invalid(value)
    }
}

impl From<Unsupported> for PreflightError {
    fn from(value: Unsupported) -> Self {
        PreflightError::Invalid(JpegError::Unsupported(value))
    }
}

impl fmt::Display for PreflightError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PreflightError::Invalid(JpegError::Unsupported(what)) => {
                write!(f, "Unsupported {}; re-encode as baseline JPEG", what)
            }
            PreflightError::Invalid(e) => write!(f, "Invalid JPEG header: {}", e),
            PreflightError::EmptyImage => f.write_str("JPEG has zero width"),
            PreflightError::TooWide { width, max } => {
                write!(f, "JPEG width {} exceeds display width {}", width, max)
            }
            PreflightError::TooTall { height, max } => {
                write!(f, "JPEG height {} exceeds limit {}", height, max)
            }
            PreflightError::WidthMismatch { width, expected } => {
                write!(f, "Strip width {} does not match image width {}", width, expected)
            }
        }
    }
}

/// Cheap signature check on the first bytes of a buffer
pub fn is_jpeg_magic(data: &[u8]) -> bool {
    data.len() >= JPEG_MAGIC.len() && data[..JPEG_MAGIC.len()] == JPEG_MAGIC
}

/// Read the frame header, skipping every segment before it
pub fn read_frame_info(data: &[u8]) -> Result<FrameInfo, JpegError> {
    let mut src = SliceReader::new(data);
    expect_soi(&mut src)?;
    loop {
        let marker = next_marker(&mut src)?;
        match marker {
            markers::SOS | markers::EOI | markers::SOI => return Err(JpegError::Malformed),
            markers::RST0..=markers::RST7 | 0x01 => {}
            other => {
                let len = segment_len(&mut src)?;
                if let Some(kind) = FrameKind::from_marker(other) {
                    return read_frame_header(&mut src, kind, len);
                }
                if !src.skip(len) {
                    return Err(JpegError::Truncated);
                }
            }
        }
    }
}

/// Whole image: must be decodable and fit within `max_width` x `max_height`
pub fn preflight_image(
    data: &[u8],
    max_width: u16,
    max_height: u16,
) -> Result<FrameInfo, PreflightError> {
    let info = read_frame_info(data)?;
    info.check_supported()?;
    if info.width == 0 {
        return Err(PreflightError::EmptyImage);
    }
    if info.width > max_width {
        return Err(PreflightError::TooWide {
            width: info.width,
            max: max_width,
        });
    }
    if info.height > max_height {
        return Err(PreflightError::TooTall {
            height: info.height,
            max: max_height,
        });
    }
    Ok(info)
}

/// One horizontal strip of a larger image.
///
/// The strip must span the full declared `image_width` and be no taller
/// than either the declared image height or the panel height.
pub fn preflight_fragment(
    data: &[u8],
    image_width: u16,
    image_height: u16,
    max_height: u16,
) -> Result<FrameInfo, PreflightError> {
    let info = read_frame_info(data)?;
    info.check_supported()?;
    if info.width == 0 {
        return Err(PreflightError::EmptyImage);
    }
    if info.width != image_width {
        return Err(PreflightError::WidthMismatch {
            width: info.width,
            expected: image_width,
        });
    }
    let limit = image_height.min(max_height);
    if info.height > limit {
        return Err(PreflightError::TooTall {
            height: info.height,
            max: limit,
        });
    }
    Ok(info)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::JpegBuilder;

    fn gray(w: u16, h: u16) -> std::vec::Vec<u8> {
        JpegBuilder::grayscale(w, h).build(|_, _| (128, 128, 128))
    }

    #[test]
    fn test_magic() {
        assert!(is_jpeg_magic(&[0xFF, 0xD8, 0xFF, 0xE0]));
        assert!(!is_jpeg_magic(&[0xFF, 0xD8]));
        assert!(!is_jpeg_magic(b"\x89PNG"));
    }

    #[test]
    fn test_image_fits() {
        let data = gray(240, 320);
        let info = preflight_image(&data, 240, 320).unwrap();
        assert_eq!((info.width, info.height), (240, 320));
    }

    #[test]
    fn test_image_too_wide_and_tall() {
        let data = gray(480, 64);
        assert_eq!(
            preflight_image(&data, 320, 240),
            Err(PreflightError::TooWide { width: 480, max: 320 })
        );
        let data = gray(64, 480);
        assert_eq!(
            preflight_image(&data, 320, 240),
            Err(PreflightError::TooTall { height: 480, max: 240 })
        );
    }

    #[test]
    fn test_progressive_message() {
        let data = JpegBuilder::grayscale(8, 8).progressive().build(|_, _| (0, 128, 128));
        let err = preflight_image(&data, 320, 240).unwrap_err();
        assert_eq!(err, PreflightError::Invalid(JpegError::Unsupported(Unsupported::Progressive)));
        let msg = std::format!("{}", err);
        assert!(msg.contains("progressive"));
        assert!(msg.contains("baseline"));
    }

    #[test]
    fn test_fragment_checks() {
        let data = gray(320, 40);
        assert!(preflight_fragment(&data, 320, 240, 240).is_ok());
        assert_eq!(
            preflight_fragment(&data, 300, 240, 240),
            Err(PreflightError::WidthMismatch { width: 320, expected: 300 })
        );
        assert_eq!(
            preflight_fragment(&data, 320, 32, 240),
            Err(PreflightError::TooTall { height: 40, max: 32 })
        );
    }

    #[test]
    fn test_garbage_after_soi() {
        let data = [0xFF, 0xD8, 0xFF, 0xDA, 0x00, 0x02];
        assert_eq!(
            preflight_image(&data, 320, 240),
            Err(PreflightError::Invalid(JpegError::Malformed))
        );
        assert_eq!(
            preflight_image(&[0xFF, 0xD8, 0xFF, 0xE0, 0x00], 320, 240),
            Err(PreflightError::Invalid(JpegError::Truncated))
        );
    }
}
