//! Marker constants and frame header parsing
//!
//! Shared by the full decoder and the header-only preflight scan.

use crate::error::{JpegError, Unsupported};
use crate::reader::ByteSource;

pub const SOI: u8 = 0xD8;
pub const EOI: u8 = 0xD9;
pub const SOS: u8 = 0xDA;
pub const DQT: u8 = 0xDB;
pub const DNL: u8 = 0xDC;
pub const DRI: u8 = 0xDD;
pub const DHT: u8 = 0xC4;
pub const RST0: u8 = 0xD0;
pub const RST7: u8 = 0xD7;

/// Maximum components this crate will carry in a [`FrameInfo`]
pub const MAX_COMPONENTS: usize = 3;

/// Coding process announced by the SOFn marker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FrameKind {
    /// SOF0
    Baseline,
    /// SOF1, Huffman-coded
    ExtendedSequential,
    /// SOF2
    Progressive,
    /// SOF3
    Lossless,
    /// SOF5-SOF7
    Hierarchical,
    /// SOF9 and up
    Arithmetic,
}

impl FrameKind {
    /// Classify a marker byte; `None` if it is not a start-of-frame marker
    pub fn from_marker(marker: u8) -> Option<Self> {
        match marker {
            0xC0 => Some(FrameKind::Baseline),
            0xC1 => Some(FrameKind::ExtendedSequential),
            0xC2 => Some(FrameKind::Progressive),
            0xC3 => Some(FrameKind::Lossless),
            0xC5..=0xC7 => Some(FrameKind::Hierarchical),
            0xC9..=0xCB | 0xCD..=0xCF => Some(FrameKind::Arithmetic),
            _ => None,
        }
    }
}

/// One component from the SOF header
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ComponentInfo {
    pub id: u8,
    pub h: u8,
    pub v: u8,
    pub quant_table: u8,
}

/// Parsed SOF header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FrameInfo {
    pub kind: FrameKind,
    pub precision: u8,
    pub width: u16,
    pub height: u16,
    pub component_count: u8,
    pub components: [ComponentInfo; MAX_COMPONENTS],
}

impl FrameInfo {
    /// Parse an SOF segment body (after the length field).
    ///
    /// Only the first [`MAX_COMPONENTS`] components are kept; the count is
    /// preserved so [`FrameInfo::check_supported`] can reject the rest.
    pub fn parse(kind: FrameKind, body: &[u8]) -> Result<Self, JpegError> {
        if body.len() < 6 {
            return Err(JpegError::Malformed);
        }
        let precision = body[0];
        let height = u16::from_be_bytes([body[1], body[2]]);
        let width = u16::from_be_bytes([body[3], body[4]]);
        let count = body[5];
        if count == 0 || body.len() < 6 + 3 * count as usize {
            return Err(JpegError::Malformed);
        }

        let mut components = [ComponentInfo::default(); MAX_COMPONENTS];
        for (i, slot) in components.iter_mut().enumerate().take(count as usize) {
            let c = &body[6 + 3 * i..9 + 3 * i];
            *slot = ComponentInfo {
                id: c[0],
                h: c[1] >> 4,
                v: c[1] & 0x0F,
                quant_table: c[2],
            };
        }

        Ok(Self {
            kind,
            precision,
            width,
            height,
            component_count: count,
            components,
        })
    }

    /// Verify the frame is inside the baseline subset this crate decodes
    pub fn check_supported(&self) -> Result<(), Unsupported> {
        match self.kind {
            FrameKind::Baseline | FrameKind::ExtendedSequential => {}
            FrameKind::Progressive => return Err(Unsupported::Progressive),
            FrameKind::Lossless => return Err(Unsupported::Lossless),
            FrameKind::Hierarchical => return Err(Unsupported::Hierarchical),
            FrameKind::Arithmetic => return Err(Unsupported::Arithmetic),
        }
        if self.precision != 8 {
            return Err(Unsupported::Precision);
        }
        if self.height == 0 {
            return Err(Unsupported::DeferredHeight);
        }
        match self.component_count {
            1 => Ok(()),
            3 => {
                let luma = self.components[0];
                let luma_ok = matches!((luma.h, luma.v), (1, 1) | (2, 1) | (1, 2) | (2, 2));
                let chroma_ok = self.components[1..]
                    .iter()
                    .all(|c| c.h == 1 && c.v == 1);
                if luma_ok && chroma_ok {
                    Ok(())
                } else {
                    Err(Unsupported::Sampling)
                }
            }
            _ => Err(Unsupported::Components),
        }
    }

    /// MCU width and height in pixels
    pub fn mcu_size(&self) -> (u16, u16) {
        if self.component_count == 1 {
            (8, 8)
        } else {
            let luma = self.components[0];
            (8 * luma.h as u16, 8 * luma.v as u16)
        }
    }

    /// Number of MCU columns and rows covering the frame
    pub fn mcu_grid(&self) -> (u16, u16) {
        let (mw, mh) = self.mcu_size();
        (self.width.div_ceil(mw), self.height.div_ceil(mh))
    }
}

/// Read the next marker code, skipping fill bytes.
///
/// Stray bytes between segments are tolerated the way most decoders do.
pub fn next_marker<S: ByteSource>(src: &mut S) -> Result<u8, JpegError> {
    loop {
        let b = src.read_byte().ok_or(JpegError::Truncated)?;
        if b != 0xFF {
            continue;
        }
        let mut m = src.read_byte().ok_or(JpegError::Truncated)?;
        while m == 0xFF {
            m = src.read_byte().ok_or(JpegError::Truncated)?;
        }
        if m != 0x00 {
            return Ok(m);
        }
    }
}

/// Read a segment length field and return the body length
pub fn segment_len<S: ByteSource>(src: &mut S) -> Result<usize, JpegError> {
    let mut len = [0u8; 2];
    if !src.read_into(&mut len) {
        return Err(JpegError::Truncated);
    }
    let len = u16::from_be_bytes(len) as usize;
    if len < 2 {
        return Err(JpegError::Malformed);
    }
    Ok(len - 2)
}

/// Read the SOI marker at the very start of the stream
pub fn expect_soi<S: ByteSource>(src: &mut S) -> Result<(), JpegError> {
    let mut soi = [0u8; 2];
    if !src.read_into(&mut soi) || soi != [0xFF, SOI] {
        return Err(JpegError::NotJpeg);
    }
    Ok(())
}

/// Largest SOF body this crate reads in full (3 components)
pub(crate) const SOF_BODY_MAX: usize = 6 + 3 * MAX_COMPONENTS;

/// Read an SOF body of `len` bytes into a small stack buffer
pub(crate) fn read_frame_header<S: ByteSource>(
    src: &mut S,
    kind: FrameKind,
    len: usize,
) -> Result<FrameInfo, JpegError> {
    let mut body = [0u8; SOF_BODY_MAX];
    let keep = len.min(SOF_BODY_MAX);
    if !src.read_into(&mut body[..keep]) {
        return Err(JpegError::Truncated);
    }
    if !src.skip(len - keep) {
        return Err(JpegError::Truncated);
    }
    if len > SOF_BODY_MAX {
        // More than three components: keep the count so the caller can reject it
        let count = body[5];
        body[5] = MAX_COMPONENTS as u8;
        let mut info = FrameInfo::parse(kind, &body)?;
        info.component_count = count;
        return Ok(info);
    }
    FrameInfo::parse(kind, &body[..keep])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::SliceReader;

    fn sof_body(precision: u8, w: u16, h: u16, comps: &[(u8, u8)]) -> [u8; 15] {
        let mut b = [0u8; 15];
        b[0] = precision;
        b[1..3].copy_from_slice(&h.to_be_bytes());
        b[3..5].copy_from_slice(&w.to_be_bytes());
        b[5] = comps.len() as u8;
        for (i, &(id, hv)) in comps.iter().enumerate() {
            b[6 + 3 * i] = id;
            b[7 + 3 * i] = hv;
        }
        b
    }

    #[test]
    fn test_frame_kind_classification() {
        assert_eq!(FrameKind::from_marker(0xC0), Some(FrameKind::Baseline));
        assert_eq!(FrameKind::from_marker(0xC2), Some(FrameKind::Progressive));
        assert_eq!(FrameKind::from_marker(0xC9), Some(FrameKind::Arithmetic));
        assert_eq!(FrameKind::from_marker(DHT), None);
        assert_eq!(FrameKind::from_marker(0xCC), None);
    }

    #[test]
    fn test_parse_420_frame() {
        let body = sof_body(8, 320, 240, &[(1, 0x22), (2, 0x11), (3, 0x11)]);
        let info = FrameInfo::parse(FrameKind::Baseline, &body).unwrap();
        assert_eq!(info.width, 320);
        assert_eq!(info.height, 240);
        assert_eq!(info.mcu_size(), (16, 16));
        assert_eq!(info.mcu_grid(), (20, 15));
        assert!(info.check_supported().is_ok());
    }

    #[test]
    fn test_unsupported_sampling_and_precision() {
        let body = sof_body(8, 64, 64, &[(1, 0x41), (2, 0x11), (3, 0x11)]);
        let info = FrameInfo::parse(FrameKind::Baseline, &body).unwrap();
        assert_eq!(info.check_supported(), Err(Unsupported::Sampling));

        let body = sof_body(12, 64, 64, &[(1, 0x11)]);
        let info = FrameInfo::parse(FrameKind::ExtendedSequential, &body[..9]).unwrap();
        assert_eq!(info.check_supported(), Err(Unsupported::Precision));
    }

    #[test]
    fn test_next_marker_skips_fill() {
        let data = [0x12, 0xFF, 0xFF, 0xFF, 0xDB];
        let mut r = SliceReader::new(&data);
        assert_eq!(next_marker(&mut r), Ok(DQT));
    }

    #[test]
    fn test_four_components_reported() {
        let mut data = [0u8; 18];
        data[0] = 8;
        data[2] = 8;
        data[4] = 8;
        data[5] = 4;
        let mut r = SliceReader::new(&data);
        let info = read_frame_header(&mut r, FrameKind::Baseline, data.len()).unwrap();
        assert_eq!(info.component_count, 4);
        assert_eq!(info.check_supported(), Err(Unsupported::Components));
    }
}
