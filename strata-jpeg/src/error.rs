//! Decoder error types

use core::fmt;

/// Errors produced while parsing or decoding a JPEG stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum JpegError {
    /// Stream does not start with an SOI marker
    NotJpeg,
    /// Input ended before the image was complete
    Truncated,
    /// Structurally invalid stream (bad segment length, bad Huffman code, ...)
    Malformed,
    /// A scan referenced a quantization or Huffman table that was never defined
    MissingTable,
    /// Valid JPEG, but uses a feature this decoder does not implement
    Unsupported(Unsupported),
}

/// JPEG features outside the baseline subset
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Unsupported {
    /// Progressive DCT (SOF2/SOF6)
    Progressive,
    /// Arithmetic entropy coding (SOF9 and up)
    Arithmetic,
    /// Lossless process (SOF3)
    Lossless,
    /// Hierarchical / differential frames (SOF5-SOF7)
    Hierarchical,
    /// Sample or quantizer precision other than 8 bits
    Precision,
    /// Component count other than 1 or 3
    Components,
    /// Sampling factors outside 1x1/2x1/1x2/2x2 luma with 1x1 chroma
    Sampling,
    /// Image split over several scans
    MultiScan,
    /// Height defined later by a DNL marker
    DeferredHeight,
}

impl fmt::Display for Unsupported {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            Unsupported::Progressive => "progressive JPEG",
            Unsupported::Arithmetic => "arithmetic-coded JPEG",
            Unsupported::Lossless => "lossless JPEG",
            Unsupported::Hierarchical => "hierarchical JPEG",
            Unsupported::Precision => "12-bit JPEG",
            Unsupported::Components => "component count (need grayscale or YCbCr)",
            Unsupported::Sampling => "chroma subsampling layout",
            Unsupported::MultiScan => "non-interleaved scans",
            Unsupported::DeferredHeight => "height defined by DNL",
        };
        f.write_str(msg)
    }
}

impl fmt::Display for JpegError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JpegError::NotJpeg => f.write_str("not a JPEG stream"),
            JpegError::Truncated => f.write_str("JPEG data is truncated"),
            JpegError::Malformed => f.write_str("JPEG data is malformed"),
            JpegError::MissingTable => f.write_str("JPEG references an undefined table"),
            JpegError::Unsupported(what) => write!(f, "unsupported {}", what),
        }
    }
}

impl From<Unsupported> for JpegError {
    fn from(value: Unsupported) -> Self {
        JpegError::Unsupported(value)
    }
}
