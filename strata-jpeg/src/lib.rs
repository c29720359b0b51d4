//! Streaming baseline JPEG decoder
//!
//! Decodes baseline (sequential, Huffman-coded, 8-bit) JPEG images one MCU
//! at a time using a fixed-size [`Workspace`], so the caller never needs a
//! full decoded frame in memory. Each decoded MCU is handed out as a clipped
//! rectangle of RGB888 pixels which the caller converts and pushes to a panel.
//!
//! Supported input:
//! - SOF0/SOF1 frames with 8-bit precision
//! - 1 component (grayscale) or 3 components (YCbCr)
//! - Luma sampling 1x1, 2x1, 1x2 or 2x2 with 1x1 chroma
//! - Restart intervals (DRI/RSTn)
//!
//! Everything else (progressive, arithmetic, lossless, hierarchical, 12-bit)
//! is rejected with [`Unsupported`].
//!
//! The [`preflight`] module inspects only the frame header and is cheap
//! enough to run in a latency-sensitive context before an image is queued.

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

#[cfg(any(test, feature = "test-util"))]
extern crate alloc;

mod color;
pub mod decoder;
pub mod error;
mod huffman;
mod idct;
pub mod markers;
pub mod preflight;
pub mod reader;

#[cfg(any(test, feature = "test-util"))]
pub mod testutil;

pub use color::ycc_to_rgb;
pub use decoder::{Decoder, McuRect, Workspace, MAX_MCU_SIZE};
pub use error::{JpegError, Unsupported};
pub use markers::{ComponentInfo, FrameInfo, FrameKind};
pub use preflight::{is_jpeg_magic, preflight_fragment, preflight_image, PreflightError};
pub use reader::{ByteSource, SliceReader};
