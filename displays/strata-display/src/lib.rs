//! Image rendering on top of a display driver
//!
//! - [`StripDecoder`] streams JPEG strips MCU row by MCU row into any
//!   `DisplayDriver` without a frame buffer of its own.
//! - [`DirectImageScreen`] is the image screen surface the dispatcher
//!   renders through: session bookkeeping, black takeover, display timeout.

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]
#![allow(async_fn_in_trait)]

extern crate alloc;

pub mod screen;
pub mod strip;

pub use screen::DirectImageScreen;
pub use strip::StripDecoder;
