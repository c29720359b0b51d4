//! Strata upload link
//!
//! Binary protocol between the network bridge (which terminates HTTP) and
//! the display MCU. Uploads travel as a begin message followed by chunks;
//! the MCU answers each finished request with a status code.
//!
//! All messages use the same frame:
//! ```text
//! ┌───────┬────────┬──────┬─────────────┬───────┐
//! │ START │ LENGTH │ TYPE │ PAYLOAD     │ CRC-8 │
//! │ 1B    │ 1B     │ 1B   │ 0–250B      │ 1B    │
//! └───────┴────────┴──────┴─────────────┴───────┘
//! ```
//! Multi-byte integers are little-endian.

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

pub mod frame;
pub mod messages;

pub use frame::{Frame, FrameError, FrameParser, FRAME_START, MAX_FRAME_SIZE, MAX_PAYLOAD_SIZE};
pub use messages::{BridgeMessage, McuMessage, MAX_CHUNK_DATA};
