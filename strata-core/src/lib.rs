//! Board-agnostic core of the Strata image display firmware
//!
//! This crate contains everything that does not depend on a specific
//! panel, bus or MCU:
//!
//! - Hardware abstraction traits (display driver, image screen, memory, clock)
//! - The upload session state machine fed by the network context
//! - The deferred dispatcher run by the rendering context
//! - RGB565/BGR565 pixel packing
//! - Configuration type definitions

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]
#![allow(async_fn_in_trait)]

extern crate alloc;

pub mod color;
pub mod config;
pub mod dispatch;
pub mod traits;
pub mod upload;
