//! Display hardware drivers
//!
//! Concrete implementations of the `strata-core` display driver trait on
//! top of the `strata-hal` bus and pin traits:
//!
//! - Direct-mode MIPI DCS panels (ST7789, ILI9341)
//! - Buffered-mode AXS15231B with a dirty-row framebuffer
//! - PWM, switched and absent backlights

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

extern crate alloc;

pub mod backlight;
pub mod display;
