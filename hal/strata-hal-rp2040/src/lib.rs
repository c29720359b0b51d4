//! RP2040-specific HAL for the Strata display firmware
//!
//! Implements the shared `strata-hal` traits on top of embassy-rp:
//!
//! - SPI panel bus with D/C and chip-select lines
//! - GPIO outputs (reset, switched backlight)
//! - PWM backlight channel

#![no_std]

pub mod gpio;
pub mod pwm;
pub mod spi_bus;

pub use gpio::RpOutput;
pub use pwm::RpPwm;
pub use spi_bus::SpiPanelBus;

// Re-export shared traits from strata-hal for convenience
pub use strata_hal::{BusError, OutputPin, PanelBus, PwmOutput};
