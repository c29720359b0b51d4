//! Strata Hardware Abstraction Layer
//!
//! Traits the display drivers are written against, implemented by
//! chip-specific HALs.
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │  strata-drivers (panel drivers)         │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  strata-hal (this crate - traits)       │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//!             ┌───────────────┐
//!             │ strata-hal-   │
//!             │    rp2040     │
//!             └───────────────┘
//! ```
//!
//! # Traits
//!
//! - [`bus::PanelBus`] - Command/data bus to a display controller
//! - [`gpio::OutputPin`] - Digital output
//! - [`pwm::PwmOutput`] - 8-bit PWM duty output

#![no_std]
#![deny(unsafe_code)]

pub mod bus;
pub mod gpio;
pub mod pwm;

pub use bus::{BusError, PanelBus};
pub use gpio::{NoPin, OutputPin};
pub use pwm::PwmOutput;
