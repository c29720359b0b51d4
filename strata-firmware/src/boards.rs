//! Reference board pin map
//!
//! | Function            | Peripheral  | GPIO |
//! |---------------------|-------------|------|
//! | Upload link TX      | UART0       | 0    |
//! | Upload link RX      | UART0       | 1    |
//! | Display D/C         | -           | 16   |
//! | Display CS          | -           | 17   |
//! | Display SCK         | SPI0        | 18   |
//! | Display MOSI        | SPI0        | 19   |
//! | Backlight           | PWM2 A      | 20   |
//! | Display reset       | -           | 21   |

use embassy_rp::peripherals::{
    PIN_0, PIN_1, PIN_16, PIN_17, PIN_18, PIN_19, PIN_20, PIN_21, PWM_SLICE2, SPI0, UART0,
};
use embassy_rp::{Peri, Peripherals};

/// Display panel wiring
pub struct DisplayPins {
    pub spi: Peri<'static, SPI0>,
    pub sck: Peri<'static, PIN_18>,
    pub mosi: Peri<'static, PIN_19>,
    pub cs: Peri<'static, PIN_17>,
    pub dc: Peri<'static, PIN_16>,
    pub reset: Peri<'static, PIN_21>,
    pub backlight: Peri<'static, PIN_20>,
    pub backlight_pwm: Peri<'static, PWM_SLICE2>,
}

/// Upload link UART to the network bridge
pub struct LinkPins {
    pub uart: Peri<'static, UART0>,
    pub tx: Peri<'static, PIN_0>,
    pub rx: Peri<'static, PIN_1>,
}

pub struct Board {
    pub display: DisplayPins,
    pub link: LinkPins,
}

impl Board {
    /// Split the peripherals into board functions
    pub fn take(p: Peripherals) -> Self {
        Self {
            display: DisplayPins {
                spi: p.SPI0,
                sck: p.PIN_18,
                mosi: p.PIN_19,
                cs: p.PIN_17,
                dc: p.PIN_16,
                reset: p.PIN_21,
                backlight: p.PIN_20,
                backlight_pwm: p.PWM_SLICE2,
            },
            link: LinkPins {
                uart: p.UART0,
                tx: p.PIN_0,
                rx: p.PIN_1,
            },
        }
    }
}
