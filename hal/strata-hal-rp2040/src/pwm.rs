//! PWM backlight channel
//!
//! The slice counts the full 16-bit range, which puts the output near
//! 1.9 kHz at the default 125 MHz system clock with no divider. The 8-bit
//! duty is stretched onto that range.

use embassy_rp::pwm::{Config, Pwm};
use strata_hal::PwmOutput;

const TOP: u16 = u16::MAX;

/// Channel A of one PWM slice
pub struct RpPwm<'d> {
    pwm: Pwm<'d>,
    config: Config,
    duty: u8,
}

impl<'d> RpPwm<'d> {
    /// Wrap a slice configured with `Pwm::new_output_a`; starts at 0 % duty
    pub fn new(mut pwm: Pwm<'d>) -> Self {
        let mut config = Config::default();
        config.top = TOP;
        config.compare_a = 0;
        pwm.set_config(&config);
        Self { pwm, config, duty: 0 }
    }
}

/// Compare value for an 8-bit duty
#[inline]
pub fn compare_for_duty(duty: u8) -> u16 {
    duty as u16 * (TOP / 255)
}

impl PwmOutput for RpPwm<'_> {
    fn set_duty(&mut self, duty: u8) {
        if duty == self.duty {
            return;
        }
        self.duty = duty;
        self.config.compare_a = compare_for_duty(duty);
        self.pwm.set_config(&self.config);
    }

    fn duty(&self) -> u8 {
        self.duty
    }
}
