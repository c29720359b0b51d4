//! Backlight control
//!
//! Brightness is a percentage. PWM backlights map it onto an 8-bit duty
//! between `duty_min` (1 %) and `duty_max` (99 %); 0 % and 100 % are fully
//! off and fully on. Active-low outputs are inverted after mapping.

use strata_core::config::BacklightConfig;
use strata_hal::{OutputPin, PwmOutput};

/// Backlight as seen by a display driver
pub trait Backlight {
    /// Full on (at the current brightness) or off
    fn set_on(&mut self, on: bool);

    /// Brightness in percent, clamped to 100
    fn set_brightness(&mut self, percent: u8);

    fn brightness(&self) -> u8;

    /// Whether brightness can be changed at all
    fn is_controllable(&self) -> bool;
}

/// Map a brightness percentage to a PWM duty
pub fn brightness_to_duty(percent: u8, duty_min: u8, duty_max: u8, active_low: bool) -> u8 {
    let duty = match percent {
        0 => 0,
        p if p >= 100 => 255,
        p => {
            let min = duty_min as u32;
            let max = (duty_max as u32).max(min);
            (min + (p as u32 - 1) * (max - min) / 98) as u8
        }
    };
    if active_low {
        255 - duty
    } else {
        duty
    }
}

/// PWM-dimmed backlight
pub struct PwmBacklight<P: PwmOutput> {
    pwm: P,
    duty_min: u8,
    duty_max: u8,
    active_low: bool,
    brightness: u8,
    on: bool,
}

impl<P: PwmOutput> PwmBacklight<P> {
    /// Starts off; `config.brightness` is applied on the first `set_on(true)`
    pub fn new(mut pwm: P, config: &BacklightConfig) -> Self {
        pwm.set_duty(brightness_to_duty(0, config.duty_min, config.duty_max, config.active_low));
        Self {
            pwm,
            duty_min: config.duty_min,
            duty_max: config.duty_max,
            active_low: config.active_low,
            brightness: config.brightness.min(100),
            on: false,
        }
    }

    fn apply(&mut self) {
        let level = if self.on { self.brightness } else { 0 };
        self.pwm
            .set_duty(brightness_to_duty(level, self.duty_min, self.duty_max, self.active_low));
    }

    pub fn pwm(&self) -> &P {
        &self.pwm
    }
}

impl<P: PwmOutput> Backlight for PwmBacklight<P> {
    fn set_on(&mut self, on: bool) {
        self.on = on;
        self.apply();
    }

    fn set_brightness(&mut self, percent: u8) {
        self.brightness = percent.min(100);
        self.on = true;
        self.apply();
    }

    fn brightness(&self) -> u8 {
        self.brightness
    }

    fn is_controllable(&self) -> bool {
        true
    }
}

/// On/off backlight on a plain GPIO
pub struct SwitchedBacklight<P: OutputPin> {
    pin: P,
    active_low: bool,
    on: bool,
}

impl<P: OutputPin> SwitchedBacklight<P> {
    pub fn new(mut pin: P, active_low: bool) -> Self {
        pin.set_state(active_low);
        Self {
            pin,
            active_low,
            on: false,
        }
    }

    pub fn pin(&self) -> &P {
        &self.pin
    }
}

impl<P: OutputPin> Backlight for SwitchedBacklight<P> {
    fn set_on(&mut self, on: bool) {
        self.on = on;
        self.pin.set_state(on != self.active_low);
    }

    /// Anything above 0 % is fully on
    fn set_brightness(&mut self, percent: u8) {
        self.set_on(percent > 0);
    }

    fn brightness(&self) -> u8 {
        if self.on {
            100
        } else {
            0
        }
    }

    fn is_controllable(&self) -> bool {
        false
    }
}

/// Panel without a controllable backlight
#[derive(Debug, Clone, Copy, Default)]
pub struct NoBacklight;

impl Backlight for NoBacklight {
    fn set_on(&mut self, _on: bool) {}

    fn set_brightness(&mut self, _percent: u8) {}

    fn brightness(&self) -> u8 {
        100
    }

    fn is_controllable(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct FakePwm(u8);

    impl PwmOutput for FakePwm {
        fn set_duty(&mut self, duty: u8) {
            self.0 = duty;
        }

        fn duty(&self) -> u8 {
            self.0
        }
    }

    #[derive(Default)]
    struct FakePin(bool);

    impl OutputPin for FakePin {
        fn set_high(&mut self) {
            self.0 = true;
        }

        fn set_low(&mut self) {
            self.0 = false;
        }

        fn is_set_high(&self) -> bool {
            self.0
        }
    }

    #[test]
    fn test_duty_endpoints() {
        assert_eq!(brightness_to_duty(0, 10, 255, false), 0);
        assert_eq!(brightness_to_duty(100, 10, 255, false), 255);
        assert_eq!(brightness_to_duty(1, 10, 255, false), 10);
        assert_eq!(brightness_to_duty(99, 10, 255, false), 255);
    }

    #[test]
    fn test_duty_midpoint() {
        // 10 + 49 * 245 / 98 = 132
        assert_eq!(brightness_to_duty(50, 10, 255, false), 132);
    }

    #[test]
    fn test_active_low_inverts() {
        assert_eq!(brightness_to_duty(0, 10, 255, true), 255);
        assert_eq!(brightness_to_duty(100, 10, 255, true), 0);
        assert_eq!(brightness_to_duty(1, 10, 255, true), 245);
    }

    #[test]
    fn test_pwm_backlight_on_off() {
        let config = BacklightConfig {
            brightness: 50,
            ..Default::default()
        };
        let mut bl = PwmBacklight::new(FakePwm::default(), &config);
        assert_eq!(bl.pwm().duty(), 0);
        bl.set_on(true);
        assert_eq!(bl.pwm().duty(), 132);
        bl.set_on(false);
        assert_eq!(bl.pwm().duty(), 0);
        assert_eq!(bl.brightness(), 50);
        bl.set_brightness(150);
        assert_eq!(bl.brightness(), 100);
        assert_eq!(bl.pwm().duty(), 255);
    }

    #[test]
    fn test_switched_backlight_active_low() {
        let mut bl = SwitchedBacklight::new(FakePin::default(), true);
        assert!(bl.pin().is_set_high());
        bl.set_on(true);
        assert!(!bl.pin().is_set_high());
        bl.set_brightness(0);
        assert!(bl.pin().is_set_high());
        assert_eq!(bl.brightness(), 0);
        assert!(!bl.is_controllable());
    }
}
