//! PWM output abstraction

/// Single PWM channel with an 8-bit duty cycle
pub trait PwmOutput {
    /// Set the duty cycle; 0 is always low, 255 always high
    fn set_duty(&mut self, duty: u8);

    /// Last duty written
    fn duty(&self) -> u8;
}
