//! Dimmer output over any `embedded-hal` PWM channel.
//!
//! The control loop works in 0..=`full_scale` (1023); the channel's own
//! resolution is hidden behind `set_duty_cycle_fraction`.

use embedded_hal::pwm::SetDutyCycle;
use log::warn;

pub struct PwmDriver<P: SetDutyCycle> {
    channel: P,
    full_scale: u16,
    current: u16,
}

impl<P: SetDutyCycle> PwmDriver<P> {
    pub fn new(channel: P, full_scale: u16) -> Self {
        Self {
            channel,
            full_scale: full_scale.max(1),
            current: 0,
        }
    }

    /// Apply `duty` out of `full_scale`. Values above full scale saturate.
    pub fn set(&mut self, duty: u16) {
        let duty = duty.min(self.full_scale);
        if let Err(e) = self.channel.set_duty_cycle_fraction(duty, self.full_scale) {
            warn!("pwm: set duty {} failed: {:?}", duty, e);
            return;
        }
        self.current = duty;
    }

    pub fn current(&self) -> u16 {
        self.current
    }
}
