//! Single on-board status LED.

use embedded_hal::digital::OutputPin;

pub struct StatusLed<P: OutputPin> {
    pin: P,
    active_low: bool,
    on: bool,
}

impl<P: OutputPin> StatusLed<P> {
    pub fn new(pin: P, active_low: bool) -> Self {
        let mut led = Self {
            pin,
            active_low,
            on: true,
        };
        led.set(false);
        led
    }

    pub fn set(&mut self, on: bool) {
        if on == self.on {
            return;
        }
        let high = on != self.active_low;
        let result = if high {
            self.pin.set_high()
        } else {
            self.pin.set_low()
        };
        if result.is_ok() {
            self.on = on;
        }
    }

    pub fn is_on(&self) -> bool {
        self.on
    }
}
