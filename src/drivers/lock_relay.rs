//! Solenoid bolt behind a relay on one GPIO.

use embedded_hal::digital::OutputPin;
use log::warn;

pub struct LockRelay<P: OutputPin> {
    pin: P,
    /// Pin level that throws the bolt.
    locked_level_high: bool,
}

impl<P: OutputPin> LockRelay<P> {
    pub fn new(pin: P, locked_level_high: bool) -> Self {
        Self {
            pin,
            locked_level_high,
        }
    }

    pub fn engage(&mut self) {
        self.drive(self.locked_level_high);
    }

    pub fn release(&mut self) {
        self.drive(!self.locked_level_high);
    }

    fn drive(&mut self, high: bool) {
        let result = if high {
            self.pin.set_high()
        } else {
            self.pin.set_low()
        };
        if let Err(e) = result {
            warn!("lock: relay pin write failed: {:?}", e);
        }
    }
}
