//! Hardware adapters: bridge real peripherals to the domain port traits.
//!
//! Each role gets its own bundle: [`LightHardware`] (LDR + dimmer) and
//! [`LockHardware`] (bolt relay). [`BoardLed`] serves both. The drivers
//! underneath are generic over `embedded-hal` traits, so on non-espidf
//! targets any mock pin or channel fits.

use embedded_hal::digital::OutputPin;
use embedded_hal::pwm::SetDutyCycle;

use crate::app::ports::{IndicatorPort, LightSensorPort, LockActuatorPort, PwmPort};
use crate::drivers::lock_relay::LockRelay;
use crate::drivers::pwm::PwmDriver;
use crate::drivers::status_led::StatusLed;
use crate::sensors::ldr::LdrSensor;

/// LDR + dimmer behind [`LightSensorPort`] and [`PwmPort`].
pub struct LightHardware<P: SetDutyCycle> {
    ldr: LdrSensor,
    pwm: PwmDriver<P>,
}

impl<P: SetDutyCycle> LightHardware<P> {
    pub fn new(ldr: LdrSensor, pwm: PwmDriver<P>) -> Self {
        Self { ldr, pwm }
    }

    pub fn duty(&self) -> u16 {
        self.pwm.current()
    }
}

impl<P: SetDutyCycle> LightSensorPort for LightHardware<P> {
    fn read_raw(&mut self) -> u16 {
        self.ldr.read()
    }
}

impl<P: SetDutyCycle> PwmPort for LightHardware<P> {
    fn set_duty(&mut self, duty: u16) {
        self.pwm.set(duty);
    }
}

/// Bolt relay behind [`LockActuatorPort`].
pub struct LockHardware<P: OutputPin> {
    relay: LockRelay<P>,
}

impl<P: OutputPin> LockHardware<P> {
    pub fn new(relay: LockRelay<P>) -> Self {
        Self { relay }
    }
}

impl<P: OutputPin> LockActuatorPort for LockHardware<P> {
    fn engage(&mut self) {
        self.relay.engage();
    }

    fn release(&mut self) {
        self.relay.release();
    }
}

/// On-board LED behind [`IndicatorPort`].
pub struct BoardLed<P: OutputPin> {
    led: StatusLed<P>,
}

impl<P: OutputPin> BoardLed<P> {
    pub fn new(led: StatusLed<P>) -> Self {
        Self { led }
    }
}

impl<P: OutputPin> IndicatorPort for BoardLed<P> {
    fn set_indicator(&mut self, on: bool) {
        self.led.set(on);
    }
}
