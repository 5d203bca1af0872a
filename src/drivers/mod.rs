//! Peripheral drivers and one-shot hardware initialisation.
//!
//! The actuator drivers are written against `embedded-hal` 1.0 traits, so
//! ESP-IDF's `LedcDriver` / `PinDriver` plug in on target and plain mocks
//! plug in on the host.

pub mod hw_init;
pub mod lock_relay;
pub mod mfrc522;
pub mod pwm;
pub mod status_led;
