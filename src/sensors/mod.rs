//! Light sensing: the raw LDR channel and the models that turn its
//! readings into illuminance.

pub mod calibration;
pub mod ldr;

pub use calibration::{CalibrationModel, PersistentCalibration};
