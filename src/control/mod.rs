//! Closed-loop output control.

pub mod proportional;

pub use proportional::{ControlLoop, ControlMode};
