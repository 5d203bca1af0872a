//! Proportional dimmer controller.
//!
//! Drives the PWM output toward a setpoint expressed in raw sensor units.
//! In AUTO each tick nudges the output by `(setpoint - raw) * gain`
//! (truncated toward zero) and clamps it; in MANUAL the output only moves
//! on explicit requests and the tick re-asserts the last value.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ControlMode {
    Auto,
    Manual,
}

/// Controller state. Owned by the light node; no global state.
#[derive(Debug, Clone)]
pub struct ControlLoop {
    mode: ControlMode,
    setpoint: u16,
    output: u16,
    gain: f32,
    out_min: u16,
    out_max: u16,
}

impl ControlLoop {
    /// New controller in AUTO at `setpoint` with the output at `out_min`.
    pub fn new(setpoint: u16, gain: f32, out_min: u16, out_max: u16) -> Self {
        Self {
            mode: ControlMode::Auto,
            setpoint,
            output: out_min,
            gain,
            out_min,
            out_max,
        }
    }

    pub fn mode(&self) -> ControlMode {
        self.mode
    }

    pub fn setpoint(&self) -> u16 {
        self.setpoint
    }

    pub fn output(&self) -> u16 {
        self.output
    }

    /// Advance one period given the latest raw reading. Returns the output
    /// to write to the actuator.
    pub fn tick(&mut self, raw: u16) -> u16 {
        if self.mode == ControlMode::Auto {
            let error = i32::from(self.setpoint) - i32::from(raw);
            // Truncation toward zero: |error| < 2 leaves the output alone.
            let adjustment = (error as f32 * self.gain) as i32;
            self.output = self.clamp(i32::from(self.output).saturating_add(adjustment));
        }
        self.output
    }

    /// AUTO → MANUAL. The output is left where it is.
    pub fn set_manual(&mut self) {
        self.mode = ControlMode::Manual;
    }

    /// Enter AUTO, adopting `raw` as the new setpoint so the first tick
    /// starts with zero error.
    pub fn set_auto(&mut self, raw: u16) {
        self.mode = ControlMode::Auto;
        self.setpoint = raw;
    }

    /// Explicit output request, clamped to the output range.
    ///
    /// Returns `None` in AUTO, where the loop owns the output.
    pub fn set_output(&mut self, requested: i32) -> Option<u16> {
        if self.mode == ControlMode::Auto {
            return None;
        }
        self.output = self.clamp(requested);
        Some(self.output)
    }

    /// Drop the output to the floor (light switched off).
    pub fn force_off(&mut self) -> u16 {
        self.output = self.out_min;
        self.output
    }

    fn clamp(&self, value: i32) -> u16 {
        // Both bounds fit in u16, so the clamped value does too.
        value.clamp(i32::from(self.out_min), i32::from(self.out_max)) as u16
    }
}
