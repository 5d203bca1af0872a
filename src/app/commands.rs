//! Inbound commands to a node.
//!
//! Every command string, whether it arrives bare or inside a mesh
//! envelope, passes through [`Command::parse`]. Malformed text is rejected
//! here, at the boundary, so the devices only ever see well-typed input.
//!
//! ```text
//! ON | OFF | PWM_MANUAL | PWM_AUTO | LOCK | UNLOCK
//! PWM:<int>
//! CAL:<degree>:<coeff0>:...:<coeff_degree>
//! ```

use core::fmt;
use core::num::IntErrorKind;

use crate::error::ProtocolError;

/// Field separator shared by every line on the wire.
pub const DELIMITER: char = ':';

/// Commands that the master (directly or through the mesh) can send.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Enable the light output; the control loop starts ticking.
    On,
    /// Disable the light output and zero the actuator.
    Off,
    /// Hand the output to explicit `PWM:<int>` commands.
    PwmManual,
    /// Return to closed-loop control, capturing the current reading as setpoint.
    PwmAuto,
    /// Manual output request. Unclamped; the control loop clamps it.
    SetPwm(i32),
    /// Replace the sensor calibration polynomial.
    Calibrate { degree: u8, coeffs: Vec<f32> },
    /// Drive the lock to LOCKED.
    Lock,
    /// Drive the lock to UNLOCKED.
    Unlock,
}

impl Command {
    /// Tokenize and validate one command string.
    pub fn parse(text: &str) -> Result<Self, ProtocolError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ProtocolError::Empty);
        }

        match text {
            "ON" => return Ok(Self::On),
            "OFF" => return Ok(Self::Off),
            "PWM_MANUAL" => return Ok(Self::PwmManual),
            "PWM_AUTO" => return Ok(Self::PwmAuto),
            "LOCK" => return Ok(Self::Lock),
            "UNLOCK" => return Ok(Self::Unlock),
            _ => {}
        }

        if let Some(value) = text.strip_prefix("PWM:") {
            return parse_pwm(value).map(Self::SetPwm);
        }

        if let Some(fields) = text.strip_prefix("CAL:") {
            return parse_calibration(fields);
        }

        Err(ProtocolError::UnknownCommand)
    }

    /// Short name used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::On => "ON",
            Self::Off => "OFF",
            Self::PwmManual => "PWM_MANUAL",
            Self::PwmAuto => "PWM_AUTO",
            Self::SetPwm(_) => "PWM",
            Self::Calibrate { .. } => "CAL",
            Self::Lock => "LOCK",
            Self::Unlock => "UNLOCK",
        }
    }
}

/// Integer duty request. Values past the `i32` range saturate so the
/// control loop can clamp them like any other out-of-range request.
fn parse_pwm(value: &str) -> Result<i32, ProtocolError> {
    match value.parse::<i32>() {
        Ok(duty) => Ok(duty),
        Err(e) => match e.kind() {
            IntErrorKind::PosOverflow => Ok(i32::MAX),
            IntErrorKind::NegOverflow => Ok(i32::MIN),
            _ => Err(ProtocolError::InvalidNumber("pwm")),
        },
    }
}

/// `<degree>:<c0>:...:<c_degree>`: exactly `degree + 1` finite coefficients.
fn parse_calibration(fields: &str) -> Result<Command, ProtocolError> {
    let mut parts = fields.split(DELIMITER);

    let degree = parts
        .next()
        .filter(|s| !s.is_empty())
        .ok_or(ProtocolError::MissingField("degree"))?
        .parse::<u8>()
        .map_err(|_| ProtocolError::InvalidNumber("degree"))?;

    let coeffs = parts
        .map(|field| {
            field
                .parse::<f32>()
                .ok()
                .filter(|c| c.is_finite())
                .ok_or(ProtocolError::InvalidNumber("coefficient"))
        })
        .collect::<Result<Vec<f32>, _>>()?;

    let expected = usize::from(degree) + 1;
    if coeffs.len() != expected {
        return Err(ProtocolError::CoefficientCount {
            expected,
            found: coeffs.len(),
        });
    }

    Ok(Command::Calibrate { degree, coeffs })
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SetPwm(duty) => write!(f, "PWM{DELIMITER}{duty}"),
            Self::Calibrate { degree, coeffs } => {
                write!(f, "CAL{DELIMITER}{degree}")?;
                for c in coeffs {
                    write!(f, "{DELIMITER}{c}")?;
                }
                Ok(())
            }
            other => f.write_str(other.name()),
        }
    }
}
