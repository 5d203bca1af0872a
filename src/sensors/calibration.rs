//! Polynomial calibration of the LDR.
//!
//! `lux = c0 + c1*raw + c2*raw^2 + c3*raw^3`, truncated at the model's
//! degree. The master fits the coefficients and pushes them with
//! `CAL:<degree>:<c0>:...`; the node persists them so the fit survives a
//! restart.

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::app::ports::{StorageError, StoragePort};
use crate::error::CalibrationError;

pub const MIN_DEGREE: u8 = 1;
pub const MAX_DEGREE: u8 = 3;
const MAX_COEFFS: usize = MAX_DEGREE as usize + 1;

/// Storage location of the persisted model.
pub const NAMESPACE: &str = "calib";
pub const KEY: &str = "ldr";

/// Upper bound on the postcard encoding (4 × f32 + degree + flag).
const RECORD_CAP: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CalibrationModel {
    coeffs: [f32; MAX_COEFFS],
    degree: u8,
    valid: bool,
}

impl Default for CalibrationModel {
    fn default() -> Self {
        Self {
            coeffs: [0.0; MAX_COEFFS],
            degree: MIN_DEGREE,
            valid: false,
        }
    }
}

impl CalibrationModel {
    pub fn is_valid(&self) -> bool {
        self.valid
    }

    pub fn degree(&self) -> u8 {
        self.degree
    }

    /// Active coefficients, lowest order first.
    pub fn coefficients(&self) -> &[f32] {
        &self.coeffs[..=usize::from(self.degree)]
    }

    /// Replace the polynomial.
    ///
    /// Rejects degrees outside 1..=3 and short coefficient lists, leaving
    /// the current model untouched. Extra coefficients past `degree` are
    /// ignored and the unused tail is zeroed.
    pub fn set_coefficients(&mut self, coeffs: &[f32], degree: u8) -> Result<(), CalibrationError> {
        if !(MIN_DEGREE..=MAX_DEGREE).contains(&degree) {
            return Err(CalibrationError::InvalidDegree(degree));
        }
        let needed = usize::from(degree) + 1;
        if coeffs.len() < needed {
            return Err(CalibrationError::MissingCoefficients {
                expected: needed,
                found: coeffs.len(),
            });
        }

        self.coeffs = [0.0; MAX_COEFFS];
        self.coeffs[..needed].copy_from_slice(&coeffs[..needed]);
        self.degree = degree;
        self.valid = true;
        Ok(())
    }

    /// Calibrated value for `raw`, or `None` while no model is loaded.
    pub fn evaluate(&self, raw: u16) -> Option<f32> {
        if !self.valid {
            return None;
        }
        let x = f32::from(raw);
        Some(
            self.coefficients()
                .iter()
                .rev()
                .fold(0.0, |acc, &c| acc * x + c),
        )
    }

    /// A decoded record is only trusted when it could have been produced by
    /// [`set_coefficients`](Self::set_coefficients).
    fn is_well_formed(&self) -> bool {
        self.valid
            && (MIN_DEGREE..=MAX_DEGREE).contains(&self.degree)
            && self.coeffs.iter().all(|c| c.is_finite())
    }
}

/// A [`CalibrationModel`] backed by persistent storage.
///
/// Every accepted update is written through before the call returns.
pub struct PersistentCalibration<S: StoragePort> {
    model: CalibrationModel,
    storage: S,
}

impl<S: StoragePort> PersistentCalibration<S> {
    /// Restore the model from `storage`.
    ///
    /// A missing, undecodable or out-of-range record yields an invalid
    /// model; it is never an error.
    pub fn load(storage: S) -> Self {
        let mut buf = [0u8; RECORD_CAP];
        let model = match storage.read(NAMESPACE, KEY, &mut buf) {
            Ok(len) => match postcard::from_bytes::<CalibrationModel>(&buf[..len]) {
                Ok(m) if m.is_well_formed() => {
                    info!(
                        "calib: loaded degree {} coefficients {:?}",
                        m.degree,
                        m.coefficients()
                    );
                    m
                }
                Ok(_) | Err(_) => {
                    warn!("calib: stored record unusable, running uncalibrated");
                    CalibrationModel::default()
                }
            },
            Err(StorageError::NotFound) => {
                info!("calib: no stored model, running uncalibrated");
                CalibrationModel::default()
            }
            Err(e) => {
                warn!("calib: read failed ({e}), running uncalibrated");
                CalibrationModel::default()
            }
        };
        Self { model, storage }
    }

    pub fn model(&self) -> &CalibrationModel {
        &self.model
    }

    pub fn evaluate(&self, raw: u16) -> Option<f32> {
        self.model.evaluate(raw)
    }

    /// Validate, apply and persist a new polynomial.
    ///
    /// On a storage failure the new model stays active in RAM and
    /// [`CalibrationError::Persist`] is returned.
    pub fn set_coefficients(&mut self, coeffs: &[f32], degree: u8) -> Result<(), CalibrationError> {
        self.model.set_coefficients(coeffs, degree)?;
        info!(
            "calib: degree {} coefficients {:?}",
            degree,
            self.model.coefficients()
        );
        self.persist().map_err(CalibrationError::Persist)
    }

    /// Give back the storage (used to simulate a restart).
    pub fn into_storage(self) -> S {
        self.storage
    }

    fn persist(&mut self) -> Result<(), StorageError> {
        let mut buf = [0u8; RECORD_CAP];
        let bytes = postcard::to_slice(&self.model, &mut buf).map_err(|_| StorageError::Full)?;
        self.storage.write(NAMESPACE, KEY, bytes)
    }
}
