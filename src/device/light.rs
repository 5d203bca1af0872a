//! Dimmable light with an LDR feedback loop.

use log::{debug, info};

use super::{Device, Outcome};
use crate::app::commands::Command;
use crate::app::events::{LightStatus, StatusBody, StatusReport};
use crate::app::ports::{LightSensorPort, PwmPort, StatusSink, StoragePort};
use crate::config::{DeviceId, NodeConfig};
use crate::control::ControlLoop;
use crate::sensors::calibration::PersistentCalibration;
use crate::sensors::ldr;

pub struct LightNode<H, S>
where
    H: LightSensorPort + PwmPort,
    S: StoragePort,
{
    id: DeviceId,
    hw: H,
    control: ControlLoop,
    calibration: PersistentCalibration<S>,
    /// Administrative ON/OFF. The loop and status reports only run while set.
    active: bool,
}

impl<H, S> LightNode<H, S>
where
    H: LightSensorPort + PwmPort,
    S: StoragePort,
{
    /// Build the node, restoring calibration from `storage`. Starts OFF
    /// with the output at the floor.
    pub fn new(cfg: &NodeConfig, mut hw: H, storage: S) -> Self {
        let control = ControlLoop::new(cfg.initial_setpoint, cfg.gain, cfg.pwm_min, cfg.pwm_max);
        hw.set_duty(control.output());
        Self {
            id: cfg.device_id.clone(),
            hw,
            control,
            calibration: PersistentCalibration::load(storage),
            active: false,
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn control(&self) -> &ControlLoop {
        &self.control
    }

    pub fn calibration(&self) -> &PersistentCalibration<S> {
        &self.calibration
    }

    pub fn hardware(&self) -> &H {
        &self.hw
    }

    pub fn hardware_mut(&mut self) -> &mut H {
        &mut self.hw
    }

    /// Calibrated illuminance when a model is loaded, else the divider
    /// estimate, else 0.
    pub fn lux(&self, raw: u16) -> f32 {
        self.calibration
            .evaluate(raw)
            .or_else(|| ldr::divider_lux(raw))
            .unwrap_or(0.0)
    }

    fn report(&self, status: &mut dyn StatusSink, body: LightStatus) {
        status.report(&StatusReport::new(&self.id, StatusBody::Light(body)));
    }
}

impl<H, S> Device for LightNode<H, S>
where
    H: LightSensorPort + PwmPort,
    S: StoragePort,
{
    fn device_id(&self) -> &str {
        &self.id
    }

    fn handle(&mut self, command: &Command, status: &mut dyn StatusSink) -> Outcome {
        match command {
            Command::On => {
                self.active = true;
                info!("light: on");
                Outcome::Applied
            }
            Command::Off => {
                self.active = false;
                let duty = self.control.force_off();
                self.hw.set_duty(duty);
                info!("light: off");
                self.report(status, LightStatus::OFF_ACK);
                Outcome::Applied
            }
            Command::PwmManual => {
                self.control.set_manual();
                info!("light: manual mode, output {}", self.control.output());
                Outcome::Applied
            }
            Command::PwmAuto => {
                let raw = self.hw.read_raw();
                self.control.set_auto(raw);
                info!("light: auto mode, setpoint {raw}");
                Outcome::Applied
            }
            Command::SetPwm(requested) => match self.control.set_output(*requested) {
                Some(duty) => {
                    if self.active {
                        self.hw.set_duty(duty);
                    }
                    debug!("light: manual output {duty} (requested {requested})");
                    Outcome::Applied
                }
                None => Outcome::Ignored("output is owned by the auto loop"),
            },
            Command::Calibrate { degree, coeffs } => {
                match self.calibration.set_coefficients(coeffs, *degree) {
                    Ok(()) => Outcome::Applied,
                    Err(e) => Outcome::Failed(e.into()),
                }
            }
            Command::Lock | Command::Unlock => Outcome::Ignored("not a lock node"),
        }
    }

    fn control_tick(&mut self) {
        if !self.active {
            return;
        }
        let raw = self.hw.read_raw();
        let duty = self.control.tick(raw);
        self.hw.set_duty(duty);
    }

    fn status_tick(&mut self, status: &mut dyn StatusSink) {
        if !self.active {
            return;
        }
        let raw = self.hw.read_raw();
        let body = LightStatus {
            on: true,
            lux: self.lux(raw),
            output: self.control.output(),
            raw,
        };
        self.report(status, body);
    }
}
