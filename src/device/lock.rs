//! Two-state door lock with an optional RFID reader.
//!
//! Powers up LOCKED. LOCK and UNLOCK are idempotent: a repeat drives the
//! actuator again and re-sends the status line, nothing else.

use log::info;
use serde::{Deserialize, Serialize};

use super::{Device, Outcome};
use crate::app::commands::Command;
use crate::app::events::{StatusBody, StatusReport};
use crate::app::ports::{CardReaderPort, LockActuatorPort, StatusSink};
use crate::config::{DeviceId, NodeConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LockState {
    Locked,
    Unlocked,
}

pub struct LockNode<A, R>
where
    A: LockActuatorPort,
    R: CardReaderPort,
{
    id: DeviceId,
    actuator: A,
    reader: R,
    state: LockState,
}

impl<A, R> LockNode<A, R>
where
    A: LockActuatorPort,
    R: CardReaderPort,
{
    pub fn new(cfg: &NodeConfig, mut actuator: A, reader: R) -> Self {
        actuator.engage();
        Self {
            id: cfg.device_id.clone(),
            actuator,
            reader,
            state: LockState::Locked,
        }
    }

    pub fn state(&self) -> LockState {
        self.state
    }

    pub fn actuator(&self) -> &A {
        &self.actuator
    }

    fn drive(&mut self, target: LockState, status: &mut dyn StatusSink) {
        match target {
            LockState::Locked => self.actuator.engage(),
            LockState::Unlocked => self.actuator.release(),
        }
        if self.state != target {
            info!("lock: {:?} -> {:?}", self.state, target);
        }
        self.state = target;

        let body = match target {
            LockState::Locked => StatusBody::Locked,
            LockState::Unlocked => StatusBody::Unlocked,
        };
        status.report(&StatusReport::new(&self.id, body));
    }
}

impl<A, R> Device for LockNode<A, R>
where
    A: LockActuatorPort,
    R: CardReaderPort,
{
    fn device_id(&self) -> &str {
        &self.id
    }

    fn handle(&mut self, command: &Command, status: &mut dyn StatusSink) -> Outcome {
        match command {
            Command::Lock => {
                self.drive(LockState::Locked, status);
                Outcome::Applied
            }
            Command::Unlock => {
                self.drive(LockState::Unlocked, status);
                Outcome::Applied
            }
            _ => Outcome::Ignored("not a light node"),
        }
    }

    fn control_tick(&mut self) {}

    fn status_tick(&mut self, status: &mut dyn StatusSink) {
        status.report(&StatusReport::new(&self.id, StatusBody::Heartbeat));
    }

    fn poll_inputs(&mut self, status: &mut dyn StatusSink) {
        if let Some(uid) = self.reader.poll_card() {
            info!("lock: card presented ({} bytes)", uid.len());
            status.report(&StatusReport::new(&self.id, StatusBody::Card(&uid)));
        }
    }
}
