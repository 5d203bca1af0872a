//! Device roles that consume routed commands.
//!
//! A node runs exactly one [`Device`]. The service hands it parsed
//! commands and timer ticks; the device talks to hardware only through the
//! port traits in [`crate::app::ports`].

pub mod light;
pub mod lock;

pub use light::LightNode;
pub use lock::{LockNode, LockState};

use crate::app::commands::Command;
use crate::app::ports::StatusSink;
use crate::error::Error;

/// Result of handing one command to a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// State changed or was re-asserted.
    Applied,
    /// Well-formed but not acted on by this role or in this mode.
    Ignored(&'static str),
    /// The command's payload was refused or only partly applied.
    Failed(Error),
}

pub trait Device {
    fn device_id(&self) -> &str;

    /// Apply one command. Status lines triggered by it go to `status`.
    fn handle(&mut self, command: &Command, status: &mut dyn StatusSink) -> Outcome;

    /// Control-period tick.
    fn control_tick(&mut self);

    /// Status-period tick.
    fn status_tick(&mut self, status: &mut dyn StatusSink);

    /// Poll local inputs once per loop iteration.
    fn poll_inputs(&mut self, _status: &mut dyn StatusSink) {}
}
