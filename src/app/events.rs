//! Outbound node events.
//!
//! Two kinds of output leave the domain core:
//!
//! - [`StatusReport`]: wire lines addressed to the master, emitted through
//!   the [`StatusSink`](super::ports::StatusSink) port.
//! - [`NodeEvent`]: structured diagnostics emitted through the
//!   [`EventSink`](super::ports::EventSink) port; adapters log them.

use core::fmt;
use core::net::Ipv4Addr;

use super::commands::{Command, DELIMITER};
use crate::config::DeviceRole;
use crate::error::Error;
use crate::mesh::envelope::MeshEnvelope;

// ───────────────────────────────────────────────────────────────
// Status lines (device → master)
// ───────────────────────────────────────────────────────────────

/// One status line. `Display` renders the exact wire text.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StatusReport<'a> {
    pub device_id: &'a str,
    pub body: StatusBody<'a>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StatusBody<'a> {
    /// `<id>:<ON|OFF>:<lux, 1 decimal>:<pwm>:<raw>`
    Light(LightStatus),
    /// `<id>:LOCKED`
    Locked,
    /// `<id>:UNLOCKED`
    Unlocked,
    /// `<id>:HEARTBEAT`
    Heartbeat,
    /// `<id>:<UID bytes as XX:XX:..>`
    Card(&'a [u8]),
    /// `OTA_PROGRESS:<id>:<percent>`
    UpdateProgress(u8),
}

/// Periodic light telemetry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightStatus {
    pub on: bool,
    /// Illuminance estimate (calibrated when available).
    pub lux: f32,
    pub output: u16,
    pub raw: u16,
}

impl LightStatus {
    /// Acknowledgment sent when the light is switched off.
    pub const OFF_ACK: Self = Self {
        on: false,
        lux: 0.0,
        output: 0,
        raw: 0,
    };
}

impl<'a> StatusReport<'a> {
    pub fn new(device_id: &'a str, body: StatusBody<'a>) -> Self {
        Self { device_id, body }
    }
}

impl fmt::Display for StatusReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let id = self.device_id;
        let d = DELIMITER;
        match self.body {
            StatusBody::Light(s) => write!(
                f,
                "{id}{d}{}{d}{:.1}{d}{}{d}{}",
                if s.on { "ON" } else { "OFF" },
                s.lux,
                s.output,
                s.raw
            ),
            StatusBody::Locked => write!(f, "{id}{d}LOCKED"),
            StatusBody::Unlocked => write!(f, "{id}{d}UNLOCKED"),
            StatusBody::Heartbeat => write!(f, "{id}{d}HEARTBEAT"),
            StatusBody::Card(uid) => {
                write!(f, "{id}")?;
                for byte in uid {
                    write!(f, "{d}{byte:02X}")?;
                }
                Ok(())
            }
            StatusBody::UpdateProgress(pct) => write!(f, "OTA_PROGRESS{d}{id}{d}{pct}"),
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Diagnostic events
// ───────────────────────────────────────────────────────────────

/// Structured events emitted by the node core.
#[derive(Debug, Clone)]
pub enum NodeEvent<'a> {
    /// The service entered its main loop.
    Started {
        device_id: &'a str,
        role: DeviceRole,
        address: Ipv4Addr,
    },
    /// A command changed (or re-asserted) device state.
    CommandApplied { command: &'a Command, via_mesh: bool },
    /// A well-formed command that this node does not act on.
    CommandIgnored {
        command: &'a Command,
        reason: &'static str,
    },
    /// Inbound text or a command payload was rejected.
    CommandRejected { text: &'a str, reason: Error },
    /// An envelope for another node was re-emitted with this TTL.
    Relayed(MeshEnvelope<'a>),
    /// An envelope for another node arrived with no hops left.
    TtlExpired(MeshEnvelope<'a>),
    /// A best-effort send failed.
    SendFailed { what: &'static str },
}
