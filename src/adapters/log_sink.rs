//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing node events to the ESP-IDF logger
//! (UART in production). Nothing here goes over the network.

use log::{debug, info, warn};

use crate::app::events::NodeEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`NodeEvent`] to the serial console.
#[derive(Debug, Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &NodeEvent<'_>) {
        match event {
            NodeEvent::Started {
                device_id,
                role,
                address,
            } => {
                info!("START | id={} role={} addr={}", device_id, role, address);
            }
            NodeEvent::CommandApplied { command, via_mesh } => {
                info!(
                    "CMD | {} ({})",
                    command,
                    if *via_mesh { "mesh" } else { "direct" }
                );
            }
            NodeEvent::CommandIgnored { command, reason } => {
                info!("IGNORE | {} | {}", command.name(), reason);
            }
            NodeEvent::CommandRejected { text, reason } => {
                warn!("REJECT | {:?} | {}", text, reason);
            }
            NodeEvent::Relayed(envelope) => {
                debug!("RELAY | {}", envelope);
            }
            NodeEvent::TtlExpired(envelope) => {
                info!("DROP | {} | ttl exhausted", envelope);
            }
            NodeEvent::SendFailed { what } => {
                warn!("SEND | {} send failed", what);
            }
        }
    }
}
