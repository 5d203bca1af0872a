//! Inbound classification: execute here, relay onward, or drop.

use core::net::Ipv4Addr;

use log::debug;

use super::envelope::MeshEnvelope;

/// What the node should do with one inbound datagram.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route<'a> {
    /// Execute `command` locally.
    Dispatch {
        command: &'a str,
        /// `true` when the command arrived inside an envelope addressed here.
        via_mesh: bool,
    },
    /// Re-emit this (already decremented) envelope to the mesh.
    Relay(MeshEnvelope<'a>),
    /// Envelope for another node with no hops left.
    Drop(MeshEnvelope<'a>),
}

/// Stateless relay decision for a node with a fixed address.
#[derive(Debug, Clone, Copy)]
pub struct Router {
    local: Ipv4Addr,
}

impl Router {
    pub fn new(local: Ipv4Addr) -> Self {
        Self { local }
    }

    pub fn local_addr(&self) -> Ipv4Addr {
        self.local
    }

    /// Classify one datagram.
    ///
    /// Non-envelope text is a bare command. An envelope addressed here
    /// unwraps to its command and is never re-wrapped; one addressed
    /// elsewhere relays with `ttl - 1` while budget remains.
    pub fn classify<'a>(&self, raw: &'a str) -> Route<'a> {
        let Some(envelope) = MeshEnvelope::parse(raw) else {
            return Route::Dispatch {
                command: raw,
                via_mesh: false,
            };
        };

        if envelope.is_for(self.local) {
            return Route::Dispatch {
                command: envelope.command,
                via_mesh: true,
            };
        }

        match envelope.decremented() {
            Some(next) => Route::Relay(next),
            None => {
                debug!("mesh: ttl exhausted for {}", envelope.target);
                Route::Drop(envelope)
            }
        }
    }
}
