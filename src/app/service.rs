//! Node service: one cooperative loop over transport, device and timers.
//!
//! [`NodeService`] owns the router, the scheduler and the device. Each
//! call to [`run_once`](NodeService::run_once) drains pending datagrams,
//! polls local inputs, then fires whatever timers are due. The transport,
//! clock and event sink are injected at call sites so the whole loop runs
//! against mocks on the host.
//!
//! ```text
//!  Transport ──▶ ┌────────────────────────────┐ ──▶ Transport (relay / status)
//!                │        NodeService         │
//!  ClockPort ──▶ │  Router · Scheduler · Dev  │ ──▶ EventSink
//!                └────────────────────────────┘
//! ```

use core::fmt::Write as _;
use core::net::{Ipv4Addr, SocketAddrV4};
use core::time::Duration;

use log::{debug, info, warn};

use super::commands::Command;
use super::events::{NodeEvent, StatusReport};
use super::ports::{
    ClockPort, Datagram, EventSink, IndicatorPort, SchedulerDelegate, StatusSink, TimerId,
    Transport,
};
use crate::config::{DeviceRole, NodeConfig, RelayMode};
use crate::device::{Device, Outcome};
use crate::mesh::envelope::MeshEnvelope;
use crate::mesh::router::{Route, Router};
use crate::scheduler::Scheduler;

// ───────────────────────────────────────────────────────────────
// NodeService
// ───────────────────────────────────────────────────────────────

pub struct NodeService<D, I>
where
    D: Device,
    I: IndicatorPort,
{
    router: Router,
    scheduler: Scheduler,
    device: D,
    indicator: I,
    led_on: bool,
    master: SocketAddrV4,
    relay_mode: RelayMode,
    mesh_port: u16,
    recv_timeout: Duration,
    drain_limit: usize,
}

impl<D, I> NodeService<D, I>
where
    D: Device,
    I: IndicatorPort,
{
    /// Build the service for a node at `local`. The timers are armed
    /// relative to `now_ms`.
    pub fn new(config: NodeConfig, local: Ipv4Addr, device: D, indicator: I, now_ms: u64) -> Self {
        let mut scheduler = Scheduler::new();
        for (id, period) in [
            (TimerId::Heartbeat, config.heartbeat_period_ms),
            (TimerId::ControlTick, config.control_period_ms),
            (TimerId::StatusReport, config.status_period_ms),
        ] {
            if scheduler.add(id, period, now_ms).is_none() {
                warn!("Scheduler full, {:?} not armed", id);
            }
        }

        Self {
            router: Router::new(local),
            scheduler,
            device,
            indicator,
            led_on: false,
            master: config.master,
            relay_mode: config.relay_mode,
            mesh_port: config.mesh_port,
            recv_timeout: config.recv_timeout(),
            drain_limit: config.drain_limit,
        }
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    pub fn device_mut(&mut self) -> &mut D {
        &mut self.device
    }

    pub fn local_addr(&self) -> Ipv4Addr {
        self.router.local_addr()
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Announce the node. Call once before the first [`run_once`](Self::run_once).
    pub fn start(&mut self, role: DeviceRole, sink: &mut impl EventSink) {
        sink.emit(&NodeEvent::Started {
            device_id: self.device.device_id(),
            role,
            address: self.router.local_addr(),
        });
        info!(
            "NodeService started: {} at {}",
            self.device.device_id(),
            self.router.local_addr()
        );
    }

    // ── Per-iteration orchestration ───────────────────────────

    /// One loop iteration.
    ///
    /// 1. Receive and route datagrams until none is pending or the drain
    ///    limit is hit, in arrival order.
    /// 2. Poll device inputs (card reader).
    /// 3. Fire due timers.
    pub fn run_once<T: Transport>(
        &mut self,
        transport: &mut T,
        clock: &impl ClockPort,
        sink: &mut impl EventSink,
    ) {
        for _ in 0..self.drain_limit {
            match transport.recv(self.recv_timeout) {
                Ok(Some(datagram)) => self.route(&datagram, transport, sink),
                Ok(None) => break,
                Err(e) => {
                    warn!("udp: receive failed: {e}");
                    break;
                }
            }
        }

        let mut uplink = Uplink {
            transport,
            master: self.master,
            sink,
        };
        self.device.poll_inputs(&mut uplink);

        let mut timers = TimerDispatch {
            device: &mut self.device,
            indicator: &mut self.indicator,
            led_on: &mut self.led_on,
            uplink,
        };
        self.scheduler.poll(clock.now_ms(), &mut timers);
    }

    /// Handle one inbound datagram: dispatch locally, relay, or drop.
    pub fn route<T: Transport>(&mut self, raw: &str, transport: &mut T, sink: &mut impl EventSink) {
        match self.router.classify(raw) {
            Route::Dispatch { command, via_mesh } => {
                self.dispatch(command, via_mesh, transport, sink);
            }
            Route::Relay(next) => self.relay(next, transport, sink),
            Route::Drop(envelope) => sink.emit(&NodeEvent::TtlExpired(envelope)),
        }
    }

    fn dispatch<T: Transport>(
        &mut self,
        text: &str,
        via_mesh: bool,
        transport: &mut T,
        sink: &mut impl EventSink,
    ) {
        let command = match Command::parse(text) {
            Ok(c) => c,
            Err(e) => {
                sink.emit(&NodeEvent::CommandRejected {
                    text,
                    reason: e.into(),
                });
                return;
            }
        };

        let outcome = {
            let mut uplink = Uplink {
                transport,
                master: self.master,
                sink: &mut *sink,
            };
            self.device.handle(&command, &mut uplink)
        };

        match outcome {
            Outcome::Applied => sink.emit(&NodeEvent::CommandApplied {
                command: &command,
                via_mesh,
            }),
            Outcome::Ignored(reason) => sink.emit(&NodeEvent::CommandIgnored {
                command: &command,
                reason,
            }),
            Outcome::Failed(reason) => sink.emit(&NodeEvent::CommandRejected { text, reason }),
        }
    }

    fn relay<T: Transport>(
        &mut self,
        next: MeshEnvelope<'_>,
        transport: &mut T,
        sink: &mut impl EventSink,
    ) {
        let mut line = Datagram::new();
        if write!(line, "{next}").is_err() {
            sink.emit(&NodeEvent::SendFailed { what: "relay" });
            return;
        }

        let sent = match self.relay_mode {
            RelayMode::Broadcast => transport.broadcast(&line),
            RelayMode::Unicast => {
                transport.send_to(&line, SocketAddrV4::new(next.target, self.mesh_port))
            }
        };
        match sent {
            Ok(()) => sink.emit(&NodeEvent::Relayed(next)),
            Err(e) => {
                warn!("mesh: relay to {} failed: {e}", next.target);
                sink.emit(&NodeEvent::SendFailed { what: "relay" });
            }
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Uplink: StatusSink that sends to the master
// ───────────────────────────────────────────────────────────────

/// Status lines go straight to the master. Best-effort: a failed send is
/// logged and forgotten.
struct Uplink<'a, T: Transport, E: EventSink> {
    transport: &'a mut T,
    master: SocketAddrV4,
    sink: &'a mut E,
}

impl<T: Transport, E: EventSink> StatusSink for Uplink<'_, T, E> {
    fn report(&mut self, status: &StatusReport<'_>) {
        let mut line = Datagram::new();
        if write!(line, "{status}").is_err() {
            self.sink.emit(&NodeEvent::SendFailed { what: "status" });
            return;
        }
        match self.transport.send_to(&line, self.master) {
            Ok(()) => debug!("STATUS | {line}"),
            Err(e) => {
                warn!("udp: status to {} failed: {e}", self.master);
                self.sink.emit(&NodeEvent::SendFailed { what: "status" });
            }
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Timer dispatch (disjoint borrows of the service)
// ───────────────────────────────────────────────────────────────

struct TimerDispatch<'a, D: Device, I: IndicatorPort, T: Transport, E: EventSink> {
    device: &'a mut D,
    indicator: &'a mut I,
    led_on: &'a mut bool,
    uplink: Uplink<'a, T, E>,
}

impl<D, I, T, E> SchedulerDelegate for TimerDispatch<'_, D, I, T, E>
where
    D: Device,
    I: IndicatorPort,
    T: Transport,
    E: EventSink,
{
    fn on_timer(&mut self, timer: TimerId) {
        match timer {
            TimerId::Heartbeat => {
                *self.led_on = !*self.led_on;
                self.indicator.set_indicator(*self.led_on);
            }
            TimerId::ControlTick => self.device.control_tick(),
            TimerId::StatusReport => self.device.status_tick(&mut self.uplink),
        }
    }
}
