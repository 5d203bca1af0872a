//! Port traits: the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ NodeService / Device (domain)
//! ```
//!
//! Driven adapters (datagram socket, LDR, PWM, lock relay, NVS, clock)
//! implement these traits. The domain consumes them via generics, so the
//! router, control loop and lock state machine never touch hardware
//! directly and run unchanged against the mocks in `tests/`.

use core::net::SocketAddrV4;
use core::time::Duration;

use super::events::{NodeEvent, StatusReport};

// ───────────────────────────────────────────────────────────────
// Datagram transport (driven adapter: domain ↔ network)
// ───────────────────────────────────────────────────────────────

/// Largest datagram the node accepts or emits, in bytes.
pub const MAX_DATAGRAM_LEN: usize = 255;

/// One inbound datagram, already validated as UTF-8 text.
pub type Datagram = heapless::String<MAX_DATAGRAM_LEN>;

/// Connectionless text transport.
///
/// Sends are best-effort: there is no acknowledgment or retry. A receive
/// that times out is `Ok(None)`, never an error.
pub trait Transport {
    /// Error type for this transport.
    type Error: core::fmt::Debug + core::fmt::Display;

    /// Unicast `payload` to `to`.
    fn send_to(&mut self, payload: &str, to: SocketAddrV4) -> Result<(), Self::Error>;

    /// Broadcast `payload` to every node on the mesh port.
    fn broadcast(&mut self, payload: &str) -> Result<(), Self::Error>;

    /// Wait up to `timeout` for one datagram.
    fn recv(&mut self, timeout: Duration) -> Result<Option<Datagram>, Self::Error>;
}

// ───────────────────────────────────────────────────────────────
// Light hardware (sensor + actuator)
// ───────────────────────────────────────────────────────────────

/// Read-side port for the light-dependent resistor.
pub trait LightSensorPort {
    /// Raw ADC reading, 0..=1023.
    fn read_raw(&mut self) -> u16;
}

/// Write-side port for the dimmer output.
pub trait PwmPort {
    /// Apply `duty` (already clamped by the caller).
    fn set_duty(&mut self, duty: u16);
}

// ───────────────────────────────────────────────────────────────
// Lock hardware
// ───────────────────────────────────────────────────────────────

/// Write-side port for the lock solenoid / relay.
pub trait LockActuatorPort {
    /// Drive the bolt to the locked position.
    fn engage(&mut self);

    /// Drive the bolt to the unlocked position.
    fn release(&mut self);
}

/// Fixed-capacity card UID (MIFARE UIDs are 4, 7 or 10 bytes).
pub type CardUid = heapless::Vec<u8, 10>;

/// Read-side port for the RFID reader attached to lock nodes.
pub trait CardReaderPort {
    /// Return the UID of a newly presented card, if any.
    fn poll_card(&mut self) -> Option<CardUid>;
}

// ───────────────────────────────────────────────────────────────
// Board indicator
// ───────────────────────────────────────────────────────────────

/// On-board status LED used as a liveness heartbeat.
pub trait IndicatorPort {
    fn set_indicator(&mut self, on: bool);
}

// ───────────────────────────────────────────────────────────────
// Clock
// ───────────────────────────────────────────────────────────────

/// Monotonic millisecond clock. Injected so timing is testable.
pub trait ClockPort {
    fn now_ms(&self) -> u64;
}

// ───────────────────────────────────────────────────────────────
// Outbound sinks
// ───────────────────────────────────────────────────────────────

/// Destination for status lines addressed to the master.
pub trait StatusSink {
    fn report(&mut self, status: &StatusReport<'_>);
}

/// The domain emits structured [`NodeEvent`]s through this port.
/// Adapters decide where they go (serial log, test recorder).
pub trait EventSink {
    fn emit(&mut self, event: &NodeEvent<'_>);
}

// ───────────────────────────────────────────────────────────────
// Scheduler delegate (decouples scheduler from the device)
// ───────────────────────────────────────────────────────────────

/// Identity of the fixed-interval timers polled by the main loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerId {
    /// Board LED heartbeat.
    Heartbeat,
    /// Control-loop adjustment.
    ControlTick,
    /// Status report to the master.
    StatusReport,
}

/// Callback the [`Scheduler`](crate::scheduler::Scheduler) invokes when a
/// timer is due. The scheduler itself knows nothing about devices or
/// transports.
pub trait SchedulerDelegate {
    fn on_timer(&mut self, timer: TimerId);
}

// ───────────────────────────────────────────────────────────────
// Storage port (driven adapter: domain ↔ NVS / flash)
// ───────────────────────────────────────────────────────────────

/// Persistent key-value storage.
///
/// Write operations MUST be complete before returning: the calibration
/// record is read back by the next boot, and no other writer exists.
pub trait StoragePort {
    /// Read a value. Returns the number of bytes written to `buf`.
    fn read(&self, namespace: &str, key: &str, buf: &mut [u8]) -> Result<usize, StorageError>;

    /// Write a value and commit it.
    fn write(&mut self, namespace: &str, key: &str, data: &[u8]) -> Result<(), StorageError>;

    /// Delete a key. Returns `Ok(())` even if the key didn't exist.
    fn delete(&mut self, namespace: &str, key: &str) -> Result<(), StorageError>;

    /// Check whether a key exists without reading it.
    fn exists(&self, namespace: &str, key: &str) -> bool;
}

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

/// Errors from configuration validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// A config field failed range validation.
    /// The `&'static str` describes which field and why.
    ValidationFailed(&'static str),
}

/// Errors from [`StoragePort`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageError {
    /// Requested key does not exist.
    NotFound,
    /// Storage partition is full.
    Full,
    /// Stored bytes failed to deserialize.
    Corrupted,
    /// Generic I/O error.
    IoError,
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::ValidationFailed(msg) => write!(f, "validation failed: {}", msg),
        }
    }
}

impl core::fmt::Display for StorageError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotFound => write!(f, "key not found"),
            Self::Full => write!(f, "storage full"),
            Self::Corrupted => write!(f, "stored value corrupted"),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}
