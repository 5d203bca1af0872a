//! Unified error types for the mesh node firmware.
//!
//! One `Error` enum that every subsystem converts into, so the service
//! layer can report a rejected command through a single event variant.
//! All variants are `Copy`: they travel through the event sink and the
//! log without allocation.

use core::fmt;

use crate::app::ports::{ConfigError, StorageError};
use crate::update::UpdateError;

// ---------------------------------------------------------------------------
// Top-level firmware error
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// Inbound text could not be tokenized into a command.
    Protocol(ProtocolError),
    /// A calibration update was rejected or could not be persisted.
    Calibration(CalibrationError),
    /// The datagram transport failed.
    Transport(TransportError),
    /// Persistent storage failed.
    Storage(StorageError),
    /// Configuration is invalid.
    Config(ConfigError),
    /// The startup firmware update failed; the running image is kept.
    Update(UpdateError),
    /// Peripheral initialisation failed.
    Init(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Protocol(e) => write!(f, "protocol: {e}"),
            Self::Calibration(e) => write!(f, "calibration: {e}"),
            Self::Transport(e) => write!(f, "transport: {e}"),
            Self::Storage(e) => write!(f, "storage: {e}"),
            Self::Config(e) => write!(f, "config: {e}"),
            Self::Update(e) => write!(f, "update: {e}"),
            Self::Init(msg) => write!(f, "init: {msg}"),
        }
    }
}

impl From<StorageError> for Error {
    fn from(e: StorageError) -> Self {
        Self::Storage(e)
    }
}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

// ---------------------------------------------------------------------------
// Protocol errors
// ---------------------------------------------------------------------------

/// Malformed command text. Never fatal: the datagram is dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolError {
    /// Datagram was empty or whitespace only.
    Empty,
    /// The leading token names no known command.
    UnknownCommand,
    /// A required field was absent.
    MissingField(&'static str),
    /// A numeric field failed to parse.
    InvalidNumber(&'static str),
    /// `CAL` carried a coefficient count other than `degree + 1`.
    CoefficientCount { expected: usize, found: usize },
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "empty command"),
            Self::UnknownCommand => write!(f, "unknown command"),
            Self::MissingField(field) => write!(f, "missing field '{field}'"),
            Self::InvalidNumber(field) => write!(f, "field '{field}' is not a number"),
            Self::CoefficientCount { expected, found } => {
                write!(f, "expected {expected} coefficients, found {found}")
            }
        }
    }
}

impl From<ProtocolError> for Error {
    fn from(e: ProtocolError) -> Self {
        Self::Protocol(e)
    }
}

// ---------------------------------------------------------------------------
// Calibration errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalibrationError {
    /// Polynomial degree outside 1..=3; the previous model is retained.
    InvalidDegree(u8),
    /// Fewer than `degree + 1` coefficients were supplied.
    MissingCoefficients { expected: usize, found: usize },
    /// The model was updated in RAM but the storage write failed.
    Persist(StorageError),
}

impl fmt::Display for CalibrationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidDegree(d) => write!(f, "degree {d} outside 1..=3"),
            Self::MissingCoefficients { expected, found } => {
                write!(f, "need {expected} coefficients, got {found}")
            }
            Self::Persist(e) => write!(f, "persist failed: {e}"),
        }
    }
}

impl From<CalibrationError> for Error {
    fn from(e: CalibrationError) -> Self {
        Self::Calibration(e)
    }
}

// ---------------------------------------------------------------------------
// Transport errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportError {
    /// Socket-level I/O failure.
    Io(std::io::ErrorKind),
    /// Payload exceeds the datagram buffer.
    Oversized(usize),
    /// Received bytes are not valid UTF-8 text.
    InvalidUtf8,
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(kind) => write!(f, "I/O error: {kind}"),
            Self::Oversized(len) => write!(f, "payload of {len} bytes exceeds datagram limit"),
            Self::InvalidUtf8 => write!(f, "datagram is not valid UTF-8"),
        }
    }
}

impl From<std::io::Error> for TransportError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e.kind())
    }
}

impl From<TransportError> for Error {
    fn from(e: TransportError) -> Self {
        Self::Transport(e)
    }
}

impl From<UpdateError> for Error {
    fn from(e: UpdateError) -> Self {
        Self::Update(e)
    }
}

/// Firmware-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
