//! Application core: pure domain logic, zero I/O.
//!
//! Command tokenizing, status formatting and the cooperative node loop.
//! All interaction with hardware and the network happens through the
//! **port traits** in [`ports`], so this layer runs unchanged against
//! mock adapters.

pub mod commands;
pub mod events;
pub mod ports;
pub mod service;
