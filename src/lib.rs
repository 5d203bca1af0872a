//! MeshNode firmware library.
//!
//! Exposes the pure-logic modules for integration testing. All
//! ESP-IDF-specific code is guarded by `#[cfg(target_os = "espidf")]`
//! within each module, so the whole crate builds and tests on the host.

#![deny(unused_must_use)]

pub mod adapters;
pub mod app;
pub mod config;
pub mod control;
pub mod device;
pub mod drivers;
pub mod error;
pub mod mesh;
pub mod pins;
pub mod scheduler;
pub mod sensors;
pub mod update;
