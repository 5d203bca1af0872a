//! Firmware-update collaborator.
//!
//! Runs once at startup, before the node joins the mesh loop:
//!
//! ```text
//!   GET /version?deviceId=<id>   → {"version":"x.y.z"}
//!   (differs from running?)      → GET /firmware?deviceId=<id>
//!                                → OtaManager: begin → chunks → finalize
//!                                → OTA_PROGRESS:<id>:<pct> to the master
//!                                → caller restarts
//! ```
//!
//! The HTTP side sits behind [`FirmwareSource`] so the whole flow runs on
//! the host against an in-memory image.

use core::fmt;

use log::{info, warn};
use serde::Deserialize;

use crate::app::events::{StatusBody, StatusReport};
use crate::app::ports::StatusSink;

#[cfg(target_os = "espidf")]
pub mod http;
pub mod ota;

pub use ota::{OtaError, OtaManager, OtaState, check_rollback};

/// Bytes copied from the source to flash per step.
const CHUNK_LEN: usize = 1024;
const VERSION_BODY_MAX: usize = 128;

pub type Version = heapless::String<16>;

// ── Errors ────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateError {
    /// Server answered with a non-200 status.
    Http(u16),
    /// Connection or read failure.
    Io,
    /// Firmware response carried no usable Content-Length.
    MissingLength,
    /// Version response was not `{"version":"..."}`.
    BadPayload,
    /// Body ended before the declared length.
    Truncated { expected: u32, received: u32 },
    Ota(OtaError),
}

impl fmt::Display for UpdateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Http(status) => write!(f, "HTTP status {status}"),
            Self::Io => write!(f, "connection error"),
            Self::MissingLength => write!(f, "missing Content-Length"),
            Self::BadPayload => write!(f, "malformed version payload"),
            Self::Truncated { expected, received } => {
                write!(f, "body truncated at {received} of {expected} bytes")
            }
            Self::Ota(e) => write!(f, "ota: {e}"),
        }
    }
}

impl From<OtaError> for UpdateError {
    fn from(e: OtaError) -> Self {
        Self::Ota(e)
    }
}

// ── Version check ─────────────────────────────────────────────

#[derive(Deserialize)]
struct VersionInfo {
    version: Version,
}

/// Extract the offered version from the server's JSON body.
pub fn parse_version_payload(body: &[u8]) -> Result<Version, UpdateError> {
    let info: VersionInfo = serde_json::from_slice(body).map_err(|_| UpdateError::BadPayload)?;
    if info.version.trim().is_empty() {
        return Err(UpdateError::BadPayload);
    }
    Ok(info.version)
}

/// Any offered version other than the running one is installed; the
/// server decides what is newer.
pub fn needs_update(running: &str, offered: &str) -> bool {
    offered.trim() != running.trim()
}

// ── Source port ───────────────────────────────────────────────

/// Where version metadata and the firmware image come from.
pub trait FirmwareSource {
    /// Fetch the version document into `buf`; returns its length.
    fn fetch_version(&mut self, device_id: &str, buf: &mut [u8]) -> Result<usize, UpdateError>;

    /// Start the image download; returns its declared length.
    fn open_firmware(&mut self, device_id: &str) -> Result<u32, UpdateError>;

    /// Next slice of the image; `Ok(0)` at end of body.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, UpdateError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    UpToDate,
    /// A new image is bootable; the caller should restart.
    Installed { bytes: u32 },
}

/// Check the server and install a different image if one is offered.
///
/// Progress lines go to `progress` each time the whole-percent value
/// changes. On any failure the session is aborted and the running image
/// stays bootable.
pub fn check_for_update<S: FirmwareSource>(
    source: &mut S,
    ota: &mut OtaManager,
    device_id: &str,
    running_version: &str,
    progress: &mut dyn StatusSink,
) -> Result<UpdateOutcome, UpdateError> {
    let mut body = [0u8; VERSION_BODY_MAX];
    let len = source.fetch_version(device_id, &mut body)?;
    let offered = parse_version_payload(&body[..len])?;

    if !needs_update(running_version, &offered) {
        info!("ota: running {} is current", running_version);
        return Ok(UpdateOutcome::UpToDate);
    }
    info!("ota: server offers {} (running {})", offered, running_version);

    let total = source.open_firmware(device_id)?;
    if total == 0 {
        return Err(UpdateError::MissingLength);
    }
    ota.begin(total)?;

    if let Err(e) = stream_image(source, ota, device_id, total, progress) {
        warn!("ota: download failed: {}", e);
        ota.abort();
        return Err(e);
    }
    ota.finalize()?;
    Ok(UpdateOutcome::Installed { bytes: total })
}

fn stream_image<S: FirmwareSource>(
    source: &mut S,
    ota: &mut OtaManager,
    device_id: &str,
    total: u32,
    progress: &mut dyn StatusSink,
) -> Result<(), UpdateError> {
    let mut chunk = [0u8; CHUNK_LEN];
    let mut written = 0u32;
    let mut last_pct = None;

    while written < total {
        let n = source.read(&mut chunk)?;
        if n == 0 {
            return Err(UpdateError::Truncated {
                expected: total,
                received: written,
            });
        }
        written = ota.write_chunk(written, &chunk[..n])?;

        let pct = ota.progress_percent();
        if last_pct != Some(pct) {
            last_pct = Some(pct);
            progress.report(&StatusReport::new(device_id, StatusBody::UpdateProgress(pct)));
        }
    }
    Ok(())
}
