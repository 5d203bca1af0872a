//! OTA partition writer, backed by the `esp-ota` crate.
//!
//! Flow: `begin(size)` → N × `write_chunk` → `finalize` → reboot
//!
//! Chunks must arrive in order; the image is only marked bootable once
//! exactly `size` bytes have been written.

use core::fmt;
use log::{info, warn};

const MAX_FIRMWARE_SIZE: u32 = 4 * 1024 * 1024; // 4 MB

// ── Error type ────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OtaError {
    AlreadyInProgress,
    InvalidSize,
    BeginFailed,
    WriteFailed,
    VerifyFailed,
    BootSetFailed,
    IncompleteTransfer,
    NotReceiving,
    NonSequential,
    Overflow,
}

impl fmt::Display for OtaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlreadyInProgress => write!(f, "OTA session already in progress"),
            Self::InvalidSize => write!(f, "firmware size out of range (max 4 MB)"),
            Self::BeginFailed => write!(f, "OTA begin failed"),
            Self::WriteFailed => write!(f, "OTA write failed"),
            Self::VerifyFailed => write!(f, "OTA image verification failed"),
            Self::BootSetFailed => write!(f, "set boot partition failed"),
            Self::IncompleteTransfer => write!(f, "finalize called before all bytes written"),
            Self::NotReceiving => write!(f, "no OTA session is receiving"),
            Self::NonSequential => write!(f, "chunk offset does not match bytes written"),
            Self::Overflow => write!(f, "chunk would exceed declared firmware size"),
        }
    }
}

// ── State machine ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OtaState {
    Idle,
    Receiving {
        expected_size: u32,
        bytes_written: u32,
    },
    Verifying,
    ReadyToReboot,
    Failed,
}

/// OTA firmware update manager.
///
/// On ESP-IDF targets the `esp-ota` crate owns the inactive partition.
/// Elsewhere only the state machine runs, which is what host tests need.
pub struct OtaManager {
    state: OtaState,
    #[cfg(target_os = "espidf")]
    ota_update: Option<esp_ota::OtaUpdate>,
}

impl OtaManager {
    pub fn new() -> Self {
        Self {
            state: OtaState::Idle,
            #[cfg(target_os = "espidf")]
            ota_update: None,
        }
    }

    pub fn state(&self) -> OtaState {
        self.state
    }

    /// Begin a session for an image of `firmware_size` bytes and open the
    /// inactive partition.
    pub fn begin(&mut self, firmware_size: u32) -> Result<(), OtaError> {
        if matches!(self.state, OtaState::Receiving { .. } | OtaState::Verifying) {
            return Err(OtaError::AlreadyInProgress);
        }
        if firmware_size == 0 || firmware_size > MAX_FIRMWARE_SIZE {
            return Err(OtaError::InvalidSize);
        }

        #[cfg(target_os = "espidf")]
        {
            let update = esp_ota::OtaUpdate::begin().map_err(|e| {
                warn!("ota: esp-ota begin failed: {:?}", e);
                OtaError::BeginFailed
            })?;
            self.ota_update = Some(update);
        }

        self.state = OtaState::Receiving {
            expected_size: firmware_size,
            bytes_written: 0,
        };
        info!("ota: begin ({} bytes)", firmware_size);
        Ok(())
    }

    /// Write a chunk at byte `offset`. Returns total bytes written.
    pub fn write_chunk(&mut self, offset: u32, data: &[u8]) -> Result<u32, OtaError> {
        let OtaState::Receiving {
            expected_size,
            bytes_written,
        } = self.state
        else {
            return Err(OtaError::NotReceiving);
        };

        if offset != bytes_written {
            return Err(OtaError::NonSequential);
        }
        let new_written = u32::try_from(data.len())
            .ok()
            .and_then(|len| bytes_written.checked_add(len))
            .filter(|&total| total <= expected_size)
            .ok_or(OtaError::Overflow)?;

        #[cfg(target_os = "espidf")]
        {
            let Some(update) = self.ota_update.as_mut() else {
                return Err(OtaError::NotReceiving);
            };
            if let Err(e) = update.write(data) {
                warn!("ota: esp-ota write failed: {:?}", e);
                self.abort();
                return Err(OtaError::WriteFailed);
            }
        }

        self.state = OtaState::Receiving {
            expected_size,
            bytes_written: new_written,
        };
        Ok(new_written)
    }

    /// Percent of the declared image written so far (0 outside a session).
    pub fn progress_percent(&self) -> u8 {
        match self.state {
            OtaState::Receiving {
                expected_size,
                bytes_written,
            } if expected_size > 0 => {
                (u64::from(bytes_written) * 100 / u64::from(expected_size)) as u8
            }
            OtaState::Verifying | OtaState::ReadyToReboot => 100,
            _ => 0,
        }
    }

    /// Verify the image and mark its partition bootable.
    pub fn finalize(&mut self) -> Result<(), OtaError> {
        match self.state {
            OtaState::Receiving {
                expected_size,
                bytes_written,
            } if bytes_written == expected_size => {}
            OtaState::Receiving { .. } => return Err(OtaError::IncompleteTransfer),
            _ => return Err(OtaError::NotReceiving),
        }

        self.state = OtaState::Verifying;

        #[cfg(target_os = "espidf")]
        {
            let Some(update) = self.ota_update.take() else {
                self.state = OtaState::Failed;
                return Err(OtaError::NotReceiving);
            };
            let mut completed = update.finalize().map_err(|e| {
                warn!("ota: esp-ota finalize failed: {:?}", e);
                self.state = OtaState::Failed;
                OtaError::VerifyFailed
            })?;
            completed.set_as_boot_partition().map_err(|e| {
                warn!("ota: set_as_boot_partition failed: {:?}", e);
                self.state = OtaState::Failed;
                OtaError::BootSetFailed
            })?;
        }

        self.state = OtaState::ReadyToReboot;
        info!("ota: finalized, ready to reboot");
        Ok(())
    }

    /// Drop the session; the partially written partition is discarded.
    pub fn abort(&mut self) {
        #[cfg(target_os = "espidf")]
        {
            // esp-ota aborts when OtaUpdate is dropped
            self.ota_update.take();
        }
        self.state = OtaState::Idle;
        warn!("ota: aborted");
    }

    /// Reset into the newly flashed firmware.
    #[cfg(target_os = "espidf")]
    pub fn reboot(&self) -> ! {
        info!("ota: rebooting into new firmware");
        esp_idf_svc::hal::reset::restart()
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn reboot(&self) -> ! {
        info!("ota(sim): reboot requested, exiting");
        std::process::exit(0)
    }
}

impl Default for OtaManager {
    fn default() -> Self {
        Self::new()
    }
}

// ── Boot validation ───────────────────────────────────────────

/// Mark the running image valid.
///
/// Without this, the bootloader reverts to the previous image on the next
/// reset after an update.
#[cfg(target_os = "espidf")]
pub fn check_rollback() {
    match esp_ota::mark_app_valid() {
        Ok(()) => info!("ota: firmware marked valid (rollback cancelled)"),
        Err(e) => warn!("ota: mark_app_valid failed: {:?}", e),
    }
}

#[cfg(not(target_os = "espidf"))]
pub fn check_rollback() {
    info!("ota(sim): rollback check skipped");
}

// ── Tests ─────────────────────────────────────────────────────
