//! Node configuration.
//!
//! Identity and role are fixed when the image is built
//! (`MESHNODE_DEVICE_ID`, `MESHNODE_ROLE`, `MESHNODE_HOST_OCTET`,
//! `MESHNODE_RELAY_MODE`); the rest
//! are network and timing constants shared by every node on the mesh.
//! The config is consumed when the service is built and never mutated.

use core::net::{Ipv4Addr, SocketAddrV4};
use core::time::Duration;

use serde::{Deserialize, Serialize};

use crate::app::ports::ConfigError;
use crate::pins::LIGHT_PWM_MAX_DUTY;
use crate::sensors::ldr::ADC_MAX;

/// What the node drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeviceRole {
    /// LDR + PWM dimmer with a closed control loop.
    Light,
    /// Two-state lock with an optional card reader.
    Lock,
}

impl DeviceRole {
    /// `light` / `lock`, case-insensitive.
    pub fn parse(s: &str) -> Option<Self> {
        if s.eq_ignore_ascii_case("light") {
            Some(Self::Light)
        } else if s.eq_ignore_ascii_case("lock") {
            Some(Self::Lock)
        } else {
            None
        }
    }

    /// Role implied by an id such as `lock_207`.
    fn from_device_id(id: &str) -> Self {
        if id.starts_with("lock") {
            Self::Lock
        } else {
            Self::Light
        }
    }
}

impl core::fmt::Display for DeviceRole {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Light => f.write_str("light"),
            Self::Lock => f.write_str("lock"),
        }
    }
}

/// How an envelope for another node is re-emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RelayMode {
    /// Limited broadcast on the mesh port (flood).
    Broadcast,
    /// Straight to the envelope's target on the mesh port.
    Unicast,
}

impl RelayMode {
    /// `broadcast` / `unicast`, case-insensitive.
    pub fn parse(s: &str) -> Option<Self> {
        if s.eq_ignore_ascii_case("broadcast") {
            Some(Self::Broadcast)
        } else if s.eq_ignore_ascii_case("unicast") {
            Some(Self::Unicast)
        } else {
            None
        }
    }
}

pub type DeviceId = heapless::String<32>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeConfig {
    // --- Identity ---
    pub device_id: DeviceId,
    pub role: DeviceRole,
    pub firmware_version: heapless::String<16>,

    // --- Network ---
    /// Where status lines go.
    pub master: SocketAddrV4,
    /// UDP port every node listens and relays on.
    pub mesh_port: u16,
    pub relay_mode: RelayMode,
    /// Last octet of the static address taken after DHCP.
    pub static_host_octet: u8,
    /// Firmware update server (HTTP).
    pub update_server: SocketAddrV4,

    // --- Timing ---
    /// Upper bound on one blocking receive.
    pub recv_timeout_ms: u32,
    /// Datagrams handled per loop iteration before timers run.
    pub drain_limit: usize,
    pub heartbeat_period_ms: u32,
    pub control_period_ms: u32,
    pub status_period_ms: u32,

    // --- Control ---
    pub gain: f32,
    pub pwm_min: u16,
    pub pwm_max: u16,
    /// Raw LDR target used until the first PWM_AUTO.
    pub initial_setpoint: u16,
}

const DEFAULT_DEVICE_ID: &str = "light_207";
const DEFAULT_HOST_OCTET: u8 = 248;
const MASTER_ADDR: Ipv4Addr = Ipv4Addr::new(192, 168, 137, 1);
const MESH_PORT: u16 = 4210;
const UPDATE_PORT: u16 = 5000;

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            device_id: heapless_str(DEFAULT_DEVICE_ID),
            role: DeviceRole::Light,
            firmware_version: heapless_str(env!("CARGO_PKG_VERSION")),

            master: SocketAddrV4::new(MASTER_ADDR, MESH_PORT),
            mesh_port: MESH_PORT,
            relay_mode: RelayMode::Broadcast,
            static_host_octet: DEFAULT_HOST_OCTET,
            update_server: SocketAddrV4::new(MASTER_ADDR, UPDATE_PORT),

            recv_timeout_ms: 10,
            drain_limit: 16,
            heartbeat_period_ms: 1000,
            control_period_ms: 100,
            status_period_ms: 5000,

            gain: 0.5,
            pwm_min: 0,
            pwm_max: 1023,
            initial_setpoint: 500,
        }
    }
}

impl NodeConfig {
    /// Defaults overlaid with the identity baked in at build time.
    pub fn from_build_env() -> Result<Self, ConfigError> {
        let mut cfg = Self::default();

        if let Some(id) = option_env!("MESHNODE_DEVICE_ID") {
            cfg.device_id = DeviceId::try_from(id)
                .map_err(|_| ConfigError::ValidationFailed("device id longer than 32 bytes"))?;
        }

        cfg.role = match option_env!("MESHNODE_ROLE") {
            Some(role) => DeviceRole::parse(role)
                .ok_or(ConfigError::ValidationFailed("MESHNODE_ROLE must be light or lock"))?,
            None => DeviceRole::from_device_id(&cfg.device_id),
        };

        if let Some(octet) = option_env!("MESHNODE_HOST_OCTET") {
            cfg.static_host_octet = octet
                .parse()
                .map_err(|_| ConfigError::ValidationFailed("MESHNODE_HOST_OCTET must be 0-255"))?;
        }

        if let Some(mode) = option_env!("MESHNODE_RELAY_MODE") {
            cfg.relay_mode = RelayMode::parse(mode).ok_or(ConfigError::ValidationFailed(
                "MESHNODE_RELAY_MODE must be broadcast or unicast",
            ))?;
        }

        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.device_id.is_empty() {
            return Err(ConfigError::ValidationFailed("device id is empty"));
        }
        if self.device_id.contains(crate::app::commands::DELIMITER) {
            return Err(ConfigError::ValidationFailed("device id contains ':'"));
        }
        if self.mesh_port == 0 {
            return Err(ConfigError::ValidationFailed("mesh port is zero"));
        }
        if self.recv_timeout_ms == 0
            || self.heartbeat_period_ms == 0
            || self.control_period_ms == 0
            || self.status_period_ms == 0
        {
            return Err(ConfigError::ValidationFailed("period is zero"));
        }
        if self.status_period_ms <= self.control_period_ms {
            return Err(ConfigError::ValidationFailed(
                "status period must be slower than control period",
            ));
        }
        if self.drain_limit == 0 {
            return Err(ConfigError::ValidationFailed("drain limit is zero"));
        }
        if self.pwm_min >= self.pwm_max {
            return Err(ConfigError::ValidationFailed("pwm_min must be below pwm_max"));
        }
        if self.pwm_max > LIGHT_PWM_MAX_DUTY {
            return Err(ConfigError::ValidationFailed("pwm_max above LEDC resolution"));
        }
        if !(self.gain > 0.0 && self.gain <= 10.0) {
            return Err(ConfigError::ValidationFailed("gain outside (0, 10]"));
        }
        if self.initial_setpoint > ADC_MAX {
            return Err(ConfigError::ValidationFailed("setpoint above ADC full scale"));
        }
        Ok(())
    }

    pub fn recv_timeout(&self) -> Duration {
        Duration::from_millis(u64::from(self.recv_timeout_ms))
    }

    /// Destination for relayed envelopes in broadcast mode.
    pub fn broadcast_addr(&self) -> SocketAddrV4 {
        SocketAddrV4::new(Ipv4Addr::BROADCAST, self.mesh_port)
    }
}

/// Truncating conversion for compile-time constants known to fit.
fn heapless_str<const N: usize>(s: &str) -> heapless::String<N> {
    let mut out = heapless::String::new();
    for ch in s.chars() {
        if out.push(ch).is_err() {
            break;
        }
    }
    out
}
