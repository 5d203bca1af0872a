//! WiFi station-mode adapter.
//!
//! Implements [`ConnectivityPort`]. The node first joins with DHCP to
//! learn the gateway and netmask, then rejoins with a fixed address on
//! that subnet (`<network>.<static_host_octet>`) so the master can address
//! it directly.
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`**: real ESP-IDF WiFi driver via `esp_idf_svc::wifi`.
//! - **all other targets**: simulation that hands out an address on
//!   `192.168.137.0/24`.

use core::fmt;
use core::net::Ipv4Addr;
use log::{error, info};

#[cfg(target_os = "espidf")]
use esp_idf_svc::{
    eventloop::EspSystemEventLoop,
    ipv4::{
        ClientConfiguration as IpClientConfiguration, ClientSettings as IpClientSettings,
        Configuration as IpConfiguration, Subnet,
    },
    netif::{EspNetif, NetifConfiguration},
    wifi::{AuthMethod, BlockingWifi, ClientConfiguration, Configuration, EspWifi},
};

#[cfg(target_os = "espidf")]
use log::warn;

// ───────────────────────────────────────────────────────────────
// Port trait
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectivityError {
    NoCredentials,
    InvalidSsid,
    InvalidPassword,
    ConnectionFailed,
    /// DHCP lease did not carry a usable gateway.
    NoGateway,
}

impl fmt::Display for ConnectivityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoCredentials => write!(f, "no WiFi credentials configured"),
            Self::InvalidSsid => write!(f, "SSID invalid (must be 1-32 printable ASCII bytes)"),
            Self::InvalidPassword => write!(f, "password invalid (must be 8-64 bytes for WPA2, or empty for open)"),
            Self::ConnectionFailed => write!(f, "WiFi connection failed"),
            Self::NoGateway => write!(f, "DHCP lease has no gateway"),
        }
    }
}

pub trait ConnectivityPort {
    /// Join the network and return the node's (static) address.
    fn connect(&mut self) -> Result<Ipv4Addr, ConnectivityError>;
    fn is_connected(&self) -> bool;
    fn set_credentials(&mut self, ssid: &str, password: &str) -> Result<(), ConnectivityError>;
}

// ───────────────────────────────────────────────────────────────
// Connection state
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WifiState {
    Disconnected,
    Connecting,
    Connected(Ipv4Addr),
    Failed,
}

// ───────────────────────────────────────────────────────────────
// Validation
// ───────────────────────────────────────────────────────────────

fn is_printable_ascii(s: &str) -> bool {
    s.bytes().all(|b| (0x20..=0x7E).contains(&b))
}

fn validate_ssid(ssid: &str) -> Result<(), ConnectivityError> {
    if ssid.is_empty() || ssid.len() > 32 || !is_printable_ascii(ssid) {
        return Err(ConnectivityError::InvalidSsid);
    }
    Ok(())
}

fn validate_password(password: &str) -> Result<(), ConnectivityError> {
    if password.is_empty() {
        return Ok(());
    }
    if password.len() < 8 || password.len() > 64 {
        return Err(ConnectivityError::InvalidPassword);
    }
    Ok(())
}

/// `gateway` with its host octet replaced, e.g. `192.168.137.1` + 248
/// gives `192.168.137.248`. Assumes a /24, which is what the access point
/// hands out.
pub fn static_address(gateway: Ipv4Addr, host_octet: u8) -> Ipv4Addr {
    let [a, b, c, _] = gateway.octets();
    Ipv4Addr::new(a, b, c, host_octet)
}

// ───────────────────────────────────────────────────────────────
// WiFi adapter
// ───────────────────────────────────────────────────────────────

pub struct WifiAdapter {
    state: WifiState,
    ssid: heapless::String<32>,
    password: heapless::String<64>,
    static_host_octet: u8,
    #[cfg(target_os = "espidf")]
    wifi: EspWifi<'static>,
    #[cfg(target_os = "espidf")]
    sys_loop: EspSystemEventLoop,
}

impl WifiAdapter {
    #[cfg(target_os = "espidf")]
    pub fn new(wifi: EspWifi<'static>, sys_loop: EspSystemEventLoop, static_host_octet: u8) -> Self {
        Self {
            state: WifiState::Disconnected,
            ssid: heapless::String::new(),
            password: heapless::String::new(),
            static_host_octet,
            wifi,
            sys_loop,
        }
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn new(static_host_octet: u8) -> Self {
        Self {
            state: WifiState::Disconnected,
            ssid: heapless::String::new(),
            password: heapless::String::new(),
            static_host_octet,
        }
    }

    /// Load credentials baked in at build time
    /// (`MESHNODE_WIFI_SSID` / `MESHNODE_WIFI_PASS`).
    pub fn with_build_credentials(mut self) -> Result<Self, ConnectivityError> {
        let ssid = option_env!("MESHNODE_WIFI_SSID").ok_or(ConnectivityError::NoCredentials)?;
        let password = option_env!("MESHNODE_WIFI_PASS").unwrap_or("");
        self.set_credentials(ssid, password)?;
        Ok(self)
    }

    pub fn state(&self) -> WifiState {
        self.state
    }

    // ── Platform-specific ─────────────────────────────────────

    #[cfg(target_os = "espidf")]
    fn join(&mut self) -> Result<(), ConnectivityError> {
        let auth_method = if self.password.is_empty() {
            AuthMethod::None
        } else {
            AuthMethod::WPAWPA2Personal
        };
        let client = ClientConfiguration {
            ssid: self
                .ssid
                .as_str()
                .try_into()
                .map_err(|_| ConnectivityError::InvalidSsid)?,
            password: self
                .password
                .as_str()
                .try_into()
                .map_err(|_| ConnectivityError::InvalidPassword)?,
            auth_method,
            ..Default::default()
        };

        let mut wifi = BlockingWifi::wrap(&mut self.wifi, self.sys_loop.clone())
            .map_err(|_| ConnectivityError::ConnectionFailed)?;
        wifi.set_configuration(&Configuration::Client(client))
            .map_err(|_| ConnectivityError::ConnectionFailed)?;
        if !wifi.is_started().unwrap_or(false) {
            wifi.start().map_err(|_| ConnectivityError::ConnectionFailed)?;
        }
        wifi.connect().map_err(|e| {
            warn!("WiFi: connect failed: {:?}", e);
            ConnectivityError::ConnectionFailed
        })?;
        wifi.wait_netif_up()
            .map_err(|_| ConnectivityError::ConnectionFailed)?;
        Ok(())
    }

    #[cfg(target_os = "espidf")]
    fn platform_connect(&mut self) -> Result<Ipv4Addr, ConnectivityError> {
        // Pass 1: DHCP, only to learn the subnet.
        self.join()?;
        let lease = self
            .wifi
            .sta_netif()
            .get_ip_info()
            .map_err(|_| ConnectivityError::ConnectionFailed)?;
        let gateway = lease.subnet.gateway;
        if gateway.is_unspecified() {
            return Err(ConnectivityError::NoGateway);
        }
        let ip = static_address(gateway, self.static_host_octet);
        info!("WiFi: DHCP gave {} via {}, switching to {}", lease.ip, gateway, ip);

        if let Err(e) = self.wifi.disconnect() {
            warn!("WiFi: disconnect before static rejoin failed: {:?}", e);
        }

        // Pass 2: fixed address on the same subnet.
        let mut conf = NetifConfiguration::wifi_default_client();
        conf.ip_configuration = Some(IpConfiguration::Client(IpClientConfiguration::Fixed(
            IpClientSettings {
                ip,
                subnet: Subnet {
                    gateway,
                    mask: lease.subnet.mask,
                },
                dns: lease.dns,
                secondary_dns: lease.secondary_dns,
            },
        )));
        let netif = EspNetif::new_with_conf(&conf).map_err(|_| ConnectivityError::ConnectionFailed)?;
        self.wifi
            .swap_netif_sta(netif)
            .map_err(|_| ConnectivityError::ConnectionFailed)?;

        self.join()?;
        Ok(ip)
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_connect(&mut self) -> Result<Ipv4Addr, ConnectivityError> {
        let gateway = Ipv4Addr::new(192, 168, 137, 1);
        let ip = static_address(gateway, self.static_host_octet);
        info!("WiFi(sim): joined '{}' as {}", self.ssid, ip);
        Ok(ip)
    }

    #[cfg(target_os = "espidf")]
    fn platform_is_connected(&self) -> bool {
        self.wifi.is_connected().unwrap_or(false)
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_is_connected(&self) -> bool {
        matches!(self.state, WifiState::Connected(_))
    }
}

// ───────────────────────────────────────────────────────────────
// ConnectivityPort
// ───────────────────────────────────────────────────────────────

impl ConnectivityPort for WifiAdapter {
    fn connect(&mut self) -> Result<Ipv4Addr, ConnectivityError> {
        if self.ssid.is_empty() {
            return Err(ConnectivityError::NoCredentials);
        }

        info!("WiFi: connecting to '{}'", self.ssid);
        self.state = WifiState::Connecting;

        match self.platform_connect() {
            Ok(ip) => {
                self.state = WifiState::Connected(ip);
                info!("WiFi: connected as {}", ip);
                Ok(ip)
            }
            Err(e) => {
                error!("WiFi: connection failed: {}", e);
                self.state = WifiState::Failed;
                Err(e)
            }
        }
    }

    fn is_connected(&self) -> bool {
        self.platform_is_connected()
    }

    fn set_credentials(&mut self, ssid: &str, password: &str) -> Result<(), ConnectivityError> {
        validate_ssid(ssid)?;
        validate_password(password)?;
        self.ssid.clear();
        self.ssid.push_str(ssid).map_err(|_| ConnectivityError::InvalidSsid)?;
        self.password.clear();
        self.password.push_str(password).map_err(|_| ConnectivityError::InvalidPassword)?;
        info!("WiFi: credentials updated (SSID='{}')", self.ssid);
        Ok(())
    }
}

// ───────────────────────────────────────────────────────────────
// Tests
// ───────────────────────────────────────────────────────────────
