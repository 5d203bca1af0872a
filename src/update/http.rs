//! HTTP firmware source on the ESP-IDF client.

use core::fmt::Write as _;
use core::net::SocketAddrV4;
use core::time::Duration;

use embedded_svc::http::client::Connection as _;
use embedded_svc::http::{Headers as _, Method, Status as _};
use embedded_svc::io::Read as _;
use esp_idf_svc::http::client::{Configuration as HttpClientConfiguration, EspHttpConnection};
use log::{info, warn};

use super::{FirmwareSource, UpdateError};

const TIMEOUT: Duration = Duration::from_secs(15);

type Url = heapless::String<128>;

pub struct HttpFirmwareSource {
    server: SocketAddrV4,
    conn: EspHttpConnection,
}

impl HttpFirmwareSource {
    pub fn new(server: SocketAddrV4) -> Result<Self, UpdateError> {
        let conf = HttpClientConfiguration {
            timeout: Some(TIMEOUT),
            ..Default::default()
        };
        let conn = EspHttpConnection::new(&conf).map_err(|e| {
            warn!("ota: http client init failed: {:?}", e);
            UpdateError::Io
        })?;
        Ok(Self { server, conn })
    }

    /// Issue `GET <path>?deviceId=<id>` and wait for a 200.
    fn get(&mut self, path: &str, device_id: &str) -> Result<(), UpdateError> {
        let mut url = Url::new();
        write!(url, "http://{}{}?deviceId={}", self.server, path, device_id)
            .map_err(|_| UpdateError::Io)?;
        info!("ota: GET {}", url);

        self.conn
            .initiate_request(Method::Get, &url, &[])
            .map_err(|_| UpdateError::Io)?;
        self.conn.initiate_response().map_err(|_| UpdateError::Io)?;

        match self.conn.status() {
            200 => Ok(()),
            status => Err(UpdateError::Http(status)),
        }
    }
}

impl FirmwareSource for HttpFirmwareSource {
    fn fetch_version(&mut self, device_id: &str, buf: &mut [u8]) -> Result<usize, UpdateError> {
        self.get("/version", device_id)?;
        let mut len = 0;
        while len < buf.len() {
            let n = self.read(&mut buf[len..])?;
            if n == 0 {
                break;
            }
            len += n;
        }
        Ok(len)
    }

    fn open_firmware(&mut self, device_id: &str) -> Result<u32, UpdateError> {
        self.get("/firmware", device_id)?;
        self.conn
            .header("Content-Length")
            .or_else(|| self.conn.header("content-length"))
            .and_then(|value| value.trim().parse::<u32>().ok())
            .ok_or(UpdateError::MissingLength)
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, UpdateError> {
        self.conn.read(buf).map_err(|_| UpdateError::Io)
    }
}
