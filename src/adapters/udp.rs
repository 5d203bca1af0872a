//! UDP datagram transport.
//!
//! Implements [`Transport`] over a single `std::net::UdpSocket` bound to
//! the mesh port. ESP-IDF's lwIP exposes BSD sockets through std, so the
//! same code runs on target and on the host.
//!
//! Inbound datagrams longer than [`MAX_DATAGRAM_LEN`] or not valid UTF-8
//! are logged and skipped; they never surface as errors.

use core::net::{Ipv4Addr, SocketAddrV4};
use core::time::Duration;
use std::io::ErrorKind;
use std::net::UdpSocket;

use log::{debug, info, warn};

use crate::app::events::StatusReport;
use crate::app::ports::{Datagram, MAX_DATAGRAM_LEN, StatusSink, Transport};
use crate::error::TransportError;

/// Smallest receive timeout handed to the socket; zero means "block
/// forever" to `set_read_timeout`.
const MIN_RECV_TIMEOUT: Duration = Duration::from_millis(1);

pub struct UdpTransport {
    socket: UdpSocket,
    mesh_port: u16,
    /// One byte over the limit so oversize datagrams are detectable.
    buf: [u8; MAX_DATAGRAM_LEN + 1],
}

impl UdpTransport {
    /// Bind on all interfaces at `mesh_port`.
    pub fn bind(mesh_port: u16) -> Result<Self, TransportError> {
        Self::bind_addr(SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, mesh_port), mesh_port)
    }

    /// Bind at `local` and relay / broadcast on `mesh_port`. `local` may
    /// use port 0 in tests.
    pub fn bind_addr(local: SocketAddrV4, mesh_port: u16) -> Result<Self, TransportError> {
        let socket = UdpSocket::bind(local)?;
        socket.set_broadcast(true)?;
        info!("udp: listening on {}", socket.local_addr()?);
        Ok(Self {
            socket,
            mesh_port,
            buf: [0; MAX_DATAGRAM_LEN + 1],
        })
    }

    pub fn local_port(&self) -> Result<u16, TransportError> {
        Ok(self.socket.local_addr()?.port())
    }

    fn check_len(payload: &str) -> Result<(), TransportError> {
        if payload.len() > MAX_DATAGRAM_LEN {
            return Err(TransportError::Oversized(payload.len()));
        }
        Ok(())
    }
}

impl Transport for UdpTransport {
    type Error = TransportError;

    fn send_to(&mut self, payload: &str, to: SocketAddrV4) -> Result<(), Self::Error> {
        Self::check_len(payload)?;
        self.socket.send_to(payload.as_bytes(), to)?;
        Ok(())
    }

    fn broadcast(&mut self, payload: &str) -> Result<(), Self::Error> {
        self.send_to(payload, SocketAddrV4::new(Ipv4Addr::BROADCAST, self.mesh_port))
    }

    /// Next valid datagram, or `None` once the socket stays quiet for
    /// `timeout`. Malformed datagrams are consumed and the read goes on,
    /// so a skipped one never reads as "nothing pending".
    fn recv(&mut self, timeout: Duration) -> Result<Option<Datagram>, Self::Error> {
        self.socket.set_read_timeout(Some(timeout.max(MIN_RECV_TIMEOUT)))?;

        loop {
            let (len, from) = match self.socket.recv_from(&mut self.buf) {
                Ok(received) => received,
                Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {
                    return Ok(None);
                }
                Err(e) => return Err(e.into()),
            };

            if len > MAX_DATAGRAM_LEN {
                warn!("udp: dropped oversize datagram from {}", from);
                continue;
            }
            let Ok(text) = core::str::from_utf8(&self.buf[..len]) else {
                warn!("udp: dropped non-UTF-8 datagram from {}", from);
                continue;
            };
            debug!("udp: {} bytes from {}", len, from);
            // Fits: len <= MAX_DATAGRAM_LEN was checked above.
            return Ok(Datagram::try_from(text).ok());
        }
    }
}

/// [`StatusSink`] that sends every line to the master. Used outside the
/// main loop (firmware update progress), where no service is running yet.
pub struct MasterReporter<'a, T: Transport> {
    transport: &'a mut T,
    master: SocketAddrV4,
}

impl<'a, T: Transport> MasterReporter<'a, T> {
    pub fn new(transport: &'a mut T, master: SocketAddrV4) -> Self {
        Self { transport, master }
    }
}

impl<T: Transport> StatusSink for MasterReporter<'_, T> {
    fn report(&mut self, status: &StatusReport<'_>) {
        let mut line = Datagram::new();
        if core::fmt::Write::write_fmt(&mut line, format_args!("{status}")).is_err() {
            return;
        }
        if let Err(e) = self.transport.send_to(&line, self.master) {
            warn!("udp: report to {} failed: {}", self.master, e);
        }
    }
}
