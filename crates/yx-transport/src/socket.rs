//! The external datagram socket contract (spec §6).
//!
//! This is the one named external collaborator this engine actually ships
//! an implementation for: bind to `(0.0.0.0, port)`, enable address/port
//! reuse and broadcast, send a single datagram, receive a single datagram
//! yielding `(bytes, peer_address)`. Everything upstream of this trait
//! (framing, crypto, reassembly) is transport-agnostic; `yx-harness` swaps
//! in a fault-injecting implementation of the same trait for deterministic
//! testing.

use std::net::{SocketAddr, UdpSocket};

use socket2::{Domain, Protocol, Socket, Type};

use crate::error::{Result, TransportError};

/// Largest possible UDP payload (65535 minus the 8-byte UDP header), used
/// to size receive buffers so a single `recv_from` always captures a
/// whole datagram.
pub const MAX_DATAGRAM_SIZE: usize = 65_507;

/// Default port the engine binds to and sends broadcasts on.
pub const DEFAULT_PORT: u16 = 50_000;

/// Default broadcast destination.
pub const DEFAULT_BROADCAST_ADDRESS: &str = "255.255.255.255";

/// A single-datagram-at-a-time socket. Implemented by [`UdpDatagramSocket`]
/// for production use and by a fault-injecting socket in `yx-harness` for
/// deterministic simulation.
pub trait DatagramSocket: Send + Sync {
    /// Send `buf` as one datagram to `dest`.
    fn send_to(&self, buf: &[u8], dest: SocketAddr) -> Result<usize>;

    /// Block until one datagram arrives, writing it into `buf` and
    /// returning its length and the sender's address.
    fn recv_from(&self, buf: &mut [u8]) -> Result<(usize, SocketAddr)>;

    /// The address this socket is bound to.
    fn local_addr(&self) -> Result<SocketAddr>;
}

/// A real UDP socket, bound with `SO_REUSEADDR`, `SO_REUSEPORT`, and
/// `SO_BROADCAST` set before `bind()` (the only point these can be set
/// portably), matching the external socket contract in spec §6.
pub struct UdpDatagramSocket {
    inner: UdpSocket,
}

impl UdpDatagramSocket {
    /// Bind to `(0.0.0.0, port)` with address/port reuse and broadcast
    /// enabled.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Bind`] if the underlying bind fails (port
    /// already in use by a non-reusing socket, insufficient privilege,
    /// etc).
    pub fn bind(port: u16) -> Result<Self> {
        let address: SocketAddr = (std::net::Ipv4Addr::UNSPECIFIED, port).into();

        let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))
            .map_err(|source| TransportError::Bind { address: address.to_string(), source })?;

        socket
            .set_reuse_address(true)
            .map_err(|source| TransportError::Bind { address: address.to_string(), source })?;
        #[cfg(unix)]
        socket
            .set_reuse_port(true)
            .map_err(|source| TransportError::Bind { address: address.to_string(), source })?;
        socket
            .set_broadcast(true)
            .map_err(|source| TransportError::Bind { address: address.to_string(), source })?;
        socket
            .bind(&address.into())
            .map_err(|source| TransportError::Bind { address: address.to_string(), source })?;

        tracing::info!(%address, "udp transport bound");

        Ok(Self { inner: socket.into() })
    }
}

impl DatagramSocket for UdpDatagramSocket {
    fn send_to(&self, buf: &[u8], dest: SocketAddr) -> Result<usize> {
        Ok(self.inner.send_to(buf, dest)?)
    }

    fn recv_from(&self, buf: &mut [u8]) -> Result<(usize, SocketAddr)> {
        Ok(self.inner.recv_from(buf)?)
    }

    fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.inner.local_addr()?)
    }
}

/// Parse `(host, port)` into the destination used for `broadcast_address`,
/// so callers don't each re-derive this from [`DEFAULT_BROADCAST_ADDRESS`].
///
/// # Errors
///
/// Returns [`TransportError::InvalidAddress`] if `host` is not a valid IP
/// address.
pub fn broadcast_destination(host: &str, port: u16) -> Result<SocketAddr> {
    let ip: std::net::IpAddr =
        host.parse().map_err(|source| TransportError::InvalidAddress { address: host.to_string(), source })?;
    Ok(SocketAddr::new(ip, port))
}
