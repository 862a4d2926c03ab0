//! YX Transport
//!
//! The one named external collaborator this engine ships a concrete
//! implementation for (spec §1, §6): a raw UDP broadcast datagram socket.
//! Binds `(0.0.0.0, port)`, enables address/port reuse and broadcast, and
//! exchanges single datagrams. Everything else - framing, crypto,
//! reassembly, rate limiting - lives in `yx-core` and never touches this
//! crate directly; an application wires `yx-core`'s pipelines to this
//! socket itself.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod error;
pub mod socket;

pub use error::{Result, TransportError};
pub use socket::{
    DEFAULT_BROADCAST_ADDRESS, DEFAULT_PORT, DatagramSocket, MAX_DATAGRAM_SIZE, UdpDatagramSocket,
    broadcast_destination,
};
