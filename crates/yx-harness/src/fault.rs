//! Fault-injecting in-memory transport.
//!
//! A [`FaultyNetwork`] stands in for `yx-transport`'s real UDP socket so
//! the full send -> receive pipeline can be exercised deterministically,
//! without binding real ports, under the loss, duplication, and
//! reordering an unreliable broadcast fabric intrinsically exhibits (spec
//! §1, §5's "Resource bounds" and §8's permutation/duplicate-delivery
//! properties). Every fault decision is driven by a seeded RNG, so a
//! given seed and [`FaultConfig`] reproduce the exact same run.

use std::{
    collections::{HashMap, VecDeque},
    net::SocketAddr,
    sync::{Arc, Mutex},
};

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use yx_transport::{DatagramSocket, Result, TransportError};

/// Probabilities governing the fault injector. All are independent
/// per-datagram coin flips in `[0.0, 1.0]`.
#[derive(Debug, Clone, Copy)]
pub struct FaultConfig {
    /// Probability a sent datagram is silently dropped.
    pub loss_probability: f64,
    /// Probability a sent datagram is additionally delivered a second time.
    pub duplicate_probability: f64,
    /// Probability a delivered datagram is inserted at a random position
    /// in the destination's inbox rather than appended, simulating
    /// reordering relative to other in-flight datagrams.
    pub reorder_probability: f64,
}

impl FaultConfig {
    /// No faults: every datagram is delivered exactly once, in order.
    #[must_use]
    pub fn reliable() -> Self {
        Self { loss_probability: 0.0, duplicate_probability: 0.0, reorder_probability: 0.0 }
    }
}

impl Default for FaultConfig {
    fn default() -> Self {
        Self::reliable()
    }
}

struct Inbound {
    buf: Vec<u8>,
    from: SocketAddr,
}

struct NetworkState {
    rng: ChaCha8Rng,
    config: FaultConfig,
    inboxes: HashMap<SocketAddr, VecDeque<Inbound>>,
    dropped: u64,
    duplicated: u64,
}

/// A shared, seeded, fault-injecting medium. Register one
/// [`FaultySocket`] per simulated peer address; datagrams sent to a
/// registered address land in that peer's inbox subject to loss,
/// duplication, and reordering.
pub struct FaultyNetwork {
    state: Mutex<NetworkState>,
}

impl FaultyNetwork {
    /// Build a network with the given seed and fault configuration.
    #[must_use]
    pub fn new(seed: u64, config: FaultConfig) -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(NetworkState {
                rng: ChaCha8Rng::seed_from_u64(seed),
                config,
                inboxes: HashMap::new(),
                dropped: 0,
                duplicated: 0,
            }),
        })
    }

    /// Register `addr` as a peer on this network, returning a socket
    /// handle bound to it.
    #[must_use]
    pub fn register(self: &Arc<Self>, addr: SocketAddr) -> FaultySocket {
        self.state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .inboxes
            .entry(addr)
            .or_default();
        FaultySocket { addr, network: Arc::clone(self) }
    }

    /// Number of datagrams dropped so far.
    #[must_use]
    pub fn dropped_count(&self) -> u64 {
        self.state.lock().unwrap_or_else(std::sync::PoisonError::into_inner).dropped
    }

    /// Number of extra copies delivered so far via duplication.
    #[must_use]
    pub fn duplicated_count(&self) -> u64 {
        self.state.lock().unwrap_or_else(std::sync::PoisonError::into_inner).duplicated
    }

    fn deliver(&self, buf: Vec<u8>, from: SocketAddr, to: SocketAddr) {
        let mut state = self.state.lock().unwrap_or_else(std::sync::PoisonError::into_inner);

        if state.rng.gen_bool(state.config.loss_probability) {
            state.dropped += 1;
            tracing::debug!(%from, %to, "fault injector dropped datagram");
            return;
        }

        let extra_copy = state.rng.gen_bool(state.config.duplicate_probability);
        let copies = if extra_copy { 2 } else { 1 };
        if extra_copy {
            state.duplicated += 1;
        }

        for _ in 0..copies {
            let reorder = state.rng.gen_bool(state.config.reorder_probability);
            let inbox = state.inboxes.entry(to).or_default();
            let entry = Inbound { buf: buf.clone(), from };
            if reorder && !inbox.is_empty() {
                let index = state.rng.gen_range(0..=inbox.len());
                inbox.insert(index, entry);
            } else {
                inbox.push_back(entry);
            }
        }
    }

    fn try_recv(&self, addr: SocketAddr) -> Option<(Vec<u8>, SocketAddr)> {
        let mut state = self.state.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let inbound = state.inboxes.get_mut(&addr)?.pop_front()?;
        Some((inbound.buf, inbound.from))
    }

    /// Number of datagrams currently waiting, undelivered, for `addr`.
    #[must_use]
    pub fn pending(&self, addr: SocketAddr) -> usize {
        self.state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .inboxes
            .get(&addr)
            .map_or(0, VecDeque::len)
    }
}

/// A [`DatagramSocket`] backed by a [`FaultyNetwork`] instead of a real
/// OS socket.
pub struct FaultySocket {
    addr: SocketAddr,
    network: Arc<FaultyNetwork>,
}

impl FaultySocket {
    /// The address this socket is registered under.
    #[must_use]
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Number of datagrams currently waiting for this socket.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.network.pending(self.addr)
    }

    /// Drain every currently-ready datagram, returning each as an owned
    /// buffer. Unlike [`DatagramSocket::recv_from`], this never blocks -
    /// it simply stops once the inbox is empty, which is what a
    /// simulation driver wants between rounds.
    #[must_use]
    pub fn drain(&self) -> Vec<(Vec<u8>, SocketAddr)> {
        std::iter::from_fn(|| self.network.try_recv(self.addr)).collect()
    }
}

impl DatagramSocket for FaultySocket {
    fn send_to(&self, buf: &[u8], dest: SocketAddr) -> Result<usize> {
        let len = buf.len();
        self.network.deliver(buf.to_vec(), self.addr, dest);
        Ok(len)
    }

    fn recv_from(&self, buf: &mut [u8]) -> Result<(usize, SocketAddr)> {
        match self.network.try_recv(self.addr) {
            Some((datagram, from)) => {
                let n = datagram.len().min(buf.len());
                buf[..n].copy_from_slice(&datagram[..n]);
                Ok((n, from))
            }
            None => Err(TransportError::Io(std::io::Error::new(
                std::io::ErrorKind::WouldBlock,
                "no datagram ready on the simulated network",
            ))),
        }
    }

    fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.addr)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn addr(port: u16) -> SocketAddr {
        ([127, 0, 0, 1], port).into()
    }

    #[test]
    fn reliable_network_delivers_exactly_once_in_order() {
        let network = FaultyNetwork::new(1, FaultConfig::reliable());
        let a = network.register(addr(1));
        let b = network.register(addr(2));

        a.send_to(b"first", b.addr()).unwrap();
        a.send_to(b"second", b.addr()).unwrap();

        let received = b.drain();
        assert_eq!(received.len(), 2);
        assert_eq!(received[0].0, b"first");
        assert_eq!(received[1].0, b"second");
        assert_eq!(received[0].1, a.addr());
    }

    #[test]
    fn empty_inbox_recv_returns_would_block() {
        let network = FaultyNetwork::new(1, FaultConfig::reliable());
        let a = network.register(addr(1));
        let mut buf = [0u8; 16];
        assert!(a.recv_from(&mut buf).is_err());
    }

    #[test]
    fn guaranteed_loss_drops_every_datagram() {
        let config = FaultConfig { loss_probability: 1.0, ..FaultConfig::reliable() };
        let network = FaultyNetwork::new(2, config);
        let a = network.register(addr(1));
        let b = network.register(addr(2));

        for _ in 0..10 {
            a.send_to(b"x", b.addr()).unwrap();
        }

        assert!(b.drain().is_empty());
        assert_eq!(network.dropped_count(), 10);
    }

    #[test]
    fn guaranteed_duplication_delivers_two_copies() {
        let config = FaultConfig { duplicate_probability: 1.0, ..FaultConfig::reliable() };
        let network = FaultyNetwork::new(3, config);
        let a = network.register(addr(1));
        let b = network.register(addr(2));

        a.send_to(b"once", b.addr()).unwrap();

        let received = b.drain();
        assert_eq!(received.len(), 2);
        assert_eq!(received[0].0, b"once");
        assert_eq!(received[1].0, b"once");
    }

    #[test]
    fn pending_count_reflects_undrained_datagrams() {
        let network = FaultyNetwork::new(4, FaultConfig::reliable());
        let a = network.register(addr(1));
        let b = network.register(addr(2));

        a.send_to(b"x", b.addr()).unwrap();
        a.send_to(b"y", b.addr()).unwrap();
        assert_eq!(b.pending(), 2);

        b.drain();
        assert_eq!(b.pending(), 0);
    }
}
