//! A simulated YX peer: pipelines plus a fault-injected socket.
//!
//! Bundles `yx-core`'s [`SenderPipeline`] and [`ReceiverPipeline`] with a
//! [`FaultySocket`] and a static view of the other peers on the simulated
//! network, so a chaos test can drive a handful of peers exchanging text
//! and binary messages over an unreliable broadcast medium without
//! touching a real socket (spec §1's "connectionless broadcast
//! transport").

use std::{net::SocketAddr, sync::Arc};

use yx_core::{ApplicationCallback, KeyStore, ReceiverPipeline, SenderPipeline, YxConfig};
use yx_proto::Guid;
use yx_transport::DatagramSocket;

use crate::{env::SimEnvironment, fault::FaultyNetwork};

/// One participant in a simulated network: its identity, its pipelines,
/// and its socket on the shared [`FaultyNetwork`].
pub struct SimPeer {
    guid: Guid,
    addr: SocketAddr,
    broadcast_peers: Vec<SocketAddr>,
    socket: crate::fault::FaultySocket,
    sender: SenderPipeline<SimEnvironment>,
    receiver: ReceiverPipeline<SimEnvironment>,
}

impl SimPeer {
    /// Join `network` as `guid`, bound to `addr`, broadcasting to every
    /// address in `broadcast_peers` (typically every other peer in the
    /// simulation, mirroring a real broadcast domain).
    #[must_use]
    pub fn join(
        network: &Arc<FaultyNetwork>,
        guid: Guid,
        addr: SocketAddr,
        broadcast_peers: Vec<SocketAddr>,
        keys: Arc<KeyStore>,
        config: YxConfig,
        env: SimEnvironment,
        forensic: Arc<dyn yx_core::forensic::ForensicLog>,
    ) -> Self {
        let socket = network.register(addr);
        let sender = SenderPipeline::new(guid, Arc::clone(&keys), config.clone(), env.clone());
        let receiver = ReceiverPipeline::new(guid, keys, config, env, forensic);
        Self { guid, addr, broadcast_peers, socket, sender, receiver }
    }

    /// This peer's identity.
    #[must_use]
    pub fn guid(&self) -> Guid {
        self.guid
    }

    /// This peer's address on the simulated network.
    #[must_use]
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Broadcast a text message to every peer in this simulation's
    /// broadcast domain.
    pub fn send_text(&self, text: &str) {
        let packet = self.sender.send_text(text);
        self.broadcast(&packet);
    }

    /// Broadcast a binary message, chunked as necessary, to every peer in
    /// this simulation's broadcast domain.
    pub fn send_binary(&self, channel_id: u16, message: &[u8], compress: bool, encrypt: bool) {
        for packet in self.sender.send_binary(channel_id, message, compress, encrypt) {
            self.broadcast(&packet);
        }
    }

    fn broadcast(&self, packet: &[u8]) {
        for peer in &self.broadcast_peers {
            if let Err(error) = self.socket.send_to(packet, *peer) {
                tracing::warn!(%error, destination = %peer, "simulated send failed");
            }
        }
    }

    /// Drain every datagram currently waiting on this peer's socket,
    /// running each through the receiver pipeline. Returns the number of
    /// datagrams processed (not the number successfully delivered - see
    /// [`ReceiverPipeline::counters`] for drop accounting).
    pub fn pump(&self, callback: &dyn ApplicationCallback) -> usize {
        let datagrams = self.socket.drain();
        let count = datagrams.len();
        for (buf, _from) in datagrams {
            self.receiver.handle_packet(&buf, callback);
        }
        count
    }

    /// Evict expired reassembly and dedup state. See
    /// [`ReceiverPipeline::reap_expired`].
    pub fn reap_expired(&self) {
        self.receiver.reap_expired();
    }

    /// Current drop-reason counters for this peer's receiver.
    #[must_use]
    pub fn counters(&self) -> yx_core::CountersSnapshot {
        self.receiver.counters()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::fault::FaultConfig;
    use std::sync::Mutex;

    struct Collector(Mutex<Vec<(Guid, String)>>);

    impl Collector {
        fn new() -> Self {
            Self(Mutex::new(Vec::new()))
        }
    }

    impl ApplicationCallback for Collector {
        fn on_message(&self, delivery: yx_core::Delivery) {
            if let yx_core::DeliveredPayload::Text(text) = delivery.payload {
                self.0.lock().unwrap().push((delivery.sender, text));
            }
        }
    }

    fn keystore(guid_a: Guid, key_a: [u8; 32], guid_b: Guid, key_b: [u8; 32]) -> Arc<KeyStore> {
        let store = KeyStore::new(key_a);
        let mut table = std::collections::HashMap::new();
        table.insert(guid_a, key_a);
        table.insert(guid_b, key_b);
        store.reload(table, key_a);
        Arc::new(store)
    }

    fn addr(port: u16) -> SocketAddr {
        ([127, 0, 0, 1], port).into()
    }

    #[test]
    fn two_peers_exchange_text_over_reliable_network() {
        let network = FaultyNetwork::new(7, FaultConfig::reliable());
        let guid_a = Guid::new(b"alice");
        let guid_b = Guid::new(b"bob");
        let keys = keystore(guid_a, [0x10; 32], guid_b, [0x10; 32]);
        let env = SimEnvironment::new(7);
        let config = YxConfig::default();

        let peer_a = SimPeer::join(
            &network,
            guid_a,
            addr(1),
            vec![addr(2)],
            Arc::clone(&keys),
            config.clone(),
            env.clone(),
            Arc::new(yx_core::forensic::MemoryForensicLog::new(16)),
        );
        let peer_b = SimPeer::join(
            &network,
            guid_b,
            addr(2),
            vec![addr(1)],
            keys,
            config,
            env,
            Arc::new(yx_core::forensic::MemoryForensicLog::new(16)),
        );

        peer_a.send_text("hello from alice");

        let collector = Collector::new();
        let processed = peer_b.pump(&collector);

        assert_eq!(processed, 1);
        assert_eq!(collector.0.lock().unwrap().as_slice(), &[(guid_a, "hello from alice".to_string())]);
    }

    #[test]
    fn message_lost_on_unreliable_network_never_arrives() {
        let network = FaultyNetwork::new(11, FaultConfig { loss_probability: 1.0, ..FaultConfig::reliable() });
        let guid_a = Guid::new(b"alice");
        let guid_b = Guid::new(b"bob");
        let keys = keystore(guid_a, [0x20; 32], guid_b, [0x20; 32]);
        let env = SimEnvironment::new(11);
        let config = YxConfig::default();

        let peer_a = SimPeer::join(
            &network,
            guid_a,
            addr(3),
            vec![addr(4)],
            Arc::clone(&keys),
            config.clone(),
            env.clone(),
            Arc::new(yx_core::forensic::MemoryForensicLog::new(16)),
        );
        let peer_b = SimPeer::join(
            &network,
            guid_b,
            addr(4),
            vec![addr(3)],
            keys,
            config,
            env,
            Arc::new(yx_core::forensic::MemoryForensicLog::new(16)),
        );

        peer_a.send_text("never arrives");

        let collector = Collector::new();
        let processed = peer_b.pump(&collector);

        assert_eq!(processed, 0);
        assert!(collector.0.lock().unwrap().is_empty());
    }
}
