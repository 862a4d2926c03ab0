//! Sender and receiver orchestration.
//!
//! Ties together every other module into the two entry points an
//! application actually calls: [`SenderPipeline`] turns an outgoing
//! message into one or more wire-ready packets, and [`ReceiverPipeline`]
//! turns an incoming packet into zero or one delivered application
//! messages, applying integrity, replay, rate-limit, and self-loop
//! filtering in that order before any protocol-specific work happens.

use std::{
    panic::AssertUnwindSafe,
    sync::{Arc, Mutex},
    time::SystemTime,
};

use bytes::Bytes;
use yx_proto::{Guid, OuterFrame};

use crate::{
    binary,
    config::YxConfig,
    dedup::DedupCache,
    env::Environment,
    forensic::{DropReason, ForensicEntry, ForensicLog},
    keystore::KeyStore,
    metrics::{Counters, CountersSnapshot},
    rate_limit::RateLimiter,
    reassembly::ReassemblyMap,
    replay::ReplayCache,
    router::{self, Routed},
    sequence::SequenceCounter,
    text,
};

/// One message delivered to the application, with its sender's GUID.
pub struct Delivery {
    /// GUID of the peer that sent this message.
    pub sender: Guid,
    /// The decoded message.
    pub payload: DeliveredPayload,
}

/// The decoded application payload of a [`Delivery`].
pub enum DeliveredPayload {
    /// A text protocol message.
    Text(String),
    /// A fully reassembled, decrypted, decompressed binary message.
    Binary {
        /// Channel the message arrived on.
        channel_id: u16,
        /// The message body.
        data: Vec<u8>,
    },
}

/// Receives fully processed application messages from [`ReceiverPipeline`].
///
/// Invoked from inside [`std::panic::catch_unwind`]: a panicking callback
/// is logged and does not take down the packet-processing loop, but
/// should not be relied on as a substitute for the callback handling its
/// own errors.
pub trait ApplicationCallback: Send + Sync {
    /// Handle one delivered message.
    fn on_message(&self, delivery: Delivery);
}

/// Builds outgoing packets: encodes, optionally compresses/encrypts,
/// chunks, and wraps each in an authenticated outer frame.
pub struct SenderPipeline<E: Environment> {
    own_guid: Guid,
    keys: Arc<KeyStore>,
    sequences: SequenceCounter,
    config: YxConfig,
    env: E,
}

impl<E: Environment> SenderPipeline<E> {
    /// Build a sender pipeline for `own_guid`, signing and optionally
    /// encrypting with keys from `keys`.
    #[must_use]
    pub fn new(own_guid: Guid, keys: Arc<KeyStore>, config: YxConfig, env: E) -> Self {
        Self { own_guid, keys, sequences: SequenceCounter::new(), config, env }
    }

    /// Encode `text` as a single outgoing packet.
    #[must_use]
    pub fn send_text(&self, text: &str) -> Vec<u8> {
        self.wrap(text::encode(text))
    }

    /// Encode `message` as one or more outgoing packets on `channel_id`,
    /// optionally compressing and/or encrypting it first.
    ///
    /// # Panics
    ///
    /// Never: `channel_id`, a freshly issued `sequence`, and
    /// `config.chunk_size` always describe valid chunk bounds.
    #[must_use]
    pub fn send_binary(&self, channel_id: u16, message: &[u8], compress: bool, encrypt: bool) -> Vec<Vec<u8>> {
        let sequence = self.sequences.next(channel_id);
        let key = self.keys.get(&self.own_guid);
        let encrypt_key = encrypt.then_some(&key);
        let env = &self.env;
        let mut nonce_source = || env.random_nonce();

        let chunks = binary::prepare(
            message,
            channel_id,
            sequence,
            self.config.chunk_size,
            compress,
            self.config.compression_level,
            encrypt_key,
            &mut nonce_source,
        )
        .expect("chunk parameters derived from config are always valid");

        chunks.iter().map(|chunk| self.wrap(binary::encode_chunk(chunk))).collect()
    }

    fn wrap(&self, inner_payload: Bytes) -> Vec<u8> {
        let key = self.keys.get(&self.own_guid);
        let placeholder = OuterFrame::new([0u8; 16], self.own_guid, inner_payload);
        let tag = yx_crypto::compute_tag(&key, &placeholder.signing_data());
        OuterFrame::new(tag, self.own_guid, placeholder.payload).to_bytes()
    }
}

/// Parses, authenticates, deduplicates, reassembles, and delivers
/// incoming packets.
pub struct ReceiverPipeline<E: Environment> {
    own_guid: Guid,
    keys: Arc<KeyStore>,
    config: YxConfig,
    env: E,
    replay: Mutex<ReplayCache<E>>,
    rate_limiter: Mutex<RateLimiter<E>>,
    reassembly: Mutex<ReassemblyMap<E>>,
    dedup: Mutex<DedupCache<E>>,
    counters: Counters,
    forensic: Arc<dyn ForensicLog>,
}

impl<E: Environment> ReceiverPipeline<E> {
    /// Build a receiver pipeline for `own_guid`, with caches sized from
    /// `config`.
    #[must_use]
    pub fn new(own_guid: Guid, keys: Arc<KeyStore>, config: YxConfig, env: E, forensic: Arc<dyn ForensicLog>) -> Self {
        let replay = ReplayCache::new(config.replay_ttl_secs, config.replay_cleanup_threshold);
        let rate_limiter =
            RateLimiter::with_trusted(config.max_requests, config.rate_window_secs, config.trusted_guids.clone());
        let reassembly = ReassemblyMap::new(config.buffer_timeout_secs, config.max_chunks_per_message);
        let dedup = DedupCache::new(config.dedup_window_secs);
        Self {
            own_guid,
            keys,
            config,
            env,
            replay: Mutex::new(replay),
            rate_limiter: Mutex::new(rate_limiter),
            reassembly: Mutex::new(reassembly),
            dedup: Mutex::new(dedup),
            counters: Counters::new(),
            forensic,
        }
    }

    /// Process one received packet, delivering it through `callback` if it
    /// is a complete, authenticated, non-duplicate message.
    ///
    /// Silently drops the packet (after recording a counter and forensic
    /// entry, where applicable) on any failure: malformed framing, failed
    /// integrity check, replay, rate limiting, or a self-loop with
    /// `process_own_packets` disabled. The protocol never signals errors
    /// back to a peer.
    pub fn handle_packet(&self, bytes: &[u8], callback: &dyn ApplicationCallback) {
        let now = self.env.now();

        let frame = match OuterFrame::decode(bytes) {
            Ok(frame) => frame,
            Err(_) => {
                self.counters.record_malformed();
                self.log(None, DropReason::Malformed);
                return;
            }
        };

        let key = self.keys.get(&frame.guid);
        let expected_tag = yx_crypto::compute_tag(&key, &frame.signing_data());
        if !yx_crypto::verify_tag(&expected_tag, &frame.tag) {
            self.counters.record_integrity_failed();
            self.log(Some(frame.guid), DropReason::IntegrityFailed);
            return;
        }

        if !self.lock_replay().check_and_record(frame.tag, now) {
            self.counters.record_replay();
            self.log(Some(frame.guid), DropReason::Replay);
            return;
        }

        if !self.lock_rate_limiter().check_and_record(frame.guid, now) {
            self.counters.record_rate_limited();
            self.log(Some(frame.guid), DropReason::RateLimited);
            return;
        }

        if !self.config.process_own_packets && frame.guid == self.own_guid {
            return;
        }

        let routed = match router::route(&frame.payload) {
            Ok(routed) => routed,
            Err(_) => {
                self.counters.record_malformed();
                self.log(Some(frame.guid), DropReason::Malformed);
                return;
            }
        };

        match routed {
            Routed::Text(body) => self.handle_text(frame.guid, &body, callback),
            Routed::Binary(body) => self.handle_binary(frame.guid, &body, now, callback),
        }
    }

    fn handle_text(&self, sender: Guid, body: &Bytes, callback: &dyn ApplicationCallback) {
        match text::decode(body) {
            Ok(text) => self.deliver(callback, sender, DeliveredPayload::Text(text)),
            Err(_) => {
                self.counters.record_malformed();
                self.log(Some(sender), DropReason::Malformed);
            }
        }
    }

    fn handle_binary(&self, sender: Guid, body: &Bytes, now: E::Instant, callback: &dyn ApplicationCallback) {
        let incoming = match binary::parse_chunk(body) {
            Ok(incoming) => incoming,
            Err(_) => {
                self.counters.record_malformed();
                self.log(Some(sender), DropReason::Malformed);
                return;
            }
        };

        let channel_id = incoming.header.channel_id();
        let sequence = incoming.header.sequence();
        let proto_opts = incoming.header.proto_opts().to_byte();

        if self.dedup.lock().unwrap_or_else(std::sync::PoisonError::into_inner).contains(channel_id, sequence, now) {
            return;
        }

        let reassembled = self.reassembly.lock().unwrap_or_else(std::sync::PoisonError::into_inner).insert(
            channel_id,
            sequence,
            incoming.header.chunk_index(),
            incoming.header.total_chunks(),
            proto_opts,
            incoming.body,
            now,
        );

        match reassembled {
            Ok(Some(reassembled_body)) => {
                let key = self.keys.get(&sender);
                match binary::finish(reassembled_body, proto_opts, Some(&key)) {
                    Ok(data) => {
                        self.dedup
                            .lock()
                            .unwrap_or_else(std::sync::PoisonError::into_inner)
                            .record(channel_id, sequence, now);
                        self.deliver(callback, sender, DeliveredPayload::Binary { channel_id, data });
                    }
                    Err(_) => {
                        self.counters.record_malformed();
                        self.log(Some(sender), DropReason::DecryptionFailed);
                    }
                }
            }
            Ok(None) => {}
            Err(_) => {
                self.counters.record_malformed();
                self.log(Some(sender), DropReason::Malformed);
            }
        }
    }

    fn deliver(&self, callback: &dyn ApplicationCallback, sender: Guid, payload: DeliveredPayload) {
        let delivery = Delivery { sender, payload };
        let outcome = std::panic::catch_unwind(AssertUnwindSafe(|| callback.on_message(delivery)));
        if outcome.is_err() {
            tracing::error!(sender = %sender, "application callback panicked");
        }
    }

    /// Evict reassembly entries and dedup records older than their
    /// configured TTLs. Applications should call this periodically; it is
    /// never invoked implicitly by `handle_packet`.
    pub fn reap_expired(&self) {
        let now = self.env.now();
        let timed_out = self.reassembly.lock().unwrap_or_else(std::sync::PoisonError::into_inner).reap_expired(now);
        for (channel_id, sequence) in timed_out {
            tracing::debug!(channel_id, sequence, "reassembly timed out");
        }
        self.dedup.lock().unwrap_or_else(std::sync::PoisonError::into_inner).sweep(now);
    }

    /// Current drop-reason counters.
    #[must_use]
    pub fn counters(&self) -> CountersSnapshot {
        self.counters.snapshot()
    }

    fn lock_replay(&self) -> std::sync::MutexGuard<'_, ReplayCache<E>> {
        self.replay.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn lock_rate_limiter(&self) -> std::sync::MutexGuard<'_, RateLimiter<E>> {
        self.rate_limiter.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn log(&self, sender: Option<Guid>, reason: DropReason) {
        self.forensic.record(ForensicEntry { at: SystemTime::now(), sender, reason });
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::env::test_support::SimEnvironment;
    use crate::forensic::MemoryForensicLog;
    use std::sync::Mutex as StdMutex;

    struct Collector(StdMutex<Vec<(Guid, String)>>, StdMutex<Vec<(Guid, u16, Vec<u8>)>>);

    impl Collector {
        fn new() -> Self {
            Self(StdMutex::new(Vec::new()), StdMutex::new(Vec::new()))
        }
    }

    impl ApplicationCallback for Collector {
        fn on_message(&self, delivery: Delivery) {
            match delivery.payload {
                DeliveredPayload::Text(text) => self.0.lock().unwrap().push((delivery.sender, text)),
                DeliveredPayload::Binary { channel_id, data } => {
                    self.1.lock().unwrap().push((delivery.sender, channel_id, data));
                }
            }
        }
    }

    fn keystore(guid: Guid, key: [u8; 32]) -> Arc<KeyStore> {
        let store = KeyStore::new(key);
        let mut table = std::collections::HashMap::new();
        table.insert(guid, key);
        store.reload(table, key);
        Arc::new(store)
    }

    #[test]
    fn text_message_round_trips_end_to_end() {
        let env = SimEnvironment::new();
        let guid = Guid::new(b"sender");
        let keys = keystore(guid, [0x11; 32]);
        let config = YxConfig::default();

        let sender = SenderPipeline::new(guid, Arc::clone(&keys), config.clone(), env.clone());
        let receiver = ReceiverPipeline::new(guid, keys, config, env, Arc::new(MemoryForensicLog::new(16)));
        let collector = Collector::new();

        let packet = sender.send_text("hello, world");
        receiver.handle_packet(&packet, &collector);

        let delivered = collector.0.lock().unwrap();
        assert_eq!(delivered.as_slice(), &[(guid, "hello, world".to_string())]);
    }

    #[test]
    fn binary_plaintext_single_chunk_round_trips() {
        let env = SimEnvironment::new();
        let guid = Guid::new(b"sender");
        let keys = keystore(guid, [0x22; 32]);
        let config = YxConfig::default();

        let sender = SenderPipeline::new(guid, Arc::clone(&keys), config.clone(), env.clone());
        let receiver = ReceiverPipeline::new(guid, keys, config, env, Arc::new(MemoryForensicLog::new(16)));
        let collector = Collector::new();

        let packets = sender.send_binary(1, b"plain body", false, false);
        assert_eq!(packets.len(), 1);
        receiver.handle_packet(&packets[0], &collector);

        let delivered = collector.1.lock().unwrap();
        assert_eq!(delivered.as_slice(), &[(guid, 1, b"plain body".to_vec())]);
    }

    #[test]
    fn binary_encrypted_compressed_multi_chunk_survives_reordering() {
        let env = SimEnvironment::new();
        let guid = Guid::new(b"sender");
        let keys = keystore(guid, [0x33; 32]);
        let mut config = YxConfig::default();
        config.chunk_size = 16;

        let sender = SenderPipeline::new(guid, Arc::clone(&keys), config.clone(), env.clone());
        let receiver = ReceiverPipeline::new(guid, keys, config, env, Arc::new(MemoryForensicLog::new(16)));
        let collector = Collector::new();

        let message = b"the quick brown fox jumps over the lazy dog".repeat(2);
        let mut packets = sender.send_binary(5, &message, true, true);
        assert!(packets.len() > 1);

        // deliver in reverse order to exercise out-of-order reassembly
        packets.reverse();
        for packet in &packets {
            receiver.handle_packet(packet, &collector);
        }

        let delivered = collector.1.lock().unwrap();
        assert_eq!(delivered.len(), 1);
        assert_eq!(delivered[0].2, message);
    }

    #[test]
    fn replayed_packet_is_dropped_and_counted() {
        let env = SimEnvironment::new();
        let guid = Guid::new(b"sender");
        let keys = keystore(guid, [0x44; 32]);
        let config = YxConfig::default();

        let sender = SenderPipeline::new(guid, Arc::clone(&keys), config.clone(), env.clone());
        let receiver = ReceiverPipeline::new(guid, keys, config, env, Arc::new(MemoryForensicLog::new(16)));
        let collector = Collector::new();

        let packet = sender.send_text("hi");
        receiver.handle_packet(&packet, &collector);
        receiver.handle_packet(&packet, &collector);

        assert_eq!(collector.0.lock().unwrap().len(), 1);
        assert_eq!(receiver.counters().replay, 1);
    }

    #[test]
    fn wrong_key_fails_integrity_check() {
        let env = SimEnvironment::new();
        let guid = Guid::new(b"sender");
        let sender_keys = keystore(guid, [0x55; 32]);
        let receiver_keys = keystore(guid, [0x56; 32]);
        let config = YxConfig::default();

        let sender = SenderPipeline::new(guid, sender_keys, config.clone(), env.clone());
        let receiver = ReceiverPipeline::new(guid, receiver_keys, config, env, Arc::new(MemoryForensicLog::new(16)));
        let collector = Collector::new();

        let packet = sender.send_text("hi");
        receiver.handle_packet(&packet, &collector);

        assert!(collector.0.lock().unwrap().is_empty());
        assert_eq!(receiver.counters().integrity_failed, 1);
    }

    #[test]
    fn rate_limit_drops_excess_requests() {
        let env = SimEnvironment::new();
        let guid = Guid::new(b"sender");
        let keys = keystore(guid, [0x66; 32]);
        let mut config = YxConfig::default();
        config.max_requests = 3;
        config.rate_window_secs = 60.0;

        let sender = SenderPipeline::new(guid, Arc::clone(&keys), config.clone(), env.clone());
        let receiver = ReceiverPipeline::new(guid, keys, config, env, Arc::new(MemoryForensicLog::new(16)));
        let collector = Collector::new();

        for i in 0..4 {
            let packet = sender.send_text(&format!("msg {i}"));
            receiver.handle_packet(&packet, &collector);
        }

        assert_eq!(collector.0.lock().unwrap().len(), 3);
        assert_eq!(receiver.counters().rate_limited, 1);
    }

    #[test]
    fn trusted_sender_bypasses_rate_limit() {
        let env = SimEnvironment::new();
        let guid = Guid::new(b"sender");
        let keys = keystore(guid, [0x88; 32]);
        let mut config = YxConfig::default();
        config.max_requests = 2;
        config.rate_window_secs = 60.0;
        config.trusted_guids.insert(guid);

        let sender = SenderPipeline::new(guid, Arc::clone(&keys), config.clone(), env.clone());
        let receiver = ReceiverPipeline::new(guid, keys, config, env, Arc::new(MemoryForensicLog::new(16)));
        let collector = Collector::new();

        for i in 0..5 {
            let packet = sender.send_text(&format!("msg {i}"));
            receiver.handle_packet(&packet, &collector);
        }

        assert_eq!(collector.0.lock().unwrap().len(), 5);
        assert_eq!(receiver.counters().rate_limited, 0);
    }

    #[test]
    fn self_loop_is_dropped_silently_when_disabled() {
        let env = SimEnvironment::new();
        let guid = Guid::new(b"sender");
        let keys = keystore(guid, [0x77; 32]);
        let mut config = YxConfig::default();
        config.process_own_packets = false;

        let sender = SenderPipeline::new(guid, Arc::clone(&keys), config.clone(), env.clone());
        let receiver = ReceiverPipeline::new(guid, keys, config, env, Arc::new(MemoryForensicLog::new(16)));
        let collector = Collector::new();

        let packet = sender.send_text("hi");
        receiver.handle_packet(&packet, &collector);

        assert!(collector.0.lock().unwrap().is_empty());
        let counters = receiver.counters();
        assert_eq!(counters.malformed, 0);
        assert_eq!(counters.integrity_failed, 0);
    }
}
