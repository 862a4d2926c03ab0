//! Delivery deduplication.
//!
//! Distinct from replay protection: a completed message is remembered by
//! `(channelID, sequence)` for a short window so that a duplicate final
//! chunk (the sender retransmitted, or a lower layer duplicated a
//! datagram) does not deliver the same application message twice.
//!
//! The check and the insert are deliberately separate calls. Every chunk
//! of a message shares the same `(channelID, sequence)`, so a combined
//! check-and-insert would mark the key as delivered on the *first* chunk
//! of a multi-chunk message, long before reassembly completes - every
//! following chunk would then be mistaken for a duplicate and dropped
//! before ever reaching the reassembly map. [`DedupCache::contains`] is
//! called per chunk, before reassembly; [`DedupCache::record`] is called
//! exactly once, only after a message has been fully reassembled,
//! decrypted, and decompressed.

use std::collections::HashMap;

use crate::env::Environment;

#[derive(Clone, Copy, PartialEq, Eq, Hash)]
struct MessageKey {
    channel_id: u16,
    sequence: u32,
}

/// Suppresses re-delivery of messages already handed to the application.
pub struct DedupCache<E: Environment> {
    delivered: HashMap<MessageKey, E::Instant>,
    ttl_secs: f64,
}

impl<E: Environment> DedupCache<E> {
    /// Create an empty cache with the given TTL.
    #[must_use]
    pub fn new(ttl_secs: f64) -> Self {
        Self { delivered: HashMap::new(), ttl_secs }
    }

    /// Returns `true` if `(channel_id, sequence)` was already delivered to
    /// the application within the TTL. Does not record anything; safe to
    /// call once per incoming chunk.
    #[must_use]
    pub fn contains(&self, channel_id: u16, sequence: u32, now: E::Instant) -> bool {
        let key = MessageKey { channel_id, sequence };
        match self.delivered.get(&key) {
            Some(&delivered_at) => now >= delivered_at && (now - delivered_at).as_secs_f64() <= self.ttl_secs,
            None => false,
        }
    }

    /// Record `(channel_id, sequence)` as delivered as of `now`. Callers
    /// must invoke this exactly once per delivered message, after
    /// reassembly, decryption, and decompression have all succeeded.
    pub fn record(&mut self, channel_id: u16, sequence: u32, now: E::Instant) {
        self.delivered.insert(MessageKey { channel_id, sequence }, now);
    }

    /// Drop every entry older than the TTL.
    pub fn sweep(&mut self, now: E::Instant) {
        let ttl_secs = self.ttl_secs;
        self.delivered
            .retain(|_, &mut delivered_at| now < delivered_at || (now - delivered_at).as_secs_f64() <= ttl_secs);
    }

    /// Number of messages currently remembered as delivered.
    #[must_use]
    pub fn len(&self) -> usize {
        self.delivered.len()
    }

    /// Whether the cache currently remembers no deliveries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.delivered.is_empty()
    }
}
