//! Chunk reassembly.
//!
//! A binary message may arrive as one or more chunks, each carrying a
//! [`ChunkHeader`](yx_proto::ChunkHeader) that names the channel, sequence,
//! chunk index, and total chunk count for the message it belongs to.
//! Chunks for the same `(channelID, sequence)` are buffered here until all
//! `totalChunks` have arrived, then concatenated in index order.
//!
//! # State machine
//!
//! An entry moves Empty -> Collecting (first chunk) -> Complete (last
//! chunk arrives; removal from the map and the concatenated body are a
//! single atomic step, so no other accessor ever observes a "complete but
//! still buffered" entry) -> Empty. There is no separate Delivered state
//! held here: once [`ReassemblyMap::insert`] returns a body, the entry is
//! already gone and delivery is the caller's concern.

use std::collections::HashMap;

use bytes::{Bytes, BytesMut};

use crate::{
    env::Environment,
    error::{Result, YxError},
};

#[derive(Clone, Copy, PartialEq, Eq, Hash)]
struct MessageKey {
    channel_id: u16,
    sequence: u32,
}

struct Entry<I> {
    total_chunks: u32,
    proto_opts: u8,
    chunks: HashMap<u32, Bytes>,
    created_at: I,
}

/// Buffers in-flight chunked messages until every chunk has arrived.
pub struct ReassemblyMap<E: Environment> {
    entries: HashMap<MessageKey, Entry<E::Instant>>,
    timeout_secs: f64,
    max_chunks_per_message: u32,
}

impl<E: Environment> ReassemblyMap<E> {
    /// Create an empty reassembly map.
    #[must_use]
    pub fn new(timeout_secs: f64, max_chunks_per_message: u32) -> Self {
        Self { entries: HashMap::new(), timeout_secs, max_chunks_per_message }
    }

    /// Insert one chunk. Returns `Ok(Some(body))` once the last chunk for
    /// its message arrives (the entry is removed in the same step),
    /// `Ok(None)` while still collecting, or an error if the chunk is
    /// malformed relative to an entry already in progress. A chunk that
    /// arrives for an index already populated is dropped silently; the
    /// first body seen for that index is kept.
    ///
    /// # Errors
    ///
    /// Returns [`YxError::InconsistentChunk`] if `total_chunks` or
    /// `proto_opts` disagree with the first chunk seen for this message
    /// (the existing entry is preserved), or [`YxError::MalformedFrame`]
    /// if `total_chunks` exceeds `max_chunks_per_message`.
    pub fn insert(
        &mut self,
        channel_id: u16,
        sequence: u32,
        chunk_index: u32,
        total_chunks: u32,
        proto_opts: u8,
        body: Bytes,
        now: E::Instant,
    ) -> Result<Option<Bytes>> {
        if total_chunks > self.max_chunks_per_message {
            return Err(YxError::MalformedFrame(format!(
                "total_chunks {total_chunks} exceeds max_chunks_per_message {}",
                self.max_chunks_per_message
            )));
        }

        let key = MessageKey { channel_id, sequence };

        if let Some(entry) = self.entries.get(&key) {
            if entry.total_chunks != total_chunks || entry.proto_opts != proto_opts {
                return Err(YxError::InconsistentChunk { channel_id, sequence });
            }
        }

        let entry = self.entries.entry(key).or_insert_with(|| Entry {
            total_chunks,
            proto_opts,
            chunks: HashMap::new(),
            created_at: now,
        });
        entry.chunks.entry(chunk_index).or_insert(body);

        if entry.chunks.len() as u32 == entry.total_chunks {
            let entry = self.entries.remove(&key).expect("entry just matched above");
            return Ok(Some(concatenate(entry)));
        }

        Ok(None)
    }

    /// Remove and return the `(channelID, sequence)` of every entry whose
    /// age exceeds the configured timeout, for forensic logging by the
    /// caller.
    pub fn reap_expired(&mut self, now: E::Instant) -> Vec<(u16, u32)> {
        let timeout_secs = self.timeout_secs;
        let expired: Vec<MessageKey> = self
            .entries
            .iter()
            .filter(|(_, entry)| {
                now >= entry.created_at && (now - entry.created_at).as_secs_f64() > timeout_secs
            })
            .map(|(key, _)| *key)
            .collect();

        for key in &expired {
            self.entries.remove(key);
        }

        expired.into_iter().map(|key| (key.channel_id, key.sequence)).collect()
    }

    /// Number of messages currently being collected.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no messages are currently in flight.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn concatenate<I>(entry: Entry<I>) -> Bytes {
    let mut out = BytesMut::new();
    for index in 0..entry.total_chunks {
        if let Some(chunk) = entry.chunks.get(&index) {
            out.extend_from_slice(chunk);
        }
    }
    out.freeze()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::env::test_support::SimEnvironment;
    use std::time::Duration;

    #[test]
    fn single_chunk_message_completes_immediately() {
        let mut map = ReassemblyMap::<SimEnvironment>::new(60.0, 1_000_000);
        let env = SimEnvironment::new();
        let result = map
            .insert(1, 0, 0, 1, 0, Bytes::from_static(b"hello"), env.now())
            .expect("should succeed");
        assert_eq!(result, Some(Bytes::from_static(b"hello")));
        assert!(map.is_empty());
    }

    #[test]
    fn multi_chunk_message_waits_for_all_chunks() {
        let mut map = ReassemblyMap::<SimEnvironment>::new(60.0, 1_000_000);
        let env = SimEnvironment::new();
        assert_eq!(
            map.insert(1, 0, 0, 2, 0, Bytes::from_static(b"hel"), env.now()).unwrap(),
            None
        );
        assert_eq!(map.len(), 1);
        let result = map.insert(1, 0, 1, 2, 0, Bytes::from_static(b"lo"), env.now()).unwrap();
        assert_eq!(result, Some(Bytes::from_static(b"hello")));
        assert!(map.is_empty());
    }

    #[test]
    fn chunks_out_of_order_still_reassemble_correctly() {
        let mut map = ReassemblyMap::<SimEnvironment>::new(60.0, 1_000_000);
        let env = SimEnvironment::new();
        assert_eq!(
            map.insert(1, 0, 2, 3, 0, Bytes::from_static(b"c"), env.now()).unwrap(),
            None
        );
        assert_eq!(
            map.insert(1, 0, 0, 3, 0, Bytes::from_static(b"a"), env.now()).unwrap(),
            None
        );
        let result = map.insert(1, 0, 1, 3, 0, Bytes::from_static(b"b"), env.now()).unwrap();
        assert_eq!(result, Some(Bytes::from_static(b"abc")));
    }

    #[test]
    fn mismatched_total_chunks_is_rejected_and_entry_preserved() {
        let mut map = ReassemblyMap::<SimEnvironment>::new(60.0, 1_000_000);
        let env = SimEnvironment::new();
        map.insert(1, 0, 0, 2, 0, Bytes::from_static(b"a"), env.now()).unwrap();
        let err = map.insert(1, 0, 1, 3, 0, Bytes::from_static(b"b"), env.now());
        assert!(matches!(err, Err(YxError::InconsistentChunk { channel_id: 1, sequence: 0 })));
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn mismatched_proto_opts_is_rejected() {
        let mut map = ReassemblyMap::<SimEnvironment>::new(60.0, 1_000_000);
        let env = SimEnvironment::new();
        map.insert(1, 0, 0, 2, 0, Bytes::from_static(b"a"), env.now()).unwrap();
        let err = map.insert(1, 0, 1, 2, 1, Bytes::from_static(b"b"), env.now());
        assert!(matches!(err, Err(YxError::InconsistentChunk { .. })));
    }

    #[test]
    fn oversized_total_chunks_is_rejected() {
        let mut map = ReassemblyMap::<SimEnvironment>::new(60.0, 10);
        let env = SimEnvironment::new();
        let err = map.insert(1, 0, 0, 11, 0, Bytes::from_static(b"a"), env.now());
        assert!(matches!(err, Err(YxError::MalformedFrame(_))));
    }

    #[test]
    fn stale_entry_is_reaped_after_timeout() {
        let mut map = ReassemblyMap::<SimEnvironment>::new(60.0, 1_000_000);
        let env = SimEnvironment::new();
        map.insert(1, 0, 0, 2, 0, Bytes::from_static(b"a"), env.now()).unwrap();
        env.advance(Duration::from_secs(61));
        let reaped = map.reap_expired(env.now());
        assert_eq!(reaped, vec![(1, 0)]);
        assert!(map.is_empty());
    }

    #[test]
    fn fresh_entry_is_not_reaped() {
        let mut map = ReassemblyMap::<SimEnvironment>::new(60.0, 1_000_000);
        let env = SimEnvironment::new();
        map.insert(1, 0, 0, 2, 0, Bytes::from_static(b"a"), env.now()).unwrap();
        env.advance(Duration::from_secs(30));
        let reaped = map.reap_expired(env.now());
        assert!(reaped.is_empty());
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn duplicate_chunk_at_same_index_is_dropped_and_first_body_is_kept() {
        let mut map = ReassemblyMap::<SimEnvironment>::new(60.0, 1_000_000);
        let env = SimEnvironment::new();
        assert_eq!(
            map.insert(1, 0, 0, 2, 0, Bytes::from_static(b"first"), env.now()).unwrap(),
            None
        );
        assert_eq!(
            map.insert(1, 0, 0, 2, 0, Bytes::from_static(b"second"), env.now()).unwrap(),
            None
        );
        let result = map.insert(1, 0, 1, 2, 0, Bytes::from_static(b"!"), env.now()).unwrap();
        assert_eq!(result, Some(Bytes::from_static(b"first!")));
    }

    #[test]
    fn distinct_sequences_on_same_channel_are_independent() {
        let mut map = ReassemblyMap::<SimEnvironment>::new(60.0, 1_000_000);
        let env = SimEnvironment::new();
        map.insert(1, 0, 0, 2, 0, Bytes::from_static(b"a"), env.now()).unwrap();
        map.insert(1, 1, 0, 2, 0, Bytes::from_static(b"x"), env.now()).unwrap();
        assert_eq!(map.len(), 2);
    }
}
