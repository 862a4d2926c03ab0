//! Forensic audit trail.
//!
//! [`Counters`](crate::metrics::Counters) answers "how many", this answers
//! "which packet and why" for an operator investigating a specific
//! incident. Implementations decide where entries go (in memory, to a
//! file, to a SIEM); [`MemoryForensicLog`] is a bounded ring buffer
//! suitable as a default.

use std::{
    collections::VecDeque,
    sync::Mutex,
    time::SystemTime,
};

use yx_proto::Guid;

/// Why a packet was recorded in the forensic log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    /// Failed to parse as a valid outer frame or binary chunk header.
    Malformed,
    /// HMAC verification failed.
    IntegrityFailed,
    /// The outer tag was seen before within the replay TTL.
    Replay,
    /// The sender exceeded its rate limit.
    RateLimited,
    /// AES-256-GCM authentication failed during decryption.
    DecryptionFailed,
    /// Raw DEFLATE decompression failed.
    DecompressionFailed,
}

/// One forensic record: what happened, to which packet, from whom.
#[derive(Debug, Clone, Copy)]
pub struct ForensicEntry {
    /// Wall-clock time the entry was recorded. Forensic timestamps are the
    /// one place this engine consults wall-clock time directly, since they
    /// are read by a human correlating against other systems, not used for
    /// any TTL or windowing decision.
    pub at: SystemTime,
    /// Sender GUID, if the packet was well-formed enough to extract one.
    pub sender: Option<Guid>,
    /// Why the packet was dropped.
    pub reason: DropReason,
}

/// Records why packets were dropped, for later inspection.
pub trait ForensicLog: Send + Sync {
    /// Append one entry.
    fn record(&self, entry: ForensicEntry);
}

/// A bounded in-memory ring buffer of the most recent forensic entries.
pub struct MemoryForensicLog {
    entries: Mutex<VecDeque<ForensicEntry>>,
    capacity: usize,
}

impl MemoryForensicLog {
    /// Create a log retaining at most `capacity` entries, discarding the
    /// oldest once full.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self { entries: Mutex::new(VecDeque::with_capacity(capacity)), capacity: capacity.max(1) }
    }

    /// Copy out the currently retained entries, oldest first.
    #[must_use]
    pub fn snapshot(&self) -> Vec<ForensicEntry> {
        self.entries.lock().unwrap_or_else(std::sync::PoisonError::into_inner).iter().copied().collect()
    }
}

impl ForensicLog for MemoryForensicLog {
    fn record(&self, entry: ForensicEntry) {
        let mut guard = self.entries.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        if guard.len() >= self.capacity {
            guard.pop_front();
        }
        guard.push_back(entry);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn records_are_retained_in_order() {
        let log = MemoryForensicLog::new(10);
        log.record(ForensicEntry { at: SystemTime::now(), sender: None, reason: DropReason::Malformed });
        log.record(ForensicEntry { at: SystemTime::now(), sender: None, reason: DropReason::Replay });

        let snapshot = log.snapshot();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot[0].reason, DropReason::Malformed);
        assert_eq!(snapshot[1].reason, DropReason::Replay);
    }

    #[test]
    fn ring_buffer_drops_oldest_once_full() {
        let log = MemoryForensicLog::new(2);
        log.record(ForensicEntry { at: SystemTime::now(), sender: None, reason: DropReason::Malformed });
        log.record(ForensicEntry { at: SystemTime::now(), sender: None, reason: DropReason::Replay });
        log.record(ForensicEntry { at: SystemTime::now(), sender: None, reason: DropReason::RateLimited });

        let snapshot = log.snapshot();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot[0].reason, DropReason::Replay);
        assert_eq!(snapshot[1].reason, DropReason::RateLimited);
    }
}
