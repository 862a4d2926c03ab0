//! Drop-reason counters.
//!
//! Every packet the receive pipeline discards increments exactly one
//! counter here, so an operator can tell a flood of malformed frames
//! apart from a key mismatch or a misbehaving rate-limited peer without
//! reading forensic log entries one at a time.

use std::sync::atomic::{AtomicU64, Ordering};

/// Atomic counters for packets dropped by the receive pipeline.
#[derive(Default)]
pub struct Counters {
    malformed: AtomicU64,
    integrity_failed: AtomicU64,
    replay: AtomicU64,
    rate_limited: AtomicU64,
}

/// A point-in-time read of all counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CountersSnapshot {
    /// Packets dropped for failing to parse as a valid frame or header.
    pub malformed: u64,
    /// Packets dropped for failing HMAC verification.
    pub integrity_failed: u64,
    /// Packets dropped as replays of a previously-seen tag.
    pub replay: u64,
    /// Packets dropped for exceeding the sender's rate limit.
    pub rate_limited: u64,
}

impl Counters {
    /// Create all counters at zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a malformed-frame drop.
    pub fn record_malformed(&self) {
        self.malformed.fetch_add(1, Ordering::Relaxed);
    }

    /// Record an integrity-check-failed drop.
    pub fn record_integrity_failed(&self) {
        self.integrity_failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a replay drop.
    pub fn record_replay(&self) {
        self.replay.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a rate-limited drop.
    pub fn record_rate_limited(&self) {
        self.rate_limited.fetch_add(1, Ordering::Relaxed);
    }

    /// Read all counters at once.
    #[must_use]
    pub fn snapshot(&self) -> CountersSnapshot {
        CountersSnapshot {
            malformed: self.malformed.load(Ordering::Relaxed),
            integrity_failed: self.integrity_failed.load(Ordering::Relaxed),
            replay: self.replay.load(Ordering::Relaxed),
            rate_limited: self.rate_limited.load(Ordering::Relaxed),
        }
    }
}
