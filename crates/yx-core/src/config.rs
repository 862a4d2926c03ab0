//! Configuration options and their normative defaults.
//!
//! Loading these from a file or environment is an application concern
//! (explicitly out of scope); this type is constructed programmatically or
//! via [`Default`].

use std::collections::HashSet;

use yx_proto::Guid;

use crate::error::{Result, YxError};

/// All tunables for the YX protocol engine, with defaults matching the
/// wire-format specification exactly. `max_requests` is cross-implementation
/// load-bearing: a mismatched value silently breaks interoperability with
/// high-rate peers.
#[derive(Debug, Clone, PartialEq)]
pub struct YxConfig {
    /// UDP port to bind to.
    pub udp_port: u16,
    /// Broadcast destination address.
    pub broadcast_address: String,
    /// Maximum bytes per outgoing chunk body.
    pub chunk_size: usize,
    /// Maximum chunks a single message may be split into. Defense-in-depth
    /// bound beyond the buffer timeout; an oversized `totalChunks` claim on
    /// a received chunk is rejected as malformed rather than allocating a
    /// vector sized to an attacker-controlled number.
    pub max_chunks_per_message: u32,
    /// Seconds a reassembly entry may live before eviction.
    pub buffer_timeout_secs: f64,
    /// Seconds a dedup entry suppresses re-delivery.
    pub dedup_window_secs: f64,
    /// Maximum accepted requests per peer within `rate_window_secs`.
    pub max_requests: usize,
    /// Width of the rate limiter's sliding window, in seconds.
    pub rate_window_secs: f64,
    /// Seconds a replay nonce is remembered.
    pub replay_ttl_secs: f64,
    /// Replay cache size threshold that triggers opportunistic cleanup.
    pub replay_cleanup_threshold: usize,
    /// Whether packets from this process's own GUID are delivered.
    pub process_own_packets: bool,
    /// Raw DEFLATE compression level (0-9).
    pub compression_level: u32,
    /// GUIDs that bypass the rate limiter entirely, regardless of request
    /// volume.
    pub trusted_guids: HashSet<Guid>,
}

impl Default for YxConfig {
    fn default() -> Self {
        Self {
            udp_port: 50000,
            broadcast_address: "255.255.255.255".to_string(),
            chunk_size: 1024,
            max_chunks_per_message: 1_000_000,
            buffer_timeout_secs: 60.0,
            dedup_window_secs: 5.0,
            max_requests: 10_000,
            rate_window_secs: 60.0,
            replay_ttl_secs: 300.0,
            replay_cleanup_threshold: 100,
            process_own_packets: true,
            compression_level: 6,
            trusted_guids: HashSet::new(),
        }
    }
}

impl YxConfig {
    /// Validate configuration invariants that must hold before the engine
    /// starts processing packets.
    ///
    /// # Errors
    ///
    /// Returns [`YxError::Config`] if `chunk_size` is zero, `compression_level`
    /// exceeds 9, or `max_requests` is zero.
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(YxError::Config("chunk_size must be non-zero".to_string()));
        }
        if self.compression_level > 9 {
            return Err(YxError::Config(format!(
                "compression_level must be 0-9, got {}",
                self.compression_level
            )));
        }
        if self.max_requests == 0 {
            return Err(YxError::Config("max_requests must be non-zero".to_string()));
        }
        Ok(())
    }
}
