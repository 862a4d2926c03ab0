//! Runtime error taxonomy.
//!
//! Every variant here is handled locally by dropping the offending input
//! and continuing; the protocol never signals errors back to a peer. Only
//! [`YxError::Config`] is fatal to the process - it can only arise during
//! key-store or configuration construction, before any packet is processed.

use thiserror::Error;

/// The full runtime error taxonomy for the YX protocol engine.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum YxError {
    /// Outer frame or binary chunk header failed to parse.
    #[error("malformed frame: {0}")]
    MalformedFrame(String),

    /// HMAC verification failed; does not distinguish tampering from a
    /// wrong key.
    #[error("integrity check failed")]
    IntegrityFailed,

    /// The outer tag was seen before within the replay TTL.
    #[error("replayed packet")]
    Replay,

    /// Sender exceeded `max_requests` within the rate window.
    #[error("rate limited")]
    RateLimited,

    /// Packet originated from this process's own GUID and
    /// `process_own_packets` is disabled. Never surfaced as a counter.
    #[error("dropped self-loop packet")]
    SelfLoop,

    /// `payload[0]` was outside `{0x00, 0x01}`.
    #[error("unknown protocol marker: {0:#04x}")]
    UnknownProtocol(u8),

    /// A later chunk disagreed with the `totalChunks`/`protoOpts` recorded
    /// by the first chunk of the same `(channelID, sequence)`.
    #[error("inconsistent chunk for channel {channel_id} sequence {sequence}")]
    InconsistentChunk {
        /// Channel the chunk belongs to.
        channel_id: u16,
        /// Message sequence within that channel.
        sequence: u32,
    },

    /// A reassembly entry aged out before all chunks arrived.
    #[error("reassembly timed out for channel {channel_id} sequence {sequence}")]
    ReassemblyTimeout {
        /// Channel the message belonged to.
        channel_id: u16,
        /// Message sequence within that channel.
        sequence: u32,
    },

    /// AES-256-GCM authentication failed during binary message decryption.
    #[error("decryption failed")]
    DecryptionFailed,

    /// Raw DEFLATE decompression failed during binary message
    /// post-processing.
    #[error("decompression failed: {0}")]
    CompressionFailed(String),

    /// Invalid key or port at configuration time. The only fatal variant.
    #[error("configuration error: {0}")]
    Config(String),
}

impl From<yx_proto::ProtocolError> for YxError {
    fn from(err: yx_proto::ProtocolError) -> Self {
        Self::MalformedFrame(err.to_string())
    }
}

impl From<yx_crypto::CryptoError> for YxError {
    fn from(err: yx_crypto::CryptoError) -> Self {
        match err {
            yx_crypto::CryptoError::DecryptionFailed
            | yx_crypto::CryptoError::CiphertextTooShort { .. } => Self::DecryptionFailed,
            yx_crypto::CryptoError::CompressionFailed { reason } => Self::CompressionFailed(reason),
        }
    }
}

/// Convenience alias used throughout `yx-core`.
pub type Result<T> = std::result::Result<T, YxError>;
