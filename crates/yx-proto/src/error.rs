//! Wire-level parse errors.
//!
//! These arise purely from malformed bytes, before any key lookup or
//! behavioral policy is applied. See `yx_core::YxError` for the full
//! runtime error taxonomy that wraps these.

use thiserror::Error;

/// Errors from parsing the outer frame or the binary chunk header.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Input shorter than the minimum frame size (22 bytes).
    #[error("frame too short: expected at least {expected} bytes, got {actual}")]
    FrameTooShort {
        /// Minimum required length.
        expected: usize,
        /// Actual length received.
        actual: usize,
    },

    /// Binary chunk header shorter than 16 bytes.
    #[error("chunk header too short: expected {expected} bytes, got {actual}")]
    HeaderTooShort {
        /// Required header length (16).
        expected: usize,
        /// Actual length received.
        actual: usize,
    },

    /// `chunkIndex` was not strictly less than `totalChunks`, or
    /// `totalChunks` was zero.
    #[error("invalid chunk bounds: index {chunk_index}, total {total_chunks}")]
    InvalidChunkBounds {
        /// Declared 0-based chunk index.
        chunk_index: u32,
        /// Declared total chunk count.
        total_chunks: u32,
    },

    /// Payload was empty where at least a protocol marker byte is required.
    #[error("empty payload")]
    EmptyPayload,
}

/// Convenience alias used throughout `yx-proto`.
pub type Result<T> = std::result::Result<T, ProtocolError>;
