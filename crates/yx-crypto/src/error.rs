//! Errors raised by cryptographic primitives.

use thiserror::Error;

/// Failures from encryption, decryption, or (de)compression.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CryptoError {
    /// AES-256-GCM authentication or decryption failed.
    ///
    /// Deliberately does not distinguish tampering from a wrong key - both
    /// present identically to an attacker.
    #[error("decryption failed")]
    DecryptionFailed,

    /// Encrypted payload was too short to contain a nonce and tag.
    #[error("encrypted payload too short: expected at least {expected} bytes, got {actual}")]
    CiphertextTooShort {
        /// Minimum length (12-byte nonce + 16-byte tag).
        expected: usize,
        /// Actual length received.
        actual: usize,
    },

    /// Raw DEFLATE stream failed to decompress.
    #[error("decompression failed: {reason}")]
    CompressionFailed {
        /// Underlying `flate2` error message.
        reason: String,
    },
}

/// Convenience alias used throughout `yx-crypto`.
pub type Result<T> = std::result::Result<T, CryptoError>;
