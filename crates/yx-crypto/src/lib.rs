//! YX Cryptographic Primitives
//!
//! Pure functions for the three cryptographic building blocks the protocol
//! uses: truncated HMAC-SHA256 for integrity, AES-256-GCM for confidentiality,
//! and raw DEFLATE for compression. Random nonces are either caller-supplied
//! (deterministic testing) or drawn from the OS RNG (production), following
//! the same "pure functions, caller provides randomness" discipline used
//! throughout this protocol family.
//!
//! # Ordering
//!
//! Sender: compress, then encrypt, then chunk. Receiver: reassemble, then
//! decrypt, then decompress. These orderings are protocol-mandated; other
//! orders are non-conforming.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod cipher;
pub mod compression;
pub mod error;
pub mod integrity;

pub use cipher::{
    KEY_SIZE as AES_KEY_SIZE, NONCE_SIZE as AES_NONCE_SIZE, decrypt, encrypt, encrypt_with_os_rng,
};
pub use compression::{DEFAULT_LEVEL, compress, decompress};
pub use error::{CryptoError, Result};
pub use integrity::{KEY_SIZE, TAG_SIZE, compute_tag, verify_tag};
