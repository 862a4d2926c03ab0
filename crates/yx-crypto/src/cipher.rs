//! AES-256-GCM encryption.
//!
//! Pure functions: the caller supplies the random nonce, which keeps this
//! module deterministic for testing while [`encrypt_with_os_rng`] covers the
//! production path. The wire form is `nonce(12) || ciphertext||tag(16)`; the
//! AEAD produces and consumes the 16-byte tag internally.

use aes_gcm::{
    Aes256Gcm, Key, Nonce,
    aead::{Aead, KeyInit, OsRng, rand_core::RngCore},
};

use crate::error::{CryptoError, Result};

/// Length of the random nonce in bytes.
pub const NONCE_SIZE: usize = 12;

/// Length of the GCM authentication tag in bytes.
pub const TAG_SIZE: usize = 16;

/// Length of an AES-256 key in bytes.
pub const KEY_SIZE: usize = 32;

/// Encrypt `plaintext` under `key` using the given `nonce`.
///
/// Returns `nonce || ciphertext||tag`. No associated data is used.
///
/// # Panics
///
/// Never: AES-256-GCM encryption cannot fail for valid key/nonce lengths,
/// which are enforced by the fixed-size parameter types.
#[must_use]
pub fn encrypt(key: &[u8; KEY_SIZE], nonce: [u8; NONCE_SIZE], plaintext: &[u8]) -> Vec<u8> {
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key));
    let Ok(ciphertext) = cipher.encrypt(Nonce::from_slice(&nonce), plaintext) else {
        unreachable!("AES-256-GCM encryption cannot fail with valid inputs");
    };

    let mut out = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
    out.extend_from_slice(&nonce);
    out.extend_from_slice(&ciphertext);
    out
}

/// Encrypt `plaintext` under `key`, drawing a fresh random nonce from the
/// OS RNG. This is the production entry point; [`encrypt`] is used directly
/// by tests that need deterministic nonces.
#[must_use]
pub fn encrypt_with_os_rng(key: &[u8; KEY_SIZE], plaintext: &[u8]) -> Vec<u8> {
    let mut nonce = [0u8; NONCE_SIZE];
    OsRng.fill_bytes(&mut nonce);
    encrypt(key, nonce, plaintext)
}

/// Decrypt a `nonce || ciphertext||tag` blob produced by [`encrypt`].
///
/// # Errors
///
/// - [`CryptoError::CiphertextTooShort`] if fewer than
///   `NONCE_SIZE + TAG_SIZE` bytes are given.
/// - [`CryptoError::DecryptionFailed`] if authentication fails (wrong key,
///   tampered ciphertext, or wrong nonce).
pub fn decrypt(key: &[u8; KEY_SIZE], data: &[u8]) -> Result<Vec<u8>> {
    if data.len() < NONCE_SIZE + TAG_SIZE {
        return Err(CryptoError::CiphertextTooShort {
            expected: NONCE_SIZE + TAG_SIZE,
            actual: data.len(),
        });
    }

    let (nonce, ciphertext) = data.split_at(NONCE_SIZE);
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key));
    cipher.decrypt(Nonce::from_slice(nonce), ciphertext).map_err(|_| CryptoError::DecryptionFailed)
}
