//! Truncated HMAC-SHA256 integrity tags.
//!
//! The tag doubles as the outer frame's integrity check and, via the
//! receiver pipeline, the replay cache's nonce. Truncation happens after
//! finalization, never before.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

/// Length of a computed tag in bytes.
pub const TAG_SIZE: usize = 16;

/// Length of a symmetric key in bytes.
pub const KEY_SIZE: usize = 32;

type HmacSha256 = Hmac<Sha256>;

/// Compute HMAC-SHA256 over `data` under `key`, truncated to the leading
/// [`TAG_SIZE`] bytes of the 32-byte digest.
///
/// # Panics
///
/// Never: `Hmac::new_from_slice` accepts keys of any length.
#[must_use]
pub fn compute_tag(key: &[u8; KEY_SIZE], data: &[u8]) -> [u8; TAG_SIZE] {
    let mut mac = <HmacSha256 as Mac>::new_from_slice(key)
        .unwrap_or_else(|_| unreachable!("HMAC accepts keys of any length"));
    mac.update(data);
    let digest = mac.finalize().into_bytes();

    let mut tag = [0u8; TAG_SIZE];
    tag.copy_from_slice(&digest[..TAG_SIZE]);
    tag
}

/// Constant-time comparison of a received tag against the expected one.
///
/// Never distinguishes "tag didn't match because the data was modified"
/// from "tag didn't match because the key was wrong" - both are a single
/// `IntegrityFailed` outcome to the caller.
#[must_use]
pub fn verify_tag(expected: &[u8; TAG_SIZE], received: &[u8; TAG_SIZE]) -> bool {
    expected.ct_eq(received).into()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn same_input_same_tag() {
        let key = [0x42; KEY_SIZE];
        let data = b"guid-or-payload-bytes";
        assert_eq!(compute_tag(&key, data), compute_tag(&key, data));
    }

    #[test]
    fn verify_accepts_matching_tag() {
        let key = [0x11; KEY_SIZE];
        let data = b"hello world";
        let tag = compute_tag(&key, data);
        assert!(verify_tag(&tag, &tag));
    }

    proptest! {
        #[test]
        fn different_keys_produce_different_tags(
            key_a in prop::array::uniform32(any::<u8>()),
            key_b in prop::array::uniform32(any::<u8>()),
            data in prop::collection::vec(any::<u8>(), 0..256),
        ) {
            prop_assume!(key_a != key_b);
            let tag_a = compute_tag(&key_a, &data);
            let tag_b = compute_tag(&key_b, &data);
            prop_assert_ne!(tag_a, tag_b);
        }

        #[test]
        fn single_bit_flip_changes_tag(
            key in prop::array::uniform32(any::<u8>()),
            mut data in prop::collection::vec(any::<u8>(), 1..256),
            flip_index in 0usize..255,
        ) {
            let index = flip_index % data.len();
            let original_tag = compute_tag(&key, &data);
            data[index] ^= 0x01;
            let flipped_tag = compute_tag(&key, &data);
            prop_assert_ne!(original_tag, flipped_tag);
        }

        #[test]
        fn wrong_key_fails_verification(
            key_a in prop::array::uniform32(any::<u8>()),
            key_b in prop::array::uniform32(any::<u8>()),
            data in prop::collection::vec(any::<u8>(), 0..256),
        ) {
            prop_assume!(key_a != key_b);
            let tag = compute_tag(&key_a, &data);
            let forged = compute_tag(&key_b, &data);
            prop_assert!(!verify_tag(&tag, &forged));
        }
    }
}
