//! Outer packet framing.
//!
//! Every YX packet on the wire is the concatenation `tag(16) || guid(6) ||
//! payload(>=0)`. The codec never inspects the payload; it only enforces the
//! minimum total size and keeps the three regions contiguous for an
//! integrity check to be applied by the caller.

use bytes::{BufMut, Bytes};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use crate::{
    error::{ProtocolError, Result},
    guid::{GUID_SIZE, Guid},
};

/// Size of the integrity tag (truncated HMAC-SHA256).
pub const TAG_SIZE: usize = 16;

/// Fixed 22-byte prefix: `tag(16) || guid(6)`.
#[repr(C, packed)]
#[derive(Clone, Copy, FromBytes, IntoBytes, KnownLayout, Immutable)]
struct OuterPrefix {
    tag: [u8; TAG_SIZE],
    guid: [u8; GUID_SIZE],
}

/// The outer packet: integrity tag, sender GUID, and opaque payload.
///
/// # Invariants
///
/// - Total encoded size is always >= [`OuterFrame::MIN_SIZE`] (22 bytes).
/// - The payload is never inspected by this type; its first byte selects the
///   inner protocol, but that dispatch happens one layer up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OuterFrame {
    /// 16-byte integrity tag (truncated HMAC-SHA256 over `guid || payload`).
    pub tag: [u8; TAG_SIZE],
    /// 6-byte sender GUID.
    pub guid: Guid,
    /// Opaque payload bytes.
    pub payload: Bytes,
}

impl OuterFrame {
    /// Minimum valid encoded size: tag + guid with an empty payload.
    pub const MIN_SIZE: usize = TAG_SIZE + GUID_SIZE;

    /// Build a new outer frame. The tag must already have been computed by
    /// the caller (this type does not perform cryptographic operations).
    #[must_use]
    pub fn new(tag: [u8; TAG_SIZE], guid: Guid, payload: impl Into<Bytes>) -> Self {
        Self { tag, guid, payload: payload.into() }
    }

    /// The bytes the integrity tag is computed/verified over: `guid ||
    /// payload`, exactly 6 GUID bytes followed by the entire payload.
    #[must_use]
    pub fn signing_data(&self) -> Vec<u8> {
        let mut data = Vec::with_capacity(GUID_SIZE + self.payload.len());
        data.extend_from_slice(self.guid.as_bytes());
        data.extend_from_slice(&self.payload);
        data
    }

    /// Encode as `tag || guid || payload`.
    pub fn encode(&self, dst: &mut impl BufMut) {
        let prefix = OuterPrefix { tag: self.tag, guid: *self.guid.as_bytes() };
        dst.put_slice(prefix.as_bytes());
        dst.put_slice(&self.payload);
    }

    /// Encode into a freshly allocated buffer.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(Self::MIN_SIZE + self.payload.len());
        self.encode(&mut buf);
        buf
    }

    /// Parse `tag || guid || payload` from the wire.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::FrameTooShort`] if `bytes.len() <
    /// Self::MIN_SIZE`. This does not verify the tag; verification requires
    /// the key store and is performed by the receiver pipeline.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let Ok((prefix, payload)) = OuterPrefix::read_from_prefix(bytes) else {
            return Err(ProtocolError::FrameTooShort { expected: Self::MIN_SIZE, actual: bytes.len() });
        };

        Ok(Self {
            tag: prefix.tag,
            guid: Guid::from_array(prefix.guid),
            payload: Bytes::copy_from_slice(payload),
        })
    }
}
