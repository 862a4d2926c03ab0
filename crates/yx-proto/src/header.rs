//! Binary protocol (Protocol 1) chunk header.
//!
//! A fixed 16-byte, big-endian header precedes every chunk body. It carries
//! enough information to route, reassemble, and post-process a message
//! without touching the chunk body itself.

use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use crate::error::{ProtocolError, Result};

/// Bit flags carried in the `protoOpts` byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProtoOpts(u8);

impl ProtoOpts {
    /// Bit 0: payload was DEFLATE-compressed before (optional) encryption.
    pub const COMPRESSED: u8 = 0x01;
    /// Bit 1: payload was AES-256-GCM encrypted after (optional) compression.
    pub const ENCRYPTED: u8 = 0x02;

    /// Wrap a raw byte. Reserved bits are preserved, not cleared, so a
    /// later chunk's opts can be compared byte-for-byte against the first.
    #[must_use]
    pub fn from_byte(byte: u8) -> Self {
        Self(byte)
    }

    /// The raw byte.
    #[must_use]
    pub fn to_byte(self) -> u8 {
        self.0
    }

    /// Whether the compression bit is set.
    #[must_use]
    pub fn is_compressed(self) -> bool {
        self.0 & Self::COMPRESSED != 0
    }

    /// Whether the encryption bit is set.
    #[must_use]
    pub fn is_encrypted(self) -> bool {
        self.0 & Self::ENCRYPTED != 0
    }
}

/// Fixed 16-byte binary chunk header (big-endian network byte order).
///
/// | Offset | Bytes | Field |
/// |---|---|---|
/// | 0 | 1 | proto (always `0x01`) |
/// | 1 | 1 | protoOpts |
/// | 2 | 2 | channelID |
/// | 4 | 4 | sequence |
/// | 8 | 4 | chunkIndex |
/// | 12 | 4 | totalChunks |
#[repr(C, packed)]
#[derive(Clone, Copy, FromBytes, IntoBytes, KnownLayout, Immutable, PartialEq, Eq, Debug)]
pub struct ChunkHeader {
    proto: u8,
    proto_opts: u8,
    channel_id: [u8; 2],
    sequence: [u8; 4],
    chunk_index: [u8; 4],
    total_chunks: [u8; 4],
}

impl ChunkHeader {
    /// Serialized size in bytes.
    pub const SIZE: usize = 16;

    /// Protocol discriminant for the binary handler.
    pub const PROTO: u8 = 0x01;

    /// Build a new chunk header.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::InvalidChunkBounds`] if `total_chunks == 0`
    /// or `chunk_index >= total_chunks`.
    pub fn new(
        proto_opts: ProtoOpts,
        channel_id: u16,
        sequence: u32,
        chunk_index: u32,
        total_chunks: u32,
    ) -> Result<Self> {
        if total_chunks == 0 || chunk_index >= total_chunks {
            return Err(ProtocolError::InvalidChunkBounds { chunk_index, total_chunks });
        }

        Ok(Self {
            proto: Self::PROTO,
            proto_opts: proto_opts.to_byte(),
            channel_id: channel_id.to_be_bytes(),
            sequence: sequence.to_be_bytes(),
            chunk_index: chunk_index.to_be_bytes(),
            total_chunks: total_chunks.to_be_bytes(),
        })
    }

    /// Parse a header from the front of `bytes`. Any trailing bytes are the
    /// chunk body and are not consumed.
    ///
    /// # Errors
    ///
    /// - [`ProtocolError::HeaderTooShort`] if fewer than 16 bytes are given.
    /// - [`ProtocolError::InvalidChunkBounds`] if `totalChunks == 0` or
    ///   `chunkIndex >= totalChunks`.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let Ok((header, _rest)) = Self::read_from_prefix(bytes) else {
            return Err(ProtocolError::HeaderTooShort { expected: Self::SIZE, actual: bytes.len() });
        };

        let total_chunks = header.total_chunks();
        let chunk_index = header.chunk_index();
        if total_chunks == 0 || chunk_index >= total_chunks {
            return Err(ProtocolError::InvalidChunkBounds { chunk_index, total_chunks });
        }

        Ok(header)
    }

    /// Serialize to a fixed 16-byte array.
    #[must_use]
    pub fn to_bytes(self) -> [u8; Self::SIZE] {
        let mut arr = [0u8; Self::SIZE];
        arr.copy_from_slice(self.as_bytes());
        arr
    }

    /// Protocol discriminant (should always equal [`Self::PROTO`] once
    /// dispatched here).
    #[must_use]
    pub fn proto(&self) -> u8 {
        self.proto
    }

    /// Compression/encryption option bits.
    #[must_use]
    pub fn proto_opts(&self) -> ProtoOpts {
        ProtoOpts::from_byte(self.proto_opts)
    }

    /// 16-bit channel namespace.
    #[must_use]
    pub fn channel_id(&self) -> u16 {
        u16::from_be_bytes(self.channel_id)
    }

    /// Per-channel message sequence number.
    #[must_use]
    pub fn sequence(&self) -> u32 {
        u32::from_be_bytes(self.sequence)
    }

    /// 0-based index of this chunk within the message.
    #[must_use]
    pub fn chunk_index(&self) -> u32 {
        u32::from_be_bytes(self.chunk_index)
    }

    /// Total number of chunks in the message.
    #[must_use]
    pub fn total_chunks(&self) -> u32 {
        u32::from_be_bytes(self.total_chunks)
    }
}
