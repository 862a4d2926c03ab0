//! Binary protocol handler.
//!
//! Splits an outgoing message into fixed-size chunks, each prefixed with a
//! 16-byte [`ChunkHeader`]; optionally compresses and/or encrypts the body
//! before chunking. On the receiving side, chunks for the same
//! `(channelID, sequence)` are buffered by [`crate::reassembly`] and, once
//! complete, decrypted then decompressed in the reverse order.
//!
//! Ordering is fixed: compress, then encrypt, then chunk on send;
//! reassemble, then decrypt, then decompress on receive. Encrypting
//! compressed data (rather than the reverse) keeps ciphertext
//! indistinguishable from the compressor's length-revealing output.

use bytes::{BufMut, Bytes, BytesMut};
use yx_proto::{ChunkHeader, Protocol, ProtoOpts};

use crate::error::{Result, YxError};

/// One outgoing chunk: a 16-byte header followed by its body.
pub struct OutgoingChunk {
    /// The chunk's header.
    pub header: ChunkHeader,
    /// The chunk's body (a slice of the processed message).
    pub body: Bytes,
}

/// Split `message` into chunks of at most `chunk_size` bytes, after
/// optionally compressing and/or encrypting it.
///
/// An empty message still produces exactly one chunk (with an empty
/// body and `total_chunks == 1`), per the single-chunk-for-empty-message
/// rule.
///
/// # Errors
///
/// Returns [`YxError::CompressionFailed`] if compression somehow fails
/// (the underlying DEFLATE encoder is effectively infallible over
/// in-memory buffers, but the path exists for consistency with decode).
pub fn prepare(
    message: &[u8],
    channel_id: u16,
    sequence: u32,
    chunk_size: usize,
    compress: bool,
    compression_level: u32,
    encrypt_key: Option<&[u8; yx_crypto::KEY_SIZE]>,
    nonce_source: &mut impl FnMut() -> [u8; yx_crypto::AES_NONCE_SIZE],
) -> Result<Vec<OutgoingChunk>> {
    let mut opts_byte = 0u8;
    let mut processed = message.to_vec();

    if compress {
        processed = yx_crypto::compress(&processed, compression_level);
        opts_byte |= ProtoOpts::COMPRESSED;
    }

    if let Some(key) = encrypt_key {
        let nonce = nonce_source();
        processed = yx_crypto::encrypt(key, nonce, &processed);
        opts_byte |= ProtoOpts::ENCRYPTED;
    }

    let opts = ProtoOpts::from_byte(opts_byte);

    let chunk_size = chunk_size.max(1);
    let bodies: Vec<Bytes> = if processed.is_empty() {
        vec![Bytes::new()]
    } else {
        processed.chunks(chunk_size).map(Bytes::copy_from_slice).collect()
    };

    let total_chunks = u32::try_from(bodies.len())
        .map_err(|_| YxError::MalformedFrame("message produced too many chunks".to_string()))?;

    bodies
        .into_iter()
        .enumerate()
        .map(|(index, body)| {
            let chunk_index = u32::try_from(index).expect("index bounded by total_chunks");
            let header = ChunkHeader::new(opts, channel_id, sequence, chunk_index, total_chunks)?;
            Ok(OutgoingChunk { header, body })
        })
        .collect()
}

/// Serialize a chunk (header followed by body) for transmission as the
/// inner payload of a binary message.
#[must_use]
pub fn encode_chunk(chunk: &OutgoingChunk) -> Bytes {
    let header_bytes = chunk.header.to_bytes();
    let mut buffer = BytesMut::with_capacity(1 + header_bytes.len() + chunk.body.len());
    buffer.put_u8(Protocol::Binary.marker());
    buffer.put_slice(&header_bytes);
    buffer.put_slice(&chunk.body);
    buffer.freeze()
}

/// A single received chunk, header and body split out from the routed
/// payload (marker byte already stripped).
pub struct IncomingChunk {
    /// The parsed chunk header.
    pub header: ChunkHeader,
    /// The chunk body.
    pub body: Bytes,
}

/// Parse a binary protocol body (marker already stripped by routing) into
/// its header and remaining body bytes.
///
/// # Errors
///
/// Returns [`YxError::MalformedFrame`] if `body` is shorter than
/// [`ChunkHeader::SIZE`], or [`YxError::InconsistentChunk`]-shaped errors
/// surfaced by [`ChunkHeader::from_bytes`] for out-of-range chunk bounds
/// (reported here as malformed, since no channel/sequence context exists
/// yet at this layer).
pub fn parse_chunk(body: &Bytes) -> Result<IncomingChunk> {
    let header = ChunkHeader::from_bytes(body)?;
    let remainder = body.slice(ChunkHeader::SIZE..);
    Ok(IncomingChunk { header, body: remainder })
}

/// Reverse [`prepare`]'s processing once all chunks for a message have
/// been reassembled into `reassembled`.
///
/// # Errors
///
/// Returns [`YxError::DecryptionFailed`] if `proto_opts` indicates
/// encryption and no key is supplied or authentication fails, and
/// [`YxError::CompressionFailed`] if `proto_opts` indicates compression
/// and decompression fails.
pub fn finish(reassembled: Bytes, proto_opts: u8, decrypt_key: Option<&[u8; yx_crypto::KEY_SIZE]>) -> Result<Vec<u8>> {
    let opts = ProtoOpts::from_byte(proto_opts);
    let mut processed = reassembled.to_vec();

    if opts.is_encrypted() {
        let key = decrypt_key.ok_or(YxError::DecryptionFailed)?;
        processed = yx_crypto::decrypt(key, &processed)?;
    }

    if opts.is_compressed() {
        processed = yx_crypto::decompress(&processed)?;
    }

    Ok(processed)
}
