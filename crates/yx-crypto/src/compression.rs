//! Raw DEFLATE compression (no zlib/gzip wrapper).

use std::io::Write;

use flate2::{Compression, write::DeflateDecoder, write::DeflateEncoder};

use crate::error::{CryptoError, Result};

/// Default compression level (0-9), matching the protocol's normative
/// default.
pub const DEFAULT_LEVEL: u32 = 6;

/// Compress `data` with raw DEFLATE at the given level (0-9).
///
/// # Panics
///
/// Never: writing to and finishing an in-memory `DeflateEncoder` cannot
/// fail.
#[must_use]
pub fn compress(data: &[u8], level: u32) -> Vec<u8> {
    let mut encoder = DeflateEncoder::new(Vec::new(), Compression::new(level));
    encoder.write_all(data).unwrap_or_else(|_| unreachable!("in-memory write cannot fail"));
    encoder.finish().unwrap_or_else(|_| unreachable!("in-memory finish cannot fail"))
}

/// Decompress a raw DEFLATE stream.
///
/// # Errors
///
/// Returns [`CryptoError::CompressionFailed`] if `data` is not a valid raw
/// DEFLATE stream.
pub fn decompress(data: &[u8]) -> Result<Vec<u8>> {
    let mut decoder = DeflateDecoder::new(Vec::new());
    decoder
        .write_all(data)
        .map_err(|error| CryptoError::CompressionFailed { reason: error.to_string() })?;
    decoder.finish().map_err(|error| CryptoError::CompressionFailed { reason: error.to_string() })
}
