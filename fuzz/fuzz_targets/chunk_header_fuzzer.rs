//! Fuzz target for the binary protocol's chunk header and chunk parser.
//!
//! The chunk header is the second structurally adversarial surface: it
//! carries attacker-controlled `chunkIndex`/`totalChunks` bounds that feed
//! directly into reassembly buffer sizing, so an off-by-one here is a
//! memory-safety or resource-exhaustion bug one layer up, not just a
//! parse error.
//!
//! # Invariants
//!
//! - `totalChunks == 0` or `chunkIndex >= totalChunks` MUST be rejected by
//!   both `ChunkHeader::from_bytes` and `yx_core::binary::parse_chunk`,
//!   never panic or produce a header with invalid bounds.
//! - Fewer than 16 bytes MUST return `HeaderTooShort`, never panic.
//! - A header that parses successfully MUST round-trip byte-for-byte
//!   through `to_bytes`.
//! - `parse_chunk` MUST leave the header's reported body length equal to
//!   `body.len() - ChunkHeader::SIZE`.

#![no_main]

use bytes::Bytes;
use libfuzzer_sys::fuzz_target;
use yx_core::binary;
use yx_proto::ChunkHeader;

fuzz_target!(|data: &[u8]| {
    match ChunkHeader::from_bytes(data) {
        Ok(header) => {
            assert!(header.total_chunks() > 0);
            assert!(header.chunk_index() < header.total_chunks());

            let bytes = header.to_bytes();
            let reparsed = ChunkHeader::from_bytes(&bytes).expect("a header we just encoded must re-decode");
            assert_eq!(reparsed, header);
        }
        Err(_) => {
            if data.len() >= ChunkHeader::SIZE {
                // bounds must have been the rejection reason, not a parse failure
                let chunk_index = u32::from_be_bytes([data[8], data[9], data[10], data[11]]);
                let total_chunks = u32::from_be_bytes([data[12], data[13], data[14], data[15]]);
                assert!(total_chunks == 0 || chunk_index >= total_chunks);
            }
        }
    }

    let body = Bytes::copy_from_slice(data);
    if let Ok(incoming) = binary::parse_chunk(&body) {
        assert_eq!(incoming.body.len(), data.len() - ChunkHeader::SIZE);
    }
});
