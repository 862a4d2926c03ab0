//! Fuzz target for the outer frame parser.
//!
//! The outer frame is the one piece of the wire format every received
//! byte string, no matter its origin, is parsed as first - it has to
//! survive arbitrary garbage without panicking or allocating unboundedly.
//!
//! # Invariants
//!
//! - Any input shorter than `OuterFrame::MIN_SIZE` (22 bytes) MUST return
//!   `ProtocolError::FrameTooShort`, never panic.
//! - `decode` never inspects the tag for validity - a structurally valid
//!   frame with a wrong tag still decodes; the caller (the receiver
//!   pipeline) is the one that recomputes and rejects it.
//! - `encode` followed by `decode` MUST reproduce the original tag, guid,
//!   and payload exactly.
//! - `signing_data()` MUST always be exactly `guid || payload`, never
//!   including the tag itself, or HMAC verification would be circular.

#![no_main]

use libfuzzer_sys::fuzz_target;
use yx_proto::{GUID_SIZE, OuterFrame};

fuzz_target!(|data: &[u8]| {
    match OuterFrame::decode(data) {
        Ok(frame) => {
            let signing_data = frame.signing_data();
            assert_eq!(signing_data.len(), GUID_SIZE + frame.payload.len());
            assert_eq!(&signing_data[..GUID_SIZE], frame.guid.as_bytes());
            assert_eq!(&signing_data[GUID_SIZE..], &frame.payload[..]);

            let reencoded = frame.to_bytes();
            let reparsed = OuterFrame::decode(&reencoded).expect("a frame we just encoded must decode");
            assert_eq!(reparsed.tag, frame.tag);
            assert_eq!(reparsed.guid, frame.guid);
            assert_eq!(reparsed.payload, frame.payload);
        }
        Err(_) => {
            assert!(data.len() < OuterFrame::MIN_SIZE, "decode only fails for undersized input");
        }
    }
});
