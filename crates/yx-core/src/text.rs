//! Text protocol handler.
//!
//! The simplest of the two protocols: a single inner payload holding a
//! UTF-8 string, with no chunking, compression, or encryption. Messages
//! larger than a single packet are the application's problem; this
//! protocol does not split them.

use bytes::{BufMut, Bytes, BytesMut};
use yx_proto::Protocol;

use crate::error::{Result, YxError};

/// Build the inner payload for a text message: marker byte followed by
/// the UTF-8 encoding of `text`.
#[must_use]
pub fn encode(text: &str) -> Bytes {
    let mut buffer = BytesMut::with_capacity(1 + text.len());
    buffer.put_u8(Protocol::Text.marker());
    buffer.put_slice(text.as_bytes());
    buffer.freeze()
}

/// Decode a text message body (with the marker byte already stripped by
/// routing) into a UTF-8 string.
///
/// # Errors
///
/// Returns [`YxError::MalformedFrame`] if `body` is not valid UTF-8.
pub fn decode(body: &Bytes) -> Result<String> {
    std::str::from_utf8(body)
        .map(str::to_owned)
        .map_err(|err| YxError::MalformedFrame(format!("invalid UTF-8 in text message: {err}")))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::router::{self, Routed};

    #[test]
    fn encode_then_route_then_decode_round_trips() {
        let payload = encode("hello, world");
        let routed = router::route(&payload).expect("should route");
        let Routed::Text(body) = routed else { panic!("expected text") };
        assert_eq!(decode(&body).expect("should decode"), "hello, world");
    }

    #[test]
    fn empty_string_round_trips() {
        let payload = encode("");
        let routed = router::route(&payload).expect("should route");
        let Routed::Text(body) = routed else { panic!("expected text") };
        assert_eq!(decode(&body).expect("should decode"), "");
    }

    #[test]
    fn invalid_utf8_is_rejected() {
        let body = Bytes::from_static(&[0xFF, 0xFE]);
        let err = decode(&body);
        assert!(matches!(err, Err(YxError::MalformedFrame(_))));
    }

    #[test]
    fn unicode_content_round_trips() {
        let payload = encode("héllo wörld 🎉");
        let routed = router::route(&payload).expect("should route");
        let Routed::Text(body) = routed else { panic!("expected text") };
        assert_eq!(decode(&body).expect("should decode"), "héllo wörld 🎉");
    }
}
