//! Protocol dispatch.
//!
//! The inner payload's first byte names which protocol handler owns the
//! rest of the bytes. Dispatch is a plain match on a closed enum, not
//! dynamic dispatch: the two handlers are different enough (one is a
//! single self-contained UTF-8 string, the other a chunked binary pipeline)
//! that a shared trait would only blur the boundary.

use bytes::Bytes;
use yx_proto::Protocol;

use crate::error::{Result, YxError};

/// The result of routing an inner payload by its protocol marker.
pub enum Routed {
    /// A text protocol message; `body` excludes the marker byte.
    Text(Bytes),
    /// A binary protocol chunk; `body` excludes the marker byte and still
    /// contains the 16-byte chunk header followed by the chunk payload.
    Binary(Bytes),
}

/// Inspect the first byte of `payload` and split off the protocol marker.
///
/// # Errors
///
/// Returns [`YxError::UnknownProtocol`] if the marker is outside
/// `{0x00, 0x01}`, and [`YxError::MalformedFrame`] if `payload` is empty.
pub fn route(payload: &Bytes) -> Result<Routed> {
    let marker = *payload.first().ok_or_else(|| YxError::MalformedFrame("empty inner payload".to_string()))?;
    let body = payload.slice(1..);

    match Protocol::from_marker(marker) {
        Some(Protocol::Text) => Ok(Routed::Text(body)),
        Some(Protocol::Binary) => Ok(Routed::Binary(body)),
        None => Err(YxError::UnknownProtocol(marker)),
    }
}
