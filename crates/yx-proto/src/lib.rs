//! YX Wire Format
//!
//! Pure, allocation-light types for the YX datagram protocol's wire format:
//! the outer frame (`tag || guid || payload`), the sender GUID, the binary
//! chunk header, and inner-protocol dispatch.
//!
//! This crate performs no cryptography and no reassembly logic - it only
//! knows how to turn bytes into structured fields and back. See `yx-crypto`
//! for cryptographic primitives and `yx-core` for protocol behavior.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod error;
pub mod frame;
pub mod guid;
pub mod header;
pub mod protocol;

pub use error::{ProtocolError, Result};
pub use frame::{OuterFrame, TAG_SIZE};
pub use guid::{GUID_SIZE, Guid};
pub use header::{ChunkHeader, ProtoOpts};
pub use protocol::Protocol;
