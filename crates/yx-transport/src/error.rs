//! Transport-level failures.

use thiserror::Error;

/// Failures from binding, sending, or receiving on a datagram socket.
#[derive(Error, Debug)]
pub enum TransportError {
    /// The socket failed to bind to the requested address.
    #[error("failed to bind to {address}: {source}")]
    Bind {
        /// Address the bind was attempted against.
        address: String,
        /// Underlying OS error.
        #[source]
        source: std::io::Error,
    },

    /// A send or receive syscall failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The destination address string failed to parse.
    #[error("invalid address '{address}': {source}")]
    InvalidAddress {
        /// The address string that failed to parse.
        address: String,
        /// Underlying parse error.
        #[source]
        source: std::net::AddrParseError,
    },
}

/// Convenience alias used throughout `yx-transport`.
pub type Result<T> = std::result::Result<T, TransportError>;
