//! Error types for the WebSocket endpoint library.
//!
//! Failures fall into two taxonomies plus plain I/O:
//!
//! - [`HandshakeError`]: the opening handshake failed. No connection exists.
//! - [`CloseError`]: a protocol-level failure after the upgrade. It is latched
//!   on the connection and returned from every subsequent operation.
//! - [`std::io::Error`]: transport failures, surfaced verbatim and never
//!   latched (the transport may already be unusable).

use thiserror::Error;

use crate::protocol::close_code;

/// Result type alias for WebSocket operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by WebSocket operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// Transport-level failure, passed through unchanged.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Terminal protocol failure, latched on the connection.
    #[error(transparent)]
    Close(#[from] CloseError),

    /// Terminal failure of the opening handshake.
    #[error(transparent)]
    Handshake(#[from] HandshakeError),

    /// The dial target could not be interpreted as a WebSocket URL.
    #[error("invalid websocket url: {0}")]
    InvalidUrl(String),
}

impl Error {
    /// Return the close code if this is a latched protocol failure.
    ///
    /// Lets callers distinguish a normal shutdown (1000, 1001) from a
    /// protocol violation without destructuring.
    #[must_use]
    pub fn close_code(&self) -> Option<u16> {
        match self {
            Error::Close(e) => Some(e.code),
            _ => None,
        }
    }
}

/// Terminal closure of a WebSocket connection.
///
/// Carries the close status code and a human-readable description. Once a
/// connection produces a `CloseError` it is latched: every later read or
/// write on that connection returns the same error.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{code}: {text}")]
pub struct CloseError {
    /// The close status code (RFC 6455 section 7.4).
    pub code: u16,
    /// Human-readable description. Empty for a peer-initiated close.
    pub text: String,
}

impl CloseError {
    /// Create a close error with an arbitrary code.
    #[must_use]
    pub fn new(code: u16, text: impl Into<String>) -> Self {
        Self {
            code,
            text: text.into(),
        }
    }

    fn protocol(text: &str) -> Self {
        Self::new(close_code::PROTOCOL_ERROR, text)
    }

    pub(crate) fn invalid_control_frame() -> Self {
        Self::protocol("control frames must not be fragmented and must carry a payload of 125 bytes or less")
    }

    pub(crate) fn nonzero_rsv() -> Self {
        Self::protocol("reserved bits must be zero when no extension has been negotiated")
    }

    pub(crate) fn reserved_opcode(opcode: u8) -> Self {
        Self::protocol(&format!("opcode {opcode:#x} is reserved"))
    }

    pub(crate) fn invalid_continuation() -> Self {
        Self::protocol("received a new data frame while a fragmented message is in progress")
    }

    pub(crate) fn nothing_to_continue() -> Self {
        Self::protocol("continuation frame without a preceding data frame")
    }

    pub(crate) fn invalid_close_payload() -> Self {
        Self::protocol("close payload must be empty or at least two bytes")
    }

    pub(crate) fn invalid_close_code() -> Self {
        Self::protocol("close code must not appear on the wire")
    }

    pub(crate) fn invalid_utf8() -> Self {
        Self::new(
            close_code::INVALID_FRAME_PAYLOAD_DATA,
            "invalid UTF-8 in text payload",
        )
    }

    pub(crate) fn oversized_payload() -> Self {
        Self::new(
            close_code::MESSAGE_TOO_BIG,
            "frame payload exceeds addressable memory",
        )
    }
}

/// Failure of the opening handshake, on either role.
///
/// Produced before a connection exists; nothing is latched. On the server
/// side an HTTP error response has already been written when this surfaces.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{reason}")]
pub struct HandshakeError {
    /// Human-readable reason the handshake was rejected.
    pub reason: String,
}

impl HandshakeError {
    /// Create a handshake error with the given reason.
    #[must_use]
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}
