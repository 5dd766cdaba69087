//! # wsline: RFC 6455 WebSocket endpoint library
//!
//! `wsline` provides both ends of a WebSocket connection (client dial and
//! server upgrade) and a full-duplex message conduit over a single stream
//! transport, plaintext TCP or TLS. It speaks protocol version 13 with the
//! strict validation the Autobahn test suite expects: reserved bits and
//! opcodes, control-frame constraints, the close-code whitelist, and
//! fail-fast UTF-8 checking of fragmented text messages.
//!
//! ## Connecting
//!
//! ```rust,ignore
//! use wsline::{Dialer, MessageKind};
//!
//! let dialer = Dialer {
//!     handshake_timeout: Some(std::time::Duration::from_secs(10)),
//!     ..Dialer::default()
//! };
//! let mut conn = dialer.dial("ws://localhost:9001/echo").await?;
//! conn.write_message(MessageKind::Text, b"hello").await?;
//! let (kind, payload) = conn.read_message().await?;
//! conn.close().await?;
//! ```
//!
//! ## Accepting
//!
//! ```rust,ignore
//! let listener = tokio::net::TcpListener::bind("127.0.0.1:9001").await?;
//! loop {
//!     let (stream, _) = listener.accept().await?;
//!     tokio::spawn(async move {
//!         let mut conn = wsline::accept(stream).await?;
//!         while let Ok((kind, payload)) = conn.read_message().await {
//!             conn.write_message(kind, &payload).await?;
//!         }
//!         Ok::<_, wsline::Error>(())
//!     });
//! }
//! ```
//!
//! ## Streaming
//!
//! Messages of unbounded size stream through [`Conn::next_reader`] and
//! [`Conn::next_writer`] without being buffered whole. The guards they
//! return hold the exclusive borrow of the connection, so the protocol's
//! one-reader/one-writer rule is enforced at compile time.
//!
//! ## Failure model
//!
//! I/O errors pass through verbatim. Protocol violations and a received
//! Close frame latch a [`CloseError`] on the connection: the matching Close
//! frame goes out, the transport is shut down, and every subsequent
//! operation returns that same error. Inspect [`CloseError::code`] to tell
//! a normal shutdown (1000, 1001) from a protocol failure.

pub mod client;
pub mod connection;
pub mod error;
pub mod protocol;
pub mod server;
pub mod tls;

mod codec;

pub use client::Dialer;
pub use connection::{Conn, MessageReader, MessageWriter, Role};
pub use error::{CloseError, Error, HandshakeError, Result};
pub use protocol::{close_code, compute_accept_key, Frame, MessageKind, OpCode};
pub use server::accept;
pub use tls::MaybeTlsStream;
