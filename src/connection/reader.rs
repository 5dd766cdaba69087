//! Streaming reader for one inbound message.

use tokio::io::{AsyncRead, AsyncWrite};

use crate::connection::Conn;
use crate::error::Result;
use crate::protocol::{MessageKind, Utf8Validator};

/// Per-message inbound state owned by the connection.
///
/// Keeping it on the connection rather than in the guard lets a dropped
/// reader's unfinished message be drained by the next `next_reader` call.
#[derive(Debug)]
pub(crate) struct ReadState {
    pub(crate) kind: MessageKind,
    /// True once the frame with `fin` set has been consumed.
    pub(crate) last: bool,
    pub(crate) buf: Vec<u8>,
    pub(crate) pos: usize,
    pub(crate) utf8: Utf8Validator,
}

impl ReadState {
    pub(crate) fn new(kind: MessageKind, last: bool, payload: Vec<u8>) -> Self {
        Self {
            kind,
            last,
            buf: payload,
            pos: 0,
            utf8: Utf8Validator::new(),
        }
    }
}

/// Streaming access to the payload of one inbound message.
///
/// Obtained from [`Conn::next_reader`]. The reader borrows the connection
/// exclusively, so at most one can exist at a time. Dropping it mid-message
/// is fine; the next `next_reader` call discards what remains.
pub struct MessageReader<'a, T> {
    conn: &'a mut Conn<T>,
    kind: MessageKind,
}

impl<'a, T> MessageReader<'a, T> {
    pub(crate) fn new(conn: &'a mut Conn<T>, kind: MessageKind) -> Self {
        Self { conn, kind }
    }

    /// The kind of the message being read.
    #[must_use]
    pub fn kind(&self) -> MessageKind {
        self.kind
    }
}

impl<T: AsyncRead + AsyncWrite + Unpin> MessageReader<'_, T> {
    /// Copy the next payload bytes into `out`, pulling further fragments off
    /// the wire as needed. Returns 0 at end of message.
    ///
    /// Interleaved control frames are handled transparently: Pings are
    /// answered, Pongs dropped, and a Close ends the read with its
    /// `CloseError`.
    ///
    /// # Errors
    ///
    /// Transport errors verbatim; protocol violations and invalid text
    /// payloads as the latched `CloseError`.
    pub async fn read(&mut self, out: &mut [u8]) -> Result<usize> {
        self.conn.reader_read(out).await
    }

    /// Read the rest of the message into `out`, returning the byte count.
    ///
    /// # Errors
    ///
    /// Same failure modes as [`read`](Self::read).
    pub async fn read_to_end(&mut self, out: &mut Vec<u8>) -> Result<usize> {
        let mut total = 0;
        let mut chunk = [0u8; 4096];
        loop {
            let n = self.read(&mut chunk).await?;
            if n == 0 {
                return Ok(total);
            }
            out.extend_from_slice(&chunk[..n]);
            total += n;
        }
    }
}
