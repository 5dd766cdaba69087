//! Streaming writer for one outbound message.

use tokio::io::{AsyncRead, AsyncWrite};

use crate::connection::Conn;
use crate::error::Result;
use crate::protocol::{MessageKind, OpCode};

/// Size of the writer's internal buffer; also the payload size of every
/// intermediate fragment.
pub(crate) const WRITE_BUFFER_SIZE: usize = 4096;

/// Per-message outbound state owned by the connection.
///
/// Lives on the connection so that a writer dropped without `finish` can be
/// finalized (terminal frame emitted) by the next `next_writer` call.
#[derive(Debug)]
pub(crate) struct WriteState {
    pub(crate) kind: MessageKind,
    /// True once the head frame has been emitted; every later fragment is a
    /// continuation.
    pub(crate) first_sent: bool,
    pub(crate) buf: Vec<u8>,
}

impl WriteState {
    pub(crate) fn new(kind: MessageKind) -> Self {
        Self {
            kind,
            first_sent: false,
            buf: Vec::with_capacity(WRITE_BUFFER_SIZE),
        }
    }

    pub(crate) fn next_opcode(&self) -> OpCode {
        if self.first_sent {
            OpCode::Continuation
        } else {
            self.kind.opcode()
        }
    }
}

/// Streaming access for one outbound message.
///
/// Obtained from [`Conn::next_writer`]. Bytes accumulate in a fixed
/// 4096-byte buffer; each time it fills, an intermediate fragment goes out
/// with `fin` clear. [`finish`](Self::finish) emits the terminal fragment.
///
/// The writer borrows the connection exclusively, so at most one can exist
/// at a time. If it is dropped without `finish`, the next `next_writer` call
/// emits the terminal frame on its behalf.
pub struct MessageWriter<'a, T> {
    conn: &'a mut Conn<T>,
}

impl<'a, T> MessageWriter<'a, T> {
    pub(crate) fn new(conn: &'a mut Conn<T>) -> Self {
        Self { conn }
    }
}

impl<T: AsyncRead + AsyncWrite + Unpin> MessageWriter<'_, T> {
    /// Append bytes to the message, emitting intermediate fragments whenever
    /// the internal buffer fills.
    ///
    /// # Errors
    ///
    /// Transport errors verbatim; the latched `CloseError` if the connection
    /// has already failed.
    pub async fn write(&mut self, data: &[u8]) -> Result<()> {
        self.conn.writer_write(data).await
    }

    /// Emit the terminal fragment (`fin` set) carrying the buffered residue,
    /// completing the message.
    ///
    /// # Errors
    ///
    /// Same failure modes as [`write`](Self::write).
    pub async fn finish(self) -> Result<()> {
        self.conn.finish_writer().await
    }
}
