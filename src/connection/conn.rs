//! The connection state machine.

use tokio::io::{AsyncRead, AsyncWrite};

use crate::codec::FrameCodec;
use crate::connection::reader::{MessageReader, ReadState};
use crate::connection::writer::{MessageWriter, WriteState, WRITE_BUFFER_SIZE};
use crate::connection::Role;
use crate::error::{CloseError, Error, Result};
use crate::protocol::close_code;
use crate::protocol::{Frame, MessageKind, OpCode};

/// A WebSocket connection over an async byte stream.
///
/// Produced by [`crate::Dialer::dial`] (client role) or [`crate::accept`]
/// (server role); [`Conn::new`] wraps a stream whose handshake was completed
/// elsewhere.
///
/// The first protocol violation, whether detected locally or signaled by
/// the peer, latches a
/// [`CloseError`] on the connection. A best-effort Close frame carrying its
/// code goes out, the transport is shut down, and every later operation
/// returns the same error.
///
/// ## Example
///
/// ```rust,ignore
/// let mut conn = Dialer::default().dial("ws://localhost:9001").await?;
/// conn.write_message(MessageKind::Text, b"hello").await?;
/// let (kind, payload) = conn.read_message().await?;
/// conn.close().await?;
/// ```
#[derive(Debug)]
pub struct Conn<T> {
    codec: FrameCodec<T>,
    close_err: Option<CloseError>,
    read_state: Option<ReadState>,
    write_state: Option<WriteState>,
}

impl<T> Conn<T> {
    /// Wrap a raw stream on which the opening handshake has already been
    /// performed.
    pub fn new(io: T, role: Role) -> Self {
        Self::with_buffered(io, role, Vec::new())
    }

    /// Wrap a raw stream, seeding the read buffer with bytes that arrived
    /// behind the handshake response.
    pub(crate) fn with_buffered(io: T, role: Role, buffered: Vec<u8>) -> Self {
        Self {
            codec: FrameCodec::with_buffered(io, role, buffered),
            close_err: None,
            read_state: None,
            write_state: None,
        }
    }

    /// This endpoint's role.
    #[must_use]
    pub fn role(&self) -> Role {
        self.codec.role()
    }

    /// The latched terminal error, if the connection has failed.
    #[must_use]
    pub fn close_error(&self) -> Option<&CloseError> {
        self.close_err.as_ref()
    }

    fn latched(&self) -> Result<()> {
        match &self.close_err {
            Some(err) => Err(Error::Close(err.clone())),
            None => Ok(()),
        }
    }
}

impl<T: AsyncRead + AsyncWrite + Unpin> Conn<T> {
    /// Wait for the next inbound data message and return a streaming reader
    /// for it, along with the message kind.
    ///
    /// Any unread remainder of the previous message is discarded first.
    /// Control frames arriving before the next data message are reacted to
    /// here: Pings are answered with Pongs, Pongs are dropped, and a Close
    /// completes the close handshake and surfaces its `CloseError`.
    ///
    /// # Errors
    ///
    /// Transport errors verbatim; protocol violations and a received Close
    /// as the latched `CloseError`.
    pub async fn next_reader(&mut self) -> Result<(MessageKind, MessageReader<'_, T>)> {
        self.drain_reader().await?;

        loop {
            self.latched()?;
            let frame = self.receive().await?;
            let Some(kind) = MessageKind::from_opcode(frame.opcode) else {
                continue;
            };

            let mut state = ReadState::new(kind, frame.fin, frame.payload);
            if kind == MessageKind::Text {
                if let Err(err) = state.utf8.push(&state.buf, state.last) {
                    return Err(self.fail(err).await);
                }
            }
            self.read_state = Some(state);
            return Ok((kind, MessageReader::new(self, kind)));
        }
    }

    /// Read the next data message whole.
    ///
    /// # Errors
    ///
    /// Same failure modes as [`next_reader`](Self::next_reader).
    pub async fn read_message(&mut self) -> Result<(MessageKind, Vec<u8>)> {
        let (kind, mut reader) = self.next_reader().await?;
        let mut payload = Vec::new();
        reader.read_to_end(&mut payload).await?;
        Ok((kind, payload))
    }

    /// Start an outbound message of the given kind, returning its streaming
    /// writer.
    ///
    /// If a previous writer was dropped without `finish`, its terminal frame
    /// is emitted first so the fragment sequence on the wire stays valid.
    ///
    /// # Errors
    ///
    /// Transport errors verbatim; the latched `CloseError` if the connection
    /// has already failed.
    pub async fn next_writer(&mut self, kind: MessageKind) -> Result<MessageWriter<'_, T>> {
        self.latched()?;
        self.finish_writer().await?;
        self.write_state = Some(WriteState::new(kind));
        Ok(MessageWriter::new(self))
    }

    /// Send one data message whole.
    ///
    /// # Errors
    ///
    /// Same failure modes as [`next_writer`](Self::next_writer).
    pub async fn write_message(&mut self, kind: MessageKind, payload: &[u8]) -> Result<()> {
        let mut writer = self.next_writer(kind).await?;
        writer.write(payload).await?;
        writer.finish().await
    }

    /// Send a Close frame and shut the transport down.
    ///
    /// The frame carries the latched error code if the connection already
    /// failed, otherwise 1000 (normal closure).
    ///
    /// # Errors
    ///
    /// Transport errors verbatim. After a latched failure the transport is
    /// usually gone already, in which case the write fails.
    pub async fn close(&mut self) -> Result<()> {
        let code = self
            .close_err
            .as_ref()
            .map_or(close_code::NORMAL_CLOSURE, |err| err.code);
        self.send_close(code).await
    }

    /// Receive one frame and perform its state reaction. Returns the frame
    /// so callers can route data payloads; control frames come back already
    /// handled.
    async fn receive(&mut self) -> Result<Frame> {
        let frame = match self.codec.read_frame().await {
            Ok(frame) => frame,
            Err(Error::Close(err)) => return Err(self.fail(err).await),
            Err(err) => return Err(err),
        };

        if let Err(err) = frame.validate() {
            return Err(self.fail(err).await);
        }

        match frame.opcode {
            OpCode::Close => {
                let code = if frame.payload.len() >= 2 {
                    u16::from_be_bytes([frame.payload[0], frame.payload[1]])
                } else {
                    close_code::NORMAL_CLOSURE
                };
                // Echo the code, then latch. The echo goes out before the
                // caller ever sees the error.
                self.send_close(code).await?;
                let err = CloseError::new(code, "");
                self.close_err = Some(err.clone());
                Err(Error::Close(err))
            }
            OpCode::Ping => {
                let pong = Frame::pong(frame.payload.clone());
                self.codec.write_frame(&pong).await?;
                Ok(frame)
            }
            OpCode::Pong => Ok(frame),
            OpCode::Text | OpCode::Binary => {
                if self.read_state.is_some() {
                    return Err(self.fail(CloseError::invalid_continuation()).await);
                }
                Ok(frame)
            }
            OpCode::Continuation => {
                if self.read_state.is_none() {
                    return Err(self.fail(CloseError::nothing_to_continue()).await);
                }
                Ok(frame)
            }
        }
    }

    /// Discard whatever remains of the in-progress inbound message.
    async fn drain_reader(&mut self) -> Result<()> {
        loop {
            if self.close_err.is_some() {
                break;
            }
            let (kind, last) = match &self.read_state {
                Some(state) => (state.kind, state.last),
                None => return Ok(()),
            };
            if last {
                break;
            }

            let frame = self.receive().await?;
            if frame.opcode.is_control() {
                continue;
            }

            if kind == MessageKind::Text {
                let checked = match self.read_state.as_mut() {
                    Some(state) => state.utf8.push(&frame.payload, frame.fin),
                    None => Ok(()),
                };
                if let Err(err) = checked {
                    return Err(self.fail(err).await);
                }
            }
            if let Some(state) = self.read_state.as_mut() {
                state.last = frame.fin;
            }
        }
        self.read_state = None;
        Ok(())
    }

    /// Reader pull path: copy buffered payload into `out`, fetching at most
    /// one further data frame when the buffer runs short.
    pub(crate) async fn reader_read(&mut self, out: &mut [u8]) -> Result<usize> {
        // End of stream: latched error, no message in progress, or the
        // final fragment fully consumed.
        if self.close_err.is_some() {
            return Ok(0);
        }
        let (last, buffered) = match &self.read_state {
            Some(state) => (state.last, state.buf.len() - state.pos),
            None => return Ok(0),
        };
        if last && buffered == 0 {
            return Ok(0);
        }

        if !last && buffered < out.len() {
            // Control frames may interleave between fragments; skip them
            // here, their reactions already ran inside receive().
            let frame = loop {
                let frame = self.receive().await?;
                if !frame.opcode.is_control() {
                    break frame;
                }
            };

            let checked = match self.read_state.as_mut() {
                Some(state) => {
                    state.buf.extend_from_slice(&frame.payload);
                    state.last = frame.fin;
                    if state.kind == MessageKind::Text {
                        state.utf8.push(&frame.payload, frame.fin)
                    } else {
                        Ok(())
                    }
                }
                None => Ok(()),
            };
            if let Err(err) = checked {
                return Err(self.fail(err).await);
            }
        }

        let Some(state) = self.read_state.as_mut() else {
            return Ok(0);
        };
        let n = out.len().min(state.buf.len() - state.pos);
        out[..n].copy_from_slice(&state.buf[state.pos..state.pos + n]);
        state.pos += n;
        Ok(n)
    }

    /// Writer append path: spill a full buffer as an intermediate fragment,
    /// then copy the caller's bytes in.
    pub(crate) async fn writer_write(&mut self, data: &[u8]) -> Result<()> {
        self.latched()?;
        let Conn {
            codec, write_state, ..
        } = self;
        let Some(state) = write_state.as_mut() else {
            return Ok(());
        };

        let mut data = data;
        while !data.is_empty() {
            if state.buf.len() == WRITE_BUFFER_SIZE {
                codec
                    .write_fragment(false, state.next_opcode(), &state.buf)
                    .await?;
                state.first_sent = true;
                state.buf.clear();
            }

            let room = WRITE_BUFFER_SIZE - state.buf.len();
            let n = room.min(data.len());
            state.buf.extend_from_slice(&data[..n]);
            data = &data[n..];
        }
        Ok(())
    }

    /// Emit the terminal fragment of the in-progress outbound message.
    pub(crate) async fn finish_writer(&mut self) -> Result<()> {
        self.latched()?;
        let Some(state) = self.write_state.take() else {
            return Ok(());
        };
        self.codec
            .write_fragment(true, state.next_opcode(), &state.buf)
            .await
    }

    /// Latch a protocol violation, attempt the Close frame for it, and shut
    /// the transport down. Returns the error to surface.
    async fn fail(&mut self, err: CloseError) -> Error {
        if self.close_err.is_none() {
            self.close_err = Some(err.clone());
        }
        let _ = self.send_close(err.code).await;
        Error::Close(err)
    }

    async fn send_close(&mut self, code: u16) -> Result<()> {
        self.codec.write_frame(&Frame::close(code)).await?;
        self.codec.shutdown().await?;
        Ok(())
    }
}
