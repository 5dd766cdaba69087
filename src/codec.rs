//! Frame-level I/O over an async byte stream.
//!
//! The codec owns the transport plus the read accumulation buffer, and is
//! the single place outgoing frames pick up client-side masking. It is
//! deliberately unaware of connection state; protocol reactions live in
//! [`crate::connection`].

use bytes::{Buf, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::connection::Role;
use crate::error::Result;
use crate::protocol::frame::{encode_frame, Frame};
use crate::protocol::OpCode;

const READ_CHUNK: usize = 4096;

/// Seed for the per-connection mask generator. Falls back to system time so
/// masking stays functional if the OS RNG is unavailable.
fn mask_seed() -> u32 {
    let mut seed = [0u8; 4];
    if getrandom::getrandom(&mut seed).is_ok() {
        u32::from_le_bytes(seed)
    } else {
        use std::time::{SystemTime, UNIX_EPOCH};
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos() as u32)
            .unwrap_or(0x6d61_736b)
    }
}

#[derive(Debug)]
pub(crate) struct FrameCodec<T> {
    io: T,
    read_buf: BytesMut,
    write_buf: BytesMut,
    role: Role,
    mask_state: u32,
}

impl<T> FrameCodec<T> {
    pub(crate) fn new(io: T, role: Role) -> Self {
        Self::with_buffered(io, role, Vec::new())
    }

    /// Create a codec whose read buffer is seeded with bytes that arrived
    /// behind the handshake head.
    pub(crate) fn with_buffered(io: T, role: Role, buffered: Vec<u8>) -> Self {
        let mut read_buf = BytesMut::with_capacity(buffered.len().max(READ_CHUNK));
        read_buf.extend_from_slice(&buffered);
        Self {
            io,
            read_buf,
            write_buf: BytesMut::new(),
            role,
            mask_state: mask_seed(),
        }
    }

    pub(crate) fn role(&self) -> Role {
        self.role
    }

    /// Produce the next per-frame mask key.
    ///
    /// An avalanche mix over an incrementing state: cheap, and every frame
    /// gets a key uncorrelated with the previous one. The RFC requires
    /// unpredictability to a network observer, not cryptographic strength.
    fn next_mask(&mut self) -> [u8; 4] {
        self.mask_state = self.mask_state.wrapping_add(0x9E37_79B9);
        let mut x = self.mask_state;
        x = (x ^ (x >> 16)).wrapping_mul(0x85EB_CA6B);
        x = (x ^ (x >> 13)).wrapping_mul(0xC2B2_AE35);
        (x ^ (x >> 16)).to_le_bytes()
    }
}

impl<T: AsyncRead + AsyncWrite + Unpin> FrameCodec<T> {
    /// Read one complete frame, unmasked.
    ///
    /// I/O errors come back verbatim; EOF mid-stream is an
    /// `UnexpectedEof` I/O error. Protocol errors detected during parsing
    /// (reserved opcodes) surface as `Error::Close`.
    pub(crate) async fn read_frame(&mut self) -> Result<Frame> {
        loop {
            if let Some((frame, consumed)) = Frame::parse(&self.read_buf)? {
                self.read_buf.advance(consumed);
                return Ok(frame);
            }

            self.read_buf.reserve(READ_CHUNK);
            let n = self.io.read_buf(&mut self.read_buf).await?;
            if n == 0 {
                return Err(std::io::Error::new(
                    std::io::ErrorKind::UnexpectedEof,
                    "connection closed",
                )
                .into());
            }
        }
    }

    /// Write one frame and flush, masking when this endpoint is a client.
    pub(crate) async fn write_frame(&mut self, frame: &Frame) -> Result<()> {
        self.write_fragment(frame.fin, frame.opcode, &frame.payload)
            .await
    }

    /// Write a frame given as parts, so the message writer can stream out of
    /// its reused buffer.
    pub(crate) async fn write_fragment(
        &mut self,
        fin: bool,
        opcode: OpCode,
        payload: &[u8],
    ) -> Result<()> {
        let key = if self.role.must_mask() {
            Some(self.next_mask())
        } else {
            None
        };

        self.write_buf.clear();
        encode_frame(&mut self.write_buf, fin, 0, opcode, payload, key);
        self.io.write_all(&self.write_buf).await?;
        self.io.flush().await?;
        Ok(())
    }

    pub(crate) async fn shutdown(&mut self) -> std::io::Result<()> {
        self.io.shutdown().await
    }
}
