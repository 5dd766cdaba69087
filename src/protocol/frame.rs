//! Frame parsing and serialization (RFC 6455 section 5.2).
//!
//! ```text
//!  0                   1                   2                   3
//!  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
//! +-+-+-+-+-------+-+-------------+-------------------------------+
//! |F|R|R|R| opcode|M| Payload len |    Extended payload length    |
//! |I|S|S|S|  (4)  |A|     (7)     |             (16/64)           |
//! |N|V|V|V|       |S|             |   (if payload len==126/127)   |
//! | |1|2|3|       |K|             |                               |
//! +-+-+-+-+-------+-+-------------+-------------------------------+
//! |                         Masking key (if present)              |
//! +---------------------------------------------------------------+
//! |                     Payload data                              |
//! +---------------------------------------------------------------+
//! ```

use bytes::{BufMut, BytesMut};

use crate::error::CloseError;
use crate::protocol::close_code;
use crate::protocol::mask::apply_mask_fast;
use crate::protocol::OpCode;

/// Maximum payload length of a control frame (RFC 6455 section 5.5).
pub const MAX_CONTROL_PAYLOAD: usize = 125;

/// A decoded WebSocket frame.
///
/// The payload of a parsed frame is always unmasked; masking is a wire-level
/// concern applied during encoding and removed during parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// True if this frame completes a message.
    pub fin: bool,
    /// The three reserved bits packed into the low bits (0..=7). Must be
    /// zero when no extension has been negotiated.
    pub rsv: u8,
    /// Frame opcode.
    pub opcode: OpCode,
    /// Unmasked payload bytes.
    pub payload: Vec<u8>,
}

impl Frame {
    /// Create a frame with cleared reserved bits.
    #[must_use]
    pub fn new(fin: bool, opcode: OpCode, payload: Vec<u8>) -> Self {
        Self {
            fin,
            rsv: 0,
            opcode,
            payload,
        }
    }

    /// Create a Close frame carrying only a status code.
    #[must_use]
    pub fn close(code: u16) -> Self {
        Self::new(true, OpCode::Close, code.to_be_bytes().to_vec())
    }

    /// Create a Pong frame, usually echoing a Ping payload.
    #[must_use]
    pub fn pong(payload: Vec<u8>) -> Self {
        Self::new(true, OpCode::Pong, payload)
    }

    /// Whether this is a Close, Ping, or Pong frame.
    #[inline]
    #[must_use]
    pub fn is_control(&self) -> bool {
        self.opcode.is_control()
    }

    /// Parse one frame from the front of `buf`.
    ///
    /// Returns `Ok(None)` when the buffer does not yet hold a complete frame,
    /// otherwise the frame and the number of bytes consumed. Masked payloads
    /// are unmasked before being returned.
    ///
    /// # Errors
    ///
    /// A reserved opcode nibble produces a protocol-error `CloseError`; a
    /// 64-bit length that does not fit in `usize` produces a 1009.
    pub fn parse(buf: &[u8]) -> Result<Option<(Self, usize)>, CloseError> {
        if buf.len() < 2 {
            return Ok(None);
        }

        let fin = buf[0] & 0x80 != 0;
        let rsv = (buf[0] >> 4) & 0x07;
        let opcode = OpCode::from_u8(buf[0] & 0x0F)?;
        let masked = buf[1] & 0x80 != 0;

        let (length, mut offset) = match buf[1] & 0x7F {
            126 => {
                if buf.len() < 4 {
                    return Ok(None);
                }
                (u64::from(u16::from_be_bytes([buf[2], buf[3]])), 4)
            }
            127 => {
                if buf.len() < 10 {
                    return Ok(None);
                }
                let length = u64::from_be_bytes([
                    buf[2], buf[3], buf[4], buf[5], buf[6], buf[7], buf[8], buf[9],
                ]);
                (length, 10)
            }
            short => (u64::from(short), 2),
        };

        let length = usize::try_from(length).map_err(|_| CloseError::oversized_payload())?;

        let key = if masked {
            if buf.len() < offset + 4 {
                return Ok(None);
            }
            let key = [buf[offset], buf[offset + 1], buf[offset + 2], buf[offset + 3]];
            offset += 4;
            Some(key)
        } else {
            None
        };

        let total = offset
            .checked_add(length)
            .ok_or_else(CloseError::oversized_payload)?;
        if buf.len() < total {
            return Ok(None);
        }

        let mut payload = buf[offset..total].to_vec();
        if let Some(key) = key {
            apply_mask_fast(&mut payload, key);
        }

        Ok(Some((
            Frame {
                fin,
                rsv,
                opcode,
                payload,
            },
            total,
        )))
    }

    /// Enforce the per-frame RFC rules that do not depend on connection state.
    ///
    /// # Errors
    ///
    /// - control frame fragmented or longer than 125 bytes → 1002
    /// - reserved bits set → 1002
    /// - Close payload of one byte → 1002
    /// - Close code outside the valid-received set → 1002
    /// - Close reason that is not UTF-8 → 1007
    pub fn validate(&self) -> Result<(), CloseError> {
        if self.is_control() && (self.payload.len() > MAX_CONTROL_PAYLOAD || !self.fin) {
            return Err(CloseError::invalid_control_frame());
        }

        if self.rsv != 0 {
            return Err(CloseError::nonzero_rsv());
        }

        if self.opcode == OpCode::Close && !self.payload.is_empty() {
            if self.payload.len() < 2 {
                return Err(CloseError::invalid_close_payload());
            }

            let code = u16::from_be_bytes([self.payload[0], self.payload[1]]);
            if !close_code::is_valid_received_close_code(code) {
                return Err(CloseError::invalid_close_code());
            }

            if std::str::from_utf8(&self.payload[2..]).is_err() {
                return Err(CloseError::invalid_utf8());
            }
        }

        Ok(())
    }

    /// Serialize this frame into `buf`, masking the payload when a key is
    /// given (client role).
    pub fn encode_into(&self, buf: &mut BytesMut, key: Option<[u8; 4]>) {
        encode_frame(buf, self.fin, self.rsv, self.opcode, &self.payload, key);
    }
}

/// Serialize a frame given as parts, so callers streaming from a reused
/// buffer do not have to construct a [`Frame`] per fragment.
pub(crate) fn encode_frame(
    buf: &mut BytesMut,
    fin: bool,
    rsv: u8,
    opcode: OpCode,
    payload: &[u8],
    key: Option<[u8; 4]>,
) {
    buf.reserve(14 + payload.len());

    let mut head = opcode.as_u8() | (rsv << 4);
    if fin {
        head |= 0x80;
    }
    buf.put_u8(head);

    let mask_bit = if key.is_some() { 0x80 } else { 0x00 };
    match payload.len() {
        len @ 0..=125 => buf.put_u8(mask_bit | len as u8),
        len @ 126..=0xFFFF => {
            buf.put_u8(mask_bit | 126);
            buf.put_u16(len as u16);
        }
        len => {
            buf.put_u8(mask_bit | 127);
            buf.put_u64(len as u64);
        }
    }

    match key {
        Some(key) => {
            buf.put_slice(&key);
            let start = buf.len();
            buf.put_slice(payload);
            apply_mask_fast(&mut buf[start..], key);
        }
        None => buf.put_slice(payload),
    }
}
