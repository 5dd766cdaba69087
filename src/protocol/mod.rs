//! WebSocket protocol core (RFC 6455): frames, opcodes, masking, close
//! codes, UTF-8 validation, and the opening-handshake primitives.

pub mod close_code;
pub mod frame;
pub mod handshake;
pub mod mask;
pub mod opcode;
pub mod utf8;

pub use frame::{Frame, MAX_CONTROL_PAYLOAD};
pub use handshake::{compute_accept_key, generate_key, ResponseHead, UpgradeRequest, WS_GUID};
pub use mask::{apply_mask, apply_mask_fast};
pub use opcode::{MessageKind, OpCode};
pub use utf8::Utf8Validator;
