//! Property-based tests for frame parsing and masking.

use bytes::BytesMut;
use proptest::prelude::*;
use wsline::protocol::{apply_mask, apply_mask_fast, OpCode};
use wsline::Frame;

fn data_opcode() -> impl Strategy<Value = OpCode> {
    prop_oneof![
        Just(OpCode::Continuation),
        Just(OpCode::Text),
        Just(OpCode::Binary),
    ]
}

proptest! {
    // Roundtrip: parse(encode(frame)) == frame, unmasked.
    #[test]
    fn roundtrip_unmasked(
        fin in any::<bool>(),
        opcode in data_opcode(),
        payload in prop::collection::vec(any::<u8>(), 0..2000)
    ) {
        let frame = Frame::new(fin, opcode, payload);
        let mut buf = BytesMut::new();
        frame.encode_into(&mut buf, None);

        let (parsed, consumed) = Frame::parse(&buf).unwrap().expect("complete frame");
        prop_assert_eq!(consumed, buf.len());
        prop_assert_eq!(parsed, frame);
    }

    // Roundtrip under masking: the parser removes the mask.
    #[test]
    fn roundtrip_masked(
        fin in any::<bool>(),
        opcode in data_opcode(),
        payload in prop::collection::vec(any::<u8>(), 0..2000),
        key in any::<[u8; 4]>()
    ) {
        let frame = Frame::new(fin, opcode, payload);
        let mut buf = BytesMut::new();
        frame.encode_into(&mut buf, Some(key));

        let (parsed, consumed) = Frame::parse(&buf).unwrap().expect("complete frame");
        prop_assert_eq!(consumed, buf.len());
        prop_assert_eq!(parsed, frame);
    }

    // Every strict prefix of an encoded frame asks for more data rather
    // than failing or succeeding early.
    #[test]
    fn truncated_frames_are_incomplete(
        payload in prop::collection::vec(any::<u8>(), 0..300),
        key in any::<[u8; 4]>()
    ) {
        let frame = Frame::new(true, OpCode::Binary, payload);
        let mut buf = BytesMut::new();
        frame.encode_into(&mut buf, Some(key));

        for cut in 0..buf.len() {
            prop_assert!(Frame::parse(&buf[..cut]).unwrap().is_none(), "cut {}", cut);
        }
    }

    // The fast mask path agrees with the scalar one on arbitrary input.
    #[test]
    fn mask_fast_matches_scalar(
        data in prop::collection::vec(any::<u8>(), 0..512),
        key in any::<[u8; 4]>()
    ) {
        let mut scalar = data.clone();
        let mut fast = data;
        apply_mask(&mut scalar, key);
        apply_mask_fast(&mut fast, key);
        prop_assert_eq!(scalar, fast);
    }

    // Masking twice is the identity.
    #[test]
    fn mask_is_involution(
        data in prop::collection::vec(any::<u8>(), 0..512),
        key in any::<[u8; 4]>()
    ) {
        let original = data.clone();
        let mut data = data;
        apply_mask_fast(&mut data, key);
        apply_mask_fast(&mut data, key);
        prop_assert_eq!(data, original);
    }
}
