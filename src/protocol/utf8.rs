//! Incremental UTF-8 validation for fragmented text messages.
//!
//! Text fragments may split a multi-byte sequence anywhere, so the validator
//! carries up to three trailing bytes of an unfinished sequence from one
//! fragment into the next instead of buffering the whole message.

use crate::error::CloseError;

/// Stateful UTF-8 validator fed one fragment at a time.
#[derive(Debug, Clone, Default)]
pub struct Utf8Validator {
    /// Unfinished multi-byte sequence carried over from the previous fragment.
    carry: [u8; 4],
    carry_len: usize,
}

impl Utf8Validator {
    /// Create a validator with no carried state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed the next fragment.
    ///
    /// With `fin` false, a sequence cut off at the end of `data` is saved and
    /// completed by the next call. With `fin` true every sequence must be
    /// complete.
    ///
    /// # Errors
    ///
    /// Returns a 1007 `CloseError` on any invalid sequence, including a
    /// sequence left unfinished by the final fragment.
    pub fn push(&mut self, data: &[u8], fin: bool) -> Result<(), CloseError> {
        let mut pending;
        let chunk: &[u8] = if self.carry_len == 0 {
            data
        } else {
            pending = Vec::with_capacity(self.carry_len + data.len());
            pending.extend_from_slice(&self.carry[..self.carry_len]);
            pending.extend_from_slice(data);
            self.carry_len = 0;
            &pending
        };

        let Err(err) = std::str::from_utf8(chunk) else {
            return Ok(());
        };

        // error_len() is None only when the input ends inside a sequence
        // that valid continuation bytes could still complete.
        if err.error_len().is_some() || fin {
            return Err(CloseError::invalid_utf8());
        }

        let tail = &chunk[err.valid_up_to()..];
        if tail.len() >= 4 {
            // A well-formed sequence is at most four bytes; anything longer
            // cannot be completed by a later fragment.
            return Err(CloseError::invalid_utf8());
        }

        self.carry[..tail.len()].copy_from_slice(tail);
        self.carry_len = tail.len();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_ascii_and_multibyte() {
        let mut v = Utf8Validator::new();
        assert!(v.push(b"plain ascii", true).is_ok());

        let mut v = Utf8Validator::new();
        assert!(v.push("κόσμε 世界 🌍".as_bytes(), true).is_ok());
    }

    #[test]
    fn rejects_invalid_sequences() {
        for bad in [&[0x80][..], &[0xff], &[0xc0, 0xaf], &[0xe0, 0x80]] {
            let mut v = Utf8Validator::new();
            let err = v.push(bad, true).unwrap_err();
            assert_eq!(err.code, 1007, "input {bad:02x?}");
        }
    }

    #[test]
    fn rejects_invalid_mid_fragment_without_fin() {
        let mut v = Utf8Validator::new();
        assert_eq!(v.push(&[0x48, 0x80, 0x6c], false).unwrap_err().code, 1007);
    }

    #[test]
    fn carries_split_sequence_across_fragments() {
        // Euro sign: e2 82 ac.
        let mut v = Utf8Validator::new();
        assert!(v.push(&[0xe2], false).is_ok());
        assert!(v.push(&[0x82, 0xac], true).is_ok());

        // Four-byte emoji split three ways: f0 9f 8e 89.
        let mut v = Utf8Validator::new();
        assert!(v.push(&[0xf0], false).is_ok());
        assert!(v.push(&[0x9f], false).is_ok());
        assert!(v.push(&[0x8e, 0x89], true).is_ok());
    }

    #[test]
    fn rejects_sequence_cut_off_by_final_fragment() {
        let mut v = Utf8Validator::new();
        assert!(v.push(&[0xe2], false).is_ok());
        assert_eq!(v.push(&[0x82], true).unwrap_err().code, 1007);
    }

    #[test]
    fn empty_fragments_preserve_carry() {
        let mut v = Utf8Validator::new();
        assert!(v.push(&[0xe2], false).is_ok());
        assert!(v.push(&[], false).is_ok());
        assert!(v.push(&[0x82, 0xac], true).is_ok());
    }

    #[test]
    fn prefix_text_before_split_sequence() {
        let mut first = b"Hello ".to_vec();
        first.push(0xe4); // first byte of U+4E16
        let mut v = Utf8Validator::new();
        assert!(v.push(&first, false).is_ok());
        assert!(v.push(&[0xb8, 0x96], true).is_ok());
    }

    #[test]
    fn empty_final_fragment_with_carry_fails() {
        let mut v = Utf8Validator::new();
        assert!(v.push(&[0xf0, 0x9f], false).is_ok());
        assert_eq!(v.push(&[], true).unwrap_err().code, 1007);
    }
}
