//! Payload masking (RFC 6455 section 5.3).
//!
//! Client-to-server frames are XOR-masked with a 4-byte key; applying the
//! same key twice restores the original bytes, so one routine serves both
//! masking and unmasking.

/// Byte-by-byte XOR masking.
#[inline]
pub fn apply_mask(data: &mut [u8], key: [u8; 4]) {
    for (i, byte) in data.iter_mut().enumerate() {
        *byte ^= key[i % 4];
    }
}

/// Word-at-a-time XOR masking.
///
/// Processes aligned 4-byte chunks as `u32` operations and falls back to the
/// scalar loop for the tail. Equivalent to [`apply_mask`] for every input.
#[inline]
pub fn apply_mask_fast(data: &mut [u8], key: [u8; 4]) {
    let key_word = u32::from_ne_bytes(key);
    let mut chunks = data.chunks_exact_mut(4);
    for chunk in &mut chunks {
        let word = u32::from_ne_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]) ^ key_word;
        chunk.copy_from_slice(&word.to_ne_bytes());
    }
    for (i, byte) in chunks.into_remainder().iter_mut().enumerate() {
        *byte ^= key[i % 4];
    }
}
