// Winternitz encoding with checksum

use crate::encoding::{bytes_to_chunks, EncodingError, IncomparableEncoding};
use crate::symmetric::MESSAGE_HASH_LEN;

/// Number of base-`2^chunk_size` digits needed for the largest possible checksum.
pub const fn checksum_chunks(chunk_size: usize) -> usize {
    let base = 1usize << chunk_size;
    let mut remaining = (MESSAGE_HASH_LEN * 8 / chunk_size) * (base - 1);
    let mut digits = 0;
    while remaining > 0 {
        remaining /= base;
        digits += 1;
    }
    digits
}

/// Message digits followed by the little-endian digits of `sum(BASE - 1 - x_i)`.
///
/// Raising any message digit lowers the checksum, which is what makes
/// codewords incomparable. Never fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WinternitzEncoding<const CHUNK_SIZE: usize>;

impl<const CHUNK_SIZE: usize> WinternitzEncoding<CHUNK_SIZE> {
    pub const NUM_CHUNKS_MESSAGE: usize = MESSAGE_HASH_LEN * 8 / CHUNK_SIZE;
    pub const NUM_CHUNKS_CHECKSUM: usize = checksum_chunks(CHUNK_SIZE);
}

impl<const CHUNK_SIZE: usize> IncomparableEncoding for WinternitzEncoding<CHUNK_SIZE> {
    const NAME: &'static str = "Winternitz";
    const CHUNK_SIZE: usize = CHUNK_SIZE;
    const DIMENSION: usize = Self::NUM_CHUNKS_MESSAGE + Self::NUM_CHUNKS_CHECKSUM;
    const MAX_TRIES: usize = 1;

    fn encode(message_hash: &[u8; MESSAGE_HASH_LEN]) -> Result<Vec<u8>, EncodingError> {
        let base = 1usize << CHUNK_SIZE;
        let mut chunks = bytes_to_chunks(message_hash, CHUNK_SIZE);

        let mut checksum: usize = chunks.iter().map(|&x| base - 1 - x as usize).sum();
        for _ in 0..Self::NUM_CHUNKS_CHECKSUM {
            chunks.push((checksum % base) as u8);
            checksum /= base;
        }

        Ok(chunks)
    }
}
