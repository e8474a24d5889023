// Incomparable encodings of message hashes into chain positions
//
// A codeword is a vector of `DIMENSION` digits in `[0, BASE)`. For two
// distinct codewords produced by the same encoding, neither is
// componentwise less than or equal to the other. The signer walks chain
// `i` up to digit `i`, so a forger would have to walk some chain backwards.

pub mod target_sum;
pub mod winternitz;

use thiserror::Error;

use crate::symmetric::MESSAGE_HASH_LEN;

pub use self::target_sum::TargetSumEncoding;
pub use self::winternitz::WinternitzEncoding;

/// Why an encoding attempt produced no codeword.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodingError {
    /// Digit sum differs from the fixed target; the caller retries with fresh randomness.
    #[error("digit sum {actual} does not match target {expected}")]
    TargetSumMismatch { expected: usize, actual: usize },
}

/// Maps a randomized message hash onto a codeword.
pub trait IncomparableEncoding:
    core::fmt::Debug + Clone + Copy + Default + PartialEq + Eq + Send + Sync + 'static
{
    /// Human-readable encoding name.
    const NAME: &'static str;
    /// Bits per digit.
    const CHUNK_SIZE: usize;
    /// Digit alphabet size, also the chain length.
    const BASE: usize = 1 << Self::CHUNK_SIZE;
    /// Number of digits, also the number of chains.
    const DIMENSION: usize;
    /// How many randomness values the signer tries before giving up.
    const MAX_TRIES: usize;

    /// Encode one message hash. Failing attempts are expected for some encodings.
    fn encode(message_hash: &[u8; MESSAGE_HASH_LEN]) -> Result<Vec<u8>, EncodingError>;
}

/// Split bytes into `chunk_size`-bit digits, least significant bits of each byte first.
///
/// `chunk_size` must divide 8.
pub fn bytes_to_chunks(bytes: &[u8], chunk_size: usize) -> Vec<u8> {
    debug_assert!(
        matches!(chunk_size, 1 | 2 | 4 | 8),
        "chunk size must divide 8"
    );
    let per_byte = 8 / chunk_size;
    let mask = ((1u16 << chunk_size) - 1) as u8;

    let mut out = Vec::with_capacity(bytes.len() * per_byte);
    for byte in bytes {
        for i in 0..per_byte {
            out.push((byte >> (i * chunk_size)) & mask);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bytes_to_chunks_nibbles() {
        let chunks = bytes_to_chunks(&[0xAB, 0x01], 4);
        assert_eq!(chunks, vec![0x0B, 0x0A, 0x01, 0x00]);
    }

    #[test]
    fn test_bytes_to_chunks_bits_and_pairs() {
        assert_eq!(
            bytes_to_chunks(&[0b1000_0101], 1),
            vec![1, 0, 1, 0, 0, 0, 0, 1]
        );
        assert_eq!(bytes_to_chunks(&[0b1110_0100], 2), vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_bytes_to_chunks_whole_bytes() {
        assert_eq!(bytes_to_chunks(&[7, 255], 8), vec![7, 255]);
    }
}
