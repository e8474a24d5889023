// Target-sum encoding

use crate::encoding::{bytes_to_chunks, EncodingError, IncomparableEncoding};
use crate::symmetric::MESSAGE_HASH_LEN;

/// Accepts a message hash only if its digits sum to `TARGET_SUM`.
///
/// Two distinct digit vectors with equal sums are always incomparable, so no
/// checksum chains are needed. The signer retries with fresh randomness
/// until a hash hits the target.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TargetSumEncoding<const CHUNK_SIZE: usize, const TARGET_SUM: usize>;

impl<const CHUNK_SIZE: usize, const TARGET_SUM: usize> IncomparableEncoding
    for TargetSumEncoding<CHUNK_SIZE, TARGET_SUM>
{
    const NAME: &'static str = "TargetSum";
    const CHUNK_SIZE: usize = CHUNK_SIZE;
    const DIMENSION: usize = MESSAGE_HASH_LEN * 8 / CHUNK_SIZE;
    const MAX_TRIES: usize = 100_000;

    fn encode(message_hash: &[u8; MESSAGE_HASH_LEN]) -> Result<Vec<u8>, EncodingError> {
        let chunks = bytes_to_chunks(message_hash, CHUNK_SIZE);
        let sum: usize = chunks.iter().map(|&x| x as usize).sum();
        if sum == TARGET_SUM {
            Ok(chunks)
        } else {
            Err(EncodingError::TargetSumMismatch {
                expected: TARGET_SUM,
                actual: sum,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type W16 = TargetSumEncoding<4, 480>;

    #[test]
    fn test_target_sum_accepts_matching_hash() {
        // 0x78 splits into 8 + 7 = 15 per byte, 32 bytes give 480
        let codeword = W16::encode(&[0x78; 32]).unwrap();
        assert_eq!(codeword.len(), 64);
        assert_eq!(codeword.iter().map(|&d| d as usize).sum::<usize>(), 480);
    }

    #[test]
    fn test_target_sum_rejects_other_sums() {
        match W16::encode(&[0u8; 32]) {
            Err(EncodingError::TargetSumMismatch { expected, actual }) => {
                assert_eq!(expected, 480);
                assert_eq!(actual, 0);
            }
            _ => panic!("Expected TargetSumMismatch"),
        }
    }

    #[test]
    fn test_target_sum_dimension() {
        assert_eq!(W16::DIMENSION, 64);
        assert_eq!(W16::BASE, 16);
        assert_eq!(TargetSumEncoding::<8, 4000>::DIMENSION, 32);
    }
}
