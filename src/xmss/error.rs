// Error types for the signature engine

use thiserror::Error;

#[derive(Debug, Error)]
pub enum HashSigError {
    /// Key generation or construction parameter rejected
    #[error("Invalid parameter: {reason}")]
    InvalidParameter { reason: String },

    /// Epoch value outside the key's valid range
    #[error("Epoch {epoch} outside valid range [{activation_epoch}, {end_epoch}) for lifetime {lifetime}")]
    EpochOutOfRange {
        epoch: u64,
        activation_epoch: u64,
        end_epoch: u64,
        lifetime: u64,
    },

    /// Epoch in range but not covered by the prepared window
    #[error("Epoch {epoch} not prepared (prepared interval [{prepared_start}, {prepared_end}))")]
    NotPrepared {
        epoch: u64,
        prepared_start: u64,
        prepared_end: u64,
    },

    /// This key already produced a signature for the epoch
    #[error("Epoch {epoch} already signed with this key; refusing to sign twice")]
    EpochAlreadySigned { epoch: u64 },

    /// No randomness in the retry budget produced a codeword
    #[error("Encoding failed after {attempts} attempts")]
    EncodingAttemptsExceeded { attempts: usize },

    /// Byte buffer with wrong length or invalid structure
    #[error("Malformed encoding: {0}")]
    MalformedEncoding(String),

    /// Background worker panicked or was cancelled
    #[error("Background task failed: {0}")]
    TaskFailed(String),
}

impl HashSigError {
    /// Whether the error belongs to the invalid-parameter family.
    pub fn is_invalid_parameter(&self) -> bool {
        matches!(
            self,
            HashSigError::InvalidParameter { .. } | HashSigError::EpochOutOfRange { .. }
        )
    }
}

impl From<bincode::Error> for HashSigError {
    fn from(err: bincode::Error) -> Self {
        HashSigError::MalformedEncoding(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, HashSigError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symmetric::Sha3TweakHash;
    use crate::xmss::codec::Encodable;
    use crate::xmss::keys::PublicKey;
    use crate::xmss::scheme::{Sha3Scheme, SignatureScheme};

    #[test]
    fn test_error_variants_can_be_constructed() {
        let param_err = HashSigError::InvalidParameter {
            reason: "lifetime must be positive".to_string(),
        };
        assert!(param_err.to_string().contains("Invalid parameter"));
        assert!(param_err.to_string().contains("lifetime must be positive"));

        let prep_err = HashSigError::NotPrepared {
            epoch: 12,
            prepared_start: 0,
            prepared_end: 8,
        };
        assert!(prep_err.to_string().contains("12"));
        assert!(prep_err.to_string().contains("[0, 8)"));

        let reuse_err = HashSigError::EpochAlreadySigned { epoch: 10 };
        assert!(reuse_err.to_string().contains("already signed"));

        let enc_err = HashSigError::EncodingAttemptsExceeded { attempts: 100 };
        assert!(enc_err.to_string().contains("100"));

        let task_err = HashSigError::TaskFailed("join error".to_string());
        assert!(task_err.to_string().contains("join error"));
    }

    #[test]
    fn test_epoch_out_of_range_includes_all_fields() {
        let err = HashSigError::EpochOutOfRange {
            epoch: 500,
            activation_epoch: 10,
            end_epoch: 100,
            lifetime: 90,
        };

        let msg = err.to_string();
        assert!(msg.contains("500"), "Should contain epoch value");
        assert!(msg.contains("[10, 100)"), "Should show range in correct format");
        assert!(msg.contains("90"), "Should contain lifetime");
    }

    #[test]
    fn test_invalid_parameter_family() {
        assert!(HashSigError::InvalidParameter {
            reason: String::new()
        }
        .is_invalid_parameter());
        assert!(HashSigError::EpochOutOfRange {
            epoch: 0,
            activation_epoch: 1,
            end_epoch: 2,
            lifetime: 1,
        }
        .is_invalid_parameter());
        assert!(!HashSigError::EpochAlreadySigned { epoch: 0 }.is_invalid_parameter());
    }

    #[test]
    fn test_truncated_public_key_maps_to_malformed_encoding() {
        let (pk, _sk) = Sha3Scheme::key_gen(&[3u8; 32], 0, 4).unwrap();
        let bytes = pk.to_bytes().unwrap();

        match PublicKey::<Sha3TweakHash>::from_bytes(&bytes[..bytes.len() / 2]) {
            Err(HashSigError::MalformedEncoding(msg)) => {
                assert!(msg.contains("io error"), "Should carry the decoder's reason: {msg}");
            }
            _ => panic!("Expected MalformedEncoding for a truncated public key"),
        }
    }
}
