// Flat binary encoding of keys and signatures
//
// Layout is bincode with fixed-width little-endian integers. Arrays are
// written without a length, vectors with a u64 length prefix. Decoding
// rejects trailing bytes and then checks the structure of the value.

use bincode::Options;
use serde::{de::DeserializeOwned, Serialize};

use crate::encoding::IncomparableEncoding;
use crate::symmetric::TweakableHash;
use crate::xmss::error::Result;
use crate::xmss::keys::{PublicKey, SecretKey, Signature};

fn options() -> impl Options {
    bincode::options()
        .with_fixint_encoding()
        .with_little_endian()
        .reject_trailing_bytes()
}

fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    Ok(options().serialize(value)?)
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    Ok(options().deserialize(bytes)?)
}

/// Byte encoding with exact round-trip
pub trait Encodable: Sized {
    fn to_bytes(&self) -> Result<Vec<u8>>;

    /// Fails with `MalformedEncoding` on wrong length or invalid structure
    fn from_bytes(bytes: &[u8]) -> Result<Self>;
}

impl<TH: TweakableHash> Encodable for PublicKey<TH> {
    fn to_bytes(&self) -> Result<Vec<u8>> {
        encode(self)
    }

    fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let pk: Self = decode(bytes)?;
        pk.validate()?;
        Ok(pk)
    }
}

impl<TH: TweakableHash> Encodable for Signature<TH> {
    fn to_bytes(&self) -> Result<Vec<u8>> {
        encode(self)
    }

    fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let sig: Self = decode(bytes)?;
        sig.validate()?;
        Ok(sig)
    }
}

impl<TH: TweakableHash, IE: IncomparableEncoding> Encodable for SecretKey<TH, IE> {
    fn to_bytes(&self) -> Result<Vec<u8>> {
        encode(self)
    }

    /// Structural checks run during deserialization
    fn from_bytes(bytes: &[u8]) -> Result<Self> {
        decode(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symmetric::poseidon::KOALABEAR_MODULUS;
    use crate::symmetric::{Poseidon2TweakHash, Sha3TweakHash};
    use crate::xmss::error::HashSigError;
    use crate::xmss::keys::StatefulSecretKey;
    use crate::xmss::scheme::{Poseidon2Scheme, Sha3Scheme, SignatureScheme};

    const SEED: [u8; 32] = [5u8; 32];

    #[test]
    fn test_public_key_length_matches_metadata() {
        let (pk, _sk) = Sha3Scheme::key_gen(&SEED, 0, 16).unwrap();
        let bytes = pk.to_bytes().unwrap();
        assert_eq!(bytes.len(), Sha3Scheme::metadata(16).public_key_size_bytes);

        let decoded = PublicKey::<Sha3TweakHash>::from_bytes(&bytes).unwrap();
        assert_eq!(decoded, pk);
    }

    #[test]
    fn test_signature_length_matches_metadata() {
        let (_pk, mut sk) = Sha3Scheme::key_gen(&SEED, 0, 16).unwrap();
        sk.advance_preparation();
        let sig = Sha3Scheme::sign(&mut sk, 2, &[3u8; 32]).unwrap();
        let bytes = sig.to_bytes().unwrap();
        assert_eq!(bytes.len(), Sha3Scheme::metadata(16).signature_size_bytes);
    }

    #[test]
    fn test_secret_key_length_is_fixed() {
        let expected = Sha3Scheme::metadata(16).secret_key_size_bytes;
        let (_pk, mut sk) = Sha3Scheme::key_gen(&SEED, 0, 16).unwrap();

        for advances in 0..5 {
            let bytes = sk.to_bytes().unwrap();
            assert_eq!(
                bytes.len(),
                expected,
                "Length should not depend on the window after {advances} advances"
            );
            let decoded = <Sha3Scheme as SignatureScheme>::SecretKey::from_bytes(&bytes).unwrap();
            assert_eq!(decoded, sk);
            assert_eq!(decoded.prepared_interval(), sk.prepared_interval());
            sk.advance_preparation();
        }
    }

    #[test]
    fn test_poseidon_secret_key_length_is_fixed() {
        let expected = Poseidon2Scheme::metadata(8).secret_key_size_bytes;
        let (_pk, mut sk) = Poseidon2Scheme::key_gen(&SEED, 0, 8).unwrap();
        assert_eq!(sk.to_bytes().unwrap().len(), expected);
        sk.advance_preparation();
        assert_eq!(sk.to_bytes().unwrap().len(), expected);
    }

    #[test]
    fn test_unused_window_slot_must_be_blank() {
        let (_pk, sk) = Sha3Scheme::key_gen(&SEED, 0, 16).unwrap();
        let mut bytes = sk.to_bytes().unwrap();

        // last node of the second slot sits right before next_bottom_tree and the flags
        let offset = bytes.len() - (8 + 4 * 2) - 8 - 1;
        bytes[offset] = 1;

        let result = <Sha3Scheme as SignatureScheme>::SecretKey::from_bytes(&bytes);
        assert!(matches!(result, Err(HashSigError::MalformedEncoding(_))));
    }

    #[test]
    fn test_consumed_flag_outside_window_rejected() {
        let (_pk, mut sk) = Sha3Scheme::key_gen(&SEED, 0, 16).unwrap();
        sk.advance_preparation();
        let mut bytes = sk.to_bytes().unwrap();

        // flags of the second slot are the last four bytes
        let len = bytes.len();
        bytes[len - 1] = 1;

        let result = <Sha3Scheme as SignatureScheme>::SecretKey::from_bytes(&bytes);
        assert!(matches!(result, Err(HashSigError::MalformedEncoding(_))));
    }

    #[test]
    fn test_truncated_and_extended_buffers_rejected() {
        let (pk, _sk) = Sha3Scheme::key_gen(&SEED, 0, 16).unwrap();
        let bytes = pk.to_bytes().unwrap();

        let short = &bytes[..bytes.len() - 1];
        match PublicKey::<Sha3TweakHash>::from_bytes(short) {
            Err(HashSigError::MalformedEncoding(_)) => {}
            _ => panic!("Expected MalformedEncoding for truncated buffer"),
        }

        let mut long = bytes.clone();
        long.push(0);
        match PublicKey::<Sha3TweakHash>::from_bytes(&long) {
            Err(HashSigError::MalformedEncoding(_)) => {}
            _ => panic!("Expected MalformedEncoding for trailing byte"),
        }
    }

    #[test]
    fn test_zero_lifetime_public_key_rejected() {
        let (pk, _sk) = Sha3Scheme::key_gen(&SEED, 0, 16).unwrap();
        let mut bytes = pk.to_bytes().unwrap();
        // lifetime is the final u64
        let len = bytes.len();
        bytes[len - 8..].copy_from_slice(&0u64.to_le_bytes());

        let result = PublicKey::<Sha3TweakHash>::from_bytes(&bytes);
        assert!(matches!(result, Err(HashSigError::MalformedEncoding(_))));
    }

    #[test]
    fn test_non_canonical_field_element_rejected() {
        let (pk, _sk) = Poseidon2Scheme::key_gen(&SEED, 0, 4).unwrap();
        let mut bytes = pk.to_bytes().unwrap();
        bytes[..4].copy_from_slice(&KOALABEAR_MODULUS.to_le_bytes());

        let result = PublicKey::<Poseidon2TweakHash>::from_bytes(&bytes);
        assert!(matches!(result, Err(HashSigError::MalformedEncoding(_))));
    }

    #[test]
    fn test_inconsistent_secret_key_window_rejected() {
        let (_pk, mut sk) = Sha3Scheme::key_gen(&SEED, 0, 16).unwrap();
        sk.advance_preparation();
        let mut bytes = sk.to_bytes().unwrap();

        // next_bottom_tree sits right before the consumed vector (u64 length + 8 flags)
        let len = bytes.len();
        let offset = len - 8 - 8 - 8;
        bytes[offset..offset + 8].copy_from_slice(&3u64.to_le_bytes());

        let result = <Sha3Scheme as SignatureScheme>::SecretKey::from_bytes(&bytes);
        assert!(matches!(result, Err(HashSigError::MalformedEncoding(_))));
    }
}
