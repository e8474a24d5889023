// SHA3-256 tweakable hash

use sha3::{Digest, Sha3_256};

use crate::symmetric::{
    Tweak, TweakableHash, MESSAGE_DIGEST_LEN, MESSAGE_HASH_LEN, PRF_OUTPUT_LEN, RAND_LEN,
};

/// Length in bytes of a SHA3 hash output.
pub const SHA3_DOMAIN_LEN: usize = 32;
/// Length in bytes of the SHA3 public parameter.
pub const SHA3_PARAMETER_LEN: usize = 16;

/// `SHA3-256(parameter || tweak || inputs...)`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Sha3TweakHash;

impl TweakableHash for Sha3TweakHash {
    type Parameter = [u8; SHA3_PARAMETER_LEN];
    type Domain = [u8; SHA3_DOMAIN_LEN];

    const NAME: &'static str = "SHA3-256";
    const DOMAIN_BYTES: usize = SHA3_DOMAIN_LEN;
    const PARAMETER_BYTES: usize = SHA3_PARAMETER_LEN;

    fn parameter_from_prf(bytes: &[u8; PRF_OUTPUT_LEN]) -> Self::Parameter {
        let mut parameter = [0u8; SHA3_PARAMETER_LEN];
        parameter.copy_from_slice(&bytes[..SHA3_PARAMETER_LEN]);
        parameter
    }

    fn domain_from_prf(bytes: &[u8; PRF_OUTPUT_LEN]) -> Self::Domain {
        let mut domain = [0u8; SHA3_DOMAIN_LEN];
        domain.copy_from_slice(&bytes[..SHA3_DOMAIN_LEN]);
        domain
    }

    fn apply(parameter: &Self::Parameter, tweak: &Tweak, inputs: &[Self::Domain]) -> Self::Domain {
        let mut hasher = Sha3_256::new();
        hasher.update(parameter);
        hasher.update(tweak.to_bytes());
        for input in inputs {
            hasher.update(input);
        }
        hasher.finalize().into()
    }

    fn message_hash(
        parameter: &Self::Parameter,
        epoch: u64,
        rho: &[u8; RAND_LEN],
        digest: &[u8; MESSAGE_DIGEST_LEN],
    ) -> [u8; MESSAGE_HASH_LEN] {
        let mut hasher = Sha3_256::new();
        hasher.update(rho);
        hasher.update(parameter);
        hasher.update(Tweak::Message { epoch }.to_bytes());
        hasher.update(digest);
        hasher.finalize().into()
    }
}
