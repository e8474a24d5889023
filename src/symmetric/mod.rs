// Tweakable hash functions, hash chains and the PRF used for key derivation

pub mod poseidon;
pub mod prf;
pub mod sha3;

use core::fmt::Debug;
use serde::{de::DeserializeOwned, Serialize};

pub use self::poseidon::Poseidon2TweakHash;
pub use self::prf::{PrfKey, PRF_KEY_LEN, PRF_OUTPUT_LEN};
pub use self::sha3::Sha3TweakHash;

/// Length in bytes of the per-signature randomness `rho`.
pub const RAND_LEN: usize = 24;
/// Length in bytes of a preprocessed message digest.
pub const MESSAGE_DIGEST_LEN: usize = 32;
/// Length in bytes of the randomized message hash fed to the encoding.
pub const MESSAGE_HASH_LEN: usize = 32;
/// Length in bytes of a serialized tweak.
pub const TWEAK_LEN: usize = 12;

/// Domain separator mixed into every hash call.
///
/// Chain tweaks, tree tweaks, padding tweaks and message tweaks never
/// collide with each other, and within one kind distinct fields give
/// distinct tweaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tweak {
    /// Step `pos` of chain `chain_index` at `epoch`.
    Chain { epoch: u64, chain_index: u8, pos: u8 },
    /// Merkle node at `level` (leaves are level 0) and horizontal position `pos`.
    Tree { level: u8, pos: u64 },
    /// Filler node for positions past the lifetime.
    Padding { level: u8, pos: u64 },
    /// Randomized message hash at `epoch`.
    Message { epoch: u64 },
}

impl Tweak {
    const CHAIN_TAG: u8 = 0x00;
    const TREE_TAG: u8 = 0x01;
    const PADDING_TAG: u8 = 0x02;
    const MESSAGE_TAG: u8 = 0x03;

    /// Fixed-length byte form: tag followed by big-endian fields, zero padded.
    pub fn to_bytes(&self) -> [u8; TWEAK_LEN] {
        let mut out = [0u8; TWEAK_LEN];
        match *self {
            Tweak::Chain {
                epoch,
                chain_index,
                pos,
            } => {
                out[0] = Self::CHAIN_TAG;
                out[1..9].copy_from_slice(&epoch.to_be_bytes());
                out[9] = chain_index;
                out[10] = pos;
            }
            Tweak::Tree { level, pos } => {
                out[0] = Self::TREE_TAG;
                out[1] = level;
                out[2..10].copy_from_slice(&pos.to_be_bytes());
            }
            Tweak::Padding { level, pos } => {
                out[0] = Self::PADDING_TAG;
                out[1] = level;
                out[2..10].copy_from_slice(&pos.to_be_bytes());
            }
            Tweak::Message { epoch } => {
                out[0] = Self::MESSAGE_TAG;
                out[1..9].copy_from_slice(&epoch.to_be_bytes());
            }
        }
        out
    }

    /// Packs the tweak into at most 88 bits.
    ///
    /// Layout from the least significant byte: tag, then the kind's fields.
    pub fn to_u128(&self) -> u128 {
        match *self {
            Tweak::Chain {
                epoch,
                chain_index,
                pos,
            } => {
                ((epoch as u128) << 24)
                    | ((chain_index as u128) << 16)
                    | ((pos as u128) << 8)
                    | Self::CHAIN_TAG as u128
            }
            Tweak::Tree { level, pos } => {
                ((pos as u128) << 16) | ((level as u128) << 8) | Self::TREE_TAG as u128
            }
            Tweak::Padding { level, pos } => {
                ((pos as u128) << 16) | ((level as u128) << 8) | Self::PADDING_TAG as u128
            }
            Tweak::Message { epoch } => ((epoch as u128) << 8) | Self::MESSAGE_TAG as u128,
        }
    }
}

/// A hash function keyed by a public parameter and domain-separated by a [`Tweak`].
///
/// Implementations are stateless unit types; all inputs travel through the
/// associated functions.
pub trait TweakableHash:
    Debug + Clone + Copy + Default + PartialEq + Eq + Send + Sync + 'static
{
    /// Public parameter shared by every hash call of one key pair.
    type Parameter: Copy + Debug + PartialEq + Eq + Send + Sync + Serialize + DeserializeOwned;
    /// Output (and chain/tree node) type.
    type Domain: Copy
        + Default
        + Debug
        + PartialEq
        + Eq
        + Send
        + Sync
        + Serialize
        + DeserializeOwned;

    /// Human-readable backend name.
    const NAME: &'static str;
    /// Required key-generation seed length.
    const SEED_LEN: usize = 32;
    /// Size in bytes of an encoded domain element.
    const DOMAIN_BYTES: usize;
    /// Size in bytes of an encoded parameter.
    const PARAMETER_BYTES: usize;

    /// Map PRF output onto a public parameter.
    fn parameter_from_prf(bytes: &[u8; PRF_OUTPUT_LEN]) -> Self::Parameter;

    /// Map PRF output onto a domain element (chain starts).
    fn domain_from_prf(bytes: &[u8; PRF_OUTPUT_LEN]) -> Self::Domain;

    /// Tweakable hash of a sequence of domain elements.
    fn apply(parameter: &Self::Parameter, tweak: &Tweak, inputs: &[Self::Domain]) -> Self::Domain;

    /// Randomized message hash bound to the parameter and the epoch.
    fn message_hash(
        parameter: &Self::Parameter,
        epoch: u64,
        rho: &[u8; RAND_LEN],
        digest: &[u8; MESSAGE_DIGEST_LEN],
    ) -> [u8; MESSAGE_HASH_LEN];

    /// Whether a decoded domain element is in canonical form.
    fn is_canonical_domain(_domain: &Self::Domain) -> bool {
        true
    }

    /// Whether a decoded parameter is in canonical form.
    fn is_canonical_parameter(_parameter: &Self::Parameter) -> bool {
        true
    }
}

/// Walks `steps` hops along chain `chain_index` starting from position `start_pos`.
///
/// Hop `j` (zero based) uses the tweak position `start_pos + j + 1`, so walking
/// `a` then `b` steps equals walking `a + b` steps.
pub fn chain<TH: TweakableHash>(
    parameter: &TH::Parameter,
    epoch: u64,
    chain_index: u8,
    start_pos: u8,
    steps: usize,
    start: &TH::Domain,
) -> TH::Domain {
    let mut current = *start;
    for j in 0..steps {
        let pos = (start_pos as usize + j + 1) as u8;
        let tweak = Tweak::Chain {
            epoch,
            chain_index,
            pos,
        };
        current = TH::apply(parameter, &tweak, &[current]);
    }
    current
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_tweak_kinds_are_separated() {
        let tweaks = [
            Tweak::Chain {
                epoch: 1,
                chain_index: 1,
                pos: 1,
            },
            Tweak::Tree { level: 1, pos: 1 },
            Tweak::Padding { level: 1, pos: 1 },
            Tweak::Message { epoch: 1 },
        ];

        let bytes: HashSet<_> = tweaks.iter().map(Tweak::to_bytes).collect();
        let packed: HashSet<_> = tweaks.iter().map(Tweak::to_u128).collect();
        assert_eq!(bytes.len(), 4, "Byte encodings must differ across kinds");
        assert_eq!(packed.len(), 4, "Packed encodings must differ across kinds");
    }

    #[test]
    fn test_tweak_fields_are_separated() {
        let a = Tweak::Chain {
            epoch: 7,
            chain_index: 3,
            pos: 2,
        };
        let b = Tweak::Chain {
            epoch: 7,
            chain_index: 2,
            pos: 3,
        };
        assert_ne!(a.to_bytes(), b.to_bytes());
        assert_ne!(a.to_u128(), b.to_u128());

        let c = Tweak::Tree { level: 2, pos: 5 };
        let d = Tweak::Tree { level: 5, pos: 2 };
        assert_ne!(c.to_bytes(), d.to_bytes());
        assert_ne!(c.to_u128(), d.to_u128());
    }

    #[test]
    fn test_tweak_packing_fits_88_bits() {
        let widest = Tweak::Chain {
            epoch: u64::MAX,
            chain_index: u8::MAX,
            pos: u8::MAX,
        };
        assert!(widest.to_u128() < (1u128 << 88), "Chain tweak must fit in 88 bits");

        let tree = Tweak::Tree {
            level: u8::MAX,
            pos: u64::MAX,
        };
        assert!(tree.to_u128() < (1u128 << 88), "Tree tweak must fit in 88 bits");
    }

    #[test]
    fn test_chain_composes() {
        let parameter = [7u8; 16];
        let start = [1u8; 32];

        let direct = chain::<Sha3TweakHash>(&parameter, 4, 2, 0, 5, &start);
        let first = chain::<Sha3TweakHash>(&parameter, 4, 2, 0, 2, &start);
        let rest = chain::<Sha3TweakHash>(&parameter, 4, 2, 2, 3, &first);

        assert_eq!(direct, rest, "Walking 2 then 3 steps must equal walking 5");
    }

    #[test]
    fn test_chain_zero_steps_is_identity() {
        let parameter = [0u8; 16];
        let start = [9u8; 32];
        assert_eq!(chain::<Sha3TweakHash>(&parameter, 0, 0, 3, 0, &start), start);
    }
}
