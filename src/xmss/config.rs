// Parameter set configuration and metadata

use serde::{Deserialize, Serialize};

use crate::encoding::IncomparableEncoding;
use crate::symmetric::{TweakableHash, PRF_KEY_LEN, RAND_LEN};
use crate::tree::TreeLayout;
use crate::xmss::scheme::{Poseidon2Scheme, Sha3Scheme, SignatureScheme};

/// Default number of epochs when none is configured
pub const DEFAULT_LIFETIME: u64 = 1 << 20;

const LEN_PREFIX: usize = 8;
const U64_BYTES: usize = 8;

/// Named backend configurations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParameterSet {
    /// SHA3-256 tweakable hash, Winternitz encoding with w = 16 (67 chains)
    Sha3Winternitz,

    /// Poseidon2 over KoalaBear, target-sum encoding with w = 16 and target 480 (64 chains)
    Poseidon2TargetSum,
}

/// Sizes and shape of one configuration at one lifetime
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterMetadata {
    pub lifetime: u64,
    pub tree_depth: u32,
    pub bottom_tree_height: u32,
    pub num_chains: usize,
    pub chain_length: usize,
    pub hash_function: String,
    pub encoding: String,
    pub signature_size_bytes: usize,
    pub public_key_size_bytes: usize,
    pub secret_key_size_bytes: usize,
}

impl ParameterSet {
    /// Get metadata for this parameter set at `lifetime`
    pub fn metadata(&self, lifetime: u64) -> ParameterMetadata {
        match self {
            ParameterSet::Sha3Winternitz => Sha3Scheme::metadata(lifetime),
            ParameterSet::Poseidon2TargetSum => Poseidon2Scheme::metadata(lifetime),
        }
    }
}

impl ParameterMetadata {
    pub fn new<TH: TweakableHash, IE: IncomparableEncoding>(lifetime: u64) -> Self {
        let layout = TreeLayout::new(lifetime);
        let depth = layout.depth() as usize;

        Self {
            lifetime,
            tree_depth: layout.depth(),
            bottom_tree_height: layout.bottom_height(),
            num_chains: IE::DIMENSION,
            chain_length: IE::BASE,
            hash_function: TH::NAME.to_string(),
            encoding: IE::NAME.to_string(),
            signature_size_bytes: signature_size(IE::DIMENSION, depth, TH::DOMAIN_BYTES),
            public_key_size_bytes: TH::DOMAIN_BYTES + TH::PARAMETER_BYTES + 2 * U64_BYTES,
            secret_key_size_bytes: secret_key_size(&layout, TH::DOMAIN_BYTES, TH::PARAMETER_BYTES),
        }
    }
}

/// Key material, epoch range, top tree, then two bottom tree slots (the unused
/// ones blank) and one consumed flag per epoch of both slots
fn secret_key_size(layout: &TreeLayout, domain_bytes: usize, parameter_bytes: usize) -> usize {
    let top = subtree_size(layout.top_height(), domain_bytes);
    let bottom = subtree_size(layout.bottom_height(), domain_bytes);
    let leaves = layout.leaves_per_bottom_tree() as usize;

    PRF_KEY_LEN
        + parameter_bytes
        + 2 * U64_BYTES
        + top
        + 1
        + 2 * bottom
        + U64_BYTES
        + LEN_PREFIX
        + 2 * leaves
}

/// rho, chain values and authentication path, each vector length-prefixed
fn signature_size(num_chains: usize, depth: usize, domain_bytes: usize) -> usize {
    RAND_LEN + LEN_PREFIX + num_chains * domain_bytes + LEN_PREFIX + depth * domain_bytes
}

/// Level byte, start, layer count, then every layer with its own length prefix
fn subtree_size(height: u32, domain_bytes: usize) -> usize {
    let nodes = (1usize << (height + 1)) - 1;
    1 + U64_BYTES + LEN_PREFIX + (height as usize + 1) * LEN_PREFIX + nodes * domain_bytes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sha3_metadata() {
        let metadata = ParameterSet::Sha3Winternitz.metadata(1 << 20);

        assert_eq!(metadata.lifetime, 1_048_576);
        assert_eq!(metadata.tree_depth, 20);
        assert_eq!(metadata.bottom_tree_height, 10);
        assert_eq!(metadata.num_chains, 67);
        assert_eq!(metadata.chain_length, 16);
        assert_eq!(metadata.hash_function, "SHA3-256");
        assert_eq!(metadata.public_key_size_bytes, 32 + 16 + 16);
        assert_eq!(
            metadata.signature_size_bytes,
            24 + 8 + 67 * 32 + 8 + 20 * 32
        );
    }

    #[test]
    fn test_poseidon_metadata() {
        let metadata = ParameterSet::Poseidon2TargetSum.metadata(16);

        assert_eq!(metadata.tree_depth, 4);
        assert_eq!(metadata.num_chains, 64);
        assert_eq!(metadata.encoding, "TargetSum");
        assert_eq!(metadata.public_key_size_bytes, 32 + 20 + 16);
        assert_eq!(metadata.signature_size_bytes, 24 + 8 + 64 * 32 + 8 + 4 * 32);
    }

    #[test]
    fn test_depth_rounds_up_for_odd_lifetimes() {
        let metadata = ParameterSet::Sha3Winternitz.metadata(10);
        assert_eq!(metadata.tree_depth, 4);
        assert_eq!(metadata.bottom_tree_height, 2);
    }

    #[test]
    fn test_secret_key_size() {
        let metadata = ParameterSet::Sha3Winternitz.metadata(16);

        // height-2 subtree: 17 header bytes, 3 layer prefixes, 7 nodes
        let subtree = 17 + 3 * 8 + 7 * 32;
        let expected = 32 + 16 + 16 + subtree + 1 + 2 * subtree + 8 + 8 + 2 * 4;
        assert_eq!(metadata.secret_key_size_bytes, expected);
    }

    #[test]
    fn test_metadata_serializes() {
        let metadata = ParameterSet::Poseidon2TargetSum.metadata(64);
        let json = serde_json::to_string(&metadata).unwrap();
        let back: ParameterMetadata = serde_json::from_str(&json).unwrap();
        assert_eq!(metadata, back);
    }

    #[test]
    fn test_parameter_set_equality() {
        assert_eq!(ParameterSet::Sha3Winternitz, ParameterSet::Sha3Winternitz);
        assert_ne!(ParameterSet::Sha3Winternitz, ParameterSet::Poseidon2TargetSum);
    }
}
