// Generalized XMSS: key generation, signing and verification

use std::marker::PhantomData;

use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::encoding::{IncomparableEncoding, TargetSumEncoding, WinternitzEncoding};
use crate::symmetric::{
    chain, prf, Poseidon2TweakHash, PrfKey, Sha3TweakHash, TweakableHash, MESSAGE_DIGEST_LEN,
};
use crate::tree::{combined_path, leaf_hash, verify_path, HashSubTree, TreeLayout};
use crate::xmss::config::ParameterMetadata;
use crate::xmss::epoch::EpochValidator;
use crate::xmss::error::{HashSigError, Result};
use crate::xmss::keys::{
    bottom_tree_from_prf_key, PublicKey, SecretKey, Signature, StatefulSecretKey,
};

/// A stateful signature scheme over 32-byte message digests
pub trait SignatureScheme: Send + Sync + 'static {
    type PublicKey: Clone + Send + Sync + 'static;
    type SecretKey: StatefulSecretKey + Send + 'static;
    type Signature: Clone + Send + Sync + 'static;

    /// Required seed length for deterministic key generation
    const SEED_LEN: usize;

    /// Generate a key pair valid for `[activation_epoch, activation_epoch + lifetime)`.
    /// The secret key starts with an empty prepared window.
    fn key_gen(
        seed: &[u8],
        activation_epoch: u64,
        lifetime: u64,
    ) -> Result<(Self::PublicKey, Self::SecretKey)>;

    /// Sign `digest` at `epoch`, consuming the epoch.
    fn sign(
        sk: &mut Self::SecretKey,
        epoch: u64,
        digest: &[u8; MESSAGE_DIGEST_LEN],
    ) -> Result<Self::Signature>;

    /// Errors only for epochs outside the key's range or structurally
    /// mismatched signatures; a wrong signature yields `Ok(false)`.
    fn verify(
        pk: &Self::PublicKey,
        epoch: u64,
        digest: &[u8; MESSAGE_DIGEST_LEN],
        sig: &Self::Signature,
    ) -> Result<bool>;

    fn metadata(lifetime: u64) -> ParameterMetadata;
}

/// Generalized XMSS over tweakable hash `TH` and incomparable encoding `IE`
#[derive(Debug, Clone, Copy, Default)]
pub struct GeneralizedXmss<TH: TweakableHash, IE: IncomparableEncoding> {
    _phantom: PhantomData<(TH, IE)>,
}

/// SHA3-256 with Winternitz encoding, w = 16
pub type Sha3Scheme = GeneralizedXmss<Sha3TweakHash, WinternitzEncoding<4>>;
/// Poseidon2 over KoalaBear with target-sum encoding, w = 16, target 480
pub type Poseidon2Scheme = GeneralizedXmss<Poseidon2TweakHash, TargetSumEncoding<4, 480>>;

impl<TH: TweakableHash, IE: IncomparableEncoding> GeneralizedXmss<TH, IE> {
    /// Chain indices and positions are carried in single bytes inside tweaks
    fn check_instantiation() -> Result<()> {
        if !matches!(IE::CHUNK_SIZE, 1 | 2 | 4 | 8) {
            return Err(HashSigError::InvalidParameter {
                reason: format!("chunk size {} must divide 8", IE::CHUNK_SIZE),
            });
        }
        if IE::BASE > 1 << 8 || IE::DIMENSION == 0 || IE::DIMENSION > 1 << 8 {
            return Err(HashSigError::InvalidParameter {
                reason: format!(
                    "encoding base {} and dimension {} must be in [1, 256]",
                    IE::BASE,
                    IE::DIMENSION
                ),
            });
        }
        Ok(())
    }

    fn chain_ends_from_signature(
        parameter: &TH::Parameter,
        epoch: u64,
        codeword: &[u8],
        hashes: &[TH::Domain],
    ) -> Vec<TH::Domain> {
        codeword
            .iter()
            .zip(hashes.iter())
            .enumerate()
            .map(|(chain_index, (&x, start))| {
                let steps = IE::BASE - 1 - x as usize;
                chain::<TH>(parameter, epoch, chain_index as u8, x, steps, start)
            })
            .collect()
    }
}

impl<TH: TweakableHash, IE: IncomparableEncoding> SignatureScheme for GeneralizedXmss<TH, IE> {
    type PublicKey = PublicKey<TH>;
    type SecretKey = SecretKey<TH, IE>;
    type Signature = Signature<TH>;

    const SEED_LEN: usize = TH::SEED_LEN;

    fn key_gen(
        seed: &[u8],
        activation_epoch: u64,
        lifetime: u64,
    ) -> Result<(Self::PublicKey, Self::SecretKey)> {
        EpochValidator::validate_key_range(activation_epoch, lifetime)?;
        Self::check_instantiation()?;
        if seed.len() != TH::SEED_LEN {
            return Err(HashSigError::InvalidParameter {
                reason: format!("seed must be {} bytes, got {}", TH::SEED_LEN, seed.len()),
            });
        }

        let prf_key = PrfKey::from_seed(seed);
        let parameter = TH::parameter_from_prf(&prf::parameter_seed(seed));
        let layout = TreeLayout::new(lifetime);

        // Every bottom tree is built once here for its root and dropped again;
        // the secret key rebuilds them on demand during preparation.
        let roots: Vec<TH::Domain> = (0..layout.num_bottom_trees() as usize)
            .into_par_iter()
            .map(|index| {
                bottom_tree_from_prf_key::<TH, IE>(
                    &prf_key,
                    &parameter,
                    activation_epoch,
                    &layout,
                    index as u64,
                )
                .root()
            })
            .collect();

        let top_tree = HashSubTree::new(
            &parameter,
            layout.bottom_height() as u8,
            0,
            layout.top_height(),
            roots,
        );

        let pk = PublicKey {
            root: top_tree.root(),
            parameter,
            activation_epoch,
            lifetime,
        };

        info!(
            hash = TH::NAME,
            encoding = IE::NAME,
            activation_epoch,
            lifetime,
            bottom_trees = layout.num_bottom_trees(),
            "generated key pair"
        );

        let sk = SecretKey::new(prf_key, parameter, activation_epoch, lifetime, top_tree);
        Ok((pk, sk))
    }

    fn sign(
        sk: &mut Self::SecretKey,
        epoch: u64,
        digest: &[u8; MESSAGE_DIGEST_LEN],
    ) -> Result<Self::Signature> {
        EpochValidator::validate_epoch(epoch, sk.activation_epoch(), sk.lifetime())?;

        let prepared = sk.prepared_interval();
        let Some((bottom_index, bottom_tree)) = sk.bottom_tree_for(epoch) else {
            return Err(HashSigError::NotPrepared {
                epoch,
                prepared_start: prepared.start,
                prepared_end: prepared.end,
            });
        };

        if sk.is_consumed(epoch) {
            warn!(epoch, "refusing to sign an epoch twice");
            return Err(HashSigError::EpochAlreadySigned { epoch });
        }

        let leaf_index = epoch - sk.activation_epoch();
        let path = combined_path(sk.top_tree(), bottom_tree, bottom_index, leaf_index);

        let parameter = *sk.parameter();
        let mut found = None;
        for attempt in 0..IE::MAX_TRIES {
            let rho = sk.prf_key().randomness(epoch, digest, attempt as u64);
            let message_hash = TH::message_hash(&parameter, epoch, &rho, digest);
            if let Ok(codeword) = IE::encode(&message_hash) {
                found = Some((rho, codeword, attempt + 1));
                break;
            }
        }

        let Some((rho, codeword, attempts)) = found else {
            return Err(HashSigError::EncodingAttemptsExceeded {
                attempts: IE::MAX_TRIES,
            });
        };

        let prf_key = sk.prf_key();
        let hashes: Vec<TH::Domain> = codeword
            .par_iter()
            .enumerate()
            .map(|(chain_index, &steps)| {
                let start = TH::domain_from_prf(&prf_key.chain_start(epoch, chain_index as u8));
                chain::<TH>(&parameter, epoch, chain_index as u8, 0, steps as usize, &start)
            })
            .collect();

        sk.mark_consumed(epoch);
        debug!(epoch, attempts, "signed epoch");

        Ok(Signature { rho, hashes, path })
    }

    fn verify(
        pk: &Self::PublicKey,
        epoch: u64,
        digest: &[u8; MESSAGE_DIGEST_LEN],
        sig: &Self::Signature,
    ) -> Result<bool> {
        EpochValidator::validate_epoch(epoch, pk.activation_epoch, pk.lifetime)?;

        let layout = TreeLayout::new(pk.lifetime);
        if sig.hashes.len() != IE::DIMENSION {
            return Err(HashSigError::MalformedEncoding(format!(
                "signature has {} chain values, expected {}",
                sig.hashes.len(),
                IE::DIMENSION
            )));
        }
        if sig.path.len() != layout.depth() as usize {
            return Err(HashSigError::MalformedEncoding(format!(
                "authentication path has {} nodes, expected {}",
                sig.path.len(),
                layout.depth()
            )));
        }

        // Decoding outside the codec skips canonicity checks
        if !TH::is_canonical_parameter(&pk.parameter)
            || !TH::is_canonical_domain(&pk.root)
            || !sig.hashes.iter().chain(&sig.path).all(TH::is_canonical_domain)
        {
            return Ok(false);
        }

        let message_hash = TH::message_hash(&pk.parameter, epoch, &sig.rho, digest);
        let Ok(codeword) = IE::encode(&message_hash) else {
            return Ok(false);
        };
        if codeword.len() != IE::DIMENSION || codeword.iter().any(|&x| x as usize >= IE::BASE) {
            return Ok(false);
        }

        let chain_ends =
            Self::chain_ends_from_signature(&pk.parameter, epoch, &codeword, &sig.hashes);
        let leaf_index = epoch - pk.activation_epoch;
        let leaf = leaf_hash::<TH>(&pk.parameter, leaf_index, &chain_ends);

        Ok(verify_path::<TH>(
            &pk.parameter,
            &pk.root,
            leaf_index,
            leaf,
            &sig.path,
        ))
    }

    fn metadata(lifetime: u64) -> ParameterMetadata {
        ParameterMetadata::new::<TH, IE>(lifetime)
    }
}
