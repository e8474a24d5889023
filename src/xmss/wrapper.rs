// HashSig facade: configured lifetime, message preprocessing, optional seeds

use rand::RngCore;
use std::marker::PhantomData;
use zeroize::Zeroize;

use crate::xmss::{
    config::{ParameterMetadata, DEFAULT_LIFETIME},
    epoch::EpochValidator,
    error::Result,
    message::MessagePreprocessor,
    prepare::prepare_for_epoch,
    scheme::{Poseidon2Scheme, Sha3Scheme, SignatureScheme},
};

/// Signature engine bound to one backend and one lifetime
///
/// The backend is fixed by `S` at construction; every call goes through the
/// same instantiation.
#[derive(Debug, Clone, Copy)]
pub struct HashSig<S: SignatureScheme> {
    lifetime: u64,
    _phantom: PhantomData<S>,
}

impl<S: SignatureScheme> HashSig<S> {
    /// Create an engine for `lifetime` epochs (2^20 when `None`)
    pub fn new(lifetime: Option<u64>) -> Result<Self> {
        let lifetime = lifetime.unwrap_or(DEFAULT_LIFETIME);
        EpochValidator::validate_key_range(0, lifetime)?;
        Ok(Self {
            lifetime,
            _phantom: PhantomData,
        })
    }

    /// Generate a key pair
    ///
    /// Preconditions:
    /// - seed, when present, is exactly `S::SEED_LEN` bytes
    /// - activation_epoch + lifetime fits in u64
    ///
    /// Postconditions:
    /// - Same seed and parameters always yield identical keys
    /// - Without a seed, one is drawn from the thread-local CSPRNG
    /// - The secret key has an empty prepared window
    ///
    /// Cost is linear in the lifetime.
    pub fn key_gen(
        &self,
        seed: Option<&[u8]>,
        activation_epoch: u64,
    ) -> Result<(S::PublicKey, S::SecretKey)> {
        match seed {
            Some(seed) => S::key_gen(seed, activation_epoch, self.lifetime),
            None => self.key_gen_with_rng(&mut rand::rng(), activation_epoch),
        }
    }

    /// Generate a key pair from a seed drawn out of `rng`
    pub fn key_gen_with_rng<R: RngCore + ?Sized>(
        &self,
        rng: &mut R,
        activation_epoch: u64,
    ) -> Result<(S::PublicKey, S::SecretKey)> {
        let mut seed = vec![0u8; S::SEED_LEN];
        rng.fill_bytes(&mut seed);
        let keys = S::key_gen(&seed, activation_epoch, self.lifetime);
        seed.zeroize();
        keys
    }

    /// Advance `sk` until `epoch` is prepared or `max_steps` is spent
    pub fn prepare(&self, sk: &mut S::SecretKey, epoch: u64, max_steps: Option<usize>) -> bool {
        prepare_for_epoch(sk, epoch, max_steps)
    }

    /// Sign message at epoch
    ///
    /// Preconditions:
    /// - epoch is prepared (`NotPrepared` otherwise)
    /// - epoch has not been signed by this key (`EpochAlreadySigned` otherwise)
    ///
    /// Postconditions:
    /// - The epoch is consumed; the key refuses to sign it again
    pub fn sign(&self, sk: &mut S::SecretKey, epoch: u64, message: &[u8]) -> Result<S::Signature> {
        let digest = MessagePreprocessor::preprocess(message);
        S::sign(sk, epoch, &digest)
    }

    /// Verify signature
    ///
    /// Postconditions:
    /// - Ok(true) iff the signature binds message and epoch to the public key
    /// - Err only for out-of-range epochs or structurally mismatched signatures
    pub fn verify(
        &self,
        pk: &S::PublicKey,
        epoch: u64,
        message: &[u8],
        signature: &S::Signature,
    ) -> Result<bool> {
        let digest = MessagePreprocessor::preprocess(message);
        S::verify(pk, epoch, &digest, signature)
    }

    pub fn get_lifetime(&self) -> u64 {
        self.lifetime
    }

    /// Sizes and shape of this configuration
    pub fn metadata(&self) -> ParameterMetadata {
        S::metadata(self.lifetime)
    }
}

// Named backend configurations
pub type HashSigSha3 = HashSig<Sha3Scheme>;
pub type HashSigPoseidon = HashSig<Poseidon2Scheme>;
