// SHAKE128-based key derivation

use core::fmt;

use serde::{Deserialize, Serialize};
use sha3::{
    digest::{ExtendableOutput, Update, XofReader},
    Shake128,
};
use zeroize::Zeroize;

use crate::symmetric::{MESSAGE_DIGEST_LEN, RAND_LEN};

/// Length in bytes of the PRF key.
pub const PRF_KEY_LEN: usize = 32;
/// Length in bytes of one PRF output block.
pub const PRF_OUTPUT_LEN: usize = 64;

const LABEL_KEY: &[u8] = b"hashsig/prf-key";
const LABEL_PARAMETER: &[u8] = b"hashsig/parameter";
const LABEL_CHAIN: &[u8] = b"hashsig/chain-start";
const LABEL_RANDOMNESS: &[u8] = b"hashsig/rho";

fn shake(label: &[u8], parts: &[&[u8]], out: &mut [u8]) {
    let mut hasher = Shake128::default();
    hasher.update(&(label.len() as u8).to_be_bytes());
    hasher.update(label);
    for part in parts {
        hasher.update(part);
    }
    hasher.finalize_xof().read(out);
}

/// Secret PRF key. Wiped from memory on drop.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrfKey([u8; PRF_KEY_LEN]);

impl PrfKey {
    /// Derive the PRF key from a key-generation seed.
    pub fn from_seed(seed: &[u8]) -> Self {
        let mut key = [0u8; PRF_KEY_LEN];
        shake(LABEL_KEY, &[seed], &mut key);
        Self(key)
    }

    pub fn as_bytes(&self) -> &[u8; PRF_KEY_LEN] {
        &self.0
    }

    /// PRF block for the start of chain `chain_index` at `epoch`.
    pub fn chain_start(&self, epoch: u64, chain_index: u8) -> [u8; PRF_OUTPUT_LEN] {
        let mut out = [0u8; PRF_OUTPUT_LEN];
        shake(
            LABEL_CHAIN,
            &[&self.0, &epoch.to_be_bytes(), &[chain_index]],
            &mut out,
        );
        out
    }

    /// Signing randomness for one encoding attempt.
    ///
    /// Deterministic in `(key, epoch, digest, attempt)`; retries advance `attempt`.
    pub fn randomness(
        &self,
        epoch: u64,
        digest: &[u8; MESSAGE_DIGEST_LEN],
        attempt: u64,
    ) -> [u8; RAND_LEN] {
        let mut out = [0u8; RAND_LEN];
        shake(
            LABEL_RANDOMNESS,
            &[&self.0, &epoch.to_be_bytes(), digest, &attempt.to_be_bytes()],
            &mut out,
        );
        out
    }
}

impl Drop for PrfKey {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

impl fmt::Debug for PrfKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PrfKey([REDACTED])")
    }
}

/// PRF block the public parameter is derived from.
pub fn parameter_seed(seed: &[u8]) -> [u8; PRF_OUTPUT_LEN] {
    let mut out = [0u8; PRF_OUTPUT_LEN];
    shake(LABEL_PARAMETER, &[seed], &mut out);
    out
}
