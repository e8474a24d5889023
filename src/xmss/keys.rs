// Public key, stateful secret key and signature

use core::fmt;
use std::borrow::Cow;
use std::marker::PhantomData;
use std::ops::Range;

use rayon::prelude::*;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tracing::debug;

use crate::encoding::IncomparableEncoding;
use crate::symmetric::{chain, PrfKey, TweakableHash, RAND_LEN};
use crate::tree::{leaf_hash, HashSubTree, TreeLayout};
use crate::xmss::epoch::EpochValidator;
use crate::xmss::error::{HashSigError, Result};

/// Secret key whose signing window is advanced explicitly by its owner
pub trait StatefulSecretKey {
    /// Epochs `[activation_epoch, activation_epoch + lifetime)`
    fn activation_interval(&self) -> Range<u64>;

    /// Epochs the key can currently sign
    fn prepared_interval(&self) -> Range<u64>;

    /// Compute signing material for the next block of epochs.
    /// A no-op once the whole lifetime has been prepared.
    fn advance_preparation(&mut self);

    fn lifetime(&self) -> u64 {
        let interval = self.activation_interval();
        interval.end - interval.start
    }

    fn prepared_start(&self) -> u64 {
        self.prepared_interval().start
    }

    fn prepared_end(&self) -> u64 {
        self.prepared_interval().end
    }

    fn is_prepared_for_epoch(&self, epoch: u64) -> bool {
        self.prepared_interval().contains(&epoch)
    }
}

/// Commitment root plus the public hash parameter and the epoch range
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct PublicKey<TH: TweakableHash> {
    pub(crate) root: TH::Domain,
    pub(crate) parameter: TH::Parameter,
    pub(crate) activation_epoch: u64,
    pub(crate) lifetime: u64,
}

impl<TH: TweakableHash> PublicKey<TH> {
    pub fn root(&self) -> &TH::Domain {
        &self.root
    }

    pub fn parameter(&self) -> &TH::Parameter {
        &self.parameter
    }

    pub fn activation_epoch(&self) -> u64 {
        self.activation_epoch
    }

    pub fn lifetime(&self) -> u64 {
        self.lifetime
    }

    pub fn activation_interval(&self) -> Range<u64> {
        self.activation_epoch..self.activation_epoch + self.lifetime
    }

    pub(crate) fn validate(&self) -> Result<()> {
        EpochValidator::validate_key_range(self.activation_epoch, self.lifetime)
            .map_err(|e| HashSigError::MalformedEncoding(e.to_string()))?;
        if !TH::is_canonical_domain(&self.root) || !TH::is_canonical_parameter(&self.parameter) {
            return Err(HashSigError::MalformedEncoding(
                "public key holds non-canonical values".to_string(),
            ));
        }
        Ok(())
    }
}

/// Chain values released for one epoch, the randomness that made the
/// encoding succeed and the authentication path to the root
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct Signature<TH: TweakableHash> {
    pub(crate) rho: [u8; RAND_LEN],
    pub(crate) hashes: Vec<TH::Domain>,
    pub(crate) path: Vec<TH::Domain>,
}

impl<TH: TweakableHash> Signature<TH> {
    pub fn rho(&self) -> &[u8; RAND_LEN] {
        &self.rho
    }

    pub fn hashes(&self) -> &[TH::Domain] {
        &self.hashes
    }

    pub fn path(&self) -> &[TH::Domain] {
        &self.path
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.hashes.is_empty() {
            return Err(HashSigError::MalformedEncoding(
                "signature carries no chain values".to_string(),
            ));
        }
        if !self
            .hashes
            .iter()
            .chain(self.path.iter())
            .all(TH::is_canonical_domain)
        {
            return Err(HashSigError::MalformedEncoding(
                "signature holds non-canonical values".to_string(),
            ));
        }
        Ok(())
    }
}

/// Regenerate the one-time keys of bottom tree `index` and commit to them.
pub(crate) fn bottom_tree_from_prf_key<TH: TweakableHash, IE: IncomparableEncoding>(
    prf_key: &PrfKey,
    parameter: &TH::Parameter,
    activation_epoch: u64,
    layout: &TreeLayout,
    index: u64,
) -> HashSubTree<TH> {
    let (first, end) = layout.bottom_tree_leaves(index);
    let leaves: Vec<TH::Domain> = (first as usize..end as usize)
        .into_par_iter()
        .map(|leaf| {
            let epoch = activation_epoch + leaf as u64;
            let chain_ends: Vec<TH::Domain> = (0..IE::DIMENSION)
                .map(|chain_index| {
                    let start = TH::domain_from_prf(&prf_key.chain_start(epoch, chain_index as u8));
                    chain::<TH>(parameter, epoch, chain_index as u8, 0, IE::BASE - 1, &start)
                })
                .collect();
            leaf_hash::<TH>(parameter, leaf as u64, &chain_ends)
        })
        .collect();

    HashSubTree::new(parameter, 0, first, layout.bottom_height(), leaves)
}

/// Secret key with a sliding window of at most two cached bottom trees.
///
/// The window covers bottom trees `[next_bottom_tree - bottom_trees.len(), next_bottom_tree)`.
/// `consumed` holds one flag per epoch of two bottom trees, the first flag being
/// the window start; a set flag means the epoch has produced a signature and
/// will never sign again.
///
/// Not `Clone`: a key has exactly one set of consumed flags.
pub struct SecretKey<TH: TweakableHash, IE: IncomparableEncoding> {
    prf_key: PrfKey,
    parameter: TH::Parameter,
    activation_epoch: u64,
    lifetime: u64,
    top_tree: HashSubTree<TH>,
    bottom_trees: Vec<HashSubTree<TH>>,
    next_bottom_tree: u64,
    consumed: Vec<bool>,
    _encoding: PhantomData<IE>,
}

const MAX_CACHED_BOTTOM_TREES: usize = 2;

/// Encoded layout: both window slots are always written, unused ones as blank trees
#[derive(Serialize)]
#[serde(bound = "")]
struct EncodedSecretKeyRef<'a, TH: TweakableHash> {
    prf_key: &'a PrfKey,
    parameter: &'a TH::Parameter,
    activation_epoch: u64,
    lifetime: u64,
    top_tree: &'a HashSubTree<TH>,
    cached_bottom_trees: u8,
    bottom_trees: [Cow<'a, HashSubTree<TH>>; MAX_CACHED_BOTTOM_TREES],
    next_bottom_tree: u64,
    consumed: &'a [bool],
}

#[derive(Deserialize)]
#[serde(bound = "")]
struct EncodedSecretKey<TH: TweakableHash> {
    prf_key: PrfKey,
    parameter: TH::Parameter,
    activation_epoch: u64,
    lifetime: u64,
    top_tree: HashSubTree<TH>,
    cached_bottom_trees: u8,
    bottom_trees: [HashSubTree<TH>; MAX_CACHED_BOTTOM_TREES],
    next_bottom_tree: u64,
    consumed: Vec<bool>,
}

impl<TH: TweakableHash, IE: IncomparableEncoding> SecretKey<TH, IE> {
    pub(crate) fn new(
        prf_key: PrfKey,
        parameter: TH::Parameter,
        activation_epoch: u64,
        lifetime: u64,
        top_tree: HashSubTree<TH>,
    ) -> Self {
        let per_tree = TreeLayout::new(lifetime).leaves_per_bottom_tree() as usize;
        Self {
            prf_key,
            parameter,
            activation_epoch,
            lifetime,
            top_tree,
            bottom_trees: Vec::with_capacity(MAX_CACHED_BOTTOM_TREES),
            next_bottom_tree: 0,
            consumed: vec![false; MAX_CACHED_BOTTOM_TREES * per_tree],
            _encoding: PhantomData,
        }
    }

    fn layout(&self) -> TreeLayout {
        TreeLayout::new(self.lifetime)
    }

    fn first_cached_tree(&self) -> u64 {
        self.next_bottom_tree - self.bottom_trees.len() as u64
    }

    pub fn activation_epoch(&self) -> u64 {
        self.activation_epoch
    }

    pub(crate) fn prf_key(&self) -> &PrfKey {
        &self.prf_key
    }

    pub(crate) fn parameter(&self) -> &TH::Parameter {
        &self.parameter
    }

    pub(crate) fn top_tree(&self) -> &HashSubTree<TH> {
        &self.top_tree
    }

    /// Number of bottom trees currently held in memory
    pub fn cached_bottom_trees(&self) -> usize {
        self.bottom_trees.len()
    }

    /// Whether `epoch` already produced a signature from this key.
    /// Only epochs inside the prepared window are tracked.
    pub fn is_consumed(&self, epoch: u64) -> bool {
        self.consumed_index(epoch)
            .map(|i| self.consumed[i])
            .unwrap_or(false)
    }

    fn consumed_index(&self, epoch: u64) -> Option<usize> {
        if !self.is_prepared_for_epoch(epoch) {
            return None;
        }
        Some((epoch - self.prepared_start()) as usize)
    }

    pub(crate) fn mark_consumed(&mut self, epoch: u64) {
        if let Some(i) = self.consumed_index(epoch) {
            self.consumed[i] = true;
        }
    }

    /// Cached bottom tree holding `epoch`, with its index
    pub(crate) fn bottom_tree_for(&self, epoch: u64) -> Option<(u64, &HashSubTree<TH>)> {
        let leaf = epoch.checked_sub(self.activation_epoch)?;
        let index = leaf / self.layout().leaves_per_bottom_tree();
        let offset = index.checked_sub(self.first_cached_tree())?;
        self.bottom_trees
            .get(offset as usize)
            .map(|tree| (index, tree))
    }

    pub(crate) fn validate(&self) -> Result<()> {
        let malformed = |reason: &str| Err(HashSigError::MalformedEncoding(reason.to_string()));

        EpochValidator::validate_key_range(self.activation_epoch, self.lifetime)
            .map_err(|e| HashSigError::MalformedEncoding(e.to_string()))?;
        if !TH::is_canonical_parameter(&self.parameter) {
            return malformed("secret key parameter is not canonical");
        }

        let layout = self.layout();
        if self.bottom_trees.len() > MAX_CACHED_BOTTOM_TREES
            || self.next_bottom_tree > layout.num_bottom_trees()
            || (self.bottom_trees.len() as u64) > self.next_bottom_tree
        {
            return malformed("secret key window is inconsistent");
        }

        let per_tree = layout.leaves_per_bottom_tree() as usize;
        if self.consumed.len() != MAX_CACHED_BOTTOM_TREES * per_tree
            || self.consumed[self.bottom_trees.len() * per_tree..]
                .iter()
                .any(|&flag| flag)
        {
            return malformed("secret key consumed flags do not match the window");
        }

        if !self
            .top_tree
            .has_shape(layout.bottom_height() as u8, 0, layout.top_height())
        {
            return malformed("secret key top tree has the wrong shape");
        }

        let first = self.first_cached_tree();
        for (offset, tree) in self.bottom_trees.iter().enumerate() {
            let index = first + offset as u64;
            let start = index * layout.leaves_per_bottom_tree();
            if !tree.has_shape(0, start, layout.bottom_height())
                || self.top_tree.leaf(index) != Some(tree.root())
            {
                return malformed("secret key bottom tree does not match the top tree");
            }
        }

        Ok(())
    }
}

impl<TH: TweakableHash, IE: IncomparableEncoding> StatefulSecretKey for SecretKey<TH, IE> {
    fn activation_interval(&self) -> Range<u64> {
        self.activation_epoch..self.activation_epoch + self.lifetime
    }

    fn prepared_interval(&self) -> Range<u64> {
        let per_tree = self.layout().leaves_per_bottom_tree();
        let start = self.activation_epoch + self.first_cached_tree() * per_tree;
        let end = self.activation_epoch + (self.next_bottom_tree * per_tree).min(self.lifetime);
        start..end
    }

    fn advance_preparation(&mut self) {
        let layout = self.layout();
        if self.next_bottom_tree >= layout.num_bottom_trees() {
            return;
        }

        let tree = bottom_tree_from_prf_key::<TH, IE>(
            &self.prf_key,
            &self.parameter,
            self.activation_epoch,
            &layout,
            self.next_bottom_tree,
        );

        let per_tree = layout.leaves_per_bottom_tree() as usize;
        if self.bottom_trees.len() == MAX_CACHED_BOTTOM_TREES {
            self.bottom_trees.remove(0);
            self.consumed.drain(..per_tree);
            self.consumed.resize(MAX_CACHED_BOTTOM_TREES * per_tree, false);
        }
        self.bottom_trees.push(tree);
        self.next_bottom_tree += 1;

        let prepared = self.prepared_interval();
        debug!(
            bottom_tree = self.next_bottom_tree - 1,
            prepared_start = prepared.start,
            prepared_end = prepared.end,
            "advanced preparation"
        );
    }

    fn lifetime(&self) -> u64 {
        self.lifetime
    }
}

impl<TH: TweakableHash, IE: IncomparableEncoding> Serialize for SecretKey<TH, IE> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let height = self.layout().bottom_height();
        let slot = |i: usize| match self.bottom_trees.get(i) {
            Some(tree) => Cow::Borrowed(tree),
            None => Cow::Owned(HashSubTree::blank(height)),
        };

        EncodedSecretKeyRef {
            prf_key: &self.prf_key,
            parameter: &self.parameter,
            activation_epoch: self.activation_epoch,
            lifetime: self.lifetime,
            top_tree: &self.top_tree,
            cached_bottom_trees: self.bottom_trees.len() as u8,
            bottom_trees: [slot(0), slot(1)],
            next_bottom_tree: self.next_bottom_tree,
            consumed: &self.consumed,
        }
        .serialize(serializer)
    }
}

impl<'de, TH: TweakableHash, IE: IncomparableEncoding> Deserialize<'de> for SecretKey<TH, IE> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let encoded = EncodedSecretKey::<TH>::deserialize(deserializer)?;
        EpochValidator::validate_key_range(encoded.activation_epoch, encoded.lifetime)
            .map_err(D::Error::custom)?;

        let cached = encoded.cached_bottom_trees as usize;
        if cached > MAX_CACHED_BOTTOM_TREES {
            return Err(D::Error::custom(format!(
                "{cached} cached bottom trees, at most {MAX_CACHED_BOTTOM_TREES}"
            )));
        }

        let height = TreeLayout::new(encoded.lifetime).bottom_height();
        let mut bottom_trees = Vec::with_capacity(MAX_CACHED_BOTTOM_TREES);
        for (slot, tree) in encoded.bottom_trees.into_iter().enumerate() {
            if slot < cached {
                bottom_trees.push(tree);
            } else if !tree.is_blank(height) {
                return Err(D::Error::custom("unused bottom tree slot is not blank"));
            }
        }

        let sk = Self {
            prf_key: encoded.prf_key,
            parameter: encoded.parameter,
            activation_epoch: encoded.activation_epoch,
            lifetime: encoded.lifetime,
            top_tree: encoded.top_tree,
            bottom_trees,
            next_bottom_tree: encoded.next_bottom_tree,
            consumed: encoded.consumed,
            _encoding: PhantomData,
        };
        sk.validate().map_err(D::Error::custom)?;
        Ok(sk)
    }
}

impl<TH: TweakableHash, IE: IncomparableEncoding> PartialEq for SecretKey<TH, IE> {
    fn eq(&self, other: &Self) -> bool {
        self.prf_key == other.prf_key
            && self.parameter == other.parameter
            && self.activation_epoch == other.activation_epoch
            && self.lifetime == other.lifetime
            && self.top_tree == other.top_tree
            && self.bottom_trees == other.bottom_trees
            && self.next_bottom_tree == other.next_bottom_tree
            && self.consumed == other.consumed
    }
}

impl<TH: TweakableHash, IE: IncomparableEncoding> Eq for SecretKey<TH, IE> {}

impl<TH: TweakableHash, IE: IncomparableEncoding> fmt::Debug for SecretKey<TH, IE> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretKey")
            .field("prf_key", &self.prf_key)
            .field("activation_epoch", &self.activation_epoch)
            .field("lifetime", &self.lifetime)
            .field("prepared", &self.prepared_interval())
            .field("cached_bottom_trees", &self.bottom_trees.len())
            .finish()
    }
}

impl<TH: TweakableHash, IE: IncomparableEncoding> fmt::Display for SecretKey<TH, IE> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prepared = self.prepared_interval();
        write!(f, "SecretKey(prepared=[{}, {}))", prepared.start, prepared.end)
    }
}
