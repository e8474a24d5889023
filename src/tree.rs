// Merkle commitment over all epochs, split into one top tree and many bottom trees

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::symmetric::{Tweak, TweakableHash};

/// Largest supported lifetime. Tree levels and tweak positions must stay small.
pub const MAX_LIFETIME: u64 = 1 << 32;

/// Shape of the commitment tree for a given lifetime.
///
/// The full tree has `depth = ceil(log2(lifetime))` levels above the leaves.
/// Bottom trees cover the lowest `bottom_height` levels, so each one commits to
/// `2^bottom_height` consecutive epochs; the top tree commits to the bottom roots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TreeLayout {
    lifetime: u64,
    depth: u32,
    bottom_height: u32,
}

impl TreeLayout {
    pub fn new(lifetime: u64) -> Self {
        let depth = if lifetime <= 1 {
            0
        } else {
            64 - (lifetime - 1).leading_zeros()
        };
        Self {
            lifetime,
            depth,
            bottom_height: depth.div_ceil(2),
        }
    }

    pub fn lifetime(&self) -> u64 {
        self.lifetime
    }

    pub fn depth(&self) -> u32 {
        self.depth
    }

    pub fn bottom_height(&self) -> u32 {
        self.bottom_height
    }

    pub fn top_height(&self) -> u32 {
        self.depth - self.bottom_height
    }

    pub fn leaves_per_bottom_tree(&self) -> u64 {
        1 << self.bottom_height
    }

    pub fn num_bottom_trees(&self) -> u64 {
        self.lifetime.div_ceil(self.leaves_per_bottom_tree())
    }

    /// Leaf range `[start, end)` committed by bottom tree `index`, clipped to the lifetime.
    pub fn bottom_tree_leaves(&self, index: u64) -> (u64, u64) {
        let start = index * self.leaves_per_bottom_tree();
        let end = (start + self.leaves_per_bottom_tree()).min(self.lifetime);
        (start, end)
    }
}

fn padding_node<TH: TweakableHash>(parameter: &TH::Parameter, level: u8, pos: u64) -> TH::Domain {
    TH::apply(parameter, &Tweak::Padding { level, pos }, &[])
}

/// One-time commitment of a leaf: hash of all chain ends under the leaf's tweak.
pub fn leaf_hash<TH: TweakableHash>(
    parameter: &TH::Parameter,
    leaf_index: u64,
    chain_ends: &[TH::Domain],
) -> TH::Domain {
    TH::apply(
        parameter,
        &Tweak::Tree {
            level: 0,
            pos: leaf_index,
        },
        chain_ends,
    )
}

/// Complete binary subtree whose lowest layer sits at `lowest_level` and starts at `start`.
///
/// `layers[k]` holds level `lowest_level + k`; the last layer is the single root.
/// Positions without a real node are filled with padding nodes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct HashSubTree<TH: TweakableHash> {
    lowest_level: u8,
    start: u64,
    layers: Vec<Vec<TH::Domain>>,
}

impl<TH: TweakableHash> HashSubTree<TH> {
    /// Build a subtree of the given `height` over `nodes`.
    ///
    /// Preconditions:
    /// - `nodes.len() <= 2^height`
    /// - `start` is a multiple of `2^height`
    pub fn new(
        parameter: &TH::Parameter,
        lowest_level: u8,
        start: u64,
        height: u32,
        nodes: Vec<TH::Domain>,
    ) -> Self {
        let width = 1usize << height;
        let mut base = nodes;
        let filled = base.len();
        base.extend(
            (filled..width).map(|i| padding_node::<TH>(parameter, lowest_level, start + i as u64)),
        );

        let mut layers = Vec::with_capacity(height as usize + 1);
        layers.push(base);
        for k in 0..height as usize {
            let level = lowest_level + k as u8 + 1;
            let parent_start = start >> (k + 1);
            let next: Vec<TH::Domain> = layers[k]
                .par_chunks_exact(2)
                .enumerate()
                .map(|(j, pair)| {
                    TH::apply(
                        parameter,
                        &Tweak::Tree {
                            level,
                            pos: parent_start + j as u64,
                        },
                        pair,
                    )
                })
                .collect();
            layers.push(next);
        }

        Self {
            lowest_level,
            start,
            layers,
        }
    }

    pub fn root(&self) -> TH::Domain {
        // every constructor leaves at least one layer with one node
        self.layers[self.layers.len() - 1][0]
    }

    pub fn height(&self) -> u32 {
        (self.layers.len() - 1) as u32
    }

    pub fn start(&self) -> u64 {
        self.start
    }

    /// Node at absolute position `pos` of the lowest layer.
    pub fn leaf(&self, pos: u64) -> Option<TH::Domain> {
        let index = pos.checked_sub(self.start)?;
        self.layers.first()?.get(index as usize).copied()
    }

    /// Sibling nodes from `pos` (absolute, at the lowest level) up to the root.
    pub fn co_path(&self, pos: u64) -> Vec<TH::Domain> {
        let height = self.height() as usize;
        let mut path = Vec::with_capacity(height);
        for k in 0..height {
            let index = ((pos >> k) - (self.start >> k)) as usize;
            path.push(self.layers[k][index ^ 1]);
        }
        path
    }

    /// Fixed-shape stand-in for an empty slot: height `height`, every node the default value.
    pub(crate) fn blank(height: u32) -> Self {
        let layers = (0..=height as usize)
            .map(|k| vec![TH::Domain::default(); 1usize << (height as usize - k)])
            .collect();
        Self {
            lowest_level: 0,
            start: 0,
            layers,
        }
    }

    pub(crate) fn is_blank(&self, height: u32) -> bool {
        self.has_shape(0, 0, height)
            && self
                .layers
                .iter()
                .flatten()
                .all(|node| *node == TH::Domain::default())
    }

    /// Structural check used after decoding.
    pub fn has_shape(&self, lowest_level: u8, start: u64, height: u32) -> bool {
        if self.lowest_level != lowest_level
            || self.start != start
            || self.layers.len() != height as usize + 1
        {
            return false;
        }
        self.layers.iter().enumerate().all(|(k, layer)| {
            layer.len() == 1usize << (height as usize - k)
                && layer.iter().all(TH::is_canonical_domain)
        })
    }
}

/// Authentication path from a leaf through its bottom tree and then the top tree.
pub fn combined_path<TH: TweakableHash>(
    top_tree: &HashSubTree<TH>,
    bottom_tree: &HashSubTree<TH>,
    bottom_index: u64,
    leaf_index: u64,
) -> Vec<TH::Domain> {
    let mut path = bottom_tree.co_path(leaf_index);
    path.extend(top_tree.co_path(bottom_index));
    path
}

/// Replay `path` from `leaf` at `leaf_index` and compare with `root`.
pub fn verify_path<TH: TweakableHash>(
    parameter: &TH::Parameter,
    root: &TH::Domain,
    leaf_index: u64,
    leaf: TH::Domain,
    path: &[TH::Domain],
) -> bool {
    if path.len() < 64 && leaf_index >> path.len() != 0 {
        return false;
    }

    let mut node = leaf;
    let mut pos = leaf_index;
    for (k, sibling) in path.iter().enumerate() {
        let inputs = if pos & 1 == 0 {
            [node, *sibling]
        } else {
            [*sibling, node]
        };
        pos >>= 1;
        node = TH::apply(
            parameter,
            &Tweak::Tree {
                level: k as u8 + 1,
                pos,
            },
            &inputs,
        );
    }
    node == *root
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symmetric::Sha3TweakHash;

    type TH = Sha3TweakHash;

    fn leaf(i: u64) -> [u8; 32] {
        leaf_hash::<TH>(&[0u8; 16], i, &[[i as u8; 32]])
    }

    #[test]
    fn test_layout_power_of_two() {
        let layout = TreeLayout::new(16);
        assert_eq!(layout.depth(), 4);
        assert_eq!(layout.bottom_height(), 2);
        assert_eq!(layout.top_height(), 2);
        assert_eq!(layout.leaves_per_bottom_tree(), 4);
        assert_eq!(layout.num_bottom_trees(), 4);
    }

    #[test]
    fn test_layout_odd_depth_and_padding() {
        let layout = TreeLayout::new(10);
        assert_eq!(layout.depth(), 4);
        assert_eq!(layout.num_bottom_trees(), 3);
        assert_eq!(layout.bottom_tree_leaves(2), (8, 10));

        let layout = TreeLayout::new(32);
        assert_eq!(layout.depth(), 5);
        assert_eq!(layout.bottom_height(), 3);
        assert_eq!(layout.top_height(), 2);
    }

    #[test]
    fn test_layout_tiny_lifetimes() {
        let one = TreeLayout::new(1);
        assert_eq!(one.depth(), 0);
        assert_eq!(one.num_bottom_trees(), 1);

        let two = TreeLayout::new(2);
        assert_eq!(two.depth(), 1);
        assert_eq!(two.bottom_height(), 1);
        assert_eq!(two.top_height(), 0);
    }

    #[test]
    fn test_co_path_verifies_every_leaf() {
        let parameter = [0u8; 16];
        let leaves: Vec<_> = (0..8).map(leaf).collect();
        let tree = HashSubTree::<TH>::new(&parameter, 0, 0, 3, leaves.clone());

        for (i, l) in leaves.iter().enumerate() {
            let path = tree.co_path(i as u64);
            assert_eq!(path.len(), 3);
            assert!(
                verify_path::<TH>(&parameter, &tree.root(), i as u64, *l, &path),
                "Leaf {} should verify",
                i
            );
        }
    }

    #[test]
    fn test_split_tree_matches_single_tree() {
        let parameter = [3u8; 16];
        let leaves: Vec<_> = (0..16).map(leaf).collect();
        let full = HashSubTree::<TH>::new(&parameter, 0, 0, 4, leaves.clone());

        let bottoms: Vec<_> = (0..4u64)
            .map(|b| {
                let chunk = leaves[(b as usize * 4)..(b as usize * 4 + 4)].to_vec();
                HashSubTree::<TH>::new(&parameter, 0, b * 4, 2, chunk)
            })
            .collect();
        let roots = bottoms.iter().map(|t| t.root()).collect();
        let top = HashSubTree::<TH>::new(&parameter, 2, 0, 2, roots);

        assert_eq!(full.root(), top.root(), "Top/bottom split must not change the root");

        let path = combined_path(&top, &bottoms[2], 2, 9);
        assert_eq!(path, full.co_path(9));
        assert!(verify_path::<TH>(&parameter, &top.root(), 9, leaves[9], &path));
    }

    #[test]
    fn test_padding_fills_missing_nodes() {
        let parameter = [0u8; 16];
        let padded = HashSubTree::<TH>::new(&parameter, 0, 8, 2, vec![leaf(8), leaf(9)]);
        let full = HashSubTree::<TH>::new(&parameter, 0, 8, 2, (8..12).map(leaf).collect());
        assert!(padded.has_shape(0, 8, 2));
        assert_ne!(padded.root(), full.root(), "Padding must differ from real leaves");

        let again = HashSubTree::<TH>::new(&parameter, 0, 8, 2, vec![leaf(8), leaf(9)]);
        assert_eq!(padded, again, "Padding must be deterministic");
        assert_eq!(padded.co_path(9)[0], leaf(8));
    }

    #[test]
    fn test_verify_rejects_wrong_leaf_and_index() {
        let parameter = [0u8; 16];
        let leaves: Vec<_> = (0..4).map(leaf).collect();
        let tree = HashSubTree::<TH>::new(&parameter, 0, 0, 2, leaves.clone());
        let path = tree.co_path(1);

        assert!(verify_path::<TH>(&parameter, &tree.root(), 1, leaves[1], &path));
        assert!(!verify_path::<TH>(&parameter, &tree.root(), 1, leaves[2], &path));
        assert!(!verify_path::<TH>(&parameter, &tree.root(), 3, leaves[1], &path));
        assert!(!verify_path::<TH>(&parameter, &tree.root(), 5, leaves[1], &path));
    }

    #[test]
    fn test_has_shape_rejects_mismatch() {
        let parameter = [0u8; 16];
        let tree = HashSubTree::<TH>::new(&parameter, 0, 0, 2, vec![leaf(0)]);
        assert!(tree.has_shape(0, 0, 2));
        assert!(!tree.has_shape(0, 4, 2));
        assert!(!tree.has_shape(1, 0, 2));
        assert!(!tree.has_shape(0, 0, 3));
    }

    #[test]
    fn test_blank_tree_shape() {
        let blank = HashSubTree::<TH>::blank(2);
        assert!(blank.is_blank(2));
        assert!(!blank.is_blank(3), "Height must match");
        assert_eq!(blank.height(), 2);

        let real = HashSubTree::<TH>::new(&[0u8; 16], 0, 0, 2, (0..4).map(leaf).collect());
        assert!(real.has_shape(0, 0, 2));
        assert!(!real.is_blank(2));
    }
}
