//! Binary keccak-256 commitment over an ordered list of leaves.

use alloy::primitives::{keccak256, B256};
use thiserror::Error;

#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum MerkleError {
    #[error("leaf index {index} out of range for {leaves} leaves")]
    IndexOutOfRange { index: usize, leaves: usize },
}

pub type MerkleResult<T> = Result<T, MerkleError>;

/// Parent digest of two adjacent nodes. Order matters.
#[inline]
pub fn hash_pair(left: &B256, right: &B256) -> B256 {
    let mut buf = [0u8; 64];
    buf[..32].copy_from_slice(left.as_slice());
    buf[32..].copy_from_slice(right.as_slice());
    keccak256(buf)
}

/// Immutable Merkle tree with every layer retained.
///
/// `layers[0]` holds the leaves and the last layer holds the root. A node
/// without a right neighbour is carried up unchanged rather than paired with
/// itself, so layer `k + 1` always has `ceil(len(k) / 2)` entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MerkleTree {
    layers: Vec<Vec<B256>>,
}

impl MerkleTree {
    /// Build the tree bottom-up. An empty leaf list yields a zero root.
    pub fn new(leaves: Vec<B256>) -> Self {
        if leaves.is_empty() {
            return Self { layers: Vec::new() };
        }

        let mut layers = vec![leaves];
        while let Some(current) = layers.last().filter(|layer| layer.len() > 1) {
            let next: Vec<B256> = current
                .chunks(2)
                .map(|pair| match pair {
                    [left, right] => hash_pair(left, right),
                    [single] => *single,
                    _ => unreachable!("chunks(2) yields one or two nodes"),
                })
                .collect();
            layers.push(next);
        }

        Self { layers }
    }

    pub fn root(&self) -> B256 {
        self.layers
            .last()
            .and_then(|layer| layer.first())
            .copied()
            .unwrap_or(B256::ZERO)
    }

    pub fn leaf_count(&self) -> usize {
        self.layers.first().map_or(0, Vec::len)
    }

    /// Number of hashing levels between the leaves and the root.
    pub fn depth(&self) -> usize {
        self.layers.len().saturating_sub(1)
    }

    pub fn leaf(&self, index: usize) -> Option<B256> {
        self.layers.first()?.get(index).copied()
    }

    /// Sibling path for the leaf at `index`, bottom to top.
    ///
    /// Levels where the node has no sibling contribute nothing.
    pub fn generate_proof(&self, index: usize) -> MerkleResult<Vec<B256>> {
        let leaves = self.leaf_count();
        if index >= leaves {
            return Err(MerkleError::IndexOutOfRange { index, leaves });
        }

        let mut path = Vec::with_capacity(self.depth());
        let mut idx = index;
        for layer in &self.layers[..self.depth()] {
            if let Some(sibling) = layer.get(idx ^ 1) {
                path.push(*sibling);
            }
            idx /= 2;
        }
        Ok(path)
    }

    /// Check `siblings` as a proof that `leaf` sits at `index` in this tree.
    pub fn verify_proof(&self, leaf: B256, index: usize, siblings: &[B256]) -> bool {
        verify_path(self.root(), self.leaf_count(), leaf, index, siblings)
    }
}

/// Recompute the root from a leaf and its sibling path.
///
/// The leaf count fixes the shape of every layer, which tells the verifier
/// where a node was promoted and therefore consumed no sibling. A path with
/// too few or too many siblings is rejected.
pub fn verify_path(
    root: B256,
    leaf_count: usize,
    leaf: B256,
    index: usize,
    siblings: &[B256],
) -> bool {
    if index >= leaf_count {
        return false;
    }

    let mut remaining = siblings.iter();
    let mut current = leaf;
    let mut idx = index;
    let mut width = leaf_count;

    while width > 1 {
        if idx ^ 1 < width {
            let Some(sibling) = remaining.next() else {
                return false;
            };
            current = if idx % 2 == 0 {
                hash_pair(&current, sibling)
            } else {
                hash_pair(sibling, &current)
            };
        }
        idx /= 2;
        width = width.div_ceil(2);
    }

    remaining.next().is_none() && current == root
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    fn leaves(n: usize) -> Vec<B256> {
        (0..n)
            .map(|i| keccak256(format!("tx-{i}").as_bytes()))
            .collect()
    }

    #[test]
    fn test_empty_tree() {
        let tree = MerkleTree::new(Vec::new());
        assert_eq!(tree.root(), B256::ZERO);
        assert_eq!(tree.leaf_count(), 0);
        assert_eq!(tree.depth(), 0);
        assert_eq!(
            tree.generate_proof(0),
            Err(MerkleError::IndexOutOfRange { index: 0, leaves: 0 })
        );
        assert!(!tree.verify_proof(B256::ZERO, 0, &[]));
    }

    #[test]
    fn test_single_leaf_is_root() {
        let l = leaves(1);
        let tree = MerkleTree::new(l.clone());
        assert_eq!(tree.root(), l[0]);
        assert_eq!(tree.generate_proof(0).unwrap(), Vec::<B256>::new());
        assert!(tree.verify_proof(l[0], 0, &[]));
    }

    #[test]
    fn test_two_leaves_hash_left_then_right() {
        let l = leaves(2);
        let tree = MerkleTree::new(l.clone());
        assert_eq!(tree.root(), hash_pair(&l[0], &l[1]));
        assert_ne!(tree.root(), hash_pair(&l[1], &l[0]));
    }

    #[test]
    fn test_odd_node_is_promoted_not_duplicated() {
        let l = leaves(3);
        let tree = MerkleTree::new(l.clone());

        let expected = hash_pair(&hash_pair(&l[0], &l[1]), &l[2]);
        assert_eq!(tree.root(), expected);
        assert_eq!(tree.depth(), 2);

        // Leaf 2 is promoted at the first level, so its path has one entry.
        assert_eq!(tree.generate_proof(2).unwrap(), vec![hash_pair(&l[0], &l[1])]);
        assert!(tree.verify_proof(l[2], 2, &[hash_pair(&l[0], &l[1])]));
    }

    #[test]
    fn test_eight_leaves_index_three() {
        let l = leaves(8);
        let tree = MerkleTree::new(l.clone());

        let proof = tree.generate_proof(3).unwrap();
        assert_eq!(proof.len(), 3);
        assert_eq!(proof[0], l[2]);
        assert_eq!(proof[1], hash_pair(&l[0], &l[1]));
        assert!(tree.verify_proof(l[3], 3, &proof));
    }

    #[test]
    fn test_every_index_verifies_for_many_sizes() {
        for n in 1..=33 {
            let l = leaves(n);
            let tree = MerkleTree::new(l.clone());
            for (i, leaf) in l.iter().enumerate() {
                let proof = tree.generate_proof(i).unwrap();
                assert!(tree.verify_proof(*leaf, i, &proof), "n={n} i={i}");
            }
        }
    }

    #[test]
    fn test_tampered_sibling_fails() {
        let mut rng = rand::thread_rng();
        for n in [2usize, 5, 8, 13, 64] {
            let l = leaves(n);
            let tree = MerkleTree::new(l.clone());
            let i = rng.gen_range(0..n);
            let proof = tree.generate_proof(i).unwrap();

            for pos in 0..proof.len() {
                let mut bad = proof.clone();
                bad[pos].0[rng.gen_range(0..32)] ^= 0x01;
                assert!(!tree.verify_proof(l[i], i, &bad), "n={n} i={i} pos={pos}");
            }
        }
    }

    #[test]
    fn test_wrong_leaf_or_index_fails() {
        let l = leaves(6);
        let tree = MerkleTree::new(l.clone());
        let proof = tree.generate_proof(1).unwrap();

        assert!(!tree.verify_proof(l[0], 1, &proof));
        assert!(!tree.verify_proof(l[1], 0, &proof));
        assert!(!tree.verify_proof(l[1], 6, &proof));
    }

    #[test]
    fn test_surplus_or_missing_siblings_fail() {
        let l = leaves(5);
        let tree = MerkleTree::new(l.clone());
        let proof = tree.generate_proof(0).unwrap();

        let mut longer = proof.clone();
        longer.push(B256::ZERO);
        assert!(!tree.verify_proof(l[0], 0, &longer));
        assert!(!tree.verify_proof(l[0], 0, &proof[..proof.len() - 1]));
    }

    #[test]
    fn test_out_of_range_proof() {
        let tree = MerkleTree::new(leaves(4));
        assert_eq!(
            tree.generate_proof(4),
            Err(MerkleError::IndexOutOfRange { index: 4, leaves: 4 })
        );
        assert_eq!(tree.leaf(4), None);
    }

    #[test]
    fn test_verify_path_without_tree() {
        let l = leaves(7);
        let tree = MerkleTree::new(l.clone());
        let proof = tree.generate_proof(6).unwrap();
        assert!(verify_path(tree.root(), 7, l[6], 6, &proof));
        assert!(!verify_path(tree.root(), 8, l[6], 6, &proof));
    }
}
