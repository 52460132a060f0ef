//! Merkle inclusion proofs for attested facts
//!
//! The attestation network publishes one BLAKE3 merkle root per voting
//! round. A proof carries the sibling path from a fact's leaf up to that
//! root. Verification recomputes the root locally; the gate compares it
//! against the published digest for the round.

use serde::{Deserialize, Serialize};

/// Hash size in bytes (BLAKE3 output)
pub const HASH_SIZE: usize = 32;

/// Sibling path from a leaf to the round root
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InclusionPath {
    /// Leaf index in the round's tree
    pub leaf_index: u64,
    /// Sibling hashes from leaf to root
    pub siblings: Vec<[u8; HASH_SIZE]>,
}

impl InclusionPath {
    /// Recompute the root this path yields for `leaf_hash`.
    pub fn compute_root(&self, leaf_hash: &[u8; HASH_SIZE]) -> [u8; HASH_SIZE] {
        let mut current = *leaf_hash;
        let mut index = self.leaf_index;

        for sibling in &self.siblings {
            current = if index % 2 == 0 {
                hash_pair(&current, sibling)
            } else {
                hash_pair(sibling, &current)
            };
            index /= 2;
        }

        current
    }
}

/// Hash two child nodes to create their parent
#[inline]
pub fn hash_pair(left: &[u8; HASH_SIZE], right: &[u8; HASH_SIZE]) -> [u8; HASH_SIZE] {
    let mut hasher = blake3::Hasher::new();
    hasher.update(left);
    hasher.update(right);
    *hasher.finalize().as_bytes()
}

/// Hash encoded fact bytes into a leaf hash
#[inline]
pub fn hash_leaf(data: &[u8]) -> [u8; HASH_SIZE] {
    *blake3::hash(data).as_bytes()
}

/// Build a round tree from leaf hashes.
///
/// Only needed to mirror what the attestation network publishes; the
/// engine itself only ever verifies paths. With an odd node count the
/// last node is paired with itself, matching the network's convention.
pub fn build_round_tree(leaves: &[[u8; HASH_SIZE]]) -> Option<RoundTree> {
    if leaves.is_empty() {
        return None;
    }

    let mut levels: Vec<Vec<[u8; HASH_SIZE]>> = vec![leaves.to_vec()];
    while levels.last().map(|l| l.len())? > 1 {
        let prev = levels.last()?;
        let mut next = Vec::with_capacity((prev.len() + 1) / 2);
        for pair in prev.chunks(2) {
            let right = pair.get(1).unwrap_or(&pair[0]);
            next.push(hash_pair(&pair[0], right));
        }
        levels.push(next);
    }

    Some(RoundTree { levels })
}

/// Fully materialized round tree (levels from leaves up to the root)
#[derive(Debug, Clone)]
pub struct RoundTree {
    levels: Vec<Vec<[u8; HASH_SIZE]>>,
}

impl RoundTree {
    pub fn root(&self) -> [u8; HASH_SIZE] {
        self.levels[self.levels.len() - 1][0]
    }

    /// Sibling path for the leaf at `leaf_index`.
    pub fn path(&self, leaf_index: u64) -> Option<InclusionPath> {
        let mut index = leaf_index as usize;
        if index >= self.levels[0].len() {
            return None;
        }

        let mut siblings = Vec::new();
        for level in &self.levels[..self.levels.len() - 1] {
            let sibling_index = if index % 2 == 0 { index + 1 } else { index - 1 };
            // Odd level width: the last node pairs with itself
            let sibling = level.get(sibling_index).unwrap_or(&level[index]);
            siblings.push(*sibling);
            index /= 2;
        }

        Some(InclusionPath {
            leaf_index,
            siblings,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_pair_order_matters() {
        let left = [1u8; HASH_SIZE];
        let right = [2u8; HASH_SIZE];
        assert_ne!(hash_pair(&left, &right), hash_pair(&right, &left));
    }

    #[test]
    fn test_single_leaf_tree() {
        let leaf = hash_leaf(b"only");
        let tree = build_round_tree(&[leaf]).unwrap();
        assert_eq!(tree.root(), leaf);
        let path = tree.path(0).unwrap();
        assert_eq!(path.compute_root(&leaf), tree.root());
    }

    #[test]
    fn test_paths_verify_for_all_leaves() {
        let leaves: Vec<_> = (0u8..5).map(|i| hash_leaf(&[i])).collect();
        let tree = build_round_tree(&leaves).unwrap();

        for (i, leaf) in leaves.iter().enumerate() {
            let path = tree.path(i as u64).unwrap();
            assert_eq!(path.compute_root(leaf), tree.root(), "leaf {}", i);
        }
    }

    #[test]
    fn test_wrong_leaf_fails() {
        let leaves: Vec<_> = (0u8..4).map(|i| hash_leaf(&[i])).collect();
        let tree = build_round_tree(&leaves).unwrap();
        let path = tree.path(1).unwrap();
        assert_ne!(path.compute_root(&hash_leaf(b"forged")), tree.root());
    }

    #[test]
    fn test_out_of_range_leaf() {
        let leaves: Vec<_> = (0u8..4).map(|i| hash_leaf(&[i])).collect();
        let tree = build_round_tree(&leaves).unwrap();
        assert!(tree.path(4).is_none());
    }
}
