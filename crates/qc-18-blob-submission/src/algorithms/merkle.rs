//! # Merkle Commitments
//!
//! Binary SHA-256 Merkle tree used for two commitments:
//!
//! - **Share commitments**: one leaf per share of a blob.
//! - **Results roots**: one leaf per executed transaction in a block, binding
//!   the transaction id to its execution result.
//!
//! Leaves and inner nodes are hashed under different prefixes so that an
//! inner node can never be presented as a leaf.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use shared_types::{Hash, TxHash};
use thiserror::Error;

use crate::domain::TxResult;

/// Prefix for leaf hashes.
pub const LEAF_DOMAIN: u8 = 0x00;

/// Prefix for inner node hashes.
pub const NODE_DOMAIN: u8 = 0x01;

/// Padding value for empty leaf slots.
pub const SENTINEL_HASH: Hash = [0u8; 32];

/// Deepest path a verifier will walk (2^64 leaves).
pub const MAX_PROOF_DEPTH: usize = 64;

/// Tree access errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MerkleError {
    /// No real leaf at `index`.
    #[error("Leaf index {index} out of bounds ({leaves} leaves)")]
    IndexOutOfBounds {
        /// Requested leaf.
        index: usize,
        /// Real leaves in the tree.
        leaves: usize,
    },
}

/// Position of a sibling relative to the running hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SiblingPosition {
    /// Sibling is hashed on the left.
    Left,
    /// Sibling is hashed on the right.
    Right,
}

/// A single step of a Merkle path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofNode {
    /// Sibling hash.
    pub hash: Hash,
    /// Side the sibling sits on.
    pub position: SiblingPosition,
}

/// Hash a leaf payload.
pub fn leaf_hash(data: &[u8]) -> Hash {
    let mut hasher = Sha256::new();
    hasher.update([LEAF_DOMAIN]);
    hasher.update(data);
    hasher.finalize().into()
}

/// Hash two children.
pub fn node_hash(left: &Hash, right: &Hash) -> Hash {
    let mut hasher = Sha256::new();
    hasher.update([NODE_DOMAIN]);
    hasher.update(left);
    hasher.update(right);
    hasher.finalize().into()
}

/// Leaf committing a transaction id to its execution result.
pub fn results_leaf(tx_hash: &TxHash, result: &TxResult) -> Result<Hash, bincode::Error> {
    let mut data = tx_hash.as_bytes().to_vec();
    data.extend(bincode::serialize(result)?);
    Ok(leaf_hash(&data))
}

/// Binary Merkle tree over pre-hashed leaves.
///
/// Stored in array form `[root, level1.., leaves..]`; the parent of `i` is
/// `(i - 1) / 2`. Leaves are padded to a power of two (minimum two) with
/// `SENTINEL_HASH`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MerkleTree {
    nodes: Vec<Hash>,
    leaf_count: usize,
    padded_leaf_count: usize,
}

impl MerkleTree {
    /// Build over `leaves`. An empty tree has `SENTINEL_HASH` as root.
    pub fn build(leaves: Vec<Hash>) -> Self {
        let leaf_count = leaves.len();

        if leaf_count == 0 {
            return Self {
                nodes: vec![SENTINEL_HASH],
                leaf_count: 0,
                padded_leaf_count: 0,
            };
        }

        let padded_leaf_count = leaf_count.next_power_of_two().max(2);
        let leaf_start = padded_leaf_count - 1;

        let mut nodes = vec![SENTINEL_HASH; 2 * padded_leaf_count - 1];
        nodes[leaf_start..leaf_start + leaf_count].copy_from_slice(&leaves);

        for i in (0..leaf_start).rev() {
            nodes[i] = node_hash(&nodes[2 * i + 1], &nodes[2 * i + 2]);
        }

        Self {
            nodes,
            leaf_count,
            padded_leaf_count,
        }
    }

    /// Tree root.
    pub fn root(&self) -> Hash {
        self.nodes[0]
    }

    /// Number of real (unpadded) leaves.
    pub fn leaf_count(&self) -> usize {
        self.leaf_count
    }

    /// Sibling path from leaf `index` up to the root.
    pub fn proof(&self, index: usize) -> Result<Vec<ProofNode>, MerkleError> {
        if index >= self.leaf_count {
            return Err(MerkleError::IndexOutOfBounds {
                index,
                leaves: self.leaf_count,
            });
        }

        let mut current = self.padded_leaf_count - 1 + index;
        let mut path = Vec::new();

        while current > 0 {
            // Odd indices are left children.
            let (sibling, position) = if current % 2 == 1 {
                (current + 1, SiblingPosition::Right)
            } else {
                (current - 1, SiblingPosition::Left)
            };
            path.push(ProofNode {
                hash: self.nodes[sibling],
                position,
            });
            current = (current - 1) / 2;
        }

        Ok(path)
    }

    /// Recompute the root from `leaf` and `path` and compare.
    pub fn verify_proof_static(leaf: &Hash, path: &[ProofNode], expected_root: &Hash) -> bool {
        if path.len() > MAX_PROOF_DEPTH {
            return false;
        }

        let computed = path.iter().fold(*leaf, |current, node| match node.position {
            SiblingPosition::Left => node_hash(&node.hash, &current),
            SiblingPosition::Right => node_hash(&current, &node.hash),
        });

        computed == *expected_root
    }
}

/// Root over a list of leaf payloads.
pub fn root_of<'a>(payloads: impl IntoIterator<Item = &'a [u8]>) -> Hash {
    MerkleTree::build(payloads.into_iter().map(leaf_hash).collect()).root()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hash_from_byte(b: u8) -> Hash {
        let mut h = [0u8; 32];
        h[0] = b;
        h
    }

    #[test]
    fn test_empty_tree_root_is_sentinel() {
        let tree = MerkleTree::build(vec![]);
        assert_eq!(tree.root(), SENTINEL_HASH);
        assert!(tree.proof(0).is_err());
    }

    #[test]
    fn test_single_leaf_pads_to_two() {
        let leaf = hash_from_byte(1);
        let tree = MerkleTree::build(vec![leaf]);
        assert_eq!(tree.root(), node_hash(&leaf, &SENTINEL_HASH));
        assert_eq!(tree.proof(0).unwrap().len(), 1);
    }

    #[test]
    fn test_four_leaves_root() {
        let leaves: Vec<Hash> = (1..=4).map(hash_from_byte).collect();
        let tree = MerkleTree::build(leaves.clone());
        let left = node_hash(&leaves[0], &leaves[1]);
        let right = node_hash(&leaves[2], &leaves[3]);
        assert_eq!(tree.root(), node_hash(&left, &right));
    }

    #[test]
    fn test_every_proof_verifies() {
        for count in 1..=17u8 {
            let leaves: Vec<Hash> = (0..count).map(hash_from_byte).collect();
            let tree = MerkleTree::build(leaves.clone());
            for (i, leaf) in leaves.iter().enumerate() {
                let path = tree.proof(i).unwrap();
                assert!(
                    MerkleTree::verify_proof_static(leaf, &path, &tree.root()),
                    "leaf {} of {} should verify",
                    i,
                    count
                );
            }
        }
    }

    #[test]
    fn test_tampered_leaf_fails() {
        let leaves: Vec<Hash> = (0..4).map(hash_from_byte).collect();
        let tree = MerkleTree::build(leaves);
        let path = tree.proof(1).unwrap();
        assert!(!MerkleTree::verify_proof_static(
            &hash_from_byte(0xEE),
            &path,
            &tree.root()
        ));
    }

    #[test]
    fn test_tampered_path_fails() {
        let leaves: Vec<Hash> = (0..4).map(hash_from_byte).collect();
        let tree = MerkleTree::build(leaves.clone());
        let mut path = tree.proof(2).unwrap();
        path[0].hash[0] ^= 0xFF;
        assert!(!MerkleTree::verify_proof_static(&leaves[2], &path, &tree.root()));
    }

    #[test]
    fn test_swapped_position_fails() {
        let leaves: Vec<Hash> = (0..2).map(hash_from_byte).collect();
        let tree = MerkleTree::build(leaves.clone());
        let mut path = tree.proof(0).unwrap();
        path[0].position = SiblingPosition::Left;
        assert!(!MerkleTree::verify_proof_static(&leaves[0], &path, &tree.root()));
    }

    #[test]
    fn test_leaf_and_node_domains_differ() {
        let a = hash_from_byte(1);
        let b = hash_from_byte(2);
        let mut concatenated = a.to_vec();
        concatenated.extend_from_slice(&b);
        assert_ne!(leaf_hash(&concatenated), node_hash(&a, &b));
    }

    #[test]
    fn test_overlong_path_rejected() {
        let leaf = hash_from_byte(1);
        let path = vec![
            ProofNode {
                hash: SENTINEL_HASH,
                position: SiblingPosition::Right,
            };
            MAX_PROOF_DEPTH + 1
        ];
        assert!(!MerkleTree::verify_proof_static(&leaf, &path, &leaf));
    }
}
