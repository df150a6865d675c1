//! # Algorithms Module
//!
//! Share encoding and Merkle commitments.

pub mod merkle;
pub mod shares;

pub use merkle::{
    leaf_hash, node_hash, results_leaf, root_of, MerkleError, MerkleTree, ProofNode,
    SiblingPosition,
};
pub use shares::{decode, encode, shares_needed, SHARE_CONTENT_SIZE, SHARE_SIZE};
