//! # Inclusion Verifier
//!
//! Confirms that a committed result is authentic without trusting the node
//! that served it.
//!
//! ## Algorithm
//!
//! 1. Query the transaction *with* a proof.
//! 2. Fetch the results root for the reported height from a trusted source.
//! 3. Recompute the leaf from the **requested** id and the **returned**
//!    result, walk the path, compare against the trusted root.
//!
//! Every inconsistency is `ProofMismatch` and is never retried here.
//! `Pending` and `NotFound` are passed up for the caller to retry.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::algorithms::merkle::{results_leaf, MerkleTree, SiblingPosition, MAX_PROOF_DEPTH};
use crate::domain::{
    Hash, InclusionError, InclusionProof, InclusionState, TxHash, TxResponse, TxResult,
    VerifiedResult,
};
use crate::ports::{TrustedRootSource, TxQueryChannel};

fn mismatch(tx_hash: &TxHash, reason: impl Into<String>) -> InclusionError {
    InclusionError::ProofMismatch {
        tx_hash: *tx_hash,
        reason: reason.into(),
    }
}

/// Leaf index implied by the sibling positions of a path.
fn index_from_path(proof: &InclusionProof) -> Option<u64> {
    if proof.path.len() > MAX_PROOF_DEPTH {
        return None;
    }
    Some(
        proof
            .path
            .iter()
            .enumerate()
            .fold(0u64, |index, (level, node)| match node.position {
                SiblingPosition::Left => index | (1u64 << level),
                SiblingPosition::Right => index,
            }),
    )
}

/// Check `response` for `requested` against `trusted_root`.
pub fn verify_response(
    requested: &TxHash,
    response: &TxResponse,
    trusted_root: &Hash,
) -> Result<VerifiedResult, InclusionError> {
    if response.tx_hash != *requested {
        return Err(mismatch(requested, format!("response is for {}", response.tx_hash)));
    }

    let proof = response
        .proof
        .as_ref()
        .ok_or_else(|| mismatch(requested, "no proof attached"))?;

    if proof.tx_hash != *requested {
        return Err(mismatch(requested, format!("proof is for {}", proof.tx_hash)));
    }
    if proof.height != response.height || proof.index != response.index {
        return Err(mismatch(
            requested,
            format!(
                "proof locates tx at {}:{}, response at {}:{}",
                proof.height, proof.index, response.height, response.index
            ),
        ));
    }
    if index_from_path(proof) != Some(u64::from(proof.index)) {
        return Err(mismatch(requested, "path does not lead to the claimed index"));
    }
    if proof.root != *trusted_root {
        return Err(mismatch(
            requested,
            format!("root differs from trusted root at height {}", proof.height),
        ));
    }

    let leaf = results_leaf(requested, &response.result)
        .map_err(|e| mismatch(requested, format!("result not encodable: {}", e)))?;

    if !MerkleTree::verify_proof_static(&leaf, &proof.path, trusted_root) {
        return Err(mismatch(requested, "path does not authenticate the result"));
    }

    Ok(VerifiedResult {
        tx_hash: *requested,
        height: response.height,
        index: response.index,
        result: response.result.clone(),
    })
}

/// Verifier over a query channel and a trusted root source.
pub struct InclusionVerifier<Q: TxQueryChannel, R: TrustedRootSource> {
    query: Arc<Q>,
    roots: Arc<R>,
}

impl<Q: TxQueryChannel, R: TrustedRootSource> Clone for InclusionVerifier<Q, R> {
    fn clone(&self) -> Self {
        Self {
            query: Arc::clone(&self.query),
            roots: Arc::clone(&self.roots),
        }
    }
}

impl<Q: TxQueryChannel, R: TrustedRootSource> InclusionVerifier<Q, R> {
    /// Verifier over a query channel and a trusted root source.
    pub fn new(query: Arc<Q>, roots: Arc<R>) -> Self {
        Self { query, roots }
    }

    /// Fast path: trust the source, skip the proof.
    pub async fn query_without_proof(&self, tx_hash: &TxHash) -> Result<TxResult, InclusionError> {
        let response = self.query.query_tx(tx_hash, false).await?;
        if response.tx_hash != *tx_hash {
            return Err(mismatch(tx_hash, format!("response is for {}", response.tx_hash)));
        }
        Ok(response.result)
    }

    /// Query with proof and verify against the trusted root.
    pub async fn verify(&self, tx_hash: &TxHash) -> Result<VerifiedResult, InclusionError> {
        let response = self.query.query_tx(tx_hash, true).await?;

        let trusted_root = match self.roots.results_root(response.height).await {
            Ok(root) => root,
            Err(InclusionError::Transport(reason)) => {
                return Err(InclusionError::Transport(reason))
            }
            Err(e) => {
                return Err(mismatch(
                    tx_hash,
                    format!("no trusted root for height {}: {}", response.height, e),
                ))
            }
        };

        match verify_response(tx_hash, &response, &trusted_root) {
            Ok(verified) => {
                debug!(
                    "[qc-18] Verified {} at height {} index {}",
                    tx_hash, verified.height, verified.index
                );
                Ok(verified)
            }
            Err(e) => {
                warn!("[qc-18] Rejecting inclusion of {}: {}", tx_hash, e);
                Err(e)
            }
        }
    }

    /// Current lifecycle state. Transport errors are passed through.
    pub async fn status(
        &self,
        tx_hash: &TxHash,
        prove: bool,
    ) -> Result<InclusionState, InclusionError> {
        let outcome = if prove {
            self.verify(tx_hash).await.map(|_| InclusionState::Verified)
        } else {
            self.query_without_proof(tx_hash)
                .await
                .map(|_| InclusionState::Committed)
        };

        match outcome {
            Ok(state) => Ok(state),
            Err(InclusionError::Pending { .. }) => Ok(InclusionState::Pending),
            Err(
                InclusionError::NotFound { .. }
                | InclusionError::ProofMismatch { .. }
                | InclusionError::UnknownHeight { .. },
            ) => Ok(InclusionState::Rejected),
            Err(e @ InclusionError::Transport(_)) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::codes;
    use async_trait::async_trait;
    use std::collections::HashMap;

    fn result(code: u32) -> TxResult {
        TxResult {
            code,
            log: String::new(),
            events: vec![],
            gas_used: 80_000,
        }
    }

    /// Five committed transactions in one block at height 7.
    fn block() -> (Vec<(TxHash, TxResult)>, MerkleTree) {
        let txs: Vec<(TxHash, TxResult)> = (0..5u8)
            .map(|i| (TxHash::digest(&[i]), result(u32::from(i))))
            .collect();
        let leaves = txs
            .iter()
            .map(|(h, r)| results_leaf(h, r).unwrap())
            .collect();
        (txs, MerkleTree::build(leaves))
    }

    fn response_for(index: usize) -> (TxHash, TxResponse, Hash) {
        let (txs, tree) = block();
        let (tx_hash, result) = txs[index].clone();
        let proof = InclusionProof {
            tx_hash,
            height: 7,
            index: index as u32,
            path: tree.proof(index).unwrap(),
            root: tree.root(),
        };
        let response = TxResponse {
            tx_hash,
            height: 7,
            index: index as u32,
            result,
            proof: Some(proof),
        };
        (tx_hash, response, tree.root())
    }

    #[test]
    fn test_honest_response_verifies() {
        for index in 0..5 {
            let (tx_hash, response, root) = response_for(index);
            let verified = verify_response(&tx_hash, &response, &root).unwrap();
            assert_eq!(verified.index, index as u32);
            assert_eq!(verified.result.code, index as u32);
        }
    }

    #[test]
    fn test_altered_result_rejected() {
        let (tx_hash, mut response, root) = response_for(2);
        response.result.code = codes::OK;
        assert!(matches!(
            verify_response(&tx_hash, &response, &root),
            Err(InclusionError::ProofMismatch { .. })
        ));
    }

    #[test]
    fn test_substituted_transaction_rejected() {
        let (requested, _, root) = response_for(1);
        let (_, other, _) = response_for(3);
        assert!(matches!(
            verify_response(&requested, &other, &root),
            Err(InclusionError::ProofMismatch { .. })
        ));
    }

    #[test]
    fn test_relabelled_index_rejected() {
        let (tx_hash, mut response, root) = response_for(1);
        response.index = 0;
        if let Some(proof) = response.proof.as_mut() {
            proof.index = 0;
        }
        assert!(matches!(
            verify_response(&tx_hash, &response, &root),
            Err(InclusionError::ProofMismatch { .. })
        ));
    }

    #[test]
    fn test_missing_proof_and_foreign_root_rejected() {
        let (tx_hash, mut response, root) = response_for(0);
        assert!(verify_response(&tx_hash, &response, &[0xAA; 32]).is_err());
        response.proof = None;
        assert!(matches!(
            verify_response(&tx_hash, &response, &root),
            Err(InclusionError::ProofMismatch { .. })
        ));
    }

    struct FixedChannel {
        responses: HashMap<TxHash, TxResponse>,
        pending: Vec<TxHash>,
    }

    #[async_trait]
    impl TxQueryChannel for FixedChannel {
        async fn query_tx(
            &self,
            tx_hash: &TxHash,
            prove: bool,
        ) -> Result<TxResponse, InclusionError> {
            if self.pending.contains(tx_hash) {
                return Err(InclusionError::Pending { tx_hash: *tx_hash });
            }
            let mut response = self
                .responses
                .get(tx_hash)
                .cloned()
                .ok_or(InclusionError::NotFound { tx_hash: *tx_hash })?;
            if !prove {
                response.proof = None;
            }
            Ok(response)
        }
    }

    struct FixedRoots(HashMap<u64, Hash>);

    #[async_trait]
    impl TrustedRootSource for FixedRoots {
        async fn results_root(&self, height: u64) -> Result<Hash, InclusionError> {
            self.0
                .get(&height)
                .copied()
                .ok_or_else(|| InclusionError::Transport(format!("no header {}", height)))
        }
    }

    fn verifier(trusted: Option<Hash>) -> (InclusionVerifier<FixedChannel, FixedRoots>, TxHash) {
        let (tx_hash, response, root) = response_for(4);
        let channel = FixedChannel {
            responses: HashMap::from([(tx_hash, response)]),
            pending: vec![TxHash::digest(b"pending")],
        };
        let roots = FixedRoots(HashMap::from([(7, trusted.unwrap_or(root))]));
        (InclusionVerifier::new(Arc::new(channel), Arc::new(roots)), tx_hash)
    }

    #[tokio::test]
    async fn test_status_transitions() {
        let (verifier, tx_hash) = verifier(None);

        assert_eq!(
            verifier.status(&TxHash::digest(b"pending"), true).await,
            Ok(InclusionState::Pending)
        );
        assert_eq!(
            verifier.status(&TxHash::digest(b"unknown"), true).await,
            Ok(InclusionState::Rejected)
        );
        assert_eq!(
            verifier.status(&tx_hash, false).await,
            Ok(InclusionState::Committed)
        );
        assert_eq!(
            verifier.status(&tx_hash, true).await,
            Ok(InclusionState::Verified)
        );
    }

    #[tokio::test]
    async fn test_untrusted_root_is_rejected_not_retried() {
        let (verifier, tx_hash) = verifier(Some([0x55; 32]));
        let err = verifier.verify(&tx_hash).await.unwrap_err();
        assert!(matches!(err, InclusionError::ProofMismatch { .. }));
        assert!(!err.is_retryable());
        assert_eq!(
            verifier.status(&tx_hash, true).await,
            Ok(InclusionState::Rejected)
        );
    }

    #[tokio::test]
    async fn test_fast_path_returns_result() {
        let (verifier, tx_hash) = verifier(None);
        let result = verifier.query_without_proof(&tx_hash).await.unwrap();
        assert_eq!(result.code, 4);
    }
}
