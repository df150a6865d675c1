//! # Value Objects
//!
//! Results, proofs and responses exchanged with the ledger collaborators.

use serde::{Deserialize, Serialize};
use shared_types::{Address, Hash, TxHash};

use super::errors::codes;
use super::events::{PayForBlobEvent, RawEvent};
use crate::algorithms::merkle::ProofNode;

/// Whether a broadcast waits for the transaction to be committed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BroadcastMode {
    /// Return after the transaction is in a block.
    Block,
    /// Return after the mempool accepted (or rejected) it.
    Sync,
}

/// A funded signer as seen by the assembler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignerAccount {
    /// Signer address.
    pub address: Address,
    /// Spendable balance in the fee denomination.
    pub balance: u64,
}

/// Execution result recorded by the ledger for one transaction.
///
/// This is the payload an inclusion proof authenticates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxResult {
    /// `0` on success, otherwise a `blob` codespace code.
    pub code: u32,
    /// Human-readable detail; empty on success.
    pub log: String,
    /// Events emitted during execution.
    pub events: Vec<RawEvent>,
    /// Gas consumed.
    pub gas_used: u64,
}

impl TxResult {
    /// Whether the transaction executed successfully.
    pub fn is_ok(&self) -> bool {
        self.code == codes::OK
    }
}

/// What the broadcaster reports back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BroadcastResponse {
    /// Id the ledger assigned to the transaction.
    pub tx_hash: TxHash,
    /// CheckTx or execution code.
    pub code: u32,
    /// Rejection detail.
    pub log: String,
    /// `None` unless the transaction was committed before returning.
    pub height: Option<u64>,
    /// Events, present once committed.
    pub events: Vec<RawEvent>,
    /// Gas consumed, `0` until committed.
    pub gas_used: u64,
}

/// Outcome of a submission, fixed at broadcast time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionResult {
    /// Locally computed transaction id.
    pub tx_hash: TxHash,
    /// Result code reported by the ledger.
    pub code: u32,
    /// Typed events, one per blob once committed.
    pub events: Vec<PayForBlobEvent>,
    /// Block height, if committed before returning.
    pub height: Option<u64>,
    /// Rejection detail.
    pub log: String,
    /// Gas consumed, `0` until committed.
    pub gas_used: u64,
}

impl SubmissionResult {
    /// Whether the ledger accepted the transaction.
    pub fn is_ok(&self) -> bool {
        self.code == codes::OK
    }
}

/// Merkle path from a transaction's result leaf to a block's results root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InclusionProof {
    /// Transaction the proof is for.
    pub tx_hash: TxHash,
    /// Block height.
    pub height: u64,
    /// Position of the transaction in the block.
    pub index: u32,
    /// Siblings from the leaf up to the root.
    pub path: Vec<ProofNode>,
    /// Results root the path claims to reach.
    pub root: Hash,
}

/// Query response for a committed transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxResponse {
    /// Transaction the response is for.
    pub tx_hash: TxHash,
    /// Block height.
    pub height: u64,
    /// Position of the transaction in the block.
    pub index: u32,
    /// Execution result.
    pub result: TxResult,
    /// Present when requested with `prove = true`.
    pub proof: Option<InclusionProof>,
}

/// A result whose inclusion has been checked against a trusted root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedResult {
    /// Requested transaction.
    pub tx_hash: TxHash,
    /// Block height.
    pub height: u64,
    /// Position in the block.
    pub index: u32,
    /// Authenticated execution result.
    pub result: TxResult,
}

/// Lifecycle of a submitted transaction from the verifier's point of view.
///
/// `Pending -> Committed -> Verified | Rejected`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InclusionState {
    /// Broadcast, not yet in a block.
    Pending,
    /// In a block; result and proof available but not yet checked.
    Committed,
    /// Proof authenticates the result.
    Verified,
    /// Proof failed, or the transaction is unknown.
    Rejected,
}

impl InclusionState {
    /// `Verified` and `Rejected` do not change on further polling.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Verified | Self::Rejected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_states() {
        assert!(!InclusionState::Pending.is_terminal());
        assert!(!InclusionState::Committed.is_terminal());
        assert!(InclusionState::Verified.is_terminal());
        assert!(InclusionState::Rejected.is_terminal());
    }

    #[test]
    fn test_result_code_zero_is_success() {
        let ok = TxResult {
            code: codes::OK,
            log: String::new(),
            events: vec![],
            gas_used: 0,
        };
        let rejected = TxResult {
            code: codes::INSUFFICIENT_FEE,
            ..ok.clone()
        };
        assert!(ok.is_ok());
        assert!(!rejected.is_ok());
    }
}
