//! # Inbound Ports
//!
//! API trait defining what the blob submission client can do.

use async_trait::async_trait;

use crate::config::PollPolicy;
use crate::domain::{
    Address, BlobEntry, BroadcastMode, ClientError, Fee, InclusionError, InclusionState,
    SubmissionResult, TxHash, TxResult, VerifiedResult,
};

/// Blob submission API - inbound port.
#[async_trait]
pub trait BlobSubmissionApi: Send + Sync {
    /// Validate, sign and broadcast a batch of blobs as one PayForBlobs
    /// transaction.
    ///
    /// Every validation failure is reported before any network call.
    async fn submit(
        &self,
        entries: &[BlobEntry],
        fee: Fee,
        mode: BroadcastMode,
    ) -> Result<SubmissionResult, ClientError>;

    /// Fetch a committed result from the trusted source, without a proof.
    async fn query(&self, tx_hash: &TxHash) -> Result<TxResult, InclusionError>;

    /// Fetch a committed result with its proof and check it.
    async fn verify_inclusion(&self, tx_hash: &TxHash) -> Result<VerifiedResult, InclusionError>;

    /// Where `tx_hash` currently stands. Without `prove`, a committed
    /// transaction reports `Committed` rather than `Verified`.
    async fn inclusion_state(
        &self,
        tx_hash: &TxHash,
        prove: bool,
    ) -> Result<InclusionState, InclusionError>;

    /// Retry `verify_inclusion` through `Pending`/`NotFound` under `policy`.
    async fn await_inclusion(
        &self,
        tx_hash: &TxHash,
        policy: &PollPolicy,
    ) -> Result<VerifiedResult, ClientError>;

    /// Address the client signs for.
    fn signer_address(&self) -> Address;
}
