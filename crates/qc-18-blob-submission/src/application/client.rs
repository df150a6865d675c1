//! # Blob Submitter
//!
//! Caller-side orchestration of one PayForBlobs lifecycle:
//!
//! ```text
//! entries ──validate──► Submission ──sign──► BlobTx ──broadcast──► SubmissionResult
//!                                                                         │
//!                                         await_inclusion (retry Pending) ▼
//!                                                                   VerifiedResult
//! ```
//!
//! All collaborators are explicit parameters. The submitter holds no
//! ledger state of its own.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use super::assembler;
use super::verifier::InclusionVerifier;
use crate::config::{PollPolicy, SubmissionConfig};
use crate::domain::{
    codes, parse_events, Address, BlobEntry, BlobTx, BroadcastMode, ClientError, Fee,
    InclusionError, InclusionState, MsgPayForBlobs, SignedTx, SignerAccount, Submission,
    SubmissionResult, TxBody, TxHash, TxResult, VerifiedResult,
};
use crate::ports::{BlobSubmissionApi, Broadcaster, Signer, TrustedRootSource, TxQueryChannel};

/// Submits blobs on behalf of one signer.
pub struct BlobSubmitter<S, B, Q, R>
where
    S: Signer,
    B: Broadcaster,
    Q: TxQueryChannel,
    R: TrustedRootSource,
{
    config: SubmissionConfig,
    signer: Arc<S>,
    broadcaster: Arc<B>,
    verifier: InclusionVerifier<Q, R>,
}

impl<S, B, Q, R> BlobSubmitter<S, B, Q, R>
where
    S: Signer,
    B: Broadcaster,
    Q: TxQueryChannel,
    R: TrustedRootSource,
{
    /// Wire a submitter to its ports.
    pub fn new(
        config: SubmissionConfig,
        signer: Arc<S>,
        broadcaster: Arc<B>,
        query: Arc<Q>,
        roots: Arc<R>,
    ) -> Self {
        Self {
            config,
            signer,
            broadcaster,
            verifier: InclusionVerifier::new(query, roots),
        }
    }

    /// Active configuration.
    pub fn config(&self) -> &SubmissionConfig {
        &self.config
    }

    /// Verifier used for inclusion checks.
    pub fn verifier(&self) -> &InclusionVerifier<Q, R> {
        &self.verifier
    }

    /// Validate entries and the fee offer, then check the signer's balance.
    ///
    /// The balance lookup is the only network call and happens last.
    pub async fn prepare(
        &self,
        entries: &[BlobEntry],
        fee: &Fee,
    ) -> Result<Submission, ClientError> {
        let (blobs, encoded) = assembler::prepare_blobs(entries, &self.config)?;

        let total_shares = encoded.iter().map(|e| e.share_count()).sum();
        let gas = assembler::estimate_gas(total_shares, &self.config);
        assembler::check_fee_offer(fee, gas, &self.config)?;

        let address = self.signer.address();
        let balance = self
            .broadcaster
            .account_balance(&address, &self.config.fee_denom)
            .await?;

        Ok(assembler::finalize(
            &SignerAccount { address, balance },
            fee,
            blobs,
            encoded,
            &self.config,
        )?)
    }

    /// Build and sign the transaction for an assembled submission.
    pub fn sign(&self, submission: Submission) -> Result<BlobTx, ClientError> {
        let body = TxBody {
            msg: MsgPayForBlobs::from_submission(&submission),
            fee: submission.fee().clone(),
            gas_limit: submission.estimated_gas(),
            public_key: self.signer.public_key(),
        };

        let sign_bytes = body
            .sign_bytes()
            .map_err(|e| ClientError::Encoding(e.to_string()))?;
        let signature = self.signer.sign(&sign_bytes)?;

        Ok(BlobTx {
            tx: SignedTx { body, signature },
            blobs: submission.into_blobs(),
        })
    }

    /// Validate, sign and broadcast.
    pub async fn submit(
        &self,
        entries: &[BlobEntry],
        fee: Fee,
        mode: BroadcastMode,
    ) -> Result<SubmissionResult, ClientError> {
        let submission = self.prepare(entries, &fee).await?;
        let blob_count = submission.len();
        let tx = self.sign(submission)?;

        let tx_bytes = tx.encode().map_err(|e| ClientError::Encoding(e.to_string()))?;
        let tx_hash = TxHash::digest(&tx_bytes);

        info!(
            "[qc-18] Broadcasting {} ({} blobs, {} bytes, {:?})",
            tx_hash,
            blob_count,
            tx_bytes.len(),
            mode
        );

        let response = self.broadcaster.broadcast(tx_bytes, mode).await?;

        if response.tx_hash != tx_hash {
            warn!(
                "[qc-18] Broadcaster reported {} for locally computed {}",
                response.tx_hash, tx_hash
            );
        }
        if response.code != codes::OK {
            warn!(
                "[qc-18] {} rejected with code {}: {}",
                tx_hash, response.code, response.log
            );
        }

        Ok(SubmissionResult {
            tx_hash,
            code: response.code,
            events: parse_events(&response.events)?,
            height: response.height,
            log: response.log,
            gas_used: response.gas_used,
        })
    }

    /// Retry verification through `Pending`/`NotFound` with exponential
    /// backoff, bounded by attempts and an overall timeout.
    ///
    /// `ProofMismatch` and transport errors return immediately.
    pub async fn await_inclusion(
        &self,
        tx_hash: &TxHash,
        policy: &PollPolicy,
    ) -> Result<VerifiedResult, ClientError> {
        let mut attempts = 0u32;

        let polled = tokio::time::timeout(policy.timeout, async {
            while attempts < policy.max_attempts {
                match self.verifier.verify(tx_hash).await {
                    Ok(verified) => return Ok(verified),
                    Err(e) if e.is_retryable() => {
                        let delay = policy.backoff(attempts);
                        attempts += 1;
                        debug!(
                            "[qc-18] {} not yet verifiable ({}), retry {} in {:?}",
                            tx_hash, e, attempts, delay
                        );
                        if attempts < policy.max_attempts {
                            tokio::time::sleep(delay).await;
                        }
                    }
                    Err(e) => return Err(ClientError::from(e)),
                }
            }
            Err(ClientError::Timeout {
                tx_hash: *tx_hash,
                attempts,
            })
        })
        .await;

        match polled {
            Ok(outcome) => outcome,
            Err(_) => Err(ClientError::Timeout {
                tx_hash: *tx_hash,
                attempts,
            }),
        }
    }
}

#[async_trait]
impl<S, B, Q, R> BlobSubmissionApi for BlobSubmitter<S, B, Q, R>
where
    S: Signer + 'static,
    B: Broadcaster + 'static,
    Q: TxQueryChannel + 'static,
    R: TrustedRootSource + 'static,
{
    async fn submit(
        &self,
        entries: &[BlobEntry],
        fee: Fee,
        mode: BroadcastMode,
    ) -> Result<SubmissionResult, ClientError> {
        BlobSubmitter::submit(self, entries, fee, mode).await
    }

    async fn query(&self, tx_hash: &TxHash) -> Result<TxResult, InclusionError> {
        self.verifier.query_without_proof(tx_hash).await
    }

    async fn verify_inclusion(&self, tx_hash: &TxHash) -> Result<VerifiedResult, InclusionError> {
        self.verifier.verify(tx_hash).await
    }

    async fn inclusion_state(
        &self,
        tx_hash: &TxHash,
        prove: bool,
    ) -> Result<InclusionState, InclusionError> {
        self.verifier.status(tx_hash, prove).await
    }

    async fn await_inclusion(
        &self,
        tx_hash: &TxHash,
        policy: &PollPolicy,
    ) -> Result<VerifiedResult, ClientError> {
        BlobSubmitter::await_inclusion(self, tx_hash, policy).await
    }

    fn signer_address(&self) -> Address {
        self.signer.address()
    }
}
