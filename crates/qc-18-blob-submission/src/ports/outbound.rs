//! # Outbound Ports
//!
//! Collaborators the core depends on: a funded signer, a broadcast channel,
//! a query channel and a source of trusted results roots.

use async_trait::async_trait;

use crate::domain::{
    Address, BroadcastFailure, BroadcastMode, BroadcastResponse, Hash, InclusionError,
    SignerError, TxHash, TxResponse,
};

/// Holds the key the signer address is derived from.
pub trait Signer: Send + Sync {
    /// Account address derived from the public key.
    fn address(&self) -> Address;

    /// Ed25519 public key.
    fn public_key(&self) -> [u8; 32];

    /// Sign `message`, returning a 64-byte Ed25519 signature.
    fn sign(&self, message: &[u8]) -> Result<[u8; 64], SignerError>;
}

/// Broadcast channel - outbound port.
#[async_trait]
pub trait Broadcaster: Send + Sync {
    /// Submit encoded transaction bytes.
    ///
    /// A rejection by the ledger is an `Ok` response with a nonzero code.
    /// `Err` is reserved for transport failure.
    async fn broadcast(
        &self,
        tx_bytes: Vec<u8>,
        mode: BroadcastMode,
    ) -> Result<BroadcastResponse, BroadcastFailure>;

    /// Spendable balance of `address` in `denom`.
    async fn account_balance(&self, address: &Address, denom: &str)
        -> Result<u64, BroadcastFailure>;
}

/// Query channel - outbound port.
#[async_trait]
pub trait TxQueryChannel: Send + Sync {
    /// Look up a committed transaction.
    ///
    /// `prove = false` is the fast path against a trusted source;
    /// `prove = true` attaches an inclusion proof.
    async fn query_tx(&self, tx_hash: &TxHash, prove: bool) -> Result<TxResponse, InclusionError>;
}

/// Source of results roots the verifier trusts (e.g. from synced headers).
#[async_trait]
pub trait TrustedRootSource: Send + Sync {
    /// Results root of the block at `height`. Unknown heights are an error.
    async fn results_root(&self, height: u64) -> Result<Hash, InclusionError>;
}
