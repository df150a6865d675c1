//! # Entities
//!
//! A `Submission` is an ordered, fully validated batch of blobs sharing one
//! signer, together with its footprint and fee. It is only built by the
//! assembler and is read-only afterwards.

use shared_types::{Address, Fee};

use super::blob::{Blob, EncodedBlob};

/// Assembled batch ready to be turned into a `MsgPayForBlobs`.
///
/// Invariants upheld by the assembler:
/// - at least one blob;
/// - `encoded[i]` is the share encoding of `blobs[i]`;
/// - `fee` covers `estimated_gas` at the configured gas price and does not
///   exceed the signer's balance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    signer: Address,
    blobs: Vec<Blob>,
    encoded: Vec<EncodedBlob>,
    total_shares: usize,
    estimated_gas: u64,
    fee: Fee,
}

impl Submission {
    pub(crate) fn new(
        signer: Address,
        blobs: Vec<Blob>,
        encoded: Vec<EncodedBlob>,
        estimated_gas: u64,
        fee: Fee,
    ) -> Self {
        let total_shares = encoded.iter().map(EncodedBlob::share_count).sum();
        Self {
            signer,
            blobs,
            encoded,
            total_shares,
            estimated_gas,
            fee,
        }
    }

    /// Account paying for the blobs.
    pub fn signer(&self) -> &Address {
        &self.signer
    }

    /// Validated blobs in caller order.
    pub fn blobs(&self) -> &[Blob] {
        &self.blobs
    }

    /// Share encodings, parallel to `blobs()`.
    pub fn encoded(&self) -> &[EncodedBlob] {
        &self.encoded
    }

    /// Sum of every blob's share count.
    pub fn total_shares(&self) -> usize {
        self.total_shares
    }

    /// Gas the ledger will charge for this submission.
    pub fn estimated_gas(&self) -> u64 {
        self.estimated_gas
    }

    /// Offered fee.
    pub fn fee(&self) -> &Fee {
        &self.fee
    }

    /// Number of blobs.
    pub fn len(&self) -> usize {
        self.blobs.len()
    }

    /// Always false for an assembled submission.
    pub fn is_empty(&self) -> bool {
        self.blobs.is_empty()
    }

    /// Give up the blobs for attaching to a transaction.
    pub fn into_blobs(self) -> Vec<Blob> {
        self.blobs
    }
}
