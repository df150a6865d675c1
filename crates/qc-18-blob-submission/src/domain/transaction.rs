//! # PayForBlobs Transaction
//!
//! ```text
//! BlobTx
//! ├── tx: SignedTx
//! │   ├── body: TxBody { msg: MsgPayForBlobs, fee, gas_limit, public_key }
//! │   └── signature (Ed25519 over bincode(body))
//! └── blobs: Vec<Blob>
//! ```
//!
//! The message commits to each blob by namespace, size, share version and
//! share commitment; the blobs travel alongside it and are checked against
//! those commitments by the ledger. The transaction id is
//! `SHA-256(bincode(BlobTx))`.

use ed25519_dalek::{Signature, Verifier, VerifyingKey};
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, Bytes};
use shared_types::{Address, Fee, Hash, TxHash};

use super::blob::{validate_share_version, Blob};
use super::entities::Submission;
use super::errors::{BlobError, CheckTxError};
use super::namespace::Namespace;

/// Message paying for the inclusion of one or more blobs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgPayForBlobs {
    /// Account paying the fee.
    pub signer: Address,
    /// Namespace of each blob.
    pub namespaces: Vec<Namespace>,
    /// Payload length of each blob.
    pub blob_sizes: Vec<u32>,
    /// Share commitment of each blob.
    pub share_commitments: Vec<Hash>,
    /// Share version of each blob.
    pub share_versions: Vec<u8>,
}

impl MsgPayForBlobs {
    /// Build the message committing to every blob of a submission.
    pub fn from_submission(submission: &Submission) -> Self {
        let blobs = submission.blobs();
        Self {
            signer: *submission.signer(),
            namespaces: blobs.iter().map(|b| *b.namespace()).collect(),
            // Sizes beyond u32 are rejected by the encoder.
            blob_sizes: blobs
                .iter()
                .map(|b| u32::try_from(b.size()).unwrap_or(u32::MAX))
                .collect(),
            share_commitments: submission
                .encoded()
                .iter()
                .map(|e| e.share_commitment())
                .collect(),
            share_versions: blobs.iter().map(Blob::share_version).collect(),
        }
    }

    /// Number of blobs the message pays for.
    pub fn blob_count(&self) -> usize {
        self.namespaces.len()
    }

    /// Stateless checks: parallel vectors agree, metadata is valid.
    pub fn validate_basic(&self) -> Result<(), CheckTxError> {
        let count = self.namespaces.len();
        if count == 0 {
            return Err(CheckTxError::Malformed("message declares no blobs".into()));
        }
        if self.blob_sizes.len() != count
            || self.share_commitments.len() != count
            || self.share_versions.len() != count
        {
            return Err(CheckTxError::Malformed(format!(
                "mismatched field lengths: {} namespaces, {} sizes, {} commitments, {} versions",
                count,
                self.blob_sizes.len(),
                self.share_commitments.len(),
                self.share_versions.len()
            )));
        }

        for index in 0..count {
            self.validate_entry(index)
                .map_err(|source| CheckTxError::Blob { index, source })?;
        }

        Ok(())
    }

    fn validate_entry(&self, index: usize) -> Result<(), BlobError> {
        self.namespaces[index].validate()?;
        validate_share_version(u32::from(self.share_versions[index]))?;
        if self.blob_sizes[index] == 0 {
            return Err(BlobError::EmptyBlob);
        }
        Ok(())
    }
}

/// The signed portion of a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxBody {
    /// The single message.
    pub msg: MsgPayForBlobs,
    /// Offered fee.
    pub fee: Fee,
    /// Gas the signer allows the ledger to charge.
    pub gas_limit: u64,
    /// Ed25519 verifying key of the signer.
    pub public_key: [u8; 32],
}

impl TxBody {
    /// Canonical bytes covered by the signature.
    pub fn sign_bytes(&self) -> Result<Vec<u8>, bincode::Error> {
        bincode::serialize(self)
    }
}

/// Body plus the signature over its sign bytes.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedTx {
    /// Signed content.
    pub body: TxBody,
    /// Ed25519 signature.
    #[serde_as(as = "Bytes")]
    pub signature: [u8; 64],
}

impl SignedTx {
    /// Check the signature and that the key owns the message signer.
    pub fn verify_signature(&self) -> Result<(), CheckTxError> {
        if Address::from_public_key(&self.body.public_key) != self.body.msg.signer {
            return Err(CheckTxError::InvalidSignature(
                "public key does not match signer address".into(),
            ));
        }

        let key = VerifyingKey::from_bytes(&self.body.public_key)
            .map_err(|e| CheckTxError::InvalidSignature(e.to_string()))?;
        let message = self
            .body
            .sign_bytes()
            .map_err(|e| CheckTxError::Malformed(e.to_string()))?;

        key.verify(&message, &Signature::from_bytes(&self.signature))
            .map_err(|e| CheckTxError::InvalidSignature(e.to_string()))
    }
}

/// A signed PayForBlobs transaction with its blobs attached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlobTx {
    /// The signed transaction.
    pub tx: SignedTx,
    /// Blobs in message order.
    pub blobs: Vec<Blob>,
}

impl BlobTx {
    /// Wire bytes as broadcast.
    pub fn encode(&self) -> Result<Vec<u8>, bincode::Error> {
        bincode::serialize(self)
    }

    /// Parse wire bytes. Contents are not validated.
    pub fn decode(bytes: &[u8]) -> Result<Self, bincode::Error> {
        bincode::deserialize(bytes)
    }

    /// Content hash of the encoded transaction.
    pub fn tx_hash(&self) -> Result<TxHash, bincode::Error> {
        Ok(TxHash::digest(&self.encode()?))
    }
}
