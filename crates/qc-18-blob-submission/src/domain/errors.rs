//! # Domain Errors
//!
//! Error taxonomy for blob submission.
//!
//! Validation errors (`BlobError`, `SubmissionError`) are produced locally
//! before anything touches the network. Transport errors (`BroadcastFailure`)
//! and inclusion outcomes (`InclusionError`) come from the collaborators and
//! are surfaced verbatim.

use shared_types::{AddressError, TxHash};
use thiserror::Error;

/// Codespace for the numeric result codes below.
pub const CODESPACE: &str = "blob";

/// Numeric result codes shared by local validation and the ledger.
///
/// `0` is success; everything else is a rejection in the `blob` codespace.
pub mod codes {
    /// Accepted.
    pub const OK: u32 = 0;
    /// Namespace id has the wrong length or is reserved.
    pub const INVALID_NAMESPACE_ID: u32 = 11110;
    /// Namespace version is not supported.
    pub const INVALID_NAMESPACE_VERSION: u32 = 11111;
    /// Blob payload is empty.
    pub const EMPTY_BLOB: u32 = 11112;
    /// Share version is not supported.
    pub const UNSUPPORTED_SHARE_VERSION: u32 = 11113;
    /// Blob payload exceeds the size limit.
    pub const BLOB_TOO_LARGE: u32 = 11114;
    /// Submission has no blobs.
    pub const EMPTY_SUBMISSION: u32 = 11115;
    /// Fee below the gas-price floor.
    pub const INSUFFICIENT_FEE: u32 = 11116;
    /// Fee above the signer's spendable balance.
    pub const INSUFFICIENT_BALANCE: u32 = 11117;
    /// Fee in a denomination the ledger does not accept.
    pub const WRONG_FEE_DENOM: u32 = 11118;
    /// Signature or signer binding does not verify.
    pub const INVALID_SIGNATURE: u32 = 11119;
    /// Transaction bytes do not decode, or the message is inconsistent.
    pub const MALFORMED_TX: u32 = 11120;
    /// Attached blob differs from what the message declares.
    pub const BLOB_MISMATCH: u32 = 11121;
    /// Gas limit below the required gas.
    pub const OUT_OF_GAS: u32 = 11122;
    /// Transaction already in the mempool or a block.
    pub const TX_ALREADY_KNOWN: u32 = 11123;
}

/// Why a namespace id was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum NamespaceIdFault {
    /// Id length does not match the version.
    #[error("length {got} does not match {expected} for this version")]
    WrongLength {
        /// Length the version requires.
        expected: usize,
        /// Length supplied.
        got: usize,
    },

    /// Id lies in a range reserved for protocol use.
    #[error("id falls in a reserved range")]
    Reserved,
}

/// Per-blob validation failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BlobError {
    /// Namespace version outside the supported set.
    #[error("Invalid namespace version: {version}")]
    InvalidNamespaceVersion {
        /// Version supplied.
        version: u32,
    },

    /// Namespace id malformed or reserved.
    #[error("Invalid namespace id: {fault}")]
    InvalidNamespaceId {
        /// What is wrong with the id.
        fault: NamespaceIdFault,
    },

    /// Share version outside the supported set.
    #[error("Unsupported share version: {version}")]
    UnsupportedShareVersion {
        /// Version supplied.
        version: u32,
    },

    /// Zero-length payload.
    #[error("Blob payload is empty")]
    EmptyBlob,

    /// Payload larger than the configured limit.
    #[error("Blob too large: {size} bytes (max: {max})")]
    BlobTooLarge {
        /// Payload size in bytes.
        size: usize,
        /// Configured limit in bytes.
        max: usize,
    },
}

impl BlobError {
    /// Result code in the `blob` codespace.
    pub fn code(&self) -> u32 {
        match self {
            Self::InvalidNamespaceVersion { .. } => codes::INVALID_NAMESPACE_VERSION,
            Self::InvalidNamespaceId { .. } => codes::INVALID_NAMESPACE_ID,
            Self::UnsupportedShareVersion { .. } => codes::UNSUPPORTED_SHARE_VERSION,
            Self::EmptyBlob => codes::EMPTY_BLOB,
            Self::BlobTooLarge { .. } => codes::BLOB_TOO_LARGE,
        }
    }
}

/// Failure to assemble a submission from a batch of entries.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmissionError {
    /// No entries supplied.
    #[error("Submission contains no blobs")]
    EmptySubmission,

    /// Entry at `index` failed validation. Nothing was submitted.
    #[error("Entry {index} is invalid: {source}")]
    InvalidEntry {
        /// Zero-based position of the entry in the caller's list.
        index: usize,
        /// Why the entry was refused.
        #[source]
        source: BlobError,
    },

    /// Offered fee below `ceil(gas * min_gas_price)`.
    #[error("Insufficient fee: offered {offered}, required {required}")]
    InsufficientFee {
        /// Fee offered.
        offered: u64,
        /// Minimum fee for the estimated gas.
        required: u64,
    },

    /// Signer cannot cover the offered fee.
    #[error("Insufficient balance: balance {balance}, fee {fee}")]
    InsufficientBalance {
        /// Spendable balance.
        balance: u64,
        /// Fee offered.
        fee: u64,
    },

    /// Fee offered in a denomination the ledger does not accept.
    #[error("Wrong fee denomination: expected {expected}, got {got}")]
    WrongFeeDenom {
        /// Accepted denomination.
        expected: String,
        /// Denomination offered.
        got: String,
    },
}

impl SubmissionError {
    /// Result code in the `blob` codespace.
    pub fn code(&self) -> u32 {
        match self {
            Self::EmptySubmission => codes::EMPTY_SUBMISSION,
            Self::InvalidEntry { source, .. } => source.code(),
            Self::InsufficientFee { .. } => codes::INSUFFICIENT_FEE,
            Self::InsufficientBalance { .. } => codes::INSUFFICIENT_BALANCE,
            Self::WrongFeeDenom { .. } => codes::WRONG_FEE_DENOM,
        }
    }

    /// Index of the offending entry, if the failure is entry-specific.
    pub fn entry_index(&self) -> Option<usize> {
        match self {
            Self::InvalidEntry { index, .. } => Some(*index),
            _ => None,
        }
    }
}

/// Ledger-side rejection of a broadcast transaction (CheckTx).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CheckTxError {
    /// Bytes do not decode to a well-formed transaction.
    #[error("Malformed transaction: {0}")]
    Malformed(String),

    /// Signature does not verify, or the key does not own the signer address.
    #[error("Invalid signature: {0}")]
    InvalidSignature(String),

    /// A blob or its declared metadata failed validation.
    #[error("Blob {index} rejected: {source}")]
    Blob {
        /// Position of the blob in the transaction.
        index: usize,
        /// Why it was refused.
        #[source]
        source: BlobError,
    },

    /// Attached blob disagrees with the size or commitment the message declares.
    #[error("Blob {index} does not match its declared {field}")]
    BlobMismatch {
        /// Position of the blob in the transaction.
        index: usize,
        /// Declared field that disagrees.
        field: &'static str,
    },

    /// Fee or balance check failed.
    #[error(transparent)]
    Submission(#[from] SubmissionError),

    /// Gas limit below what the blobs will consume.
    #[error("Out of gas: limit {limit}, required {required}")]
    OutOfGas {
        /// Gas limit in the transaction.
        limit: u64,
        /// Gas the blobs require.
        required: u64,
    },

    /// Identical transaction already in the mempool or a block.
    #[error("Transaction already known")]
    AlreadyKnown,
}

impl CheckTxError {
    /// Result code in the `blob` codespace.
    pub fn code(&self) -> u32 {
        match self {
            Self::Malformed(_) => codes::MALFORMED_TX,
            Self::InvalidSignature(_) => codes::INVALID_SIGNATURE,
            Self::Blob { source, .. } => source.code(),
            Self::BlobMismatch { .. } => codes::BLOB_MISMATCH,
            Self::Submission(e) => e.code(),
            Self::OutOfGas { .. } => codes::OUT_OF_GAS,
            Self::AlreadyKnown => codes::TX_ALREADY_KNOWN,
        }
    }
}

/// Failure to decode share bytes back into a blob.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ShareDecodeError {
    /// Input is empty or not a whole number of shares.
    #[error("Share data length {0} is not a positive multiple of the share size")]
    InvalidLength(usize),

    /// A share's namespace does not validate.
    #[error("Share {index} carries an invalid namespace: {source}")]
    Namespace {
        /// Share position.
        index: usize,
        /// Validation failure.
        #[source]
        source: BlobError,
    },

    /// A continuation share's namespace differs from the first share's.
    #[error("Share {index} belongs to a different namespace")]
    NamespaceMismatch {
        /// Share position.
        index: usize,
    },

    /// Start flag set on a continuation share or missing on the first.
    #[error("Share {index} has an unexpected sequence start flag")]
    SequenceStart {
        /// Share position.
        index: usize,
    },

    /// A share's version is not supported.
    #[error("Share {index}: {source}")]
    ShareVersion {
        /// Share position.
        index: usize,
        /// Validation failure.
        #[source]
        source: BlobError,
    },

    /// A continuation share's version or sequence length differs from the
    /// first share's.
    #[error("Share {index} prefix disagrees with the first share")]
    InconsistentPrefix {
        /// Share position.
        index: usize,
    },

    /// Declared sequence length needs a different number of shares.
    #[error("Sequence length {declared} needs {expected} shares, found {found}")]
    SequenceLength {
        /// Length in the first share's prefix.
        declared: usize,
        /// Shares that length requires.
        expected: usize,
        /// Shares supplied.
        found: usize,
    },

    /// Bytes after the end of the sequence are not zero.
    #[error("Non-zero padding after the end of the sequence")]
    DirtyPadding,

    /// Reassembled blob is invalid.
    #[error(transparent)]
    Blob(#[from] BlobError),
}

/// Transport-level broadcast failure. Carries the underlying reason as-is.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Broadcast failed: {reason}")]
pub struct BroadcastFailure {
    /// Reason reported by the transport.
    pub reason: String,
}

impl BroadcastFailure {
    /// Wrap a transport reason.
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Outcome of querying or verifying a transaction's inclusion.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InclusionError {
    /// Known to the source but not yet committed. Retry after a commit cycle.
    #[error("Transaction {tx_hash} is pending")]
    Pending {
        /// Queried transaction.
        tx_hash: TxHash,
    },

    /// Unknown to the queried source.
    #[error("Transaction {tx_hash} not found")]
    NotFound {
        /// Queried transaction.
        tx_hash: TxHash,
    },

    /// The responder's proof does not authenticate its result. Never retried.
    #[error("Proof mismatch for {tx_hash}: {reason}")]
    ProofMismatch {
        /// Queried transaction.
        tx_hash: TxHash,
        /// Which check failed.
        reason: String,
    },

    /// The root source has no results root for this height.
    #[error("No results root known for height {height}")]
    UnknownHeight {
        /// Requested height.
        height: u64,
    },

    /// Query channel failure.
    #[error("Query transport error: {0}")]
    Transport(String),
}

impl InclusionError {
    /// `Pending` and `NotFound` may succeed on a later attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Pending { .. } | Self::NotFound { .. })
    }
}

/// Failure to read a typed event back from ledger attributes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EventParseError {
    /// A required attribute is absent.
    #[error("Event {kind} is missing attribute {key}")]
    MissingAttribute {
        /// Event type.
        kind: String,
        /// Missing attribute name.
        key: &'static str,
    },

    /// Signer attribute is not a valid address.
    #[error("Invalid signer address: {0}")]
    InvalidSigner(#[from] AddressError),

    /// Size attribute is not an unsigned integer.
    #[error("Invalid blob size {value:?}")]
    InvalidBlobSize {
        /// Raw attribute value.
        value: String,
    },
}

/// Signing failure reported by a signer port.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Signing failed: {0}")]
pub struct SignerError(pub String);

/// Top-level error for the submission client.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Local validation failed; nothing was broadcast.
    #[error(transparent)]
    Submission(#[from] SubmissionError),

    /// Broadcast transport failed.
    #[error(transparent)]
    Broadcast(#[from] BroadcastFailure),

    /// Query or verification failed.
    #[error(transparent)]
    Inclusion(#[from] InclusionError),

    /// Signer refused or failed.
    #[error(transparent)]
    Signing(#[from] SignerError),

    /// Response events could not be parsed.
    #[error(transparent)]
    Events(#[from] EventParseError),

    /// Transaction could not be serialized.
    #[error("Transaction encoding failed: {0}")]
    Encoding(String),

    /// Retry budget exhausted while waiting for inclusion.
    #[error("Gave up waiting for {tx_hash} after {attempts} attempts")]
    Timeout {
        /// Awaited transaction.
        tx_hash: TxHash,
        /// Verification attempts made.
        attempts: u32,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_error_reports_index_and_code() {
        let err = SubmissionError::InvalidEntry {
            index: 3,
            source: BlobError::UnsupportedShareVersion { version: 1 },
        };
        assert_eq!(err.entry_index(), Some(3));
        assert_eq!(err.code(), codes::UNSUPPORTED_SHARE_VERSION);
        assert!(err.to_string().contains("Entry 3"));
    }

    #[test]
    fn test_namespace_errors_have_distinct_codes() {
        let version = BlobError::InvalidNamespaceVersion { version: 1 };
        let id = BlobError::InvalidNamespaceId {
            fault: NamespaceIdFault::Reserved,
        };
        assert_ne!(version.code(), id.code());
    }

    #[test]
    fn test_retryable_classification() {
        let tx_hash = TxHash([1u8; 32]);
        assert!(InclusionError::Pending { tx_hash }.is_retryable());
        assert!(InclusionError::NotFound { tx_hash }.is_retryable());
        assert!(!InclusionError::ProofMismatch {
            tx_hash,
            reason: "root".into()
        }
        .is_retryable());
        assert!(!InclusionError::Transport("reset".into()).is_retryable());
    }

    #[test]
    fn test_check_tx_codes_follow_blob_taxonomy() {
        let err = CheckTxError::Blob {
            index: 0,
            source: BlobError::InvalidNamespaceId {
                fault: NamespaceIdFault::Reserved,
            },
        };
        assert_eq!(err.code(), codes::INVALID_NAMESPACE_ID);
        assert_eq!(
            CheckTxError::from(SubmissionError::InsufficientFee {
                offered: 1,
                required: 2
            })
            .code(),
            codes::INSUFFICIENT_FEE
        );
        assert_eq!(CheckTxError::AlreadyKnown.code(), codes::TX_ALREADY_KNOWN);
    }

    #[test]
    fn test_broadcast_failure_keeps_reason_verbatim() {
        let err = BroadcastFailure::new("connection refused");
        assert_eq!(err.to_string(), "Broadcast failed: connection refused");
    }
}
