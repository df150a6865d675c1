//! # QC-18 Blob Submission
//!
//! Client core for publishing arbitrary namespaced payloads ("blobs") to a
//! ledger that only stores them, and for proving afterwards that the ledger
//! accepted them.
//!
//! **Subsystem ID:** 18  
//! **Architecture:** Hexagonal (DDD + Ports/Adapters)
//!
//! ## Purpose
//!
//! - Validate namespaces and payloads before anything leaves the process
//! - Encode blobs into fixed-size shares and commit to them
//! - Assemble, price and sign a PayForBlobs transaction
//! - Surface typed events from the ledger's response
//! - Verify a committed result against a trusted results root
//!
//! ## Error Surface
//!
//! | Code | Meaning |
//! |------|---------|
//! | 11110 | Namespace id reserved or wrong length |
//! | 11111 | Namespace version unsupported |
//! | 11112 | Empty blob |
//! | 11113 | Share version unsupported |
//! | 11114 | Blob too large |
//! | 11116 | Fee below the gas-price floor |
//! | 11117 | Fee above the signer's balance |
//!
//! ## Module Structure
//!
//! ```text
//! qc-18-blob-submission/
//! ├── domain/          # Namespace, Blob, Submission, tx types, events, errors
//! ├── algorithms/      # Share encoding, Merkle commitments and proofs
//! ├── ports/           # API trait (inbound) + ledger/signer traits (outbound)
//! ├── application/     # Assembler, BlobSubmitter, InclusionVerifier
//! ├── adapters/        # Ed25519Signer, LocalLedger
//! └── config.rs        # SubmissionConfig, PollPolicy
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod adapters;
pub mod algorithms;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;

// Re-exports
pub use adapters::{Ed25519Signer, LocalLedger, Tamper};
pub use algorithms::{decode, encode, shares_needed, MerkleTree, SHARE_SIZE};
pub use application::{
    assemble, assemble_batches, estimate_gas, required_fee, verify_response, BatchRequest,
    BlobSubmitter, InclusionVerifier,
};
pub use config::{PollPolicy, SubmissionConfig};
pub use domain::{
    codes, emit_events, parse_events, validate_namespace, Address, Blob, BlobEntry, BlobError,
    BroadcastMode, ClientError, EncodedBlob, Fee, InclusionError, InclusionState, Namespace,
    PayForBlobEvent, Submission, SubmissionError, SubmissionResult, TxHash, TxResult,
    VerifiedResult,
};
pub use ports::{BlobSubmissionApi, Broadcaster, Signer, TrustedRootSource, TxQueryChannel};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
