//! # Adapters
//!
//! Concrete implementations of the outbound ports.
//!
//! - `local_signer`: in-memory Ed25519 signer
//! - `local_ledger`: in-process ledger serving broadcast, query and
//!   trusted-root ports

pub mod local_signer;
pub mod local_ledger;

pub use local_signer::Ed25519Signer;
pub use local_ledger::{CommittedBlock, LocalLedger, Tamper};
