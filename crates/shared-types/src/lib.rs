//! # Shared Types Crate
//!
//! Ledger primitives shared between the blob submission core and the
//! collaborators it is wired to (signers, broadcasters, query channels).
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: hashes, addresses and fees are defined once.
//! - **Textual Forms Are Canonical**: `TxHash` renders as upper-case hex and
//!   `Address` as bech32, and both parse back losslessly.

pub mod entities;
pub mod errors;

pub use entities::*;
pub use errors::*;
