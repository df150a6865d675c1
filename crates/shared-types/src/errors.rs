//! # Error Types
//!
//! Parse errors for the shared primitives.

use thiserror::Error;

/// Errors produced while parsing a bech32 account address.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressError {
    /// Not valid bech32 (bad charset, checksum or structure).
    #[error("Invalid bech32 address: {0}")]
    Bech32(String),

    /// Valid bech32 under a different human readable part.
    #[error("Unexpected address prefix: expected {expected}, got {got}")]
    WrongPrefix { expected: String, got: String },

    /// Decoded payload is not 20 bytes.
    #[error("Invalid address length: {0} bytes (expected 20)")]
    InvalidLength(usize),
}

/// Errors produced while parsing a hex encoded hash.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HashParseError {
    /// Not hex.
    #[error("Invalid hex: {0}")]
    InvalidHex(String),

    /// Decoded length is not 32 bytes.
    #[error("Invalid hash length: {0} bytes (expected 32)")]
    InvalidLength(usize),
}
