//! # Core Ledger Entities
//!
//! Primitive types shared by the blob submission subsystem and the ledger
//! collaborators it talks to.
//!
//! ## Clusters
//!
//! - **Hashing**: `Hash`, `TxHash`
//! - **Accounts**: `Address` (bech32 rendered), `Fee`

use std::fmt;
use std::str::FromStr;

use bech32::{Bech32, Hrp};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::errors::{AddressError, HashParseError};

/// A 32-byte SHA-256 digest.
pub type Hash = [u8; 32];

/// Length of an account address in bytes.
pub const ADDRESS_LEN: usize = 20;

/// Human readable part used when rendering account addresses.
pub const ACCOUNT_ADDRESS_PREFIX: &str = "celestia";

const ACCOUNT_HRP: Hrp = Hrp::parse_unchecked(ACCOUNT_ADDRESS_PREFIX);

/// Compute SHA-256 over arbitrary bytes.
pub fn sha256(data: &[u8]) -> Hash {
    Sha256::digest(data).into()
}

// =============================================================================
// TRANSACTION IDENTIFIERS
// =============================================================================

/// Content hash identifying a broadcast transaction.
///
/// Rendered as upper-case hex, the way block explorers and node RPCs print
/// transaction hashes.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
pub struct TxHash(pub Hash);

impl TxHash {
    /// Hash the canonical transaction bytes.
    pub fn digest(tx_bytes: &[u8]) -> Self {
        Self(sha256(tx_bytes))
    }

    /// Raw digest bytes.
    pub fn as_bytes(&self) -> &Hash {
        &self.0
    }

    /// Upper-case hex encoding.
    pub fn to_hex(&self) -> String {
        hex::encode_upper(self.0)
    }

    /// Parse a hex encoded hash (either case).
    pub fn from_hex(s: &str) -> Result<Self, HashParseError> {
        let bytes = hex::decode(s).map_err(|e| HashParseError::InvalidHex(e.to_string()))?;
        let hash: Hash = bytes
            .as_slice()
            .try_into()
            .map_err(|_| HashParseError::InvalidLength(bytes.len()))?;
        Ok(Self(hash))
    }
}

impl fmt::Display for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TxHash({})", &self.to_hex()[..16])
    }
}

impl FromStr for TxHash {
    type Err = HashParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

// =============================================================================
// ACCOUNTS
// =============================================================================

/// A 20-byte account address derived from the signer's public key.
///
/// The textual form is bech32 with the `celestia` prefix.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Address([u8; ADDRESS_LEN]);

impl Address {
    /// Wrap raw address bytes.
    pub fn from_bytes(bytes: [u8; ADDRESS_LEN]) -> Self {
        Self(bytes)
    }

    /// Derive the address of an Ed25519 public key: first 20 bytes of
    /// SHA-256(public_key).
    pub fn from_public_key(public_key: &[u8; 32]) -> Self {
        let digest = sha256(public_key);
        let mut bytes = [0u8; ADDRESS_LEN];
        bytes.copy_from_slice(&digest[..ADDRESS_LEN]);
        Self(bytes)
    }

    /// Raw address bytes.
    pub fn as_bytes(&self) -> &[u8; ADDRESS_LEN] {
        &self.0
    }

    /// Bech32 encoding with the account prefix.
    pub fn to_bech32(&self) -> String {
        // 20 bytes under a static hrp is always within bech32 length limits.
        bech32::encode::<Bech32>(ACCOUNT_HRP, &self.0).unwrap_or_default()
    }

    /// Parse a bech32 address, rejecting foreign prefixes and bad lengths.
    pub fn from_bech32(s: &str) -> Result<Self, AddressError> {
        let (hrp, data) = bech32::decode(s).map_err(|e| AddressError::Bech32(e.to_string()))?;

        if hrp != ACCOUNT_HRP {
            return Err(AddressError::WrongPrefix {
                expected: ACCOUNT_ADDRESS_PREFIX.to_string(),
                got: hrp.to_string(),
            });
        }

        let bytes: [u8; ADDRESS_LEN] = data
            .as_slice()
            .try_into()
            .map_err(|_| AddressError::InvalidLength(data.len()))?;

        Ok(Self(bytes))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_bech32())
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self.to_bech32())
    }
}

impl FromStr for Address {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_bech32(s)
    }
}

/// Fee offered by a transaction, in the smallest unit of `denom`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Fee {
    /// Amount in base units.
    pub amount: u64,
    /// Denomination (e.g. `utia`).
    pub denom: String,
}

impl Fee {
    /// Create a fee.
    pub fn new(amount: u64, denom: impl Into<String>) -> Self {
        Self {
            amount,
            denom: denom.into(),
        }
    }
}

impl fmt::Display for Fee {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.amount, self.denom)
    }
}
