//! # Blob Submission Configuration
//!
//! Gas schedule, fee policy and limits shared by the assembler and the
//! ledger adapter, plus the caller-side polling policy.

use std::env;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Gas charged per byte of share footprint.
pub const DEFAULT_GAS_PER_BLOB_BYTE: u64 = 8;

/// Flat gas charged for a PayForBlobs message.
pub const DEFAULT_FIXED_PFB_GAS: u64 = 75_000;

/// Fee denomination accepted by the ledger.
pub const DEFAULT_FEE_DENOM: &str = "utia";

/// Largest accepted payload.
pub const DEFAULT_MAX_BLOB_SIZE: usize = 2 * 1024 * 1024;

/// Submission configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SubmissionConfig {
    /// Minimum price per unit of gas, in `fee_denom`.
    pub min_gas_price: f64,

    /// Gas per byte of share footprint (share count * share size).
    pub gas_per_blob_byte: u64,

    /// Flat gas per PayForBlobs message.
    pub fixed_pfb_gas: u64,

    /// Largest payload accepted per blob, in bytes.
    pub max_blob_size: usize,

    /// Accepted fee denomination.
    pub fee_denom: String,

    /// Built results trees the local ledger caches for proof serving. The
    /// results themselves are always retained; evicted trees are rebuilt.
    pub max_cached_trees: usize,
}

impl Default for SubmissionConfig {
    fn default() -> Self {
        Self {
            min_gas_price: 0.0,
            gas_per_blob_byte: DEFAULT_GAS_PER_BLOB_BYTE,
            fixed_pfb_gas: DEFAULT_FIXED_PFB_GAS,
            max_blob_size: DEFAULT_MAX_BLOB_SIZE,
            fee_denom: DEFAULT_FEE_DENOM.to_string(),
            max_cached_trees: 256,
        }
    }
}

impl SubmissionConfig {
    /// Create a config for testing: a nonzero gas price so fee checks bite,
    /// and a small tree cache.
    pub fn for_testing() -> Self {
        Self {
            min_gas_price: 0.002,
            max_blob_size: 64 * 1024,
            max_cached_trees: 8,
            ..Self::default()
        }
    }

    /// Load from environment, falling back to defaults.
    ///
    /// # Environment Variables
    ///
    /// - `QC18_MIN_GAS_PRICE` (default: 0.0)
    /// - `QC18_GAS_PER_BLOB_BYTE` (default: 8)
    /// - `QC18_FIXED_PFB_GAS` (default: 75000)
    /// - `QC18_MAX_BLOB_SIZE` (default: 2 MiB)
    /// - `QC18_FEE_DENOM` (default: utia)
    /// - `QC18_MAX_CACHED_TREES` (default: 256)
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            min_gas_price: parse_var("QC18_MIN_GAS_PRICE")
                .filter(|p: &f64| p.is_finite() && *p >= 0.0)
                .unwrap_or(defaults.min_gas_price),

            gas_per_blob_byte: parse_var("QC18_GAS_PER_BLOB_BYTE")
                .unwrap_or(defaults.gas_per_blob_byte),

            fixed_pfb_gas: parse_var("QC18_FIXED_PFB_GAS").unwrap_or(defaults.fixed_pfb_gas),

            max_blob_size: parse_var("QC18_MAX_BLOB_SIZE").unwrap_or(defaults.max_blob_size),

            fee_denom: env::var("QC18_FEE_DENOM").unwrap_or(defaults.fee_denom),

            max_cached_trees: parse_var("QC18_MAX_CACHED_TREES")
                .unwrap_or(defaults.max_cached_trees),
        }
    }
}

fn parse_var<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

/// Caller-directed retry policy for waiting on inclusion.
///
/// Only `Pending` and `NotFound` are retried. Backoff doubles from
/// `initial_backoff` up to `max_backoff`; the whole wait is bounded by
/// `timeout`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollPolicy {
    /// Queries before giving up.
    pub max_attempts: u32,
    /// Delay after the first unsuccessful query.
    pub initial_backoff: Duration,
    /// Cap on the doubled delay.
    pub max_backoff: Duration,
    /// Bound on the whole wait.
    pub timeout: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 30,
            initial_backoff: Duration::from_millis(250),
            max_backoff: Duration::from_secs(5),
            timeout: Duration::from_secs(60),
        }
    }
}

impl PollPolicy {
    /// Short delays for tests.
    pub fn for_testing() -> Self {
        Self {
            max_attempts: 10,
            initial_backoff: Duration::from_millis(10),
            max_backoff: Duration::from_millis(100),
            timeout: Duration::from_secs(5),
        }
    }

    /// Delay before retry number `attempt` (zero based).
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt.min(31)).unwrap_or(u32::MAX);
        self.initial_backoff
            .checked_mul(factor)
            .map_or(self.max_backoff, |d| d.min(self.max_backoff))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SubmissionConfig::default();
        assert_eq!(config.gas_per_blob_byte, 8);
        assert_eq!(config.fixed_pfb_gas, 75_000);
        assert_eq!(config.fee_denom, "utia");
        assert_eq!(config.min_gas_price, 0.0);
    }

    #[test]
    fn test_testing_config() {
        let config = SubmissionConfig::for_testing();
        assert!(config.min_gas_price > 0.0);
        assert_eq!(config.fee_denom, DEFAULT_FEE_DENOM);
    }

    #[test]
    fn test_backoff_doubles_and_caps() {
        let policy = PollPolicy {
            max_attempts: 10,
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_millis(700),
            timeout: Duration::from_secs(1),
        };
        assert_eq!(policy.backoff(0), Duration::from_millis(100));
        assert_eq!(policy.backoff(1), Duration::from_millis(200));
        assert_eq!(policy.backoff(2), Duration::from_millis(400));
        assert_eq!(policy.backoff(3), Duration::from_millis(700));
        assert_eq!(policy.backoff(u32::MAX), Duration::from_millis(700));
    }
}
