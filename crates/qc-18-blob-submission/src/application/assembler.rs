//! # Submission Assembler
//!
//! Turns raw caller entries into a validated `Submission`.
//!
//! ## Per-entry pipeline
//!
//! 1. Namespace: version supported, id length matches, id not reserved.
//! 2. Payload: non-empty, within `max_blob_size`.
//! 3. Encoding: share version supported; share count and commitment.
//!
//! The first failing entry aborts the whole batch with its index. Nothing
//! is partially assembled.
//!
//! ## Fee
//!
//! `gas = fixed_pfb_gas + total_shares * SHARE_SIZE * gas_per_blob_byte`,
//! `required = ceil(gas * min_gas_price)`. The offered fee must be in the
//! configured denomination, at least `required`, and within the signer's
//! balance.

use rayon::prelude::*;
use tracing::{debug, warn};

use crate::algorithms::shares::{self, SHARE_SIZE};
use crate::config::SubmissionConfig;
use crate::domain::{
    Blob, BlobEntry, BlobError, EncodedBlob, Fee, Namespace, SignerAccount, Submission,
    SubmissionError,
};

/// Below this many batches, `assemble_batches` stays on the calling thread.
pub const PARALLEL_THRESHOLD: usize = 4;

/// One independent batch for `assemble_batches`.
#[derive(Debug, Clone)]
pub struct BatchRequest {
    /// Paying account.
    pub signer: SignerAccount,
    /// Fee offered for the batch.
    pub fee: Fee,
    /// Raw blob entries.
    pub entries: Vec<BlobEntry>,
}

/// Gas a PayForBlobs message spanning `total_shares` shares will consume.
pub fn estimate_gas(total_shares: usize, config: &SubmissionConfig) -> u64 {
    let footprint = (total_shares as u64).saturating_mul(SHARE_SIZE as u64);
    config
        .fixed_pfb_gas
        .saturating_add(footprint.saturating_mul(config.gas_per_blob_byte))
}

/// Smallest acceptable fee for `gas`.
pub fn required_fee(gas: u64, config: &SubmissionConfig) -> u64 {
    // f64 -> u64 casts saturate.
    (gas as f64 * config.min_gas_price).ceil() as u64
}

/// Validate and encode a single entry.
pub fn prepare_entry(
    entry: &BlobEntry,
    config: &SubmissionConfig,
) -> Result<(Blob, EncodedBlob), BlobError> {
    let namespace = Namespace::new(entry.namespace_version, &entry.namespace_id)?;

    let share_version =
        u8::try_from(entry.share_version).map_err(|_| BlobError::UnsupportedShareVersion {
            version: entry.share_version,
        })?;

    let blob = Blob::new(namespace, entry.data.clone(), share_version)?;

    if blob.size() > config.max_blob_size {
        return Err(BlobError::BlobTooLarge {
            size: blob.size(),
            max: config.max_blob_size,
        });
    }

    let encoded = shares::encode(&blob)?;
    Ok((blob, encoded))
}

/// Validate and encode every entry in order, stopping at the first failure.
pub fn prepare_blobs(
    entries: &[BlobEntry],
    config: &SubmissionConfig,
) -> Result<(Vec<Blob>, Vec<EncodedBlob>), SubmissionError> {
    if entries.is_empty() {
        return Err(SubmissionError::EmptySubmission);
    }

    let mut blobs = Vec::with_capacity(entries.len());
    let mut encoded = Vec::with_capacity(entries.len());

    for (index, entry) in entries.iter().enumerate() {
        let (blob, enc) = prepare_entry(entry, config).map_err(|source| {
            debug!("[qc-18] Entry {} rejected: {}", index, source);
            SubmissionError::InvalidEntry { index, source }
        })?;
        blobs.push(blob);
        encoded.push(enc);
    }

    Ok((blobs, encoded))
}

/// Fee checks that need no account state: denomination and amount.
///
/// Returns the required fee on success.
pub fn check_fee_offer(
    fee: &Fee,
    gas: u64,
    config: &SubmissionConfig,
) -> Result<u64, SubmissionError> {
    if fee.denom != config.fee_denom {
        return Err(SubmissionError::WrongFeeDenom {
            expected: config.fee_denom.clone(),
            got: fee.denom.clone(),
        });
    }

    let required = required_fee(gas, config);
    if fee.amount < required {
        return Err(SubmissionError::InsufficientFee {
            offered: fee.amount,
            required,
        });
    }

    Ok(required)
}

/// The signer must be able to pay the offered fee.
pub fn check_balance(signer: &SignerAccount, fee: &Fee) -> Result<(), SubmissionError> {
    if fee.amount > signer.balance {
        return Err(SubmissionError::InsufficientBalance {
            balance: signer.balance,
            fee: fee.amount,
        });
    }
    Ok(())
}

/// Check an offered fee against the gas estimate and the signer's balance.
pub fn check_fee(
    signer: &SignerAccount,
    fee: &Fee,
    gas: u64,
    config: &SubmissionConfig,
) -> Result<u64, SubmissionError> {
    let required = check_fee_offer(fee, gas, config)?;
    check_balance(signer, fee)?;
    Ok(required)
}

/// Price already prepared blobs and seal them into a `Submission`.
pub fn finalize(
    signer: &SignerAccount,
    fee: &Fee,
    blobs: Vec<Blob>,
    encoded: Vec<EncodedBlob>,
    config: &SubmissionConfig,
) -> Result<Submission, SubmissionError> {
    let total_shares: usize = encoded.iter().map(EncodedBlob::share_count).sum();
    let gas = estimate_gas(total_shares, config);

    let required = check_fee(signer, fee, gas, config).inspect_err(|e| {
        warn!("[qc-18] Fee check failed for {}: {}", signer.address, e);
    })?;

    debug!(
        "[qc-18] Assembled {} blobs ({} shares, gas {}, fee {} >= {})",
        blobs.len(),
        total_shares,
        gas,
        fee,
        required
    );

    Ok(Submission::new(
        signer.address,
        blobs,
        encoded,
        gas,
        fee.clone(),
    ))
}

/// Build a `Submission` from raw entries.
pub fn assemble(
    signer: &SignerAccount,
    fee: &Fee,
    entries: &[BlobEntry],
    config: &SubmissionConfig,
) -> Result<Submission, SubmissionError> {
    let (blobs, encoded) = prepare_blobs(entries, config)?;
    finalize(signer, fee, blobs, encoded, config)
}

/// Assemble independent batches, in parallel when there are enough of them.
///
/// Results are returned in input order; one batch failing does not affect
/// the others.
pub fn assemble_batches(
    requests: &[BatchRequest],
    config: &SubmissionConfig,
) -> Vec<Result<Submission, SubmissionError>> {
    let run = |req: &BatchRequest| assemble(&req.signer, &req.fee, &req.entries, config);

    if requests.len() < PARALLEL_THRESHOLD {
        requests.iter().map(run).collect()
    } else {
        requests.par_iter().map(run).collect()
    }
}
