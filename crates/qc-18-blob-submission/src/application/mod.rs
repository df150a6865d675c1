//! # Application Module
//!
//! Application services orchestrating the domain and outbound ports.

pub mod assembler;
pub mod client;
pub mod verifier;

pub use assembler::{
    assemble, assemble_batches, check_fee, estimate_gas, prepare_blobs, required_fee,
    BatchRequest,
};
pub use client::BlobSubmitter;
pub use verifier::{verify_response, InclusionVerifier};
