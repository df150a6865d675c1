//! # Blobs
//!
//! Opaque payloads tagged with a namespace and the share layout version that
//! will carry them on chain.

use serde::{Deserialize, Serialize};
use shared_types::Hash;

use super::errors::BlobError;
use super::namespace::Namespace;

/// The only defined share layout.
pub const SHARE_VERSION_ZERO: u8 = 0;

/// Supported share versions.
pub const SUPPORTED_SHARE_VERSIONS: &[u8] = &[SHARE_VERSION_ZERO];

/// Check that `version` selects a known share layout.
pub fn validate_share_version(version: u32) -> Result<u8, BlobError> {
    u8::try_from(version)
        .ok()
        .filter(|v| SUPPORTED_SHARE_VERSIONS.contains(v))
        .ok_or(BlobError::UnsupportedShareVersion { version })
}

/// A namespaced payload.
///
/// The payload is never empty. The share version is carried as given and
/// checked by the encoder, which is the component that knows the layouts.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Blob {
    namespace: Namespace,
    data: Vec<u8>,
    share_version: u8,
}

impl Blob {
    /// Create a blob. Fails with `EmptyBlob` on an empty payload.
    pub fn new(namespace: Namespace, data: Vec<u8>, share_version: u8) -> Result<Self, BlobError> {
        if data.is_empty() {
            return Err(BlobError::EmptyBlob);
        }
        Ok(Self {
            namespace,
            data,
            share_version,
        })
    }

    /// Namespace the blob is published under.
    pub fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    /// Raw payload bytes.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Share layout version the blob is encoded with.
    pub fn share_version(&self) -> u8 {
        self.share_version
    }

    /// Payload length in bytes.
    pub fn size(&self) -> usize {
        self.data.len()
    }
}

impl std::fmt::Debug for Blob {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Blob")
            .field("namespace", &self.namespace)
            .field("size", &self.data.len())
            .field("share_version", &self.share_version)
            .finish()
    }
}

/// Raw caller input for one blob, before any validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlobEntry {
    /// Requested namespace version (only 0 is accepted).
    pub namespace_version: u32,
    /// Requested namespace id; 8 bytes for version 0.
    pub namespace_id: Vec<u8>,
    /// Payload bytes.
    pub data: Vec<u8>,
    /// Requested share version (only 0 is accepted).
    pub share_version: u32,
}

impl BlobEntry {
    /// Entry using share version 0.
    pub fn new(
        namespace_version: u32,
        namespace_id: impl Into<Vec<u8>>,
        data: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            namespace_version,
            namespace_id: namespace_id.into(),
            data: data.into(),
            share_version: u32::from(SHARE_VERSION_ZERO),
        }
    }

    /// Entry for an already validated namespace.
    pub fn for_namespace(namespace: &Namespace, data: impl Into<Vec<u8>>) -> Self {
        Self::new(u32::from(namespace.version()), namespace.id().to_vec(), data)
    }

    /// Override the share version.
    pub fn with_share_version(mut self, share_version: u32) -> Self {
        self.share_version = share_version;
        self
    }
}

/// The committed on-chain form of a blob.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedBlob {
    pub(crate) bytes: Vec<u8>,
    pub(crate) share_count: usize,
    pub(crate) commitment: Hash,
}

impl EncodedBlob {
    /// Concatenated shares.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Footprint in shares. This is what the ledger bills.
    pub fn share_count(&self) -> usize {
        self.share_count
    }

    /// Merkle root over the blob's shares.
    pub fn share_commitment(&self) -> Hash {
        self.commitment
    }

    /// Take the concatenated shares.
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_share_version_support() {
        assert_eq!(validate_share_version(0), Ok(SHARE_VERSION_ZERO));
        for version in [1, 2, 127, 255, 256, u32::MAX] {
            assert_eq!(
                validate_share_version(version),
                Err(BlobError::UnsupportedShareVersion { version })
            );
        }
    }

    #[test]
    fn test_empty_payload_rejected() {
        let ns = Namespace::v0(&[1, 2, 3, 4, 5, 6, 7, 8]).unwrap();
        assert_eq!(
            Blob::new(ns, Vec::new(), SHARE_VERSION_ZERO),
            Err(BlobError::EmptyBlob)
        );
    }

    #[test]
    fn test_entry_defaults_to_share_version_zero() {
        let entry = BlobEntry::new(0, vec![1u8; 8], vec![0xAA]);
        assert_eq!(entry.share_version, 0);
        assert_eq!(entry.with_share_version(1).share_version, 1);
    }
}
