//! # Namespaces
//!
//! A namespace tags blob data so that independent applications can share a
//! block without reading each other's data. It is a version byte followed by
//! an id whose length is fixed by the version.
//!
//! ## Invariants
//!
//! - Only version 0 is defined; its id is exactly 8 bytes.
//! - Ids at or below `MAX_RESERVED_NAMESPACE_ID`, the tail-padding id and the
//!   parity-shares id are reserved for the protocol and never valid for
//!   user blobs.
//! - A constructed `Namespace` has passed validation and cannot be mutated.

use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::errors::{BlobError, NamespaceIdFault};

/// The only defined namespace version.
pub const NAMESPACE_VERSION_ZERO: u8 = 0;

/// Supported namespace versions.
pub const SUPPORTED_NAMESPACE_VERSIONS: &[u8] = &[NAMESPACE_VERSION_ZERO];

/// Bytes used by the version prefix.
pub const NAMESPACE_VERSION_SIZE: usize = 1;

/// Id length for version 0.
pub const NAMESPACE_ID_SIZE: usize = 8;

/// Serialized namespace length (version + id).
pub const NAMESPACE_SIZE: usize = NAMESPACE_VERSION_SIZE + NAMESPACE_ID_SIZE;

/// Highest id of the reserved low range (tx, ISR, evidence, PFB namespaces).
pub const MAX_RESERVED_NAMESPACE_ID: [u8; NAMESPACE_ID_SIZE] = [0, 0, 0, 0, 0, 0, 0, 0xFF];

/// Namespace of the padding shares that fill the end of a square.
pub const TAIL_PADDING_NAMESPACE_ID: [u8; NAMESPACE_ID_SIZE] =
    [0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFE];

/// Namespace of erasure-coded parity shares.
pub const PARITY_SHARES_NAMESPACE_ID: [u8; NAMESPACE_ID_SIZE] = [0xFF; NAMESPACE_ID_SIZE];

/// Id length required by `version`, or `None` if the version is unknown.
pub fn id_size_for_version(version: u32) -> Option<usize> {
    match version {
        v if v == u32::from(NAMESPACE_VERSION_ZERO) => Some(NAMESPACE_ID_SIZE),
        _ => None,
    }
}

/// Whether a version 0 id is reserved for protocol use.
pub fn is_reserved_id(id: &[u8]) -> bool {
    id <= &MAX_RESERVED_NAMESPACE_ID[..]
        || id == TAIL_PADDING_NAMESPACE_ID
        || id == PARITY_SHARES_NAMESPACE_ID
}

/// Validate a raw (version, id) pair.
///
/// Total over all inputs: never panics, always returns a typed result.
pub fn validate_namespace(version: u32, id: &[u8]) -> Result<(), BlobError> {
    let expected = id_size_for_version(version)
        .ok_or(BlobError::InvalidNamespaceVersion { version })?;

    if id.len() != expected {
        return Err(BlobError::InvalidNamespaceId {
            fault: NamespaceIdFault::WrongLength {
                expected,
                got: id.len(),
            },
        });
    }

    if is_reserved_id(id) {
        return Err(BlobError::InvalidNamespaceId {
            fault: NamespaceIdFault::Reserved,
        });
    }

    Ok(())
}

/// A validated blob namespace.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Namespace {
    version: u8,
    id: [u8; NAMESPACE_ID_SIZE],
}

impl Namespace {
    /// Validate and construct.
    pub fn new(version: u32, id: &[u8]) -> Result<Self, BlobError> {
        validate_namespace(version, id)?;

        // Both conversions are guaranteed by validate_namespace.
        let version = u8::try_from(version)
            .map_err(|_| BlobError::InvalidNamespaceVersion { version })?;
        let id: [u8; NAMESPACE_ID_SIZE] =
            id.try_into().map_err(|_| BlobError::InvalidNamespaceId {
                fault: NamespaceIdFault::WrongLength {
                    expected: NAMESPACE_ID_SIZE,
                    got: id.len(),
                },
            })?;

        Ok(Self { version, id })
    }

    /// Version 0 namespace from an 8-byte id.
    pub fn v0(id: &[u8]) -> Result<Self, BlobError> {
        Self::new(u32::from(NAMESPACE_VERSION_ZERO), id)
    }

    /// Draw a random version 0 namespace outside every reserved range.
    pub fn random_blob_namespace<R: Rng + ?Sized>(rng: &mut R) -> Self {
        loop {
            let mut id = [0u8; NAMESPACE_ID_SIZE];
            rng.fill(&mut id);
            if !is_reserved_id(&id) {
                return Self {
                    version: NAMESPACE_VERSION_ZERO,
                    id,
                };
            }
        }
    }

    /// Parse the serialized `version || id` form.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, BlobError> {
        match bytes.split_first() {
            Some((version, id)) => Self::new(u32::from(*version), id),
            None => Err(BlobError::InvalidNamespaceId {
                fault: NamespaceIdFault::WrongLength {
                    expected: NAMESPACE_SIZE,
                    got: 0,
                },
            }),
        }
    }

    /// Serialized `version || id` form.
    pub fn to_bytes(&self) -> [u8; NAMESPACE_SIZE] {
        let mut out = [0u8; NAMESPACE_SIZE];
        out[0] = self.version;
        out[NAMESPACE_VERSION_SIZE..].copy_from_slice(&self.id);
        out
    }

    /// Re-run validation. Used on values that arrived through deserialization.
    pub fn validate(&self) -> Result<(), BlobError> {
        validate_namespace(u32::from(self.version), &self.id)
    }

    /// Namespace version byte.
    pub fn version(&self) -> u8 {
        self.version
    }

    /// Namespace id bytes.
    pub fn id(&self) -> &[u8; NAMESPACE_ID_SIZE] {
        &self.id
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.to_bytes()))
    }
}

impl fmt::Debug for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Namespace(v{}:{})", self.version, hex::encode(self.id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn user_id() -> [u8; NAMESPACE_ID_SIZE] {
        [0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08]
    }

    #[test]
    fn test_only_schema_length_passes_for_supported_versions() {
        for &version in SUPPORTED_NAMESPACE_VERSIONS {
            let schema_len = id_size_for_version(u32::from(version)).unwrap();
            for len in 0..=64 {
                let id = vec![0xAB; len];
                let result = validate_namespace(u32::from(version), &id);
                if len == schema_len {
                    assert!(result.is_ok(), "length {} should pass", len);
                } else {
                    assert!(
                        matches!(
                            result,
                            Err(BlobError::InvalidNamespaceId {
                                fault: NamespaceIdFault::WrongLength { .. }
                            })
                        ),
                        "length {} should fail",
                        len
                    );
                }
            }
        }
    }

    #[test]
    fn test_unsupported_versions_fail_regardless_of_id() {
        for version in (1..=255u32).chain([256, u32::MAX]) {
            for id in [&user_id()[..], &[][..], &[0xFF; 32][..]] {
                assert_eq!(
                    validate_namespace(version, id),
                    Err(BlobError::InvalidNamespaceVersion { version })
                );
            }
        }
    }

    #[test]
    fn test_reserved_ranges_rejected() {
        let reserved = [
            [0u8; NAMESPACE_ID_SIZE],
            [0, 0, 0, 0, 0, 0, 0, 0x01],
            [0, 0, 0, 0, 0, 0, 0, 0x04],
            MAX_RESERVED_NAMESPACE_ID,
            TAIL_PADDING_NAMESPACE_ID,
            PARITY_SHARES_NAMESPACE_ID,
        ];
        for id in reserved {
            assert_eq!(
                Namespace::v0(&id),
                Err(BlobError::InvalidNamespaceId {
                    fault: NamespaceIdFault::Reserved
                }),
                "{:?} should be reserved",
                id
            );
        }
    }

    #[test]
    fn test_first_id_above_reserved_range_is_valid() {
        assert!(Namespace::v0(&[0, 0, 0, 0, 0, 0, 0x01, 0x00]).is_ok());
        assert!(Namespace::v0(&[0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFD]).is_ok());
    }

    #[test]
    fn test_random_namespaces_are_valid() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(18);
        for _ in 0..1000 {
            let ns = Namespace::random_blob_namespace(&mut rng);
            assert!(ns.validate().is_ok());
            assert_eq!(ns.version(), NAMESPACE_VERSION_ZERO);
        }
    }

    #[test]
    fn test_bytes_round_trip() {
        let ns = Namespace::v0(&user_id()).unwrap();
        let bytes = ns.to_bytes();
        assert_eq!(bytes.len(), NAMESPACE_SIZE);
        assert_eq!(bytes[0], NAMESPACE_VERSION_ZERO);
        assert_eq!(Namespace::from_bytes(&bytes).unwrap(), ns);
    }

    #[test]
    fn test_from_bytes_is_total() {
        assert!(Namespace::from_bytes(&[]).is_err());
        assert!(Namespace::from_bytes(&[0]).is_err());
        assert!(Namespace::from_bytes(&[1, 1, 2, 3, 4, 5, 6, 7, 8]).is_err());
    }
}
