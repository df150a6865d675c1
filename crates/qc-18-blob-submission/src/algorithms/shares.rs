//! # Share Encoding
//!
//! Splits a blob into fixed-size shares, the unit the ledger stores and
//! bills, and reassembles blobs from shares.
//!
//! ## Layout (share version 0)
//!
//! ```text
//! | namespace (9) | info (1) | sequence length u32 BE (4) | content (498) |
//! ```
//!
//! - `info = share_version << 1 | sequence_start`; the start bit is set only
//!   on the first share of a blob.
//! - Every share repeats the sequence length, so content capacity is the
//!   same for every share and `shares_needed(len) = ceil(len / 498)`.
//! - The last share is zero padded.

use tracing::debug;

use super::merkle;
use crate::domain::{
    validate_share_version, Blob, BlobError, EncodedBlob, Namespace, ShareDecodeError,
    NAMESPACE_SIZE,
};

/// Size of every share in bytes.
pub const SHARE_SIZE: usize = 512;

/// Bytes used by the info byte.
pub const SHARE_INFO_BYTES: usize = 1;

/// Bytes used by the big-endian sequence length.
pub const SEQUENCE_LEN_BYTES: usize = 4;

/// Bytes before the content section of a share.
pub const SHARE_PREFIX_SIZE: usize = NAMESPACE_SIZE + SHARE_INFO_BYTES + SEQUENCE_LEN_BYTES;

/// Payload bytes carried by one share.
pub const SHARE_CONTENT_SIZE: usize = SHARE_SIZE - SHARE_PREFIX_SIZE;

const SEQUENCE_START_BIT: u8 = 0x01;

/// Shares needed to carry `len` payload bytes.
pub fn shares_needed(len: usize) -> usize {
    len.div_ceil(SHARE_CONTENT_SIZE)
}

fn info_byte(share_version: u8, sequence_start: bool) -> u8 {
    (share_version << 1) | u8::from(sequence_start)
}

/// Encode a blob into its committed share form.
pub fn encode(blob: &Blob) -> Result<EncodedBlob, BlobError> {
    let share_version = validate_share_version(u32::from(blob.share_version()))?;

    let sequence_len = u32::try_from(blob.size()).map_err(|_| BlobError::BlobTooLarge {
        size: blob.size(),
        max: u32::MAX as usize,
    })?;

    let share_count = shares_needed(blob.size());
    let namespace = blob.namespace().to_bytes();
    let mut bytes = Vec::with_capacity(share_count * SHARE_SIZE);

    for (i, chunk) in blob.data().chunks(SHARE_CONTENT_SIZE).enumerate() {
        bytes.extend_from_slice(&namespace);
        bytes.push(info_byte(share_version, i == 0));
        bytes.extend_from_slice(&sequence_len.to_be_bytes());
        bytes.extend_from_slice(chunk);
        bytes.resize((i + 1) * SHARE_SIZE, 0);
    }

    let commitment = merkle::root_of(bytes.chunks_exact(SHARE_SIZE));

    debug!(
        "[qc-18] Encoded {} byte blob in {} into {} shares",
        blob.size(),
        blob.namespace(),
        share_count
    );

    Ok(EncodedBlob {
        bytes,
        share_count,
        commitment,
    })
}

/// Reassemble a blob from its shares.
///
/// Rejects anything `encode` would not have produced: mixed namespaces,
/// misplaced start flags, inconsistent lengths, dirty padding.
pub fn decode(bytes: &[u8]) -> Result<Blob, ShareDecodeError> {
    if bytes.is_empty() || bytes.len() % SHARE_SIZE != 0 {
        return Err(ShareDecodeError::InvalidLength(bytes.len()));
    }

    let mut namespace: Option<Namespace> = None;
    let mut share_version = 0u8;
    let mut declared_len = 0usize;
    let mut content = Vec::with_capacity(bytes.len());

    for (index, share) in bytes.chunks_exact(SHARE_SIZE).enumerate() {
        let (ns_bytes, rest) = share.split_at(NAMESPACE_SIZE);
        let info = rest[0];
        let mut len_bytes = [0u8; SEQUENCE_LEN_BYTES];
        len_bytes.copy_from_slice(&rest[SHARE_INFO_BYTES..SHARE_INFO_BYTES + SEQUENCE_LEN_BYTES]);
        let sequence_len = u32::from_be_bytes(len_bytes) as usize;

        let is_start = info & SEQUENCE_START_BIT == SEQUENCE_START_BIT;
        if is_start != (index == 0) {
            return Err(ShareDecodeError::SequenceStart { index });
        }

        let version = validate_share_version(u32::from(info >> 1))
            .map_err(|source| ShareDecodeError::ShareVersion { index, source })?;

        match namespace {
            None => {
                let ns = Namespace::from_bytes(ns_bytes)
                    .map_err(|source| ShareDecodeError::Namespace { index, source })?;
                namespace = Some(ns);
                share_version = version;
                declared_len = sequence_len;
            }
            Some(ns) => {
                if ns.to_bytes()[..] != *ns_bytes {
                    return Err(ShareDecodeError::NamespaceMismatch { index });
                }
                if version != share_version || sequence_len != declared_len {
                    return Err(ShareDecodeError::InconsistentPrefix { index });
                }
            }
        }

        content.extend_from_slice(&share[SHARE_PREFIX_SIZE..]);
    }

    let found = bytes.len() / SHARE_SIZE;
    let expected = shares_needed(declared_len);
    if expected != found {
        return Err(ShareDecodeError::SequenceLength {
            declared: declared_len,
            expected,
            found,
        });
    }

    if content[declared_len..].iter().any(|&b| b != 0) {
        return Err(ShareDecodeError::DirtyPadding);
    }
    content.truncate(declared_len);

    let namespace = namespace.ok_or(ShareDecodeError::InvalidLength(bytes.len()))?;
    Ok(Blob::new(namespace, content, share_version)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::SHARE_VERSION_ZERO;
    use proptest::prelude::*;

    fn namespace() -> Namespace {
        Namespace::v0(&[0x0A, 0x0B, 0x0C, 0x0D, 0x01, 0x02, 0x03, 0x04]).unwrap()
    }

    fn blob_of(len: usize) -> Blob {
        let data = (0..len).map(|i| (i % 251) as u8).collect();
        Blob::new(namespace(), data, SHARE_VERSION_ZERO).unwrap()
    }

    #[test]
    fn test_layout_constants() {
        assert_eq!(SHARE_PREFIX_SIZE, 14);
        assert_eq!(SHARE_CONTENT_SIZE, 498);
    }

    #[test]
    fn test_shares_needed_boundaries() {
        assert_eq!(shares_needed(0), 0);
        assert_eq!(shares_needed(1), 1);
        assert_eq!(shares_needed(SHARE_CONTENT_SIZE), 1);
        assert_eq!(shares_needed(SHARE_CONTENT_SIZE + 1), 2);
        assert_eq!(shares_needed(3 * SHARE_CONTENT_SIZE), 3);
    }

    #[test]
    fn test_small_blob_fits_one_share() {
        let payload = hex::decode("0204033704032c0b162109000908094d425837422c2116").unwrap();
        let blob = Blob::new(namespace(), payload, SHARE_VERSION_ZERO).unwrap();
        let encoded = encode(&blob).unwrap();

        assert_eq!(encoded.share_count(), 1);
        assert_eq!(encoded.bytes().len(), SHARE_SIZE);
        assert_eq!(&encoded.bytes()[..NAMESPACE_SIZE], &namespace().to_bytes());
        assert_eq!(encoded.bytes()[NAMESPACE_SIZE], 0x01);
        assert_eq!(&encoded.bytes()[NAMESPACE_SIZE + 1..SHARE_PREFIX_SIZE], &[0, 0, 0, 23]);
    }

    #[test]
    fn test_continuation_shares_clear_start_bit() {
        let encoded = encode(&blob_of(2 * SHARE_CONTENT_SIZE + 5)).unwrap();
        assert_eq!(encoded.share_count(), 3);
        for (i, share) in encoded.bytes().chunks(SHARE_SIZE).enumerate() {
            assert_eq!(share[NAMESPACE_SIZE] & SEQUENCE_START_BIT == 1, i == 0);
        }
    }

    #[test]
    fn test_unsupported_share_version_rejected() {
        let blob = Blob::new(namespace(), vec![1, 2, 3], 1).unwrap();
        assert_eq!(
            encode(&blob),
            Err(BlobError::UnsupportedShareVersion { version: 1 })
        );
    }

    #[test]
    fn test_commitment_depends_on_namespace() {
        let a = encode(&blob_of(100)).unwrap();
        let other_ns = Namespace::v0(&[9, 9, 9, 9, 9, 9, 9, 9]).unwrap();
        let b = encode(&Blob::new(other_ns, blob_of(100).data().to_vec(), 0).unwrap()).unwrap();
        assert_ne!(a.share_commitment(), b.share_commitment());
    }

    #[test]
    fn test_decode_rejects_truncated_input() {
        let encoded = encode(&blob_of(SHARE_CONTENT_SIZE + 1)).unwrap();
        assert!(matches!(
            decode(&encoded.bytes()[..SHARE_SIZE]),
            Err(ShareDecodeError::SequenceLength { expected: 2, found: 1, .. })
        ));
        assert!(matches!(
            decode(&encoded.bytes()[..SHARE_SIZE + 10]),
            Err(ShareDecodeError::InvalidLength(_))
        ));
        assert!(matches!(decode(&[]), Err(ShareDecodeError::InvalidLength(0))));
    }

    #[test]
    fn test_decode_rejects_mixed_namespaces() {
        let mut bytes = encode(&blob_of(SHARE_CONTENT_SIZE + 1)).unwrap().into_bytes();
        bytes[SHARE_SIZE + NAMESPACE_SIZE - 1] ^= 0x01;
        assert_eq!(
            decode(&bytes),
            Err(ShareDecodeError::NamespaceMismatch { index: 1 })
        );
    }

    #[test]
    fn test_decode_rejects_dirty_padding() {
        let mut bytes = encode(&blob_of(10)).unwrap().into_bytes();
        bytes[SHARE_SIZE - 1] = 0xFF;
        assert_eq!(decode(&bytes), Err(ShareDecodeError::DirtyPadding));
    }

    #[test]
    fn test_decode_rejects_missing_start_flag() {
        let mut bytes = encode(&blob_of(10)).unwrap().into_bytes();
        bytes[NAMESPACE_SIZE] = 0x00;
        assert_eq!(
            decode(&bytes),
            Err(ShareDecodeError::SequenceStart { index: 0 })
        );
    }

    #[test]
    fn test_decode_rejects_disagreeing_sequence_length() {
        let mut bytes = encode(&blob_of(2 * SHARE_CONTENT_SIZE + 1)).unwrap().into_bytes();
        // Last byte of the third share's sequence length.
        bytes[2 * SHARE_SIZE + SHARE_PREFIX_SIZE - 1] ^= 0x01;
        assert_eq!(
            decode(&bytes),
            Err(ShareDecodeError::InconsistentPrefix { index: 2 })
        );
    }

    proptest! {
        #[test]
        fn prop_share_count_and_round_trip(
            data in proptest::collection::vec(any::<u8>(), 1..3000)
        ) {
            let blob = Blob::new(namespace(), data.clone(), SHARE_VERSION_ZERO).unwrap();
            let encoded = encode(&blob).unwrap();

            prop_assert_eq!(encoded.share_count(), data.len().div_ceil(SHARE_CONTENT_SIZE));
            prop_assert_eq!(encoded.bytes().len(), encoded.share_count() * SHARE_SIZE);

            let decoded = decode(encoded.bytes()).unwrap();
            prop_assert_eq!(decoded.data(), &data[..]);
            prop_assert_eq!(decoded.share_version(), SHARE_VERSION_ZERO);
            prop_assert_eq!(decoded.namespace(), blob.namespace());
        }
    }
}
