//! # PayForBlob Events
//!
//! One event per blob of an accepted submission, in submission order. Each
//! carries the signer and the exact payload length in bytes (not the share
//! footprint).
//!
//! The ledger stores events as string attributes. `PayForBlobEvent` is the
//! typed view; `to_raw` and `parse_events` convert between the two by
//! attribute name, never by position.

use serde::{Deserialize, Serialize};
use shared_types::Address;

use super::errors::EventParseError;
use super::entities::Submission;
use super::transaction::MsgPayForBlobs;

/// Event type tag.
pub const EVENT_TYPE_PAY_FOR_BLOB: &str = "payforblob";

/// Attribute holding the bech32 signer.
pub const ATTRIBUTE_SIGNER: &str = "signer";

/// Attribute holding the payload length in bytes.
pub const ATTRIBUTE_BLOB_SIZE: &str = "blob_size";

/// A single key/value attribute as stored by the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventAttribute {
    /// Attribute name.
    pub key: String,
    /// Attribute value, always a string on the ledger.
    pub value: String,
}

impl EventAttribute {
    /// Build an attribute from any string-like key and value.
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Untyped ledger event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawEvent {
    /// Event type tag, e.g. `payforblob`.
    pub kind: String,
    /// Attributes in emission order.
    pub attributes: Vec<EventAttribute>,
}

impl RawEvent {
    /// First attribute named `key`.
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|attr| attr.key == key)
            .map(|attr| attr.value.as_str())
    }
}

/// Typed `payforblob` event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayForBlobEvent {
    /// Account that paid for the blob.
    pub signer: Address,
    /// Payload length in bytes.
    pub blob_size: u32,
}

impl PayForBlobEvent {
    /// Render as the ledger's string attribute form.
    pub fn to_raw(&self) -> RawEvent {
        RawEvent {
            kind: EVENT_TYPE_PAY_FOR_BLOB.to_string(),
            attributes: vec![
                EventAttribute::new(ATTRIBUTE_SIGNER, self.signer.to_bech32()),
                EventAttribute::new(ATTRIBUTE_BLOB_SIZE, self.blob_size.to_string()),
            ],
        }
    }

    /// Parse a raw `payforblob` event. The caller filters by kind.
    pub fn from_raw(raw: &RawEvent) -> Result<Self, EventParseError> {
        let signer = raw
            .attribute(ATTRIBUTE_SIGNER)
            .ok_or_else(|| EventParseError::MissingAttribute {
                kind: raw.kind.clone(),
                key: ATTRIBUTE_SIGNER,
            })?;
        let size = raw
            .attribute(ATTRIBUTE_BLOB_SIZE)
            .ok_or_else(|| EventParseError::MissingAttribute {
                kind: raw.kind.clone(),
                key: ATTRIBUTE_BLOB_SIZE,
            })?;

        Ok(Self {
            signer: Address::from_bech32(signer)?,
            blob_size: size.parse().map_err(|_| EventParseError::InvalidBlobSize {
                value: size.to_string(),
            })?,
        })
    }
}

/// Events for an assembled submission.
pub fn emit_events(submission: &Submission) -> Vec<PayForBlobEvent> {
    let signer = *submission.signer();
    submission
        .blobs()
        .iter()
        .map(|blob| PayForBlobEvent {
            signer,
            blob_size: u32::try_from(blob.size()).unwrap_or(u32::MAX),
        })
        .collect()
}

/// Events for a message the ledger has executed.
pub fn emit_for_message(msg: &MsgPayForBlobs) -> Vec<PayForBlobEvent> {
    msg.blob_sizes
        .iter()
        .map(|&blob_size| PayForBlobEvent {
            signer: msg.signer,
            blob_size,
        })
        .collect()
}

/// Extract every `payforblob` event, in order, skipping other kinds.
pub fn parse_events(raw: &[RawEvent]) -> Result<Vec<PayForBlobEvent>, EventParseError> {
    raw.iter()
        .filter(|event| event.kind == EVENT_TYPE_PAY_FOR_BLOB)
        .map(PayForBlobEvent::from_raw)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signer() -> Address {
        Address::from_public_key(&[3u8; 32])
    }

    #[test]
    fn test_raw_form_uses_named_attributes() {
        let raw = PayForBlobEvent {
            signer: signer(),
            blob_size: 23,
        }
        .to_raw();

        assert_eq!(raw.kind, "payforblob");
        assert_eq!(raw.attribute("blob_size"), Some("23"));
        assert_eq!(raw.attribute("signer"), Some(signer().to_bech32().as_str()));
    }

    #[test]
    fn test_parse_ignores_attribute_order_and_other_events() {
        let reordered = RawEvent {
            kind: EVENT_TYPE_PAY_FOR_BLOB.to_string(),
            attributes: vec![
                EventAttribute::new("msg_index", "0"),
                EventAttribute::new(ATTRIBUTE_BLOB_SIZE, "7"),
                EventAttribute::new(ATTRIBUTE_SIGNER, signer().to_bech32()),
            ],
        };
        let transfer = RawEvent {
            kind: "transfer".to_string(),
            attributes: vec![EventAttribute::new("amount", "2utia")],
        };

        let parsed = parse_events(&[transfer, reordered]).unwrap();
        assert_eq!(
            parsed,
            vec![PayForBlobEvent {
                signer: signer(),
                blob_size: 7
            }]
        );
    }

    #[test]
    fn test_parse_rejects_missing_and_malformed_attributes() {
        let missing = RawEvent {
            kind: EVENT_TYPE_PAY_FOR_BLOB.to_string(),
            attributes: vec![EventAttribute::new(ATTRIBUTE_BLOB_SIZE, "7")],
        };
        assert!(matches!(
            parse_events(&[missing]),
            Err(EventParseError::MissingAttribute { key: "signer", .. })
        ));

        let bad_size = RawEvent {
            kind: EVENT_TYPE_PAY_FOR_BLOB.to_string(),
            attributes: vec![
                EventAttribute::new(ATTRIBUTE_SIGNER, signer().to_bech32()),
                EventAttribute::new(ATTRIBUTE_BLOB_SIZE, "-1"),
            ],
        };
        assert!(matches!(
            parse_events(&[bad_size]),
            Err(EventParseError::InvalidBlobSize { .. })
        ));

        let bad_signer = RawEvent {
            kind: EVENT_TYPE_PAY_FOR_BLOB.to_string(),
            attributes: vec![
                EventAttribute::new(ATTRIBUTE_SIGNER, "not-an-address"),
                EventAttribute::new(ATTRIBUTE_BLOB_SIZE, "1"),
            ],
        };
        assert!(matches!(
            parse_events(&[bad_signer]),
            Err(EventParseError::InvalidSigner(_))
        ));
    }
}
