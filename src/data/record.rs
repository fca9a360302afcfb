//! Media-type framing for stored records
//!
//! A stored record is a single opaque byte string: a one-byte media-type tag
//! followed by the raw payload. Backends never look inside. The tag is the
//! only piece of metadata the service persists, so an unknown leading byte on
//! read means the record is unusable.

use serde::{Deserialize, Serialize};

use super::error::CacheError;

/// Tag byte for JSON payloads
const TAG_JSON: u8 = 0x00;

/// Tag byte for XML payloads
const TAG_XML: u8 = 0x01;

/// Media type of a cached payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PayloadType {
    Json,
    Xml,
}

impl PayloadType {
    /// MIME type restored on the response
    pub fn content_type(&self) -> &'static str {
        match self {
            PayloadType::Json => "application/json",
            PayloadType::Xml => "application/xml",
        }
    }

    fn tag(&self) -> u8 {
        match self {
            PayloadType::Json => TAG_JSON,
            PayloadType::Xml => TAG_XML,
        }
    }
}

/// Frame a payload for storage: `tag || payload`.
pub fn frame(payload_type: PayloadType, payload: &[u8]) -> Vec<u8> {
    let mut framed = Vec::with_capacity(payload.len() + 1);
    framed.push(payload_type.tag());
    framed.extend_from_slice(payload);
    framed
}

/// Split a stored record back into its media type and payload bytes.
///
/// Records written without a known tag byte (or empty records) are rejected
/// as malformed rather than guessed at.
pub fn unframe(record: &[u8]) -> Result<(PayloadType, &[u8]), CacheError> {
    match record.first() {
        Some(&TAG_JSON) => Ok((PayloadType::Json, &record[1..])),
        Some(&TAG_XML) => Ok((PayloadType::Xml, &record[1..])),
        _ => Err(CacheError::MalformedRecord),
    }
}
