//! URL query state codec - maps the three buffers to and from the
//! address-bar query string.
//!
//! Buffer contents go through an unpadded URL-safe base64 transform, so
//! the encoded value is byte-preserving and already within the query
//! alphabet. Decoding is tolerant per slot: a missing or malformed
//! parameter restores as an empty buffer rather than blocking page load.

use crate::buffers::{BufferKind, Buffers};
use anyhow::{anyhow, Result};
use base64::alphabet;
use base64::engine::{DecodePaddingMode, Engine, GeneralPurpose, GeneralPurposeConfig};

/// Query-safe transform: URL-safe alphabet, no padding, padding-agnostic
/// decode so hand-edited links still restore.
const QUERY_B64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new()
        .with_encode_padding(false)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Legacy links were minted with `btoa` (standard alphabet, padded).
const LEGACY_B64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Encode all three buffers into a `html=..&css=..&js=..` query string.
///
/// Always emits all three parameters so `decode(encode(b)) == b` holds
/// for empty buffers too. Filenames are session-local and not persisted.
pub fn encode(buffers: &Buffers) -> String {
    let mut query = url::form_urlencoded::Serializer::new(String::new());
    for kind in BufferKind::ALL {
        query.append_pair(
            kind.query_param(),
            &QUERY_B64.encode(buffers.get(kind).content.as_bytes()),
        );
    }
    query.finish()
}

/// Decode a query string back into buffers.
///
/// Unknown parameters are ignored; a missing or malformed parameter
/// yields an empty buffer for that slot. This never fails: the codec
/// must not prevent the page from loading.
pub fn decode(query: &str) -> Buffers {
    let query = query.strip_prefix('?').unwrap_or(query);
    let mut buffers = Buffers::default();
    for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
        let kind = match key.as_ref() {
            "html" => BufferKind::Markup,
            "css" => BufferKind::Style,
            "js" => BufferKind::Script,
            _ => continue,
        };
        buffers.get_mut(kind).content = decode_component(&value).unwrap_or_default();
    }
    buffers
}

/// Strict per-slot transform: errors instead of corrupting data.
///
/// `decode` swallows these errors into empty buffers; callers that need
/// to distinguish "absent" from "broken" can use this directly.
pub fn decode_component(value: &str) -> Result<String> {
    // Query parsing turns '+' into a space before the value gets here,
    // so legacy standard-alphabet payloads arrive with spaces where
    // their '+' bytes were.
    let bytes = QUERY_B64
        .decode(value)
        .or_else(|_| LEGACY_B64.decode(value))
        .or_else(|_| LEGACY_B64.decode(value.replace(' ', "+")))
        .map_err(|e| anyhow!("invalid base64 in query parameter: {}", e))?;
    String::from_utf8(bytes).map_err(|e| anyhow!("query parameter is not valid UTF-8: {}", e))
}
