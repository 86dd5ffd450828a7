//! Decoding of base64 image payloads submitted with catalog items.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PayloadError {
    #[error("invalid payload")]
    InvalidEncoding,
    #[error("invalid payload: decoded to zero bytes")]
    Empty,
    #[error("payload is {actual} bytes, limit is {limit}")]
    TooLarge { actual: usize, limit: usize },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedPayload {
    pub bytes: Vec<u8>,
    /// Media type from a `data:` URL header, when one was supplied.
    pub mime: Option<String>,
}

/// Decode a payload given either as plain base64 or as a
/// `data:<mime>;base64,<data>` URL. Embedded whitespace is ignored.
///
/// # Errors
///
/// Returns [`PayloadError::InvalidEncoding`] for malformed input,
/// [`PayloadError::Empty`] when nothing decodes, and
/// [`PayloadError::TooLarge`] when the decoded size exceeds `max_bytes`.
pub fn decode_payload(raw: &str, max_bytes: usize) -> Result<DecodedPayload, PayloadError> {
    let raw = raw.trim();

    let (mime, data) = match raw.strip_prefix("data:") {
        Some(rest) => {
            let (header, data) = rest.split_once(',').ok_or(PayloadError::InvalidEncoding)?;
            let mut parts = header.split(';');
            let mime = parts
                .next()
                .map(str::trim)
                .filter(|m| !m.is_empty())
                .map(str::to_lowercase);
            if !parts.any(|p| p.trim().eq_ignore_ascii_case("base64")) {
                return Err(PayloadError::InvalidEncoding);
            }
            (mime, data)
        }
        None => (None, raw),
    };

    let compact: String = data.chars().filter(|c| !c.is_whitespace()).collect();

    // base64 expands 3 bytes to 4 chars; reject oversized input before decoding it.
    if compact.len() / 4 * 3 > max_bytes.saturating_add(3) {
        return Err(PayloadError::TooLarge {
            actual: compact.len() / 4 * 3,
            limit: max_bytes,
        });
    }

    let bytes = STANDARD
        .decode(compact.as_bytes())
        .map_err(|_| PayloadError::InvalidEncoding)?;

    if bytes.is_empty() {
        return Err(PayloadError::Empty);
    }
    if bytes.len() > max_bytes {
        return Err(PayloadError::TooLarge {
            actual: bytes.len(),
            limit: max_bytes,
        });
    }

    Ok(DecodedPayload { bytes, mime })
}
