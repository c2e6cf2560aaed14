//! `data:` URLs for embedded images and preview thumbnails.

use base64::{Engine as _, engine::general_purpose};

/// Encode bytes as a base64 `data:` URL.
pub fn encode(mime: &str, bytes: &[u8]) -> String {
    format!("data:{mime};base64,{}", general_purpose::STANDARD.encode(bytes))
}

/// Split a base64 `data:` URL into its MIME type and decoded bytes.
/// Returns `None` for remote URLs, non-base64 payloads, or bad base64.
pub fn decode(url: &str) -> Option<(&str, Vec<u8>)> {
    let rest = url.strip_prefix("data:")?;
    let (meta, payload) = rest.split_once(',')?;
    let mime = meta.strip_suffix(";base64")?;
    let bytes = general_purpose::STANDARD.decode(payload.trim()).ok()?;
    Some((mime, bytes))
}
