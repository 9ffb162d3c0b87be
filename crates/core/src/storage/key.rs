//! Object keys, content hashes and header encoding.

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use sha1::{Digest, Sha1};

/// Characters left as-is in `X-Bz-File-Name` and `X-Bz-Info-*` values.
const B2_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~')
    .remove(b'/');

/// Lowercase hex SHA-1 of `bytes`.
#[must_use]
pub fn content_sha1(bytes: &[u8]) -> String {
    hex::encode(Sha1::digest(bytes))
}

/// Exactly 40 lowercase hex characters.
#[must_use]
pub fn is_valid_sha1(candidate: &str) -> bool {
    candidate.len() == 40
        && candidate
            .bytes()
            .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
}

/// Use the caller's hash when well formed, otherwise hash the bytes.
#[must_use]
pub fn resolve_sha1(provided: Option<&str>, bytes: &[u8]) -> String {
    match provided {
        Some(hash) if is_valid_sha1(hash) => hash.to_string(),
        _ => content_sha1(bytes),
    }
}

/// File extension (with leading dot) for a content type, or empty.
#[must_use]
pub fn extension_for(content_type: &str) -> String {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    let known = match essence.as_str() {
        "application/pdf" => Some("pdf"),
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/png" => Some("png"),
        "application/msword" => Some("doc"),
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document" => Some("docx"),
        "application/vnd.ms-excel" => Some("xls"),
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet" => Some("xlsx"),
        "text/plain" => Some("txt"),
        _ => None,
    };

    known
        .or_else(|| {
            mime_guess::get_mime_extensions_str(&essence).and_then(|exts| exts.first().copied())
        })
        .map(|ext| format!(".{ext}"))
        .unwrap_or_default()
}

/// Generate a globally unique object key.
///
/// Format: `{folder}/{timestampMillis}_{16 hex random}{ext}`, whitespace
/// replaced by underscores.
#[must_use]
pub fn generate_object_key(folder: &str, content_type: &str, timestamp_millis: i64) -> String {
    let suffix: u64 = rand::random();
    let folder = folder.trim_matches('/');
    let ext = extension_for(content_type);

    let key = if folder.is_empty() {
        format!("{timestamp_millis}_{suffix:016x}{ext}")
    } else {
        format!("{folder}/{timestamp_millis}_{suffix:016x}{ext}")
    };

    key.chars()
        .map(|c| if c.is_whitespace() { '_' } else { c })
        .collect()
}

/// Percent-encode a value for B2 file name and info headers.
#[must_use]
pub fn encode_header_value(value: &str) -> String {
    utf8_percent_encode(value, B2_ENCODE_SET).to_string()
}
