//! Stdout transcoding.
//!
//! Git output is collected as raw bytes and decoded late, so content read
//! from blobs can be shown in the encoding the caller asks for. Byte-order
//! marks are only consulted when the caller opts into guessing.

use encoding_rs::{Encoding, UTF_8, UTF_16BE, UTF_16LE};

/// Resolve an encoding label such as `utf8`, `latin1` or `shift_jis`.
///
/// Unknown labels fall back to UTF-8. A few labels git users commonly type
/// that are not WHATWG labels are normalized first.
pub fn resolve(label: Option<&str>) -> &'static Encoding {
    let Some(label) = label else {
        return UTF_8;
    };

    let normalized = match label.trim().to_ascii_lowercase().as_str() {
        "utf8" => "utf-8".to_string(),
        "utf16le" => "utf-16le".to_string(),
        "utf16be" => "utf-16be".to_string(),
        other => other.to_string(),
    };

    Encoding::for_label(normalized.as_bytes()).unwrap_or(UTF_8)
}

/// Whether `label` names an encoding the decoder understands.
pub fn exists(label: &str) -> bool {
    let resolved = resolve(Some(label));
    resolved != UTF_8 || matches!(label.trim().to_ascii_lowercase().as_str(), "utf8" | "utf-8" | "unicode-1-1-utf-8")
}

/// Decode `bytes` as `label`, stripping only that encoding's own byte-order mark.
pub fn decode(bytes: &[u8], label: Option<&str>) -> String {
    let (text, _) = resolve(label).decode_with_bom_removal(bytes);
    text.into_owned()
}

/// Detect a Unicode encoding from a byte-order mark.
pub fn detect_unicode_encoding(bytes: &[u8]) -> Option<&'static Encoding> {
    if bytes.len() < 2 {
        return None;
    }

    match (bytes[0], bytes[1]) {
        (0xFE, 0xFF) => return Some(UTF_16BE),
        (0xFF, 0xFE) => return Some(UTF_16LE),
        _ => {}
    }

    if bytes.len() >= 3 && bytes[..3] == [0xEF, 0xBB, 0xBF] {
        return Some(UTF_8);
    }

    None
}

/// Whether the buffer looks like text: no NUL byte, unless it is UTF-16.
pub fn is_text(bytes: &[u8]) -> bool {
    match detect_unicode_encoding(bytes) {
        Some(encoding) if encoding == UTF_16BE || encoding == UTF_16LE => true,
        _ => !bytes.contains(&0),
    }
}
