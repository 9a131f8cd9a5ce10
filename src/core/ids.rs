//! Deterministic, content-derived identifiers.
//!
//! Identifiers are stable functions of semantic content so that unchanged
//! input across runs yields identical ids. Trend comparison depends on this.

use sha2::{Digest, Sha256};

/// Length of the hex digest suffix appended to every id.
const DIGEST_CHARS: usize = 12;

/// Build a `{prefix}-{hex}` identifier from the given content parts.
///
/// Parts are hashed with a field separator so `["ab", "c"]` and `["a", "bc"]`
/// never collide.
pub fn content_id(prefix: &str, parts: &[&str]) -> String {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part.as_bytes());
        hasher.update([0x1f]);
    }
    let digest = hasher.finalize();
    let mut id = String::with_capacity(prefix.len() + 1 + DIGEST_CHARS);
    id.push_str(prefix);
    id.push('-');
    for byte in digest.iter().take(DIGEST_CHARS / 2) {
        id.push_str(&format!("{byte:02x}"));
    }
    id
}

/// Normalize a human label into a slug suitable for id derivation.
pub fn normalize_label(label: &str) -> String {
    let mut slug = String::with_capacity(label.len());
    let mut last_dash = true;
    for ch in label.chars() {
        if ch.is_ascii_alphanumeric() {
            slug.push(ch.to_ascii_lowercase());
            last_dash = false;
        } else if !last_dash {
            slug.push('-');
            last_dash = true;
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    if slug.is_empty() {
        "unknown".to_string()
    } else {
        slug
    }
}
