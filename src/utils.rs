//! # Utilities Module
//!
//! ## Purpose
//! Common text utilities used throughout the corpus builder: whitespace
//! normalization for extracted markup text and sentence identity, and URL
//! absolutization for audio links.
//!
//! ## Input/Output Specification
//! - **Input**: Raw text fragments from markup, relative URLs
//! - **Output**: Space-collapsed text, normalized sentence identities,
//!   absolute URLs

use unicode_normalization::UnicodeNormalization;

/// Collapse every run of whitespace (spaces, tabs, newlines and non-breaking
/// spaces) to a single ASCII space and trim the ends.
///
/// Extracted markup text must always pass through here so adjacent text
/// nodes never concatenate without a separator.
pub fn collapse_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_gap = true; // swallows leading whitespace
    for ch in text.chars() {
        if ch.is_whitespace() {
            in_gap = true;
        } else {
            if in_gap && !out.is_empty() {
                out.push(' ');
            }
            in_gap = false;
            out.push(ch);
        }
    }
    out
}

/// Normalize a sentence for identity comparison: Unicode NFC followed by
/// whitespace collapse. Two examples are the same iff their normalized
/// contexts are byte-equal.
pub fn normalize_context(text: &str) -> String {
    collapse_whitespace(&text.nfc().collect::<String>())
}

/// Absolutize a possibly-relative URL against a base. Page audio sources
/// usually start with `/`.
pub fn absolutize_url(base: &str, src: &str) -> String {
    if src.is_empty() {
        return String::new();
    }
    if src.starts_with("http://") || src.starts_with("https://") {
        return src.to_string();
    }
    let base = base.trim_end_matches('/');
    if src.starts_with('/') {
        format!("{}{}", base, src)
    } else {
        format!("{}/{}", base, src)
    }
}
