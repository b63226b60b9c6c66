//! Filesystem-safe path segments.
//!
//! Session, sequence and request identifiers arrive from clients and end up as
//! directory and file names. Anything outside `[A-Za-z0-9_-]` is replaced with
//! `_`, which rules out separators, `.`/`..` traversal, drive prefixes and
//! NUL bytes in one pass.

use std::borrow::Cow;

const REPLACEMENT: char = '_';

fn is_allowed(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-'
}

/// Sanitize a caller-supplied identifier into a single path segment.
///
/// Returns `Cow::Borrowed` when the input is already safe. An empty input maps
/// to `"_"` so it can never name the parent directory itself.
#[must_use]
pub fn sanitize_segment(input: &str) -> Cow<'_, str> {
    if input.is_empty() {
        return Cow::Owned(REPLACEMENT.to_string());
    }
    if input.chars().all(is_allowed) {
        return Cow::Borrowed(input);
    }
    Cow::Owned(
        input
            .chars()
            .map(|c| if is_allowed(c) { c } else { REPLACEMENT })
            .collect(),
    )
}
