use std::{borrow::Cow, sync::LazyLock};

use regex::bytes::Regex;

// Only spaces and tabs count; a `\r` before the `\n` is content, not whitespace.
static TRAILING_WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[ \t]+\n").expect("trailing whitespace regex must compile"));

/// Strip spaces and tabs immediately before every line feed. Returns
/// `Cow::Borrowed` (byte-identical to the input) if there was nothing to strip.
///
/// Whitespace at the very end of the file with no newline after it is kept.
pub fn strip_trailing_whitespace(contents: &[u8]) -> Cow<'_, [u8]> {
    TRAILING_WHITESPACE.replace_all(contents, &b"\n"[..])
}
