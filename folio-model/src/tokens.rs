//! Conversion between free-text comma-separated input and ordered tag lists.

/// Split comma-delimited free text into trimmed, non-empty tokens,
/// preserving input order.
pub fn split_tokens(text: &str) -> Vec<String> {
    text.split(',')
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_owned)
        .collect()
}

/// Join tokens back into the comma-separated form used by edit forms.
pub fn join_tokens(tokens: &[String]) -> String {
    tokens.join(", ")
}
