//! URL extraction from free text.

use std::sync::LazyLock;

use regex::Regex;

/// Greedy match of `http://` or `https://` followed by a run of URL-safe
/// characters or percent-encoded bytes. Stops at the first character
/// outside the class (whitespace, quotes, angle brackets, ...).
static URL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"https?://(?:[A-Za-z0-9$_@.&+!*'(),/?:;=~#\-]|%[0-9a-fA-F]{2})+")
        .expect("URL pattern is valid")
});

/// Extract URL substrings from `text`, in order of first appearance.
///
/// Pure function: no network validation, no deduplication, no
/// normalization — callers must not assume canonical form.
pub fn extract_urls(text: &str) -> Vec<String> {
    URL_PATTERN
        .find_iter(text)
        .map(|m| m.as_str().to_string())
        .collect()
}
