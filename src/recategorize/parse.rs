use std::sync::LazyLock;

use regex::Regex;

use crate::models::Taxonomy;

static NUMBERING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+\.\s*").expect("numbering pattern is valid"));

/// Labels from a chunk response, in response order.
///
/// Tokens are split on commas and newlines, trimmed, lowercased and stripped
/// of `"<n>. "` prefixes. Anything outside the taxonomy is dropped rather than
/// replaced, so the result can be shorter than the chunk.
pub fn parse_labels(response: &str, taxonomy: &Taxonomy) -> Vec<String> {
    response
        .split([',', '\n'])
        .map(|token| token.trim().to_lowercase())
        .map(|token| NUMBERING.replace(&token, "").trim().to_string())
        .filter(|token| !token.is_empty())
        .filter_map(|token| taxonomy.resolve(&token).map(str::to_string))
        .collect()
}
