//! Citation URL extraction from free-form response text.

/// Minimum plausible URL length; shorter matches are degenerate
/// (`http://a.b` and the like) and get dropped.
const MIN_URL_LEN: usize = 11;

/// Extract URL-like substrings, deduplicated in first-seen order.
///
/// A match runs from `http://` or `https://` to the first whitespace or
/// closing parenthesis; trailing sentence punctuation is stripped. Trailing
/// slash and no-slash forms of the same address are kept distinct.
pub fn extract_sources(text: &str) -> Vec<String> {
    let mut sources: Vec<String> = Vec::new();
    let mut search_from = 0;

    while let Some(offset) = text[search_from..].find("http") {
        let start = search_from + offset;
        let tail = &text[start..];
        if !tail.starts_with("http://") && !tail.starts_with("https://") {
            search_from = start + 4;
            continue;
        }

        let end = tail
            .find(|c: char| c.is_whitespace() || c == ')')
            .unwrap_or(tail.len());
        let url = tail[..end].trim_end_matches(['.', ',', ';', ':']);

        if url.len() >= MIN_URL_LEN && !sources.iter().any(|seen| seen == url) {
            sources.push(url.to_string());
        }

        search_from = start + end.max(1);
    }

    sources
}
