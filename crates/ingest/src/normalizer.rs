/// Lowercase and collapse every whitespace run to a single space.
pub fn normalize_text(text: &str) -> String {
    text.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Text an article is matched and embedded on.
pub fn matching_text(headline: &str, content: &str) -> String {
    normalize_text(&format!("{}\n{}", headline, content))
}
