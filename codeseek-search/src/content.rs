//! Text cleanup helpers shared by providers, documents and enrichment.
//!
//! Provider payloads carry HTML bodies and entity-escaped titles. These
//! helpers turn them into plain, whitespace-collapsed text.

use scraper::Html;

/// Strip markup tags from an HTML fragment and collapse whitespace.
///
/// Tags are replaced by a single space so adjacent blocks do not run
/// together. Character entities are decoded.
pub fn strip_markup(html: &str) -> String {
    if html.trim().is_empty() {
        return String::new();
    }
    let fragment = Html::parse_fragment(html);
    let text = fragment.root_element().text().collect::<Vec<_>>().join(" ");
    collapse_whitespace(&text)
}

/// Collapse every run of whitespace into one space and trim the ends.
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Lower-case and whitespace-collapse text for the searchable document field.
pub fn normalize_text(text: &str) -> String {
    collapse_whitespace(text).to_lowercase()
}

/// Truncate to at most `max_chars` characters, appending `...` when cut.
///
/// Counts characters rather than bytes so multi-byte text is never split.
pub fn truncate_with_ellipsis(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        None => text.to_owned(),
        Some((end, _)) => {
            let mut truncated = text[..end].trim_end().to_owned();
            truncated.push_str("...");
            truncated
        }
    }
}
