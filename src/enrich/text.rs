//! Description cleanup: markup stripping, whitespace collapsing, truncation.

use std::sync::LazyLock;

use regex::Regex;

static HTML_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]*>").unwrap_or_else(|e| panic!("bad html pattern: {e}")));

static BBCODE_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[/?[a-zA-Z0-9*]+(?:=[^\]]*)?\]")
        .unwrap_or_else(|e| panic!("bad bbcode pattern: {e}"))
});

const ELLIPSIS: &str = "...";

/// Removes HTML and BBCode tags and collapses whitespace runs to one space.
pub fn strip_markup(text: &str) -> String {
    let text = HTML_TAG.replace_all(text, " ");
    let text = BBCODE_TAG.replace_all(&text, " ");
    collapse_whitespace(&text)
}

/// Collapses every whitespace run to a single space and trims the ends.
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Caps `text` at `limit` characters, ending in `...` when cut.
///
/// `limit` counts characters, not bytes, and includes the ellipsis.
pub fn truncate(text: &str, limit: usize) -> String {
    if text.chars().count() <= limit {
        return text.to_string();
    }
    let keep = limit.saturating_sub(ELLIPSIS.len());
    let mut out: String = text.chars().take(keep).collect();
    out.push_str(ELLIPSIS);
    out
}
