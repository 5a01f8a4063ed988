//! Message text formatting.
//!
//! Converts raw user text into HTML that is safe to insert into the page.
//! Escaping always runs first, so the only tags in the output are the ones
//! produced by the lightweight markup substitutions below.

use std::sync::LazyLock;

use regex::Regex;

static BOLD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\*\*(.*?)\*\*").unwrap());
static ITALIC: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\*(.*?)\*").unwrap());
static LINK: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(https?://\S+)").unwrap());

/// Escape the five HTML-significant characters.
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#039;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Format a chat message for display.
///
/// Applies, in order: HTML escaping, `**bold**`, `*italic*`, then bare
/// `http(s)://` links (opened in a new tab).
pub fn format_message(raw: &str) -> String {
    let safe = escape_html(raw);
    let safe = BOLD.replace_all(&safe, "<strong>${1}</strong>");
    let safe = ITALIC.replace_all(&safe, "<em>${1}</em>");
    let safe = LINK.replace_all(&safe, r#"<a href="${1}" target="_blank">${1}</a>"#);
    safe.into_owned()
}
