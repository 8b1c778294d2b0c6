//! Restricted markdown for chat bubbles.
//!
//! The transform is a fixed sequence of textual rules applied to
//! HTML-escaped input, each rule consuming the output of the previous one:
//!
//! 1. newlines become `<br>`
//! 2. `**bold**` becomes `<b>`
//! 3. `*italic*` becomes `<i>`
//! 4. `[label](url)` becomes an anchor opening in a new browsing context
//! 5. bare `http(s)://` tokens outside anchors are auto-linked the same way
//! 6. lines starting with `- ` become list items, and a block containing any
//!    item is wrapped in `<ul>`
//!
//! Because the input is escaped first, the only markup in the output is the
//! markup these rules insert.

use std::sync::LazyLock;

use regex::{Captures, Regex};

const LINE_BREAK: &str = "<br>";
const LIST_MARKER: &str = "- ";

static BOLD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*\*(.+?)\*\*").expect("bold pattern should compile"));
static ITALIC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*(.+?)\*").expect("italic pattern should compile"));
static LINK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[([^\]]+)\]\(([^)\s]+)\)").expect("link pattern should compile")
});
static ANCHOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<a [^>]*>.*?</a>").expect("anchor pattern should compile"));
// Runs over escaped text: `&amp;` stays in the token, every other entity
// ends it.
static BARE_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"https?://(?:[^\s<&]|&amp;)+").expect("url pattern should compile")
});
static TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]*>").expect("tag pattern should compile"));

/// Escapes the five HTML-significant characters.
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Converts chat text into safe bubble markup.
pub fn format_markdown(text: &str) -> String {
    let html = escape_html(text).replace('\n', LINE_BREAK);
    let html = BOLD.replace_all(&html, "<b>$1</b>");
    let html = ITALIC.replace_all(&html, "<i>$1</i>");
    let html = LINK.replace_all(&html, |caps: &Captures| {
        let label = &caps[1];
        let target = &caps[2];
        if is_linkable(target) {
            anchor(target, label)
        } else {
            label.to_string()
        }
    });
    let html = autolink(&html);
    wrap_list_items(&html)
}

/// Plain-text projection of bubble markup: tags dropped, line breaks kept,
/// entities decoded. Streaming animates over this text.
pub fn plain_text(markup: &str) -> String {
    let text = markup.replace(LINE_BREAK, "\n");
    let text = TAG.replace_all(&text, "");
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}

fn anchor(href: &str, label: &str) -> String {
    format!(r#"<a href="{href}" target="_blank" rel="noopener noreferrer">{label}</a>"#)
}

fn is_linkable(target: &str) -> bool {
    let lower = target.to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://") || lower.starts_with("mailto:")
}

// Only the spans between existing anchors are scanned, so a URL that is
// already a link target or label is never wrapped twice.
fn autolink(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut last = 0;
    for existing in ANCHOR.find_iter(html) {
        out.push_str(&autolink_span(&html[last..existing.start()]));
        out.push_str(existing.as_str());
        last = existing.end();
    }
    out.push_str(&autolink_span(&html[last..]));
    out
}

fn autolink_span(span: &str) -> String {
    BARE_URL
        .replace_all(span, |caps: &Captures| {
            let token = &caps[0];
            let url = token.trim_end_matches(['.', ',', ';', ':', '!', '?', ')']);
            let trailer = &token[url.len()..];
            format!("{}{trailer}", anchor(url, url))
        })
        .into_owned()
}

fn wrap_list_items(html: &str) -> String {
    let lines: Vec<(bool, String)> = html
        .split(LINE_BREAK)
        .map(|line| match line.strip_prefix(LIST_MARKER) {
            Some(item) => (true, format!("<li>{item}</li>")),
            None => (false, line.to_string()),
        })
        .collect();
    if !lines.iter().any(|(is_item, _)| *is_item) {
        return html.to_string();
    }
    let mut out = String::from("<ul>");
    for (idx, (is_item, line)) in lines.iter().enumerate() {
        if idx > 0 && !is_item && !lines[idx - 1].0 {
            out.push_str(LINE_BREAK);
        }
        out.push_str(line);
    }
    out.push_str("</ul>");
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emphasis_and_links() {
        let html = format_markdown("**bold** and *italic* with [link](https://x)");
        assert!(html.contains("<b>bold</b>"));
        assert!(html.contains("<i>italic</i>"));
        assert!(html.contains(r#"<a href="https://x" target="_blank" rel="noopener noreferrer">link</a>"#));
        assert_eq!(html.matches("<a ").count(), 1);
    }

    #[test]
    fn bare_url_linked_once() {
        let html = format_markdown("see https://y for more");
        assert_eq!(
            html,
            r#"see <a href="https://y" target="_blank" rel="noopener noreferrer">https://y</a> for more"#
        );
    }

    #[test]
    fn bracket_link_with_url_label_not_double_wrapped() {
        let html = format_markdown("[https://z](https://z) and [see https://w](https://w)");
        assert_eq!(html.matches("<a ").count(), 2);
        assert_eq!(html.matches("</a>").count(), 2);
    }

    #[test]
    fn mixed_bracket_and_bare_links() {
        let html = format_markdown("[docs](https://x) or https://y.");
        assert_eq!(html.matches("<a ").count(), 2);
        assert!(html.ends_with("</a>."));
    }

    #[test]
    fn quoted_and_bracketed_urls_keep_clean_targets() {
        let link = r#"<a href="https://x.com" target="_blank" rel="noopener noreferrer">https://x.com</a>"#;
        assert_eq!(
            format_markdown("'https://x.com'"),
            format!("&#39;{link}&#39;")
        );
        assert_eq!(
            format_markdown("\"https://x.com\"."),
            format!("&quot;{link}&quot;.")
        );
        assert_eq!(
            format_markdown("<https://x.com>"),
            format!("&lt;{link}&gt;")
        );
    }

    #[test]
    fn query_ampersands_stay_in_url() {
        let html = format_markdown("https://x.com/?a=1&b=2");
        assert!(html.starts_with(r#"<a href="https://x.com/?a=1&amp;b=2""#));
        assert!(html.ends_with(">https://x.com/?a=1&amp;b=2</a>"));
    }

    #[test]
    fn newlines_become_breaks() {
        assert_eq!(format_markdown("a\nb"), "a<br>b");
    }

    #[test]
    fn list_items_wrapped() {
        let html = format_markdown("Options:\n- one\n- two");
        assert_eq!(html, "<ul>Options:<li>one</li><li>two</li></ul>");
        assert_eq!(format_markdown("no - list here"), "no - list here");
    }

    #[test]
    fn markup_is_escaped() {
        let html = format_markdown("<script>alert('x')</script>");
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;"));
    }

    #[test]
    fn unsafe_link_targets_render_label_only() {
        assert_eq!(format_markdown("[click](javascript:void)"), "click");
        assert!(format_markdown("[mail](mailto:a@b.c)").contains(r#"href="mailto:a@b.c""#));
    }

    #[test]
    fn plain_text_projection() {
        let html = format_markdown("**Hi** &\n[there](https://x)");
        assert_eq!(plain_text(&html), "Hi &\nthere");
    }
}
