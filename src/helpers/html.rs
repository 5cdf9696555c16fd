//! HTML text helpers

/// Escape HTML special characters
pub fn html_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

const BLOCK_TAGS: &[&str] = &[
    "p", "h1", "h2", "h3", "h4", "h5", "h6", "li", "ul", "ol", "div", "pre", "br", "tr", "td",
    "th", "table", "blockquote", "figure",
];

/// Drop tags and decode the handful of entities the renderer emits
pub fn strip_html(s: &str) -> String {
    let mut text = String::with_capacity(s.len());
    let mut tag: Option<String> = None;

    for c in s.chars() {
        match tag.as_mut() {
            None if c == '<' => tag = Some(String::new()),
            None => text.push(c),
            Some(name) if c == '>' => {
                let name = name
                    .trim_start_matches('/')
                    .split(|c: char| c.is_whitespace() || c == '/')
                    .next()
                    .unwrap_or_default()
                    .to_ascii_lowercase();
                // Keep words in adjacent blocks apart
                if BLOCK_TAGS.contains(&name.as_str()) {
                    text.push(' ');
                }
                tag = None;
            }
            Some(name) => name.push(c),
        }
    }

    let text = text
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&");
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Cut to at most `length` characters, omission included
pub fn truncate(s: &str, length: usize, omission: Option<&str>) -> String {
    let omission = omission.unwrap_or("...");
    if s.chars().count() <= length {
        return s.to_string();
    }
    let keep = length.saturating_sub(omission.chars().count());
    let head: String = s.chars().take(keep).collect();
    format!("{}{}", head.trim_end(), omission)
}
